use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::OrchestratorError;

/// Job search criteria.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchCriteria {
    pub job_titles: Vec<String>,
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default = "default_posted_within_days")]
    pub posted_within_days: u32,
}

fn default_posted_within_days() -> u32 {
    7
}

fn default_delay_between_connections() -> u64 {
    30
}

fn default_max_connections_per_session() -> u32 {
    20
}

/// Everything one campaign needs. Immutable once the campaign starts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CampaignConfig {
    pub search: SearchCriteria,
    pub message_template: String,
    pub crm_stage_id: String,
    /// Seconds to wait after each successful send.
    #[serde(default = "default_delay_between_connections")]
    pub delay_between_connections: u64,
    #[serde(default = "default_max_connections_per_session")]
    pub max_connections_per_session: u32,
}

impl CampaignConfig {
    pub fn validate(&self) -> Result<(), OrchestratorError> {
        if self.message_template.trim().is_empty() {
            return Err(OrchestratorError::InvalidConfig(
                "message template is empty".into(),
            ));
        }
        if self.crm_stage_id.trim().is_empty() {
            return Err(OrchestratorError::InvalidConfig(
                "CRM stage id is empty".into(),
            ));
        }
        Ok(())
    }
}

/// A posting found by the search phase. Lives only for one campaign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPosting {
    pub title: String,
    pub company: String,
    pub link: String,
    pub search_term: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Executive {
    pub name: String,
    pub title: String,
    pub company: String,
    pub profile_url: String,
    /// The posting title that led us to this company.
    pub hiring_for: Option<String>,
    pub profile_summary: Option<String>,
}

impl Executive {
    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or("")
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Pending,
    Sent,
    Accepted,
    Failed,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Accepted => "accepted",
            Self::Failed => "failed",
        }
    }
}

/// One outreach attempt. Created pending, resolved exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionRequest {
    pub executive: Executive,
    pub message: String,
    pub status: ConnectionStatus,
    pub sent_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl ConnectionRequest {
    pub fn new(executive: Executive, message: String) -> Self {
        Self {
            executive,
            message,
            status: ConnectionStatus::Pending,
            sent_at: None,
            error: None,
        }
    }

    pub fn mark_sent(mut self, at: DateTime<Utc>) -> Self {
        debug_assert_eq!(self.status, ConnectionStatus::Pending);
        self.status = ConnectionStatus::Sent;
        self.sent_at = Some(at);
        self
    }

    pub fn mark_failed(mut self, error: impl Into<String>) -> Self {
        debug_assert_eq!(self.status, ConnectionStatus::Pending);
        self.status = ConnectionStatus::Failed;
        self.error = Some(error.into());
        self
    }
}

/// A timestamped status-log line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogEntry {
    pub at: DateTime<Local>,
    pub message: String,
}

impl LogEntry {
    pub fn now(message: impl Into<String>) -> Self {
        Self {
            at: Local::now(),
            message: message.into(),
        }
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.at.format("%H:%M:%S"), self.message)
    }
}

pub const IDLE_ACTION: &str = "Idle";

/// Snapshot of the campaign. Observers always receive the whole thing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CampaignStatus {
    pub campaign_id: Option<Uuid>,
    pub is_running: bool,
    pub current_action: String,
    pub connections_sent: u32,
    pub connections_failed: u32,
    pub leads_created: u32,
    pub current_executive: Option<Executive>,
    pub log: VecDeque<LogEntry>,
}

impl Default for CampaignStatus {
    fn default() -> Self {
        Self {
            campaign_id: None,
            is_running: false,
            current_action: IDLE_ACTION.to_string(),
            connections_sent: 0,
            connections_failed: 0,
            leads_created: 0,
            current_executive: None,
            log: VecDeque::new(),
        }
    }
}
