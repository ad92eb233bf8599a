//! CRM lead logging.
//!
//! The campaign only needs "create lead"; [`LeadSink`] is that seam.
//! [`HttpCrmClient`] talks to the CRM's JSON API.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::campaign::models::Executive;

pub const DEFAULT_CRM_BASE_URL: &str = "https://work.patchops.io";
pub const DEFAULT_SOURCE_TAG: &str = "LinkedIn Sales Robot";
const NEXT_STEPS: &str = "Follow up on LinkedIn connection acceptance";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum CrmError {
    #[error("CRM request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("CRM returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "urgent" => Ok(Self::Urgent),
            _ => Err(format!("Invalid priority: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadId(pub String);

impl LeadId {
    /// Placeholder for a created lead whose response carried no id.
    pub fn unknown() -> Self {
        Self("unknown".to_string())
    }
}

impl fmt::Display for LeadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Body of `POST /api/leads`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeadPayload {
    pub name: String,
    pub stage_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    pub priority: Priority,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_steps: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Per-deployment lead attributes that are not part of a campaign config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadDefaults {
    pub source_tag: String,
    pub priority: Priority,
}

impl Default for LeadDefaults {
    fn default() -> Self {
        Self {
            source_tag: DEFAULT_SOURCE_TAG.to_string(),
            priority: Priority::Medium,
        }
    }
}

impl LeadPayload {
    pub fn for_executive(
        executive: &Executive,
        stage_id: &str,
        message: &str,
        defaults: &LeadDefaults,
    ) -> Self {
        Self {
            name: executive.name.clone(),
            stage_id: stage_id.to_string(),
            company: Some(executive.company.clone()),
            priority: defaults.priority,
            source: defaults.source_tag.clone(),
            next_steps: Some(NEXT_STEPS.to_string()),
            notes: Some(lead_notes(executive, message)),
        }
    }
}

fn lead_notes(executive: &Executive, message: &str) -> String {
    format!(
        "LinkedIn Profile: {}\nTitle: {}\nHiring for: {}\n\nConnection Message Sent:\n{}\n\nProfile Summary:\n{}",
        executive.profile_url,
        executive.title,
        executive.hiring_for.as_deref().unwrap_or("N/A"),
        message,
        executive.profile_summary.as_deref().unwrap_or("N/A"),
    )
}

/// Anything that can record a lead. Failures are never fatal to a campaign.
#[async_trait]
pub trait LeadSink: Send + Sync {
    async fn create_lead(&self, payload: &LeadPayload) -> Result<LeadId, CrmError>;
}

pub struct HttpCrmClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpCrmClient {
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self, CrmError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl LeadSink for HttpCrmClient {
    async fn create_lead(&self, payload: &LeadPayload) -> Result<LeadId, CrmError> {
        let url = format!("{}/api/leads", self.base_url);
        let mut request = self.http.post(&url).json(payload);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CrmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        // Any 2xx means the lead exists, whatever the body looks like.
        let body: Option<serde_json::Value> = resp.json().await.ok();
        Ok(body.as_ref().map(lead_id_from).unwrap_or_else(LeadId::unknown))
    }
}

/// Reads `{"id": ...}` or `{"lead": {"id": ...}}`, string or number.
fn lead_id_from(body: &serde_json::Value) -> LeadId {
    match body.get("id").or_else(|| body.pointer("/lead/id")) {
        Some(serde_json::Value::String(s)) => LeadId(s.clone()),
        Some(serde_json::Value::Number(n)) => LeadId(n.to_string()),
        _ => LeadId::unknown(),
    }
}
