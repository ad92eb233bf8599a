//! Typed error hierarchy for the outreach orchestrator.
//!
//! Two top-level enums cover the orchestration layer:
//! - `OrchestratorError`: operator-facing rejections (start/stop/config)
//! - `CampaignError`: failures that terminate a running campaign; the
//!   gateway cause is part of the message rather than a chained source
//!
//! Collaborator errors live next to their traits: `GatewayError` in
//! `crate::gateway`, `CrmError` in `crate::crm`.

use thiserror::Error;

use crate::gateway::GatewayError;

/// Errors returned to callers of the `Orchestrator` control methods.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrchestratorError {
    #[error("Campaign is already running")]
    AlreadyRunning,

    #[error("Campaign is not running")]
    NotRunning,

    #[error("Invalid campaign config: {0}")]
    InvalidConfig(String),
}

/// Errors raised outside per-item boundaries. Each one ends the campaign
/// and is reported through the status log.
#[derive(Debug, Error)]
pub enum CampaignError {
    #[error("Failed to open browser session: {0}")]
    SessionUnavailable(GatewayError),

    #[error("Failed to check login status: {0}")]
    LoginCheck(GatewayError),
}
