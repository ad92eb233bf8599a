use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::campaign::{CampaignConfig, CampaignStatus, Orchestrator, SearchCriteria};
use crate::errors::OrchestratorError;

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
}

pub type SharedState = Arc<AppState>;

// ── Request payload types ─────────────────────────────────────────────

fn default_posted_within_days() -> u32 {
    7
}

fn default_delay_between_connections() -> u64 {
    30
}

fn default_max_connections_per_session() -> u32 {
    20
}

/// Flat start request, as sent by the UI form.
#[derive(Debug, Deserialize)]
pub struct StartCampaignRequest {
    pub job_titles: Vec<String>,
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default = "default_posted_within_days")]
    pub posted_within_days: u32,
    pub message_template: String,
    pub crm_stage_id: String,
    #[serde(default = "default_delay_between_connections")]
    pub delay_between_connections: u64,
    #[serde(default = "default_max_connections_per_session")]
    pub max_connections_per_session: u32,
}

impl From<StartCampaignRequest> for CampaignConfig {
    fn from(req: StartCampaignRequest) -> Self {
        CampaignConfig {
            search: SearchCriteria {
                job_titles: req.job_titles,
                locations: req.locations,
                posted_within_days: req.posted_within_days,
            },
            message_template: req.message_template,
            crm_stage_id: req.crm_stage_id,
            delay_between_connections: req.delay_between_connections,
            max_connections_per_session: req.max_connections_per_session,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ControlResponse {
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<uuid::Uuid>,
}

impl ControlResponse {
    fn new(status: &str, message: &str) -> Self {
        Self {
            status: status.to_string(),
            message: message.to_string(),
            campaign_id: None,
        }
    }
}

// ── Error handling ────────────────────────────────────────────────────

pub enum ApiError {
    Conflict(String),
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };
        (status, Json(serde_json::json!({"error": message}))).into_response()
    }
}

impl From<OrchestratorError> for ApiError {
    fn from(err: OrchestratorError) -> Self {
        match err {
            OrchestratorError::AlreadyRunning | OrchestratorError::NotRunning => {
                ApiError::Conflict(err.to_string())
            }
            OrchestratorError::InvalidConfig(_) => ApiError::BadRequest(err.to_string()),
        }
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/api/start", post(start_campaign))
        .route("/api/stop", post(stop_campaign))
        .route("/api/status", get(get_status))
        .route("/api/close-session", post(close_session))
        .route("/health", get(health_check))
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn start_campaign(
    State(state): State<SharedState>,
    Json(req): Json<StartCampaignRequest>,
) -> Result<Json<ControlResponse>, ApiError> {
    let id = state.orchestrator.start(req.into())?;
    Ok(Json(ControlResponse {
        campaign_id: Some(id),
        ..ControlResponse::new("started", "Campaign started successfully")
    }))
}

async fn stop_campaign(
    State(state): State<SharedState>,
) -> Result<Json<ControlResponse>, ApiError> {
    state.orchestrator.request_stop()?;
    Ok(Json(ControlResponse::new("stopped", "Campaign stop requested")))
}

async fn get_status(State(state): State<SharedState>) -> Json<CampaignStatus> {
    Json(state.orchestrator.current_status())
}

async fn close_session(State(state): State<SharedState>) -> Json<ControlResponse> {
    state.orchestrator.shutdown().await;
    Json(ControlResponse::new("closed", "Browser session closed"))
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_request_defaults_match_ui_form() {
        let req: StartCampaignRequest = serde_json::from_value(serde_json::json!({
            "job_titles": ["Data Engineer"],
            "message_template": "Hi {name}",
            "crm_stage_id": "stage-1"
        }))
        .unwrap();
        let config: CampaignConfig = req.into();
        assert_eq!(config.search.job_titles, vec!["Data Engineer".to_string()]);
        assert_eq!(config.search.posted_within_days, 7);
        assert_eq!(config.delay_between_connections, 30);
        assert_eq!(config.max_connections_per_session, 20);
    }

    #[test]
    fn operator_errors_map_to_conflict() {
        let resp = ApiError::from(OrchestratorError::AlreadyRunning).into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let resp = ApiError::from(OrchestratorError::NotRunning).into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let resp =
            ApiError::from(OrchestratorError::InvalidConfig("empty".into())).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn control_response_omits_missing_campaign_id() {
        let json = serde_json::to_value(ControlResponse::new("stopped", "ok")).unwrap();
        assert!(json.get("campaign_id").is_none());
        assert_eq!(json["status"], "stopped");
    }
}
