//! Single-flight campaign orchestrator.
//!
//! One campaign at a time. `start` spawns the campaign body on the tokio
//! runtime and returns immediately; `request_stop` flips a cancellation
//! token the body checks at loop boundaries and rate-limit waits.
//!
//! A campaign counts as active until its task has actually ended, whatever
//! the status board says, so a new body never overlaps an old one.

use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures_util::FutureExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::hub::{ObserverId, Subscription};
use super::models::{CampaignConfig, CampaignStatus};
use super::runner::CampaignRun;
use super::site::SiteProfile;
use super::status::{COMPLETED_ACTION, StatusBoard};
use crate::crm::{LeadDefaults, LeadSink};
use crate::errors::OrchestratorError;
use crate::gateway::Gateway;

pub const SESSION_CLOSED_ACTION: &str = "Session closed";

/// Waits the body makes to let pages render and to respect rate limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pacing {
    /// After every navigation.
    pub page_settle: Duration,
    /// After clicks and fills.
    pub action_settle: Duration,
    /// After each job-title query.
    pub search_delay: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            page_settle: Duration::from_millis(2000),
            action_settle: Duration::from_millis(1000),
            search_delay: Duration::from_millis(2000),
        }
    }
}

impl Pacing {
    pub fn immediate() -> Self {
        Self {
            page_settle: Duration::ZERO,
            action_settle: Duration::ZERO,
            search_delay: Duration::ZERO,
        }
    }
}

/// Deployment settings shared by every campaign this orchestrator runs.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub profile_dir: PathBuf,
    pub headless: bool,
    pub pacing: Pacing,
    pub site: SiteProfile,
    pub lead_defaults: LeadDefaults,
    /// How long `shutdown` waits for the body before aborting it.
    pub shutdown_grace: Duration,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            profile_dir: PathBuf::from("./browser_data"),
            headless: false,
            pacing: Pacing::default(),
            site: SiteProfile::default(),
            lead_defaults: LeadDefaults::default(),
            shutdown_grace: Duration::from_secs(10),
        }
    }
}

struct ActiveCampaign {
    id: Uuid,
    cancel: CancellationToken,
    /// Cancelled when the spawned task ends, including by abort.
    finished: CancellationToken,
    handle: JoinHandle<()>,
}

impl ActiveCampaign {
    fn is_live(&self) -> bool {
        !self.finished.is_cancelled()
    }
}

pub struct Orchestrator {
    gateway: Arc<dyn Gateway>,
    crm: Arc<dyn LeadSink>,
    settings: Arc<OrchestratorSettings>,
    board: Arc<StatusBoard>,
    active: Mutex<Option<ActiveCampaign>>,
}

impl Orchestrator {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        crm: Arc<dyn LeadSink>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            gateway,
            crm,
            settings: Arc::new(settings),
            board: Arc::new(StatusBoard::new()),
            active: Mutex::new(None),
        }
    }

    /// Launch a campaign. Must be called from within a tokio runtime.
    pub fn start(&self, config: CampaignConfig) -> Result<Uuid, OrchestratorError> {
        config.validate()?;

        let mut active = self.lock_active();
        if self.board.is_running() || active.as_ref().is_some_and(ActiveCampaign::is_live) {
            return Err(OrchestratorError::AlreadyRunning);
        }

        let id = Uuid::new_v4();
        let cancel = CancellationToken::new();
        let finished = CancellationToken::new();
        self.board.begin(id);

        let run = CampaignRun {
            id,
            config,
            gateway: Arc::clone(&self.gateway),
            crm: Arc::clone(&self.crm),
            settings: Arc::clone(&self.settings),
            board: Arc::clone(&self.board),
            cancel: cancel.clone(),
        };
        let board = Arc::clone(&self.board);
        let done = finished.clone().drop_guard();
        let handle = tokio::spawn(async move {
            let _done = done;
            if AssertUnwindSafe(run.execute()).catch_unwind().await.is_err() {
                error!(campaign_id = %id, "campaign task panicked");
                board.log("Campaign aborted by an internal error");
                board.finish(COMPLETED_ACTION);
            }
        });

        *active = Some(ActiveCampaign {
            id,
            cancel,
            finished,
            handle,
        });
        info!(campaign_id = %id, "campaign started");
        Ok(id)
    }

    /// Ask the running campaign to wind down. Repeat calls are no-ops.
    pub fn request_stop(&self) -> Result<(), OrchestratorError> {
        let active = self.lock_active();
        match active.as_ref() {
            Some(campaign) if self.board.is_running() => {
                if !campaign.cancel.is_cancelled() {
                    info!(campaign_id = %campaign.id, "stop requested");
                    self.board.log("Stopping campaign...");
                    campaign.cancel.cancel();
                }
                Ok(())
            }
            _ => Err(OrchestratorError::NotRunning),
        }
    }

    /// Stop whatever is running and release the browser session. Waits up to
    /// the shutdown grace period for the body, then aborts it. Concurrent
    /// callers all wait for the same body to end before finishing the board.
    pub async fn shutdown(&self) {
        let _ = self.request_stop();

        if let Some((id, finished)) = self.live_campaign() {
            let wound_down =
                tokio::time::timeout(self.settings.shutdown_grace, finished.cancelled()).await;
            if wound_down.is_err() {
                warn!(campaign_id = %id, "campaign did not wind down within grace period, aborting");
                self.abort(id);
                finished.cancelled().await;
                self.board.log("Campaign aborted during shutdown");
            }
        }

        self.board.finish(SESSION_CLOSED_ACTION);
        self.board.log("Browser session closed");
    }

    /// Wait for the current campaign body to finish.
    pub async fn join(&self) {
        if let Some((_, finished)) = self.live_campaign() {
            finished.cancelled().await;
        }
    }

    pub fn current_status(&self) -> CampaignStatus {
        self.board.snapshot()
    }

    pub fn subscribe(&self) -> Subscription {
        self.board.subscribe()
    }

    pub fn unsubscribe(&self, id: ObserverId) {
        self.board.unsubscribe(id);
    }

    fn live_campaign(&self) -> Option<(Uuid, CancellationToken)> {
        self.lock_active()
            .as_ref()
            .filter(|campaign| campaign.is_live())
            .map(|campaign| (campaign.id, campaign.finished.clone()))
    }

    fn abort(&self, id: Uuid) {
        if let Some(campaign) = self.lock_active().as_ref()
            && campaign.id == id
        {
            campaign.handle.abort();
        }
    }

    fn lock_active(&self) -> MutexGuard<'_, Option<ActiveCampaign>> {
        self.active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
