//! The campaign body: login check → job search → executive discovery →
//! outreach → CRM logging.
//!
//! Per-item failures (one job card, one profile, one connection attempt,
//! one CRM call) are logged and converted into outcomes; only session
//! bring-up and the login check can end the campaign early with an error.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info_span, warn};
use uuid::Uuid;

use super::message::render_message;
use super::models::{CampaignConfig, ConnectionRequest, ConnectionStatus, Executive, JobPosting};
use super::orchestrator::OrchestratorSettings;
use super::site::{
    MAX_CANDIDATES_PER_COMPANY, MAX_POSTINGS_PER_TITLE, is_executive_title, is_login_wall,
};
use super::status::{COMPLETED_ACTION, StatusBoard};
use crate::crm::{LeadPayload, LeadSink};
use crate::errors::CampaignError;
use crate::gateway::{Gateway, GatewayError, GatewayResult, PageElement, PageSession};

/// Why the phases ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    NotAuthenticated,
    NoPostings,
    Exhausted,
    CapReached,
    Stopped,
}

enum ConnectOutcome {
    Submitted,
    /// Neither the direct control nor the menu path offered "Connect".
    NoConnectControl,
}

pub(crate) struct CampaignRun {
    pub id: Uuid,
    pub config: CampaignConfig,
    pub gateway: Arc<dyn Gateway>,
    pub crm: Arc<dyn LeadSink>,
    pub settings: Arc<OrchestratorSettings>,
    pub board: Arc<StatusBoard>,
    pub cancel: CancellationToken,
}

impl CampaignRun {
    /// Run to completion. Always leaves the board finished.
    pub async fn execute(self) {
        let span = info_span!("campaign", campaign_id = %self.id);
        async move {
            self.board.set_action("Starting browser");
            self.board.log("Starting browser session...");

            match self
                .gateway
                .open_session(&self.settings.profile_dir, self.settings.headless)
                .await
            {
                Ok(mut session) => {
                    self.board.log("Browser session started");
                    match self.drive(session.as_mut()).await {
                        Ok(exit) => self.report_exit(exit),
                        Err(e) => self.report_error(&e),
                    }
                    if let Err(e) = session.close().await {
                        warn!(error = %e, "failed to close browser session");
                        self.board.log(format!("Failed to close browser session: {}", e));
                    }
                }
                Err(e) => self.report_error(&CampaignError::SessionUnavailable(e)),
            }

            self.board.finish(COMPLETED_ACTION);
        }
        .instrument(span)
        .await
    }

    async fn drive(&self, session: &mut dyn PageSession) -> Result<Exit, CampaignError> {
        if !self.check_login(session).await? {
            return Ok(Exit::NotAuthenticated);
        }

        let postings = self.search_jobs(session).await;
        if postings.is_empty() {
            return Ok(Exit::NoPostings);
        }

        let mut processed_companies = HashSet::new();
        for posting in &postings {
            if self.cancel.is_cancelled() {
                return Ok(Exit::Stopped);
            }
            if self.cap_reached() {
                return Ok(Exit::CapReached);
            }
            if !processed_companies.insert(posting.company.clone()) {
                continue;
            }

            let executives = self.discover_executives(session, posting).await;
            for executive in executives {
                if self.cancel.is_cancelled() || self.cap_reached() {
                    break;
                }
                self.reach_out(session, executive).await;
            }
            self.board.set_executive(None);
        }

        Ok(if self.cancel.is_cancelled() {
            Exit::Stopped
        } else if self.cap_reached() {
            Exit::CapReached
        } else {
            Exit::Exhausted
        })
    }

    fn report_exit(&self, exit: Exit) {
        match exit {
            Exit::NotAuthenticated => {
                self.board.log(
                    "Please log in to the site in the browser window, then restart the campaign.",
                );
                return;
            }
            Exit::NoPostings => {
                self.board.log("No job postings found matching criteria");
                return;
            }
            Exit::Stopped => self.board.log("Campaign stopped by operator"),
            Exit::CapReached => self.board.log(format!(
                "Reached max connections limit ({})",
                self.config.max_connections_per_session
            )),
            Exit::Exhausted => {}
        }
        self.board.log(format!(
            "Campaign completed. Sent {} connections.",
            self.board.connections_sent()
        ));
    }

    fn report_error(&self, err: &CampaignError) {
        error!(error = %err, "campaign terminated");
        self.board.log(format!("Campaign error: {}", err));
    }

    fn cap_reached(&self) -> bool {
        self.board.connections_sent() >= self.config.max_connections_per_session
    }

    /// Rate-limiting wait; returns early when a stop is requested.
    async fn rate_limit(&self, delay: Duration) {
        if delay.is_zero() {
            return;
        }
        tokio::select! {
            _ = self.cancel.cancelled() => {}
            _ = tokio::time::sleep(delay) => {}
        }
    }

    /// Let the page render after navigation or an interaction.
    async fn settle(&self, delay: Duration) {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    // ── Session bring-up ─────────────────────────────────────────────

    async fn check_login(&self, session: &mut dyn PageSession) -> Result<bool, CampaignError> {
        self.board.set_action("Checking login status");
        let resolved = session
            .navigate(&self.settings.site.feed_url())
            .await
            .map_err(CampaignError::LoginCheck)?;
        self.settle(self.settings.pacing.page_settle).await;

        if is_login_wall(&resolved) {
            self.board.log("Not logged in. Please log in manually.");
            return Ok(false);
        }
        self.board.log("Login confirmed");
        Ok(true)
    }

    // ── Search phase ─────────────────────────────────────────────────

    async fn search_jobs(&self, session: &mut dyn PageSession) -> Vec<JobPosting> {
        self.board.set_action("Searching for job postings");
        let mut postings = Vec::new();

        for term in &self.config.search.job_titles {
            if self.cancel.is_cancelled() {
                break;
            }
            self.board.log(format!("Searching for: {}", term));
            let url = self
                .settings
                .site
                .job_search_url(term, self.config.search.posted_within_days);
            match self.collect_postings(session, &url, term).await {
                Ok(found) => postings.extend(found),
                Err(e) => self.board.log(format!("Search for '{}' failed: {}", term, e)),
            }
            self.rate_limit(self.settings.pacing.search_delay).await;
        }

        self.board.log(format!("Found {} job postings", postings.len()));
        postings
    }

    async fn collect_postings(
        &self,
        session: &mut dyn PageSession,
        url: &str,
        term: &str,
    ) -> GatewayResult<Vec<JobPosting>> {
        session.navigate(url).await?;
        self.settle(self.settings.pacing.page_settle).await;

        let cards = session.query_all(&self.settings.site.job_card).await?;
        let mut found = Vec::new();
        for card in cards.iter().take(MAX_POSTINGS_PER_TITLE) {
            if self.cancel.is_cancelled() {
                break;
            }
            match self.extract_posting(card.as_ref(), term).await {
                Ok(Some(posting)) => found.push(posting),
                Ok(None) => self
                    .board
                    .log("Skipped job card: missing title, company or link"),
                Err(e) => self.board.log(format!("Error extracting job: {}", e)),
            }
        }
        Ok(found)
    }

    async fn extract_posting(
        &self,
        card: &dyn PageElement,
        term: &str,
    ) -> GatewayResult<Option<JobPosting>> {
        let site = &self.settings.site;
        let (Some(title), Some(company), Some(link)) = (
            card.query(&site.job_title).await?,
            card.query(&site.job_company).await?,
            card.query(&site.job_link).await?,
        ) else {
            return Ok(None);
        };

        let title = title.text().await?.trim().to_string();
        let company = company.text().await?.trim().to_string();
        let Some(href) = link.attribute("href").await? else {
            return Ok(None);
        };
        if title.is_empty() || company.is_empty() || href.trim().is_empty() {
            return Ok(None);
        }

        Ok(Some(JobPosting {
            title,
            company,
            link: site.absolute_url(href.trim()),
            search_term: term.to_string(),
        }))
    }

    // ── Discovery sub-phase ──────────────────────────────────────────

    async fn discover_executives(
        &self,
        session: &mut dyn PageSession,
        posting: &JobPosting,
    ) -> Vec<Executive> {
        self.board
            .set_action(format!("Finding executives at {}", posting.company));
        match self.collect_executives(session, posting).await {
            Ok(executives) => executives,
            Err(e) => {
                self.board.log(format!(
                    "Executive search at {} failed: {}",
                    posting.company, e
                ));
                Vec::new()
            }
        }
    }

    async fn collect_executives(
        &self,
        session: &mut dyn PageSession,
        posting: &JobPosting,
    ) -> GatewayResult<Vec<Executive>> {
        let site = &self.settings.site;
        session
            .navigate(&site.people_search_url(&posting.company))
            .await?;
        self.settle(self.settings.pacing.page_settle).await;

        let cards = session.query_all(&site.person_card).await?;
        let mut executives = Vec::new();
        for card in cards.iter().take(MAX_CANDIDATES_PER_COMPANY) {
            if self.cancel.is_cancelled() {
                break;
            }
            match self.extract_candidate(card.as_ref(), posting).await {
                Ok(Some(executive)) => {
                    self.board.log(format!(
                        "Found executive: {} - {}",
                        executive.name, executive.title
                    ));
                    executives.push(executive);
                }
                Ok(None) => {}
                Err(e) => self.board.log(format!("Error extracting person: {}", e)),
            }
        }
        Ok(executives)
    }

    /// `Ok(None)` for incomplete cards and non-executives.
    async fn extract_candidate(
        &self,
        card: &dyn PageElement,
        posting: &JobPosting,
    ) -> GatewayResult<Option<Executive>> {
        let site = &self.settings.site;
        let (Some(name), Some(title), Some(link)) = (
            card.query(&site.person_name).await?,
            card.query(&site.person_title).await?,
            card.query(&site.person_link).await?,
        ) else {
            return Ok(None);
        };

        let name = name.text().await?.trim().to_string();
        let title = title.text().await?.trim().to_string();
        let Some(href) = link.attribute("href").await? else {
            return Ok(None);
        };
        if name.is_empty() || !is_executive_title(&title) {
            debug!(candidate = %name, title = %title, "not an executive");
            return Ok(None);
        }

        Ok(Some(Executive {
            name,
            title,
            company: posting.company.clone(),
            profile_url: site.absolute_url(href.trim()),
            hiring_for: Some(posting.title.clone()),
            profile_summary: None,
        }))
    }

    // ── Outreach ─────────────────────────────────────────────────────

    async fn reach_out(&self, session: &mut dyn PageSession, executive: Executive) {
        let message = render_message(&self.config.message_template, &executive);
        let name = executive.name.clone();
        self.board.set_action(format!("Sending connection to {}", name));
        self.board.set_executive(Some(executive.clone()));

        let request = ConnectionRequest::new(executive, message);
        let outcome = self
            .connect(session, &request.executive.profile_url, &request.message)
            .await;
        let request = match outcome {
            Ok(ConnectOutcome::Submitted) => {
                self.board.log(format!("Connection sent to {}", name));
                self.board.record_sent();
                request.mark_sent(Utc::now())
            }
            Ok(ConnectOutcome::NoConnectControl) => {
                self.board.log(format!(
                    "Connect button not found for {} - may already be connected",
                    name
                ));
                self.board.record_failed();
                request.mark_failed("Connect button not found")
            }
            Err(e) => {
                self.board
                    .log(format!("Failed to connect with {}: {}", name, e));
                self.board.record_failed();
                request.mark_failed(e.to_string())
            }
        };

        if request.status != ConnectionStatus::Sent {
            return;
        }
        self.log_to_crm(&request).await;

        if !self.cancel.is_cancelled() {
            let delay = self.config.delay_between_connections;
            if delay > 0 {
                self.board
                    .log(format!("Waiting {} seconds before next connection...", delay));
            }
            self.rate_limit(Duration::from_secs(delay)).await;
        }
    }

    async fn connect(
        &self,
        session: &mut dyn PageSession,
        profile_url: &str,
        message: &str,
    ) -> GatewayResult<ConnectOutcome> {
        let site = &self.settings.site;
        let pacing = &self.settings.pacing;

        session.navigate(profile_url).await?;
        self.settle(pacing.page_settle).await;

        let mut connect = session.query(&site.connect_button).await?;
        if connect.is_none()
            && let Some(more) = session.query(&site.more_button).await?
        {
            more.click().await?;
            self.settle(pacing.action_settle).await;
            connect = session.query(&site.connect_menu_item).await?;
        }
        let Some(connect) = connect else {
            return Ok(ConnectOutcome::NoConnectControl);
        };

        connect.click().await?;
        self.settle(pacing.action_settle).await;

        if let Some(add_note) = session.query(&site.add_note_button).await? {
            add_note.click().await?;
            self.settle(pacing.action_settle).await;
        }
        if let Some(note) = session.query(&site.note_field).await? {
            note.fill(message).await?;
            self.settle(pacing.action_settle).await;
        }

        let send = session
            .query(&site.send_button)
            .await?
            .ok_or_else(|| GatewayError::ElementMissing("Send button".into()))?;
        send.click().await?;
        self.settle(pacing.page_settle).await;

        Ok(ConnectOutcome::Submitted)
    }

    async fn log_to_crm(&self, request: &ConnectionRequest) {
        let executive = &request.executive;
        self.board
            .set_action(format!("Logging {} to CRM", executive.name));
        let payload = LeadPayload::for_executive(
            executive,
            &self.config.crm_stage_id,
            &request.message,
            &self.settings.lead_defaults,
        );
        match self.crm.create_lead(&payload).await {
            Ok(id) => {
                self.board
                    .log(format!("Lead created in CRM: {} ({})", executive.name, id));
                self.board.record_lead();
            }
            Err(e) => {
                warn!(executive = %executive.name, error = %e, "CRM lead creation failed");
                self.board.log(format!("Failed to create CRM lead: {}", e));
            }
        }
    }
}
