//! Scripted in-memory site and CRM used by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use outreach::campaign::site::SiteProfile;
use outreach::campaign::{
    CampaignConfig, CampaignStatus, Orchestrator, OrchestratorSettings, Pacing, SearchCriteria,
};
use outreach::crm::{CrmError, LeadDefaults, LeadId, LeadPayload, LeadSink};
use outreach::gateway::{
    Gateway, GatewayError, GatewayResult, Locator, PageElement, PageSession,
};
use percent_encoding::percent_decode_str;

pub const ORIGIN: &str = "https://site.test";

/// How a profile page lets us connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectMode {
    /// A Connect button on the profile.
    Direct,
    /// Connect hidden behind the More menu.
    ViaMenu,
    /// No connect control at all (already connected).
    Unavailable,
    /// Connect works but the dialog never shows a Send button.
    NoSend,
}

/// Empty fields have no element on the card.
#[derive(Debug, Clone)]
pub struct FakeJob {
    pub title: String,
    pub company: String,
    pub href: String,
    /// Reading the card's text fails, like a stale element.
    pub stale: bool,
}

#[derive(Debug, Clone)]
pub struct FakePerson {
    pub name: String,
    pub title: String,
    pub href: String,
    pub connect: ConnectMode,
    pub stale: bool,
}

#[derive(Debug, Default)]
struct SiteState {
    logged_in: bool,
    fail_open: bool,
    open_delay: Duration,
    /// Navigations to URLs containing one of these fail.
    broken_urls: Vec<String>,
    jobs: HashMap<String, Vec<FakeJob>>,
    people: HashMap<String, Vec<FakePerson>>,
    navigations: Vec<String>,
    /// (profile url, note text) per clicked Send.
    sent: Vec<(String, String)>,
    pending_note: String,
    sessions_opened: usize,
    sessions_closed: usize,
    live_sessions: usize,
    max_live_sessions: usize,
}

/// A fake site shared between the gateway and the test's assertions.
#[derive(Clone)]
pub struct FakeSite {
    site: SiteProfile,
    state: Arc<Mutex<SiteState>>,
}

impl FakeSite {
    pub fn new() -> Self {
        Self {
            site: SiteProfile::with_origin(ORIGIN),
            state: Arc::new(Mutex::new(SiteState {
                logged_in: true,
                ..SiteState::default()
            })),
        }
    }

    pub fn logged_out(self) -> Self {
        self.state.lock().unwrap().logged_in = false;
        self
    }

    pub fn failing_open(self) -> Self {
        self.state.lock().unwrap().fail_open = true;
        self
    }

    /// Opening a session takes `delay` before it succeeds.
    pub fn slow_open(self, delay: Duration) -> Self {
        self.state.lock().unwrap().open_delay = delay;
        self
    }

    /// The job search for `term` fails to load.
    pub fn failing_job_search(self, term: &str) -> Self {
        let url = self.site.job_search_url(term, 7);
        self.state.lock().unwrap().broken_urls.push(url);
        self
    }

    /// The people search for `company` fails to load.
    pub fn failing_people_search(self, company: &str) -> Self {
        let url = self.site.people_search_url(company);
        self.state.lock().unwrap().broken_urls.push(url);
        self
    }

    /// Postings returned for the `term` job search.
    pub fn with_jobs(self, term: &str, jobs: Vec<FakeJob>) -> Self {
        self.state
            .lock()
            .unwrap()
            .jobs
            .insert(term.to_string(), jobs);
        self
    }

    /// People returned for the `company` people search.
    pub fn with_people(self, company: &str, people: Vec<FakePerson>) -> Self {
        self.state
            .lock()
            .unwrap()
            .people
            .insert(company.to_string(), people);
        self
    }

    pub fn site(&self) -> SiteProfile {
        self.site.clone()
    }

    pub fn gateway(&self) -> Arc<dyn Gateway> {
        Arc::new(FakeGateway { site: self.clone() })
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.state.lock().unwrap().navigations.clone()
    }

    /// How many times the people search for `company` was opened.
    pub fn discovery_visits(&self, company: &str) -> usize {
        let url = self.site.people_search_url(company);
        self.navigations().iter().filter(|u| **u == url).count()
    }

    pub fn sessions(&self) -> (usize, usize) {
        let state = self.state.lock().unwrap();
        (state.sessions_opened, state.sessions_closed)
    }

    /// Most browser sessions that were ever open at the same time.
    pub fn max_live_sessions(&self) -> usize {
        self.state.lock().unwrap().max_live_sessions
    }

    fn page_for(&self, url: &str) -> Page {
        let state = self.state.lock().unwrap();
        if url == self.site.feed_url() {
            return if state.logged_in {
                Page::Feed
            } else {
                Page::Login
            };
        }
        if url.starts_with(&format!("{}/jobs/search/", ORIGIN)) {
            let term = keywords(url);
            return Page::Jobs(state.jobs.get(&term).cloned().unwrap_or_default());
        }
        if url.starts_with(&format!("{}/search/results/people/", ORIGIN)) {
            let company = keywords(url);
            return Page::People(state.people.get(&company).cloned().unwrap_or_default());
        }
        let person = state
            .people
            .values()
            .flatten()
            .find(|p| self.site.absolute_url(&p.href) == url)
            .cloned();
        match person {
            Some(person) => Page::Profile(person),
            None => Page::Blank,
        }
    }
}

impl Default for FakeSite {
    fn default() -> Self {
        Self::new()
    }
}

fn keywords(url: &str) -> String {
    url.split(['?', '&'])
        .find_map(|pair| pair.strip_prefix("keywords="))
        .map(|raw| percent_decode_str(raw).decode_utf8_lossy().into_owned())
        .unwrap_or_default()
}

pub fn job(title: &str, company: &str) -> FakeJob {
    FakeJob {
        title: title.to_string(),
        company: company.to_string(),
        href: format!("/jobs/view/{}-{}", company.to_lowercase(), title.len()),
        stale: false,
    }
}

/// A card with no company element.
pub fn job_without_company(title: &str) -> FakeJob {
    FakeJob {
        company: String::new(),
        ..job(title, "Unknown")
    }
}

/// A card whose text cannot be read.
pub fn stale_job(title: &str, company: &str) -> FakeJob {
    FakeJob {
        stale: true,
        ..job(title, company)
    }
}

pub fn person(name: &str, title: &str) -> FakePerson {
    FakePerson {
        name: name.to_string(),
        title: title.to_string(),
        href: format!("/in/{}", name.to_lowercase().replace(' ', "-")),
        connect: ConnectMode::Direct,
        stale: false,
    }
}

pub fn stale_person(name: &str, title: &str) -> FakePerson {
    FakePerson {
        stale: true,
        ..person(name, title)
    }
}

pub fn person_with(name: &str, title: &str, connect: ConnectMode) -> FakePerson {
    FakePerson {
        connect,
        ..person(name, title)
    }
}

// ── Gateway double ───────────────────────────────────────────────────

struct FakeGateway {
    site: FakeSite,
}

#[async_trait]
impl Gateway for FakeGateway {
    async fn open_session(
        &self,
        _profile_dir: &Path,
        _headless: bool,
    ) -> GatewayResult<Box<dyn PageSession>> {
        let delay = self.site.state.lock().unwrap().open_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.site.state.lock().unwrap();
        if state.fail_open {
            return Err(GatewayError::Session("chromedriver not reachable".into()));
        }
        state.sessions_opened += 1;
        state.live_sessions += 1;
        state.max_live_sessions = state.max_live_sessions.max(state.live_sessions);
        Ok(Box::new(FakeSession {
            site: self.site.clone(),
            page: Page::Blank,
        }))
    }
}

#[derive(Debug, Clone)]
enum Page {
    Blank,
    Login,
    Feed,
    Jobs(Vec<FakeJob>),
    People(Vec<FakePerson>),
    Profile(FakePerson),
}

struct FakeSession {
    site: FakeSite,
    page: Page,
}

impl FakeSession {
    fn element(&self, kind: ElementKind) -> Option<Box<dyn PageElement>> {
        Some(Box::new(FakeElement {
            site: self.site.clone(),
            kind,
        }))
    }
}

#[async_trait]
impl PageSession for FakeSession {
    async fn navigate(&mut self, url: &str) -> GatewayResult<String> {
        {
            let mut state = self.site.state.lock().unwrap();
            state.navigations.push(url.to_string());
            if state.broken_urls.iter().any(|broken| broken == url) {
                self.page = Page::Blank;
                return Err(GatewayError::Navigation {
                    url: url.to_string(),
                    message: "net::ERR_TIMED_OUT".into(),
                });
            }
        }
        self.page = self.site.page_for(url);
        Ok(match self.page {
            Page::Login => format!("{}/login?session_redirect=feed", ORIGIN),
            _ => url.to_string(),
        })
    }

    async fn query(&self, locator: &Locator) -> GatewayResult<Option<Box<dyn PageElement>>> {
        let site = &self.site.site;
        let Page::Profile(person) = &self.page else {
            return Ok(None);
        };
        let profile_url = site.absolute_url(&person.href);
        let mode = person.connect;

        let found = if *locator == site.connect_button {
            (mode == ConnectMode::Direct || mode == ConnectMode::NoSend)
                .then(|| self.element(ElementKind::Button))
        } else if *locator == site.more_button {
            (mode == ConnectMode::ViaMenu).then(|| self.element(ElementKind::Button))
        } else if *locator == site.connect_menu_item {
            (mode == ConnectMode::ViaMenu).then(|| self.element(ElementKind::Button))
        } else if *locator == site.add_note_button {
            (mode != ConnectMode::Unavailable).then(|| self.element(ElementKind::Button))
        } else if *locator == site.note_field {
            (mode != ConnectMode::Unavailable).then(|| self.element(ElementKind::NoteField))
        } else if *locator == site.send_button {
            (mode == ConnectMode::Direct || mode == ConnectMode::ViaMenu)
                .then(|| self.element(ElementKind::Send(profile_url)))
        } else {
            None
        };
        Ok(found.flatten())
    }

    async fn query_all(&self, locator: &Locator) -> GatewayResult<Vec<Box<dyn PageElement>>> {
        let site = &self.site.site;
        let elements: Vec<ElementKind> = match &self.page {
            Page::Jobs(jobs) if *locator == site.job_card => {
                jobs.iter().cloned().map(ElementKind::JobCard).collect()
            }
            Page::People(people) if *locator == site.person_card => {
                people.iter().cloned().map(ElementKind::PersonCard).collect()
            }
            _ => Vec::new(),
        };
        Ok(elements
            .into_iter()
            .map(|kind| {
                Box::new(FakeElement {
                    site: self.site.clone(),
                    kind,
                }) as Box<dyn PageElement>
            })
            .collect())
    }

    async fn close(self: Box<Self>) -> GatewayResult<()> {
        let mut state = self.site.state.lock().unwrap();
        state.sessions_closed += 1;
        state.live_sessions -= 1;
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum ElementKind {
    JobCard(FakeJob),
    PersonCard(FakePerson),
    Text(String),
    StaleText,
    Link(String),
    Button,
    NoteField,
    Send(String),
}

struct FakeElement {
    site: FakeSite,
    kind: ElementKind,
}

impl FakeElement {
    fn child(&self, kind: ElementKind) -> Option<Box<dyn PageElement>> {
        Some(Box::new(FakeElement {
            site: self.site.clone(),
            kind,
        }))
    }

    /// A text child, absent when empty and unreadable when stale.
    fn text_child(&self, text: &str, stale: bool) -> Option<Box<dyn PageElement>> {
        if text.is_empty() {
            None
        } else if stale {
            self.child(ElementKind::StaleText)
        } else {
            self.child(ElementKind::Text(text.to_string()))
        }
    }
}

#[async_trait]
impl PageElement for FakeElement {
    async fn text(&self) -> GatewayResult<String> {
        match &self.kind {
            ElementKind::Text(text) => Ok(text.clone()),
            ElementKind::StaleText => Err(GatewayError::Interaction(
                "stale element reference".into(),
            )),
            _ => Ok(String::new()),
        }
    }

    async fn attribute(&self, name: &str) -> GatewayResult<Option<String>> {
        Ok(match &self.kind {
            ElementKind::Link(href) if name == "href" => Some(href.clone()),
            _ => None,
        })
    }

    async fn click(&self) -> GatewayResult<()> {
        if let ElementKind::Send(profile_url) = &self.kind {
            let mut state = self.site.state.lock().unwrap();
            let note = std::mem::take(&mut state.pending_note);
            state.sent.push((profile_url.clone(), note));
        }
        Ok(())
    }

    async fn fill(&self, text: &str) -> GatewayResult<()> {
        match self.kind {
            ElementKind::NoteField => {
                self.site.state.lock().unwrap().pending_note = text.to_string();
                Ok(())
            }
            _ => Err(GatewayError::Interaction("element is not editable".into())),
        }
    }

    async fn query(&self, locator: &Locator) -> GatewayResult<Option<Box<dyn PageElement>>> {
        let site = &self.site.site;
        Ok(match &self.kind {
            ElementKind::JobCard(job) => {
                if *locator == site.job_title {
                    self.text_child(&job.title, job.stale)
                } else if *locator == site.job_company {
                    self.text_child(&job.company, job.stale)
                } else if *locator == site.job_link && !job.href.is_empty() {
                    self.child(ElementKind::Link(job.href.clone()))
                } else {
                    None
                }
            }
            ElementKind::PersonCard(person) => {
                if *locator == site.person_name {
                    self.text_child(&person.name, person.stale)
                } else if *locator == site.person_title {
                    self.text_child(&person.title, person.stale)
                } else if *locator == site.person_link {
                    self.child(ElementKind::Link(person.href.clone()))
                } else {
                    None
                }
            }
            _ => None,
        })
    }
}

// ── CRM double ───────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingCrm {
    leads: Mutex<Vec<LeadPayload>>,
    fail: bool,
}

impl RecordingCrm {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            leads: Mutex::new(Vec::new()),
            fail: true,
        })
    }

    pub fn leads(&self) -> Vec<LeadPayload> {
        self.leads.lock().unwrap().clone()
    }
}

#[async_trait]
impl LeadSink for RecordingCrm {
    async fn create_lead(&self, payload: &LeadPayload) -> Result<LeadId, CrmError> {
        if self.fail {
            return Err(CrmError::Status {
                status: 503,
                body: "maintenance".into(),
            });
        }
        let mut leads = self.leads.lock().unwrap();
        leads.push(payload.clone());
        Ok(LeadId(format!("lead-{}", leads.len())))
    }
}

// ── Harness ──────────────────────────────────────────────────────────

pub fn settings(site: &FakeSite) -> OrchestratorSettings {
    OrchestratorSettings {
        profile_dir: std::env::temp_dir().join("outreach-test-profile"),
        headless: true,
        pacing: Pacing::immediate(),
        site: site.site(),
        lead_defaults: LeadDefaults::default(),
        shutdown_grace: Duration::from_secs(2),
    }
}

pub fn orchestrator(site: &FakeSite, crm: Arc<RecordingCrm>) -> Orchestrator {
    Orchestrator::new(site.gateway(), crm, settings(site))
}

pub fn campaign(job_titles: &[&str]) -> CampaignConfig {
    CampaignConfig {
        search: SearchCriteria {
            job_titles: job_titles.iter().map(|t| t.to_string()).collect(),
            locations: Vec::new(),
            posted_within_days: 7,
        },
        message_template: "Hi {name}, I noticed {company} is hiring for {job_title}.".into(),
        crm_stage_id: "stage-1".into(),
        delay_between_connections: 0,
        max_connections_per_session: 20,
    }
}

/// Run a campaign to completion and return the final snapshot.
pub async fn run_to_end(orchestrator: &Orchestrator, config: CampaignConfig) -> CampaignStatus {
    orchestrator.start(config).expect("campaign should start");
    tokio::time::timeout(Duration::from_secs(5), orchestrator.join())
        .await
        .expect("campaign should finish");
    orchestrator.current_status()
}

pub fn log_messages(status: &CampaignStatus) -> Vec<String> {
    status.log.iter().map(|e| e.message.clone()).collect()
}

pub fn has_log(status: &CampaignStatus, needle: &str) -> bool {
    status.log.iter().any(|e| e.message.contains(needle))
}
