//! Deployment configuration read from `outreach.toml`.
//!
//! Layered: file → environment → CLI flags. A missing file means defaults.
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 8000
//! dev_mode = false
//!
//! [browser]
//! webdriver_url = "http://localhost:9515"
//! profile_dir = "./browser_data"
//! headless = false
//!
//! [crm]
//! base_url = "https://work.patchops.io"
//! api_key = ""
//! source_tag = "LinkedIn Sales Robot"
//! priority = "medium"
//!
//! [pacing]
//! page_settle_ms = 2000
//! action_settle_ms = 1000
//! search_delay_ms = 2000
//!
//! [orchestrator]
//! shutdown_grace_secs = 10
//!
//! [logging]
//! level = "info"
//! directory = ""
//! json = false
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::campaign::{OrchestratorSettings, Pacing};
use crate::campaign::site::SiteProfile;
use crate::crm::{DEFAULT_CRM_BASE_URL, DEFAULT_SOURCE_TAG, LeadDefaults, Priority};
use crate::gateway::webdriver::DEFAULT_WEBDRIVER_URL;

pub const DEFAULT_CONFIG_FILE: &str = "outreach.toml";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Permissive CORS for a locally served UI.
    #[serde(default)]
    pub dev_mode: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            dev_mode: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BrowserSection {
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,
    /// Persistent browser profile; keeps the site login across restarts.
    #[serde(default = "default_profile_dir")]
    pub profile_dir: PathBuf,
    #[serde(default)]
    pub headless: bool,
}

fn default_webdriver_url() -> String {
    DEFAULT_WEBDRIVER_URL.to_string()
}

fn default_profile_dir() -> PathBuf {
    PathBuf::from("./browser_data")
}

impl Default for BrowserSection {
    fn default() -> Self {
        Self {
            webdriver_url: default_webdriver_url(),
            profile_dir: default_profile_dir(),
            headless: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CrmSection {
    #[serde(default = "default_crm_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_source_tag")]
    pub source_tag: String,
    #[serde(default)]
    pub priority: Priority,
}

fn default_crm_base_url() -> String {
    DEFAULT_CRM_BASE_URL.to_string()
}

fn default_source_tag() -> String {
    DEFAULT_SOURCE_TAG.to_string()
}

impl Default for CrmSection {
    fn default() -> Self {
        Self {
            base_url: default_crm_base_url(),
            api_key: None,
            source_tag: default_source_tag(),
            priority: Priority::Medium,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PacingSection {
    #[serde(default = "default_page_settle_ms")]
    pub page_settle_ms: u64,
    #[serde(default = "default_action_settle_ms")]
    pub action_settle_ms: u64,
    #[serde(default = "default_search_delay_ms")]
    pub search_delay_ms: u64,
}

fn default_page_settle_ms() -> u64 {
    2000
}

fn default_action_settle_ms() -> u64 {
    1000
}

fn default_search_delay_ms() -> u64 {
    2000
}

impl Default for PacingSection {
    fn default() -> Self {
        Self {
            page_settle_ms: default_page_settle_ms(),
            action_settle_ms: default_action_settle_ms(),
            search_delay_ms: default_search_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrchestratorSection {
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

fn default_shutdown_grace_secs() -> u64 {
    10
}

impl Default for OrchestratorSection {
    fn default() -> Self {
        Self {
            shutdown_grace_secs: default_shutdown_grace_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingSection {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Directory for daily-rolling log files; unset logs to stderr only.
    #[serde(default)]
    pub directory: Option<PathBuf>,
    /// Emit JSON lines instead of human-readable text.
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: None,
            json: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub browser: BrowserSection,
    #[serde(default)]
    pub crm: CrmSection,
    #[serde(default)]
    pub pacing: PacingSection,
    #[serde(default)]
    pub orchestrator: OrchestratorSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

impl AppConfig {
    /// Load `path`, or defaults when it does not exist, then apply
    /// environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid TOML")
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// production).
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(host) = lookup("OUTREACH_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("OUTREACH_PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("OUTREACH_PORT is not a port number: {}", port))?;
        }
        if let Some(url) = lookup("WEBDRIVER_URL") {
            self.browser.webdriver_url = url;
        }
        if let Some(dir) = lookup("OUTREACH_PROFILE_DIR") {
            self.browser.profile_dir = PathBuf::from(dir);
        }
        if let Some(headless) = lookup("OUTREACH_HEADLESS") {
            self.browser.headless = matches!(headless.to_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Some(url) = lookup("CRM_BASE_URL") {
            self.crm.base_url = url;
        }
        if let Some(key) = lookup("CRM_API_KEY") {
            self.crm.api_key = Some(key);
        }
        if let Some(level) = lookup("OUTREACH_LOG_LEVEL") {
            self.logging.level = level;
        }
        Ok(())
    }

    /// Human-readable warnings for settings that work but are probably wrong.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.crm.api_key.as_deref().is_none_or(str::is_empty) {
            warnings.push("crm.api_key is not set; lead creation will be unauthenticated".into());
        }
        if self.pacing.page_settle_ms == 0 && self.pacing.search_delay_ms == 0 {
            warnings.push("pacing delays are zero; the target site may rate-limit the session".into());
        }
        if self.orchestrator.shutdown_grace_secs == 0 {
            warnings.push("orchestrator.shutdown_grace_secs is 0; shutdown will abort campaigns immediately".into());
        }
        warnings
    }

    pub fn pacing(&self) -> Pacing {
        Pacing {
            page_settle: Duration::from_millis(self.pacing.page_settle_ms),
            action_settle: Duration::from_millis(self.pacing.action_settle_ms),
            search_delay: Duration::from_millis(self.pacing.search_delay_ms),
        }
    }

    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            profile_dir: self.browser.profile_dir.clone(),
            headless: self.browser.headless,
            pacing: self.pacing(),
            site: SiteProfile::default(),
            lead_defaults: LeadDefaults {
                source_tag: self.crm.source_tag.clone(),
                priority: self.crm.priority,
            },
            shutdown_grace: Duration::from_secs(self.orchestrator.shutdown_grace_secs),
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }
}
