//! CLI command implementations.
//!
//! | Module   | Commands handled |
//! |----------|------------------|
//! | `serve`  | `Serve`          |
//! | `run`    | `Run`            |
//! | `config` | `Config`         |

pub mod config;
pub mod run;
pub mod serve;

use std::sync::Arc;

use anyhow::{Context, Result};
use outreach::campaign::Orchestrator;
use outreach::config::AppConfig;
use outreach::crm::HttpCrmClient;
use outreach::gateway::webdriver::WebDriverGateway;

pub use config::cmd_config;
pub use run::cmd_run;
pub use serve::cmd_serve;

/// Wire the production gateway and CRM client into an orchestrator.
fn build_orchestrator(config: &AppConfig) -> Result<Arc<Orchestrator>> {
    let gateway = WebDriverGateway::new(config.browser.webdriver_url.clone());
    let crm = HttpCrmClient::new(&config.crm.base_url, config.crm.api_key.clone())
        .context("Failed to build CRM client")?;
    if !crm.has_api_key() {
        tracing::warn!("no CRM API key configured; lead creation may be rejected");
    }
    Ok(Arc::new(Orchestrator::new(
        Arc::new(gateway),
        Arc::new(crm),
        config.orchestrator_settings(),
    )))
}
