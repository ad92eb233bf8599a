//! Control server command: `outreach serve`.

use anyhow::Result;
use outreach::config::AppConfig;
use outreach::server::{ServerConfig, start_server};

pub async fn cmd_serve(
    config: AppConfig,
    port: Option<u16>,
    host: Option<String>,
    dev: bool,
) -> Result<()> {
    for warning in config.warnings() {
        tracing::warn!("{}", warning);
    }

    let orchestrator = super::build_orchestrator(&config)?;
    let server = ServerConfig {
        host: host.unwrap_or(config.server.host),
        port: port.unwrap_or(config.server.port),
        dev_mode: dev || config.server.dev_mode,
    };
    start_server(server, orchestrator).await
}
