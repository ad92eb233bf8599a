use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use outreach::config::{AppConfig, DEFAULT_CONFIG_FILE};

mod cmd;

#[derive(Parser)]
#[command(name = "outreach")]
#[command(version, about = "Automated hiring-manager outreach with CRM lead capture")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the deployment config file
    #[arg(long, global = true, env = "OUTREACH_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the control API and status WebSocket
    Serve {
        /// Port to serve on (overrides config and OUTREACH_PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// Interface to bind (overrides config and OUTREACH_HOST)
        #[arg(long)]
        host: Option<String>,

        /// Enable dev mode (CORS permissive for a local UI dev server)
        #[arg(long)]
        dev: bool,
    },
    /// Run one campaign from a campaign file and stream its log to stdout
    Run {
        /// Path to the campaign TOML file
        campaign_file: PathBuf,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show effective configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Write a default outreach.toml
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if let Commands::Config { command } = &cli.command {
        return cmd::cmd_config(&cli.config, command.clone());
    }

    let config = AppConfig::load(&cli.config)?;
    let _guard = init_tracing(&config, cli.verbose)?;

    match &cli.command {
        Commands::Serve { port, host, dev } => {
            cmd::cmd_serve(config, *port, host.clone(), *dev).await?;
        }
        Commands::Run { campaign_file } => {
            cmd::cmd_run(config, campaign_file).await?;
        }
        Commands::Config { .. } => {}
    }

    Ok(())
}

/// `RUST_LOG` wins; otherwise the configured level, or `debug` with `-v`.
/// With a log directory configured, output goes to a daily-rolling file and
/// the returned guard must be held until exit.
fn init_tracing(config: &AppConfig, verbose: bool) -> Result<Option<WorkerGuard>> {
    let level = if verbose {
        "debug".to_string()
    } else {
        config.logging.level.clone()
    };
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&level))
        .with_context(|| format!("Invalid log level: {}", level))?;

    let directory = config
        .logging
        .directory
        .as_deref()
        .filter(|dir| !dir.as_os_str().is_empty());

    let (writer, guard) = match directory {
        Some(dir) => {
            let (writer, guard) = file_writer(dir)?;
            (BoxMakeWriter::new(writer), Some(guard))
        }
        None => (BoxMakeWriter::new(std::io::stderr), None),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(writer)
        .with_ansi(guard.is_none());
    if config.logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(guard)
}

fn file_writer(dir: &Path) -> Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
    let appender = tracing_appender::rolling::daily(dir, "outreach.log");
    Ok(tracing_appender::non_blocking(appender))
}
