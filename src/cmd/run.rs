//! One-shot campaign: `outreach run <campaign.toml>`.

use std::path::Path;

use anyhow::{Context, Result};
use outreach::campaign::CampaignConfig;
use outreach::campaign::models::LogEntry;
use outreach::config::AppConfig;

pub fn load_campaign(path: &Path) -> Result<CampaignConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read campaign file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse campaign file: {}", path.display()))
}

/// Entries of `log` that come after `last_seen`. The log is a bounded ring,
/// so when `last_seen` has been evicted everything still held is new.
fn unseen<'a>(log: &'a [LogEntry], last_seen: Option<&LogEntry>) -> &'a [LogEntry] {
    match last_seen.and_then(|last| log.iter().rposition(|e| e == last)) {
        Some(pos) => &log[pos + 1..],
        None => log,
    }
}

/// What a Ctrl+C asks for: the first one winds the campaign down, any later
/// one gives up waiting on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    Stop,
    Force,
}

impl Interrupt {
    fn after(stop_requested: bool) -> Self {
        if stop_requested { Self::Force } else { Self::Stop }
    }
}

pub async fn cmd_run(config: AppConfig, campaign_file: &Path) -> Result<()> {
    let campaign = load_campaign(campaign_file)?;
    let orchestrator = super::build_orchestrator(&config)?;

    let id = orchestrator.start(campaign)?;
    println!("Campaign {} started. Press Ctrl+C to stop.", id);

    let mut subscription = orchestrator.subscribe();
    let mut last_seen: Option<LogEntry> = None;
    let mut stop_requested = false;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        let snapshot = subscription.rx.borrow_and_update().clone();
        let log: Vec<LogEntry> = snapshot.log.iter().cloned().collect();
        for entry in unseen(&log, last_seen.as_ref()) {
            println!("{}", entry);
        }
        if let Some(entry) = log.last() {
            last_seen = Some(entry.clone());
        }
        if !snapshot.is_running {
            break;
        }

        tokio::select! {
            changed = subscription.rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = &mut ctrl_c => match Interrupt::after(stop_requested) {
                Interrupt::Stop => {
                    stop_requested = true;
                    println!("Stopping after the current step. Press Ctrl+C again to force.");
                    // Already finished is fine; the next snapshot ends the loop.
                    let _ = orchestrator.request_stop();
                    ctrl_c.set(tokio::signal::ctrl_c());
                }
                Interrupt::Force => {
                    println!("Forcing shutdown...");
                    orchestrator.shutdown().await;
                    break;
                }
            },
        }
    }

    orchestrator.unsubscribe(subscription.id);
    orchestrator.join().await;

    let status = orchestrator.current_status();
    println!();
    println!(
        "Sent: {}  Failed: {}  Leads: {}",
        status.connections_sent, status.connections_failed, status.leads_created
    );
    Ok(())
}
