//! The shared campaign status and its closed set of transitions.
//!
//! Every setter mutates under the lock and publishes the full snapshot
//! before releasing it, so observers see mutations in the order the
//! campaign body made them.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::info;
use uuid::Uuid;

use super::hub::{ObserverHub, ObserverId, Subscription};
use super::models::{CampaignStatus, Executive, LogEntry};

/// Maximum retained log entries; the oldest are evicted first.
pub const LOG_CAPACITY: usize = 100;

pub const COMPLETED_ACTION: &str = "Completed";

#[derive(Default)]
pub struct StatusBoard {
    state: Mutex<CampaignStatus>,
    hub: ObserverHub,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> CampaignStatus {
        self.lock().clone()
    }

    pub fn is_running(&self) -> bool {
        self.lock().is_running
    }

    pub fn connections_sent(&self) -> u32 {
        self.lock().connections_sent
    }

    /// Register an observer seeded with the current snapshot. Holding the
    /// state lock here means no publish can slip between seed and registration.
    pub fn subscribe(&self) -> Subscription {
        let state = self.lock();
        self.hub.subscribe(Arc::new(state.clone()))
    }

    pub fn unsubscribe(&self, id: ObserverId) {
        self.hub.unsubscribe(id);
    }

    /// Reset for a new campaign and mark it running.
    pub fn begin(&self, campaign_id: Uuid) {
        self.mutate(|s| {
            *s = CampaignStatus {
                campaign_id: Some(campaign_id),
                is_running: true,
                current_action: "Starting".to_string(),
                ..CampaignStatus::default()
            };
        });
    }

    pub fn log(&self, message: impl Into<String>) {
        let entry = LogEntry::now(message);
        self.mutate(|s| {
            info!(campaign_id = ?s.campaign_id, "{}", entry.message);
            s.log.push_back(entry);
            while s.log.len() > LOG_CAPACITY {
                s.log.pop_front();
            }
        });
    }

    pub fn set_action(&self, action: impl Into<String>) {
        let action = action.into();
        self.mutate(|s| s.current_action = action);
    }

    pub fn set_executive(&self, executive: Option<Executive>) {
        self.mutate(|s| s.current_executive = executive);
    }

    pub fn record_sent(&self) {
        self.mutate(|s| s.connections_sent += 1);
    }

    pub fn record_failed(&self) {
        self.mutate(|s| s.connections_failed += 1);
    }

    pub fn record_lead(&self) {
        self.mutate(|s| s.leads_created += 1);
    }

    /// Mark the campaign stopped with a terminal action.
    pub fn finish(&self, action: impl Into<String>) {
        let action = action.into();
        self.mutate(|s| {
            s.is_running = false;
            s.current_executive = None;
            s.current_action = action;
        });
    }

    fn mutate(&self, f: impl FnOnce(&mut CampaignStatus)) {
        let mut state = self.lock();
        f(&mut state);
        self.hub.publish(Arc::new(state.clone()));
    }

    fn lock(&self) -> MutexGuard<'_, CampaignStatus> {
        // Status stays readable even if a holder panicked mid-update.
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_never_exceeds_capacity_and_evicts_oldest() {
        let board = StatusBoard::new();
        for i in 0..LOG_CAPACITY {
            board.log(format!("entry {}", i));
        }
        assert_eq!(board.snapshot().log.len(), LOG_CAPACITY);

        board.log("entry 100");
        let status = board.snapshot();
        assert_eq!(status.log.len(), LOG_CAPACITY);
        assert_eq!(status.log.front().unwrap().message, "entry 1");
        assert_eq!(status.log.back().unwrap().message, "entry 100");
    }

    #[test]
    fn retained_tail_stays_chronological() {
        let board = StatusBoard::new();
        for i in 0..250 {
            board.log(format!("{}", i));
        }
        let messages: Vec<u32> = board
            .snapshot()
            .log
            .iter()
            .map(|e| e.message.parse().unwrap())
            .collect();
        assert_eq!(messages, (150..250).collect::<Vec<_>>());
    }

    #[test]
    fn begin_resets_counters_and_log() {
        let board = StatusBoard::new();
        board.record_sent();
        board.record_failed();
        board.log("old");
        let id = Uuid::new_v4();

        board.begin(id);

        let status = board.snapshot();
        assert!(status.is_running);
        assert_eq!(status.campaign_id, Some(id));
        assert_eq!(status.connections_sent, 0);
        assert_eq!(status.connections_failed, 0);
        assert!(status.log.is_empty());
    }

    #[test]
    fn finish_clears_running_and_executive() {
        let board = StatusBoard::new();
        board.begin(Uuid::new_v4());
        board.set_executive(Some(Executive {
            name: "Ada".into(),
            title: "CTO".into(),
            company: "Acme".into(),
            profile_url: "https://example.test/in/ada".into(),
            hiring_for: None,
            profile_summary: None,
        }));

        board.finish(COMPLETED_ACTION);

        let status = board.snapshot();
        assert!(!status.is_running);
        assert!(status.current_executive.is_none());
        assert_eq!(status.current_action, "Completed");
    }

    #[test]
    fn every_mutation_is_published() {
        let board = StatusBoard::new();
        let mut sub = board.subscribe();

        board.record_sent();
        assert!(sub.rx.has_changed().unwrap());
        assert_eq!(sub.rx.borrow_and_update().connections_sent, 1);

        board.set_action("Searching for job postings");
        assert!(sub.rx.has_changed().unwrap());
        assert_eq!(
            sub.rx.borrow_and_update().current_action,
            "Searching for job postings"
        );

        board.record_lead();
        let latest = sub.rx.borrow_and_update();
        assert_eq!(latest.leads_created, 1);
        assert_eq!(latest.connections_sent, 1);
    }

    #[test]
    fn subscriber_is_seeded_with_current_state() {
        let board = StatusBoard::new();
        board.record_failed();
        let sub = board.subscribe();
        assert_eq!(sub.rx.borrow().connections_failed, 1);
    }
}
