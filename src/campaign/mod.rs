//! Campaign orchestration engine.
//!
//! ## Module Map
//!
//! ```text
//! ┌──────────────┐  start / request_stop / shutdown  ┌─────────────────────────────┐
//! │ server / cmd │ ─────────────────────────────────> │ orchestrator.rs             │
//! └──────────────┘                                    │   single-flight, owns the   │
//!        ^                                            │   cancellation token        │
//!        │ watch<Arc<CampaignStatus>>                 │        │ tokio::spawn       │
//!        │                                            │        v                    │
//! ┌──────────────┐   publish after every mutation     │ runner.rs  (campaign body)  │
//! │   hub.rs     │ <───────── status.rs <──────────── │   login → search → dedup →  │
//! └──────────────┘                                    │   discovery → connect → CRM │
//!                                                     └─────────────────────────────┘
//! ```
//!
//! | Module         | Responsibility                                          |
//! |----------------|---------------------------------------------------------|
//! | `models`       | Config, postings, executives, requests, status snapshot |
//! | `status`       | `StatusBoard`: the only shared mutable state           |
//! | `hub`          | `ObserverHub`: copy-on-publish fan-out                 |
//! | `message`      | Connection-note templating and length cap               |
//! | `site`         | Target-site URLs, locators, executive classification   |
//! | `runner`       | The campaign body                                       |
//! | `orchestrator` | `Orchestrator` control API                              |

pub mod hub;
pub mod message;
pub mod models;
pub mod orchestrator;
mod runner;
pub mod site;
pub mod status;

pub use models::{CampaignConfig, CampaignStatus, SearchCriteria};
pub use orchestrator::{Orchestrator, OrchestratorSettings, Pacing};
