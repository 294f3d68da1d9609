pub mod cleanup;
pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod index;
pub mod matcher;
pub mod media;
pub mod notifier;
pub mod rules;
pub mod stats;
pub mod storage;
pub mod worker;

pub use config::AppConfig;
pub use engine::{MatchSource, ReclaimEngine, TaskOutcome};
pub use error::Error;
pub use notifier::{Notifier, SilentNotifier};
pub use stats::{BatchSummary, CleanupStats};
pub use worker::{CleanupService, TaskSender};
