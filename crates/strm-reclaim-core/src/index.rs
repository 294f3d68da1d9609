//! Seams to the host's transfer history, download history and event bus.
//!
//! The reconciler only ever talks to these traits, so tests drive it with
//! in-memory fakes and the CLI drives it with [`crate::storage::Database`].

use crate::error::Result;
use crate::storage::models::TransferRecord;

pub trait TransferIndex: Send {
    /// Season/episode narrow the query only when both are given.
    fn query_by_identity(
        &self,
        tmdb_id: u64,
        season: Option<&str>,
        episode: Option<&str>,
    ) -> Result<Vec<TransferRecord>>;

    fn query_by_destination(&self, dest: &str) -> Result<Option<TransferRecord>>;

    fn delete_by_id(&self, id: i64) -> Result<()>;
}

pub trait DownloadIndex: Send {
    fn hash_for_path(&self, path: &str) -> Result<Option<String>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// Ask the download subsystem to drop the torrent owning `hash`.
    DownloadFileDeleted { hash: String },
}

impl HostEvent {
    pub fn name(&self) -> &'static str {
        match self {
            HostEvent::DownloadFileDeleted { .. } => "download-file-deleted",
        }
    }
}

pub trait EventBus: Send {
    fn emit(&self, event: HostEvent) -> Result<()>;
}

/// Event bus that drops everything; used when torrent linkage is not wired up.
pub struct NullEventBus;

impl EventBus for NullEventBus {
    fn emit(&self, _event: HostEvent) -> Result<()> {
        Ok(())
    }
}
