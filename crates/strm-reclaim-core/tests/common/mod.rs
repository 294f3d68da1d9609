#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use strm_reclaim_core::error::{Error, Result};
use strm_reclaim_core::index::{DownloadIndex, EventBus, HostEvent, TransferIndex};
use strm_reclaim_core::storage::models::TransferRecord;
use strm_reclaim_core::{AppConfig, BatchSummary, Notifier, ReclaimEngine};

#[derive(Default)]
pub struct IndexState {
    pub records: Vec<TransferRecord>,
    pub hashes: Vec<(String, String)>,
    pub deleted_ids: Vec<i64>,
    pub fail_queries: bool,
}

/// In-memory transfer + download index. Clones share state.
#[derive(Clone, Default)]
pub struct FakeIndex {
    pub state: Arc<Mutex<IndexState>>,
}

impl FakeIndex {
    pub fn add_record(&self, id: i64, tmdb_id: i64, dest: &Path) {
        self.add(TransferRecord {
            id,
            src: None,
            dest: Some(dest.to_string_lossy().into_owned()),
            tmdb_id: Some(tmdb_id),
            season: None,
            episode: None,
            download_hash: None,
        });
    }

    pub fn add(&self, record: TransferRecord) {
        self.state.lock().unwrap().records.push(record);
    }

    pub fn add_hash(&self, path: &str, hash: &str) {
        self.state
            .lock()
            .unwrap()
            .hashes
            .push((path.to_string(), hash.to_string()));
    }

    pub fn fail_queries(&self) {
        self.state.lock().unwrap().fail_queries = true;
    }

    pub fn deleted_ids(&self) -> Vec<i64> {
        self.state.lock().unwrap().deleted_ids.clone()
    }

    pub fn record_count(&self) -> usize {
        self.state.lock().unwrap().records.len()
    }
}

impl TransferIndex for FakeIndex {
    fn query_by_identity(
        &self,
        tmdb_id: u64,
        season: Option<&str>,
        episode: Option<&str>,
    ) -> Result<Vec<TransferRecord>> {
        let state = self.state.lock().unwrap();
        if state.fail_queries {
            return Err(Error::Index("backend unavailable".to_string()));
        }
        Ok(state
            .records
            .iter()
            .filter(|r| r.tmdb_id == Some(tmdb_id as i64))
            .filter(|r| match (season, episode) {
                (Some(s), Some(e)) => {
                    r.season.as_deref() == Some(s) && r.episode.as_deref() == Some(e)
                }
                _ => true,
            })
            .cloned()
            .collect())
    }

    fn query_by_destination(&self, dest: &str) -> Result<Option<TransferRecord>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .records
            .iter()
            .find(|r| r.dest.as_deref() == Some(dest))
            .cloned())
    }

    fn delete_by_id(&self, id: i64) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.records.retain(|r| r.id != id);
        state.deleted_ids.push(id);
        Ok(())
    }
}

impl DownloadIndex for FakeIndex {
    fn hash_for_path(&self, path: &str) -> Result<Option<String>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .hashes
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, h)| h.clone()))
    }
}

#[derive(Clone, Default)]
pub struct FakeEvents {
    pub emitted: Arc<Mutex<Vec<HostEvent>>>,
}

impl FakeEvents {
    pub fn hashes(&self) -> Vec<String> {
        self.emitted
            .lock()
            .unwrap()
            .iter()
            .map(|e| match e {
                HostEvent::DownloadFileDeleted { hash } => hash.clone(),
            })
            .collect()
    }
}

impl EventBus for FakeEvents {
    fn emit(&self, event: HostEvent) -> Result<()> {
        self.emitted.lock().unwrap().push(event);
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct RecordingNotifier {
    pub sent: Arc<Mutex<Vec<BatchSummary>>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<BatchSummary> {
        self.sent.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, summary: &BatchSummary) {
        self.sent.lock().unwrap().push(summary.clone());
    }
}

/// Temp layout with a pointer tree under `strm/` and a library under `media/`.
pub struct Fixture {
    pub tmp: tempfile::TempDir,
    pub index: FakeIndex,
    pub events: FakeEvents,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            tmp: tempfile::tempdir().unwrap(),
            index: FakeIndex::default(),
            events: FakeEvents::default(),
        }
    }

    pub fn strm(&self, rel: &str) -> PathBuf {
        self.tmp.path().join("strm").join(rel)
    }

    pub fn media(&self, rel: &str) -> PathBuf {
        self.tmp.path().join("media").join(rel)
    }

    /// Config mapping `strm/<kind>` onto `media/<kind>` for movie and tv.
    pub fn config(&self) -> AppConfig {
        let mappings = ["movie", "tv"]
            .iter()
            .map(|kind| {
                format!(
                    "{}:{}",
                    self.strm(kind).to_string_lossy(),
                    self.media(kind).to_string_lossy()
                )
            })
            .collect();
        AppConfig {
            enabled: true,
            notify_only: false,
            path_mappings: mappings,
            ..AppConfig::default()
        }
    }

    pub fn engine(&self, config: &AppConfig) -> ReclaimEngine {
        ReclaimEngine::new(
            config,
            Box::new(self.index.clone()),
            Box::new(self.index.clone()),
        )
        .with_event_bus(Box::new(self.events.clone()))
    }
}

pub fn touch(path: &Path) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, b"x").unwrap();
}
