use crate::error::Result;
use crate::media::{is_media_file, MediaInfo};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const HISTORY_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    Cleaned,
    WouldClean,
    NotFound,
    LookupFailed,
}

impl HistoryAction {
    pub fn label(&self) -> &'static str {
        match self {
            HistoryAction::Cleaned => "Cleaned",
            HistoryAction::WouldClean => "Would clean",
            HistoryAction::NotFound => "Local media not found",
            HistoryAction::LookupFailed => "Lookup failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeepSearchStatus {
    Disabled,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchInfo {
    /// Candidates produced by the transfer index.
    pub records: usize,
    pub deep_search: DeepSearchStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub time: String,
    pub title: String,
    pub action: HistoryAction,
    pub target: String,
    pub files: Vec<String>,
    pub pointer_path: String,
    pub match_info: MatchInfo,
    pub media: Option<MediaInfo>,
}

impl HistoryEntry {
    pub fn new(
        title: impl Into<String>,
        action: HistoryAction,
        target: impl Into<String>,
        pointer_path: &Path,
        match_info: MatchInfo,
    ) -> Self {
        Self {
            time: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            title: title.into(),
            action,
            target: target.into(),
            files: Vec::new(),
            pointer_path: pointer_path.to_string_lossy().into_owned(),
            match_info,
            media: None,
        }
    }

    pub fn with_files(mut self, files: Vec<String>) -> Self {
        self.files = files;
        self
    }

    pub fn with_media(mut self, media: Option<MediaInfo>) -> Self {
        self.media = media;
        self
    }

    pub fn file_summary(&self) -> FileSummary {
        FileSummary::from_paths(&self.files)
    }
}

/// Per-category counts of the paths in a history entry.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FileSummary {
    pub videos: usize,
    pub directories: usize,
    pub metadata: usize,
    pub images: usize,
    pub other: usize,
}

impl FileSummary {
    pub fn from_paths(paths: &[String]) -> Self {
        let mut summary = FileSummary::default();
        for raw in paths {
            let path = Path::new(raw);
            let ext = path
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase());
            match ext.as_deref() {
                _ if is_media_file(path) => summary.videos += 1,
                Some("nfo") | Some("xml") => summary.metadata += 1,
                Some("jpg") | Some("png") | Some("bif") => summary.images += 1,
                None => summary.directories += 1,
                Some(_) => summary.other += 1,
            }
        }
        summary
    }
}

impl fmt::Display for FileSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = [
            ("video", self.videos),
            ("dir", self.directories),
            ("meta", self.metadata),
            ("image", self.images),
            ("other", self.other),
        ]
        .iter()
        .filter(|(_, n)| *n > 0)
        .map(|(label, n)| format!("{} {}", label, n))
        .collect();
        write!(f, "{}", parts.join(" "))
    }
}

/// Newest-first log of processed pointers, capped at [`HISTORY_LIMIT`].
#[derive(Debug, Default)]
pub struct HistoryStore {
    entries: Vec<HistoryEntry>,
    path: Option<PathBuf>,
}

impl HistoryStore {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load from a JSON file. A missing or unreadable log starts empty; the
    /// log is informational and never blocks cleanup.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut entries: Vec<HistoryEntry> = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => Vec::new(),
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Corrupt history file {}, starting empty: {}", path.display(), e);
                    Vec::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        entries.truncate(HISTORY_LIMIT);
        debug!("Loaded {} history entries from {}", entries.len(), path.display());
        Ok(Self {
            entries,
            path: Some(path),
        })
    }

    pub fn append(&mut self, entry: HistoryEntry) -> Result<()> {
        self.entries.insert(0, entry);
        self.entries.truncate(HISTORY_LIMIT);
        self.persist()
    }

    pub fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        self.persist()
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        // Readers see either the old file or the complete new one.
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, serde_json::to_string_pretty(&self.entries)?)?;
        fs::rename(&staging, path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn entry(title: &str) -> HistoryEntry {
        HistoryEntry::new(
            title,
            HistoryAction::NotFound,
            "exact match failed",
            Path::new("/strm/x.strm"),
            MatchInfo {
                records: 0,
                deep_search: DeepSearchStatus::Disabled,
            },
        )
    }

    #[test]
    fn test_newest_first_and_capped() {
        let mut store = HistoryStore::in_memory();
        for i in 0..105 {
            store.append(entry(&format!("t{}", i))).unwrap();
        }
        assert_eq!(store.len(), HISTORY_LIMIT);
        assert_eq!(store.entries()[0].title, "t104");
        assert_eq!(store.entries()[HISTORY_LIMIT - 1].title, "t5");
    }

    #[test]
    fn test_persist_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("history.json");

        let mut store = HistoryStore::load(&path).unwrap();
        assert!(store.is_empty());
        store.append(entry("first")).unwrap();
        store.append(entry("second")).unwrap();

        let reloaded = HistoryStore::load(&path).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.entries()[0].title, "second");
        assert_eq!(reloaded.entries()[0].action, HistoryAction::NotFound);

        let mut reloaded = reloaded;
        reloaded.clear().unwrap();
        assert!(HistoryStore::load(&path).unwrap().is_empty());
    }

    #[test]
    fn test_file_summary() {
        let summary = FileSummary::from_paths(&[
            "/m/Foo.mkv".to_string(),
            "/m/Foo.nfo".to_string(),
            "/m/Foo.jpg".to_string(),
            "/m/Season 1".to_string(),
            "/m/Foo.srt".to_string(),
        ]);
        assert_eq!(
            summary,
            FileSummary {
                videos: 1,
                directories: 1,
                metadata: 1,
                images: 1,
                other: 1,
            }
        );
        assert_eq!(summary.to_string(), "video 1 dir 1 meta 1 image 1 other 1");
    }

    #[test]
    fn test_corrupt_file_loads_empty_and_is_replaced() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.json");
        fs::write(&path, "[{\"time\":").unwrap();

        let mut store = HistoryStore::load(&path).unwrap();
        assert!(store.is_empty());

        store.append(entry("after")).unwrap();
        assert!(!path.with_extension("json.tmp").exists());
        let reloaded = HistoryStore::load(&path).unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.entries()[0].title, "after");
    }
}
