//! Cascading deletion of reclaimed media.
//!
//! Every sub-step is isolated: a failure is logged as a warning and the
//! remaining steps (and candidates) still run. In dry-run mode nothing is
//! mutated; every step is reported as "would ...".

use crate::config::CleanupOptions;
use crate::index::{DownloadIndex, EventBus, HostEvent, TransferIndex};
use crate::media::{is_media_file, is_meta_file, META_EXTENSIONS};
use crate::rules::exclusion::ExclusionFilter;
use crate::stats::CleanupStats;
use crate::storage::models::TransferRecord;
use glob::Pattern;
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Upper bound on directories reclaimed in one upward walk.
const MAX_ASCENT_DEPTH: usize = 64;

const SIBLING_SEPARATORS: [char; 4] = [' ', '.', '-', '_'];

/// Paths already handled within one task, in the order they sort.
pub type Processed = BTreeSet<String>;

pub struct CleanupExecutor<'a> {
    options: CleanupOptions,
    filter: &'a ExclusionFilter,
    transfers: &'a dyn TransferIndex,
    downloads: &'a dyn DownloadIndex,
    events: &'a dyn EventBus,
}

impl<'a> CleanupExecutor<'a> {
    pub fn new(
        options: CleanupOptions,
        filter: &'a ExclusionFilter,
        transfers: &'a dyn TransferIndex,
        downloads: &'a dyn DownloadIndex,
        events: &'a dyn EventBus,
    ) -> Self {
        Self {
            options,
            filter,
            transfers,
            downloads,
            events,
        }
    }

    /// Delete one media file and everything hanging off it.
    pub fn clean_file(&self, path: &Path, stats: &mut CleanupStats, processed: &mut Processed) {
        let key = path.to_string_lossy().into_owned();
        if processed.contains(&key) {
            return;
        }
        let exists = path.exists();
        let record = self.lookup_record(path);

        if self.options.dry_run {
            self.report_file(path, exists, record.as_ref());
            processed.insert(key);
            return;
        }

        if self.options.clean_metadata {
            let removed = self.delete_metadata(path);
            if removed > 0 {
                info!("-> Removed {} metadata file(s) for {}", removed, path.display());
            }
        }

        if self.options.delete_torrent {
            if let Some(hash) = self.resolve_hash(path, record.as_ref()) {
                self.emit_download_deleted(&hash);
            }
        }

        if self.options.remove_record {
            if let Some(record) = &record {
                match self.transfers.delete_by_id(record.id) {
                    Ok(()) => info!("-> Removed transfer record ID={}", record.id),
                    Err(e) => warn!("-> Failed to remove transfer record ID={}: {}", record.id, e),
                }
            }
        }

        if exists {
            match fs::remove_file(path) {
                Ok(()) => {
                    info!("-> Deleted file: {}", path.display());
                    stats.record_deleted(path);
                }
                Err(e) => {
                    warn!("-> Failed to delete file {}: {}", path.display(), e);
                    stats.failed += 1;
                }
            }
        } else {
            info!(
                "-> File already missing, cleaned related items only: {}",
                path.display()
            );
        }

        processed.insert(key);
    }

    /// Remove `dir` and its ancestors while they hold no subdirectory and no
    /// media file. Never touches `boundary` or anything outside it. In dry-run
    /// only the first qualifying directory is reported.
    pub fn reclaim_empty_ancestors(&self, dir: &Path, boundary: &Path, stats: &mut CleanupStats) {
        let mut current = dir.to_path_buf();

        for _ in 0..MAX_ASCENT_DEPTH {
            if current.as_path() == boundary || !current.starts_with(boundary) || !current.is_dir() {
                return;
            }

            match is_reclaimable(&current) {
                Ok(true) => {}
                Ok(false) => return,
                Err(e) => {
                    warn!("-> Could not inspect {}: {}", current.display(), e);
                    return;
                }
            }

            if self.options.dry_run {
                info!("-> [dry-run] Would reclaim empty directory: {}", current.display());
                return;
            }

            match fs::remove_dir_all(&current) {
                Ok(()) => {
                    info!("-> Reclaimed empty directory: {}", current.display());
                    stats.deleted += 1;
                }
                Err(e) => {
                    warn!("-> Failed to reclaim {}: {}", current.display(), e);
                    stats.failed += 1;
                    return;
                }
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => return,
            }
        }
    }

    /// Remove a whole resolved media directory in one operation, after
    /// unlinking records and torrents for every file under it.
    pub fn clean_directory(&self, dir: &Path, stats: &mut CleanupStats, processed: &mut Processed) {
        if let Some(token) = self.filter.classify_path(dir) {
            info!("-> Directory matches exclusion [{}], skipped: {}", token, dir.display());
            return;
        }
        processed.insert(dir.to_string_lossy().into_owned());

        if self.options.dry_run {
            let files = nested_files(dir);
            info!(
                "-> [dry-run] Would delete directory {} ({} file(s))",
                dir.display(),
                files.len()
            );
            return;
        }

        if self.options.remove_record || self.options.delete_torrent {
            for file in nested_files(dir) {
                let record = self.lookup_record(&file);
                if self.options.remove_record {
                    if let Some(record) = &record {
                        if let Err(e) = self.transfers.delete_by_id(record.id) {
                            warn!("-> Failed to remove transfer record ID={}: {}", record.id, e);
                        }
                    }
                }
                if self.options.delete_torrent {
                    if let Some(hash) = self.resolve_hash(&file, record.as_ref()) {
                        self.emit_download_deleted(&hash);
                    }
                }
            }
        }

        match fs::remove_dir_all(dir) {
            Ok(()) => {
                info!("-> Deleted directory: {}", dir.display());
                stats.record_deleted(dir);
            }
            Err(e) => {
                warn!("-> Failed to delete directory {}: {}", dir.display(), e);
                stats.failed += 1;
            }
        }
    }

    fn lookup_record(&self, path: &Path) -> Option<TransferRecord> {
        match self.transfers.query_by_destination(&path.to_string_lossy()) {
            Ok(record) => record,
            Err(e) => {
                warn!("-> Transfer record lookup failed for {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Stored hash first, then the record's source path, then the file itself.
    fn resolve_hash(&self, path: &Path, record: Option<&TransferRecord>) -> Option<String> {
        if let Some(hash) = record.and_then(|r| r.download_hash.clone()) {
            if !hash.is_empty() {
                return Some(hash);
            }
        }

        let mut lookups: Vec<String> = Vec::with_capacity(2);
        if let Some(src) = record.and_then(|r| r.src.clone()) {
            lookups.push(src);
        }
        lookups.push(path.to_string_lossy().into_owned());

        for lookup in lookups {
            match self.downloads.hash_for_path(&lookup) {
                Ok(Some(hash)) => return Some(hash),
                Ok(None) => {}
                Err(e) => {
                    warn!("-> Download hash lookup failed for {}: {}", lookup, e);
                    return None;
                }
            }
        }
        None
    }

    fn emit_download_deleted(&self, hash: &str) {
        let event = HostEvent::DownloadFileDeleted {
            hash: hash.to_string(),
        };
        let name = event.name();
        match self.events.emit(event) {
            Ok(()) => info!("-> Triggered {} for {}...", name, short_hash(hash)),
            Err(e) => warn!("-> Failed to emit {} for {}: {}", name, short_hash(hash), e),
        }
    }

    fn delete_metadata(&self, media_path: &Path) -> usize {
        let mut removed = 0;
        for sibling in metadata_siblings(media_path) {
            match fs::remove_file(&sibling) {
                Ok(()) => {
                    debug!("Removed metadata file {}", sibling.display());
                    removed += 1;
                }
                Err(e) => warn!("-> Failed to remove metadata {}: {}", sibling.display(), e),
            }
        }
        removed
    }

    fn report_file(&self, path: &Path, exists: bool, record: Option<&TransferRecord>) {
        if exists {
            info!("-> [dry-run] Would delete: {}", path.display());
        } else {
            info!("-> [dry-run] Would clean related items of missing file: {}", path.display());
        }
        if self.options.clean_metadata {
            for sibling in metadata_siblings(path) {
                info!("-> [dry-run] Would delete metadata: {}", sibling.display());
            }
        }
        if self.options.delete_torrent {
            if let Some(hash) = self.resolve_hash(path, record) {
                info!("-> [dry-run] Would trigger torrent removal for {}...", short_hash(&hash));
            }
        }
        if self.options.remove_record {
            if let Some(record) = record {
                info!("-> [dry-run] Would remove transfer record ID={}", record.id);
            }
        }
    }
}

/// A directory is reclaimable when it holds no subdirectory and no media file.
pub fn is_reclaimable(dir: &Path) -> io::Result<bool> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() || (path.is_file() && is_media_file(&path)) {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Metadata files belonging to `media_path`: exact `stem.ext` matches plus
/// names starting with the stem followed by a space, dot, dash or underscore.
pub fn metadata_siblings(media_path: &Path) -> Vec<PathBuf> {
    let (Some(parent), Some(stem)) = (media_path.parent(), media_path.file_stem()) else {
        return Vec::new();
    };
    if !parent.is_dir() {
        return Vec::new();
    }
    let stem = stem.to_string_lossy();
    let mut found: BTreeSet<PathBuf> = BTreeSet::new();

    for ext in META_EXTENSIONS {
        let candidate = parent.join(format!("{}.{}", stem, ext));
        if candidate.is_file() {
            found.insert(candidate);
        }
    }

    let pattern = format!(
        "{}*",
        Pattern::escape(&parent.join(stem.as_ref()).to_string_lossy())
    );
    match glob::glob(&pattern) {
        Ok(paths) => {
            for candidate in paths.flatten() {
                if candidate == media_path || !candidate.is_file() || !is_meta_file(&candidate) {
                    continue;
                }
                let Some(name) = candidate.file_stem().map(|s| s.to_string_lossy().into_owned())
                else {
                    continue;
                };
                let fuzzy = name
                    .strip_prefix(stem.as_ref())
                    .and_then(|rest| rest.chars().next())
                    .map(|c| SIBLING_SEPARATORS.contains(&c))
                    .unwrap_or(false);
                if name == stem.as_ref() || fuzzy {
                    found.insert(candidate);
                }
            }
        }
        Err(e) => warn!("-> Invalid metadata pattern {}: {}", pattern, e),
    }

    found.into_iter().collect()
}

fn nested_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("-> Error walking {}: {}", dir.display(), e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect()
}

fn short_hash(hash: &str) -> &str {
    hash.get(..8).unwrap_or(hash)
}
