use crate::cleanup::{CleanupExecutor, Processed};
use crate::config::{AppConfig, CleanupOptions};
use crate::history::{DeepSearchStatus, HistoryAction, HistoryEntry, HistoryStore, MatchInfo};
use crate::index::{DownloadIndex, EventBus, NullEventBus, TransferIndex};
use crate::matcher::{self, DeepMatch};
use crate::media::{MediaInfo, MediaKind, MediaLookup};
use crate::rules::exclusion::ExclusionFilter;
use crate::rules::identity::{self, MediaIdentity};
use crate::rules::mapping::{self, PathMapping, ResolvedPath};
use crate::stats::CleanupStats;
use std::path::Path;
use tracing::{info, warn};

/// How a task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// The pointer path hit a keep/exclude token.
    Excluded(String),
    /// No configured source root prefixes the pointer path.
    Unmapped,
    /// The transfer index query failed; nothing was attempted.
    LookupFailed,
    NotFound,
    Cleaned {
        source: MatchSource,
        files: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchSource {
    TransferIndex,
    DeepSearch,
}

/// Reconciles one pointer file at a time against the transfer index and the
/// local library, then records the result.
pub struct ReclaimEngine {
    options: CleanupOptions,
    filter: ExclusionFilter,
    mappings: Vec<PathMapping>,
    transfers: Box<dyn TransferIndex>,
    downloads: Box<dyn DownloadIndex>,
    events: Box<dyn EventBus>,
    media: Option<Box<dyn MediaLookup>>,
    history: HistoryStore,
}

impl ReclaimEngine {
    pub fn new(
        config: &AppConfig,
        transfers: Box<dyn TransferIndex>,
        downloads: Box<dyn DownloadIndex>,
    ) -> Self {
        Self {
            options: config.cleanup_options(),
            filter: config.exclusion_filter(),
            mappings: config.mappings(),
            transfers,
            downloads,
            events: Box::new(NullEventBus),
            media: None,
            history: HistoryStore::in_memory(),
        }
    }

    pub fn with_event_bus(mut self, events: Box<dyn EventBus>) -> Self {
        self.events = events;
        self
    }

    pub fn with_media_lookup(mut self, media: Box<dyn MediaLookup>) -> Self {
        self.media = Some(media);
        self
    }

    pub fn with_history(mut self, history: HistoryStore) -> Self {
        self.history = history;
        self
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Handle one pointer file. Never fails: every error is logged and
    /// reflected in `stats` or the returned outcome.
    pub fn reconcile(&mut self, pointer: &Path, stats: &mut CleanupStats) -> TaskOutcome {
        let title = identity::file_stem(pointer);
        info!(pointer = %pointer.display(), "Pointer file arrived");
        stats.scanned += 1;

        let media_identity = identity::extract(pointer);
        match &media_identity {
            Some(id) => info!("-> Extracted {}", id),
            None => info!("-> No TMDB id in path"),
        }
        let media = media_identity.as_ref().and_then(|id| self.lookup_media(id));

        if let Some(token) = self.filter.classify_path(pointer) {
            info!("-> Matches exclusion rule [{}], skipped", token);
            return TaskOutcome::Excluded(token.to_string());
        }

        let Some(resolved) = mapping::resolve(pointer, &self.mappings) else {
            warn!("-> No path mapping matches {}, skipped", pointer.display());
            return TaskOutcome::Unmapped;
        };
        info!(
            "-> Path mapping: {} => {}",
            resolved.source_root,
            resolved.local_base.display()
        );

        let label = media_identity
            .as_ref()
            .map(|id| id.to_string())
            .unwrap_or_else(|| title.clone());
        let mut match_info = MatchInfo {
            records: 0,
            deep_search: DeepSearchStatus::Disabled,
        };
        let mut processed = Processed::new();

        if let Some(id) = &media_identity {
            match matcher::find_candidates(
                self.transfers.as_ref(),
                id,
                &resolved.local_base,
                &self.filter,
            ) {
                Ok(candidates) if !candidates.is_empty() => {
                    match_info.records = candidates.len();
                    stats.matched += candidates.len();
                    {
                        let executor = self.executor();
                        for file in &candidates {
                            executor.clean_file(file, stats, &mut processed);
                            if let Some(parent) = file.parent() {
                                executor.reclaim_empty_ancestors(parent, &resolved.local_base, stats);
                            }
                        }
                    }
                    let files: Vec<String> = if self.options.dry_run {
                        candidates
                            .iter()
                            .map(|c| c.to_string_lossy().into_owned())
                            .collect()
                    } else {
                        processed.into_iter().collect()
                    };
                    info!("{}: {} file(s)", self.cleaned_action().label(), files.len());
                    let target = format!("{} file(s)", files.len());
                    self.save_history(
                        HistoryEntry::new(label, self.cleaned_action(), target, pointer, match_info)
                            .with_files(files.clone())
                            .with_media(media),
                    );
                    return TaskOutcome::Cleaned {
                        source: MatchSource::TransferIndex,
                        files,
                    };
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("-> Transfer index query failed: {}", e);
                    self.save_history(
                        HistoryEntry::new(
                            label,
                            HistoryAction::LookupFailed,
                            e.to_string(),
                            pointer,
                            match_info,
                        )
                        .with_media(media),
                    );
                    return TaskOutcome::LookupFailed;
                }
            }
        }

        if !self.options.deep_search {
            info!("No matching local media, skipped");
            self.save_history(
                HistoryEntry::new(
                    label,
                    HistoryAction::NotFound,
                    "exact match failed",
                    pointer,
                    match_info,
                )
                .with_media(media),
            );
            return TaskOutcome::NotFound;
        }

        info!("-> Exact match failed, starting deep search...");
        self.deep_search(pointer, &resolved, &title, stats, &mut processed);

        if processed.is_empty() {
            match_info.deep_search = DeepSearchStatus::Failed;
            info!("No matching local media, skipped");
            self.save_history(
                HistoryEntry::new(
                    label,
                    HistoryAction::NotFound,
                    resolved.local_base.to_string_lossy(),
                    pointer,
                    match_info,
                )
                .with_media(media),
            );
            return TaskOutcome::NotFound;
        }

        match_info.deep_search = DeepSearchStatus::Succeeded;
        let files: Vec<String> = processed.into_iter().collect();
        info!(
            "{}: {} item(s) via deep search",
            self.cleaned_action().label(),
            files.len()
        );
        let target = format!("{} file(s) (deep search)", files.len());
        self.save_history(
            HistoryEntry::new(label, self.cleaned_action(), target, pointer, match_info)
                .with_files(files.clone())
                .with_media(media),
        );
        TaskOutcome::Cleaned {
            source: MatchSource::DeepSearch,
            files,
        }
    }

    fn deep_search(
        &self,
        pointer: &Path,
        resolved: &ResolvedPath,
        stem: &str,
        stats: &mut CleanupStats,
        processed: &mut Processed,
    ) {
        let segments = resolved.directory_segments();
        let executor = self.executor();
        match matcher::locate(&resolved.local_base, &segments, stem, &self.filter) {
            DeepMatch::Episodes { dir, files } => {
                for file in &files {
                    if processed.contains(&*file.to_string_lossy()) {
                        continue;
                    }
                    stats.matched += 1;
                    executor.clean_file(file, stats, processed);
                }
                executor.reclaim_empty_ancestors(&dir, &resolved.local_base, stats);
            }
            DeepMatch::Directory(dir) => {
                if !processed.contains(&*dir.to_string_lossy()) {
                    stats.matched += 1;
                    executor.clean_directory(&dir, stats, processed);
                }
            }
            DeepMatch::NotFound => {
                info!("-> Deep search found nothing for {}", pointer.display());
            }
        }
    }

    fn executor(&self) -> CleanupExecutor<'_> {
        CleanupExecutor::new(
            self.options,
            &self.filter,
            self.transfers.as_ref(),
            self.downloads.as_ref(),
            self.events.as_ref(),
        )
    }

    fn cleaned_action(&self) -> HistoryAction {
        if self.options.dry_run {
            HistoryAction::WouldClean
        } else {
            HistoryAction::Cleaned
        }
    }

    fn lookup_media(&self, id: &MediaIdentity) -> Option<MediaInfo> {
        let lookup = self.media.as_ref()?;
        let kind = if id.is_episode() {
            MediaKind::Tv
        } else {
            MediaKind::Movie
        };
        match lookup.recognize(id.id, kind) {
            Ok(Some(mut info)) => {
                info!("-> Recognized: {} ({})", info.title, info.year.as_deref().unwrap_or("?"));
                info.season = info.season.or(id.season_number());
                info.episode = info.episode.or(id.episode_number());
                Some(info)
            }
            Ok(None) => None,
            Err(e) => {
                warn!("-> Media lookup failed: {}", e);
                None
            }
        }
    }

    fn save_history(&mut self, entry: HistoryEntry) {
        if let Err(e) = self.history.append(entry) {
            warn!("Failed to persist history: {}", e);
        }
    }
}
