use anyhow::{Context, Result};
use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use strm_reclaim_core::media::is_pointer_file;
use strm_reclaim_core::rules::mapping::PathMapping;
use strm_reclaim_core::TaskSender;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

/// Keeps the filesystem watch alive; dropping it stops event delivery.
pub struct PointerWatcher {
    _watcher: RecommendedWatcher,
    roots: Vec<PathBuf>,
}

impl PointerWatcher {
    pub fn start(mappings: &[PathMapping], sender: TaskSender) -> Result<Self> {
        let roots: BTreeSet<PathBuf> = mappings
            .iter()
            .map(|m| PathBuf::from(&m.source_root))
            .collect();

        let mut watcher = RecommendedWatcher::new(
            move |res: std::result::Result<Event, notify::Error>| match res {
                Ok(event) => {
                    for (path, is_dir) in arrived_paths(&event) {
                        if sender.submit_event(&path, is_dir) {
                            debug!("Queued {}", path.display());
                        }
                    }
                }
                Err(e) => error!("Watch error: {:?}", e),
            },
            Config::default(),
        )
        .context("failed to create filesystem watcher")?;

        let mut watched = Vec::new();
        for root in roots {
            if !root.is_dir() {
                warn!("Source root does not exist, not watching: {}", root.display());
                continue;
            }
            match watcher.watch(&root, RecursiveMode::Recursive) {
                Ok(()) => {
                    info!(
                        "Watching {} ({} existing pointer files)",
                        root.display(),
                        count_pointers(&root)
                    );
                    watched.push(root);
                }
                Err(e) => error!("Failed to watch {}: {}", root.display(), e),
            }
        }

        Ok(Self {
            _watcher: watcher,
            roots: watched,
        })
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }
}

/// Paths that came into existence: created entries and rename destinations.
fn arrived_paths(event: &Event) -> Vec<(PathBuf, bool)> {
    let paths: Vec<&PathBuf> = match event.kind {
        EventKind::Create(_) => event.paths.iter().collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => event.paths.iter().collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            event.paths.get(1).into_iter().collect()
        }
        _ => return Vec::new(),
    };
    paths.into_iter().map(|p| (p.clone(), p.is_dir())).collect()
}

fn count_pointers(root: &Path) -> usize {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_pointer_file(e.path()))
        .count()
}
