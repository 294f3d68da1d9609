use crate::notifier::Notifier;
use std::path::Path;
use tracing::info;

/// Maximum number of deleted file names listed in one batch notification.
pub const SUMMARY_FILE_LIMIT: usize = 8;

pub const SUMMARY_TITLE: &str = "[STRM local cleanup] Batch complete";

/// Counters for every task handled inside one idle window.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupStats {
    pub scanned: usize,
    pub matched: usize,
    pub deleted: usize,
    pub failed: usize,
    pub deleted_files: Vec<String>,
}

impl CleanupStats {
    pub fn record_deleted(&mut self, path: &Path) {
        self.deleted += 1;
        self.deleted_files.push(path.to_string_lossy().into_owned());
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub title: String,
    pub text: String,
}

/// Render the notification for a window. `None` when nothing was scanned.
pub fn summarize(stats: &CleanupStats) -> Option<BatchSummary> {
    if stats.scanned == 0 {
        return None;
    }

    let mut text = format!(
        "Scanned: {} | Matched: {} | Deleted: {}",
        stats.scanned, stats.matched, stats.deleted
    );
    if stats.failed > 0 {
        text.push_str(&format!(" | Failed: {}", stats.failed));
    }
    if !stats.deleted_files.is_empty() {
        text.push_str("\nDetails:");
        for file in stats.deleted_files.iter().take(SUMMARY_FILE_LIMIT) {
            let name = Path::new(file)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| file.clone());
            text.push_str(&format!("\n- {}", name));
        }
        if stats.deleted_files.len() > SUMMARY_FILE_LIMIT {
            text.push_str("\n...");
        }
    }

    Some(BatchSummary {
        title: SUMMARY_TITLE.to_string(),
        text,
    })
}

/// Owns the current window's stats and flushes them as one notification.
#[derive(Debug, Default)]
pub struct BatchAggregator {
    stats: CleanupStats,
    has_data: bool,
    send_notify: bool,
}

impl BatchAggregator {
    pub fn new(send_notify: bool) -> Self {
        Self {
            stats: CleanupStats::default(),
            has_data: false,
            send_notify,
        }
    }

    /// Mark the window as active and hand out the stats for the next task.
    pub fn begin_task(&mut self) -> &mut CleanupStats {
        self.has_data = true;
        &mut self.stats
    }

    pub fn has_data(&self) -> bool {
        self.has_data
    }

    pub fn stats(&self) -> &CleanupStats {
        &self.stats
    }

    /// Send the summary (if enabled and non-empty) and reset the window.
    /// Returns true when a notification went out.
    pub fn flush(&mut self, notifier: &dyn Notifier) -> bool {
        if !self.has_data {
            return false;
        }

        let mut sent = false;
        if self.send_notify {
            if let Some(summary) = summarize(&self.stats) {
                info!(
                    "Batch complete, sending notification: {}",
                    summary.text.replace('\n', " ")
                );
                notifier.notify(&summary);
                sent = true;
            }
        }

        self.stats = CleanupStats::default();
        self.has_data = false;
        sent
    }
}
