use colored::*;
use strm_reclaim_core::error::Result;
use strm_reclaim_core::history::{HistoryAction, HistoryEntry};
use strm_reclaim_core::index::{EventBus, HostEvent};
use strm_reclaim_core::{BatchSummary, Notifier};
use tracing::info;

/// Prints batch summaries to stderr.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, summary: &BatchSummary) {
        eprintln!("\n  {} {}", "✓".green(), summary.title.bold());
        for line in summary.text.lines() {
            eprintln!("    {}", line);
        }
    }
}

/// No download client is bundled, so torrent removal requests are only logged.
pub struct LogEventBus;

impl EventBus for LogEventBus {
    fn emit(&self, event: HostEvent) -> Result<()> {
        match &event {
            HostEvent::DownloadFileDeleted { hash } => {
                info!(event = event.name(), hash = %hash, "Download removal requested");
            }
        }
        Ok(())
    }
}

pub fn print_entry(entry: &HistoryEntry) {
    let action = match entry.action {
        HistoryAction::Cleaned => entry.action.label().green(),
        HistoryAction::WouldClean => entry.action.label().yellow(),
        HistoryAction::NotFound => entry.action.label().dimmed(),
        HistoryAction::LookupFailed => entry.action.label().red(),
    };
    println!("{} [{}] {}", entry.time.dimmed(), action, entry.title.bold());
    println!("    pointer: {}", entry.pointer_path);
    if !entry.target.is_empty() {
        println!("    target:  {}", entry.target.cyan());
    }
    if !entry.files.is_empty() {
        println!("    files:   {}", entry.file_summary());
    }
    if let Some(media) = &entry.media {
        match &media.year {
            Some(year) => println!("    media:   {} ({})", media.title, year),
            None => println!("    media:   {}", media.title),
        }
    }
}
