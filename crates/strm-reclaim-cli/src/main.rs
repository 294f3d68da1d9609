mod commands;
mod console;
mod logging;
mod watcher;

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands};
use console::{ConsoleNotifier, LogEventBus};
use dotenv::dotenv;
use strm_reclaim_core::history::HistoryStore;
use strm_reclaim_core::media::is_pointer_file;
use strm_reclaim_core::stats::summarize;
use strm_reclaim_core::storage::Database;
use strm_reclaim_core::worker::DEFAULT_JOIN_TIMEOUT;
use strm_reclaim_core::{AppConfig, CleanupService, CleanupStats, Notifier, ReclaimEngine};
use tracing::{error, info, warn};
use walkdir::WalkDir;
use watcher::PointerWatcher;

fn main() {
    dotenv().ok();

    let _guard = logging::init_logger();

    let config = match strm_reclaim_core::config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let args = Cli::parse();

    let result = match args.command {
        Some(Commands::Watch) => run_watch(&config),
        Some(Commands::Reconcile { paths }) => run_reconcile(&config, &paths),
        Some(Commands::History { limit }) => run_history(&config, limit),
        Some(Commands::ClearHistory) => run_clear_history(&config),
        Some(Commands::PrintConfig) => {
            println!("Configuration: {:#?}", config);
            Ok(())
        }
        None => {
            let _ = Cli::command().print_long_help();
            Ok(())
        }
    };

    if let Err(err) = result {
        error!("Error: {:#}", err);
        process::exit(1);
    }
}

fn build_engine(config: &AppConfig) -> Result<ReclaimEngine> {
    let transfers = Database::open(&config.database_path)
        .with_context(|| format!("opening transfer index {}", config.database_path))?;
    let downloads = Database::open(&config.database_path)
        .with_context(|| format!("opening download index {}", config.database_path))?;
    let history = HistoryStore::load(&config.history_path)
        .with_context(|| format!("loading history {}", config.history_path))?;

    Ok(
        ReclaimEngine::new(config, Box::new(transfers), Box::new(downloads))
            .with_event_bus(Box::new(LogEventBus))
            .with_history(history),
    )
}

fn run_watch(config: &AppConfig) -> Result<()> {
    if !config.enabled {
        warn!("Cleanup is disabled; set enabled = true to start watching");
        return Ok(());
    }
    config.warn_missing_sources();
    if config.notify_only {
        info!("{}", "Dry-run mode: nothing will be deleted".yellow());
    }

    let engine = build_engine(config)?;
    let service = CleanupService::start(
        engine,
        Box::new(ConsoleNotifier),
        config.notify_interval(),
        config.send_notify,
    )
    .context("starting cleanup worker")?;

    let watcher = PointerWatcher::start(&config.mappings(), service.sender())?;
    if watcher.roots().is_empty() {
        warn!("No source root could be watched");
    }

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        eprintln!("\nShutting down...");
        r.store(false, Ordering::SeqCst);
    })
    .context("failed to set Ctrl+C handler")?;

    while running.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(200));
    }

    drop(watcher);
    if service.stop(DEFAULT_JOIN_TIMEOUT).is_none() {
        warn!("Worker was still busy at shutdown");
    }
    Ok(())
}

fn run_reconcile(config: &AppConfig, paths: &[PathBuf]) -> Result<()> {
    config.warn_missing_sources();
    let mut engine = build_engine(config)?;
    let mut stats = CleanupStats::default();

    for pointer in paths.iter().flat_map(|p| pointer_files(p)) {
        let outcome = engine.reconcile(&pointer, &mut stats);
        info!("{} -> {:?}", pointer.display(), outcome);
    }

    match summarize(&stats) {
        Some(summary) => ConsoleNotifier.notify(&summary),
        None => warn!("No pointer files found"),
    }
    Ok(())
}

/// A file argument as-is, or every pointer file beneath a directory.
fn pointer_files(path: &Path) -> Vec<PathBuf> {
    if !path.is_dir() {
        return vec![path.to_path_buf()];
    }
    let mut found: Vec<PathBuf> = WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_pointer_file(e.path()))
        .map(|e| e.into_path())
        .collect();
    found.sort();
    found
}

fn run_history(config: &AppConfig, limit: usize) -> Result<()> {
    let store = HistoryStore::load(&config.history_path)?;
    if store.is_empty() {
        println!("No history yet");
        return Ok(());
    }
    for entry in store.entries().iter().take(limit) {
        console::print_entry(entry);
    }
    println!(
        "{}",
        format!("{} of {} entries", limit.min(store.len()), store.len()).dimmed()
    );
    Ok(())
}

fn run_clear_history(config: &AppConfig) -> Result<()> {
    if !prompt_confirm("Are you SURE you want to delete all cleanup history?", Some(false))? {
        return Ok(());
    }
    let mut store = HistoryStore::load(&config.history_path)?;
    store.clear()?;
    println!("History cleared");
    Ok(())
}

fn prompt_confirm(prompt: &str, default: Option<bool>) -> io::Result<bool> {
    let mut input = String::new();

    loop {
        input.clear();

        match default {
            Some(true) => print!("{} (Y/n): ", prompt),
            Some(false) | None => print!("{} (y/N): ", prompt),
        }
        io::stdout().flush()?;

        io::stdin().read_line(&mut input)?;

        match input.trim().to_uppercase().as_str() {
            "Y" => return Ok(true),
            "N" => return Ok(false),
            "" => match default {
                Some(default) => return Ok(default),
                None => continue,
            },
            _ => continue,
        }
    }
}
