use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "strm-reclaim")]
#[command(about = "Reclaim local media once its .strm pointer shows up", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Watch the configured source roots and clean up as pointers arrive
    Watch,
    /// Reconcile the given pointer files, or every pointer under a directory
    Reconcile {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Show recent cleanup history
    History {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Delete all stored history entries
    ClearHistory,
    /// Print configuration values
    PrintConfig,
}
