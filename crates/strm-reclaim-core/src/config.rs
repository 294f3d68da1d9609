use crate::rules::exclusion::ExclusionFilter;
use crate::rules::mapping::PathMapping;
use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub enabled: bool,
    /// Dry-run: match and report, never mutate.
    pub notify_only: bool,
    pub send_notify: bool,
    pub notify_interval: u64,
    pub clean_metadata: bool,
    pub delete_torrent: bool,
    pub remove_record: bool,
    pub deep_search: bool,
    /// `"sourceRoot:localRoot"` lines, first match wins.
    pub path_mappings: Vec<String>,
    pub keep_dirs: String,
    pub exclude_keywords: String,
    pub database_path: String,
    pub history_path: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            notify_only: true,
            send_notify: true,
            notify_interval: 10,
            clean_metadata: false,
            delete_torrent: false,
            remove_record: false,
            deep_search: false,
            path_mappings: Vec::new(),
            keep_dirs: String::new(),
            exclude_keywords: String::new(),
            database_path: "strm_reclaim.db".to_string(),
            history_path: "strm_reclaim_history.json".to_string(),
        }
    }
}

/// Toggles consulted by the cleanup executor and reconciler.
#[derive(Debug, Clone, Copy, Default)]
pub struct CleanupOptions {
    pub dry_run: bool,
    pub clean_metadata: bool,
    pub delete_torrent: bool,
    pub remove_record: bool,
    pub deep_search: bool,
}

pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Config").required(false))
        .add_source(
            Environment::with_prefix("STRM_RECLAIM")
                .try_parsing(true)
                .list_separator(";")
                .with_list_parse_key("path_mappings"),
        )
        .build()?;
    builder.try_deserialize::<AppConfig>()
}

impl AppConfig {
    pub fn mappings(&self) -> Vec<PathMapping> {
        self.path_mappings
            .iter()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .filter_map(|line| match PathMapping::parse(line) {
                Some(mapping) => Some(mapping),
                None => {
                    warn!("Ignoring path mapping without ':' separator: {}", line);
                    None
                }
            })
            .collect()
    }

    pub fn exclusion_filter(&self) -> ExclusionFilter {
        ExclusionFilter::new(
            split_delimited(&self.keep_dirs),
            split_delimited(&self.exclude_keywords),
        )
    }

    pub fn cleanup_options(&self) -> CleanupOptions {
        CleanupOptions {
            dry_run: self.notify_only,
            clean_metadata: self.clean_metadata,
            delete_torrent: self.delete_torrent,
            remove_record: self.remove_record,
            deep_search: self.deep_search,
        }
    }

    pub fn notify_interval(&self) -> Duration {
        Duration::from_secs(self.notify_interval.max(1))
    }

    /// Warn about mappings whose source root is not present on disk.
    /// Returns the number of missing roots.
    pub fn warn_missing_sources(&self) -> usize {
        let mut missing = 0;
        for mapping in self.mappings() {
            if !Path::new(&mapping.source_root).exists() {
                warn!("Watched source root does not exist: {}", mapping.source_root);
                missing += 1;
            }
        }
        missing
    }
}

/// Split a `|` or newline delimited list, trimming and dropping blanks.
pub fn split_delimited(raw: &str) -> Vec<String> {
    raw.replace('\n', "|")
        .split('|')
        .map(|token| token.trim())
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}
