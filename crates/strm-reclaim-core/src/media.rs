use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Extension of the pointer files whose arrival triggers a cleanup.
pub const POINTER_EXTENSION: &str = "strm";

pub const MEDIA_EXTENSIONS: &[&str] = &[
    "mp4", "mkv", "ts", "iso", "rmvb", "avi", "mov", "mpeg", "mpg", "wmv", "3gp", "asf", "m4v",
    "flv", "m2ts", "tp", "f4v",
];

pub const META_EXTENSIONS: &[&str] = &["nfo", "jpg", "png", "xml", "bif", "json"];

fn extension_in(path: &Path, set: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| set.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

pub fn is_media_file(path: &Path) -> bool {
    extension_in(path, MEDIA_EXTENSIONS)
}

pub fn is_meta_file(path: &Path) -> bool {
    extension_in(path, META_EXTENSIONS)
}

pub fn is_pointer_file(path: &Path) -> bool {
    extension_in(path, &[POINTER_EXTENSION])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Tv,
}

/// Display metadata for a recognized title, attached to history entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub tmdb_id: u64,
    pub kind: MediaKind,
    pub title: String,
    pub year: Option<String>,
    pub poster_path: Option<String>,
    pub season: Option<u32>,
    pub episode: Option<u32>,
}

/// Catalog lookup used only to enrich history entries. Failures never block cleanup.
pub trait MediaLookup: Send {
    fn recognize(&self, tmdb_id: u64, kind: MediaKind) -> Result<Option<MediaInfo>>;
}
