use crate::media::is_media_file;
use crate::rules::exclusion::ExclusionFilter;
use crate::rules::identity::episode_tag;
use lazy_static::lazy_static;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

lazy_static! {
    static ref NAME_YEAR: Regex = Regex::new(r"(.+?)[\(\[（](\d{4})[\)\]）]").unwrap();
    static ref SEASON: Regex = Regex::new(r"(?i)season\s*(\d+)").unwrap();
}

/// Where a deep search landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeepMatch {
    /// Episode files carrying the pointer's `SxxExx` tag inside `dir`.
    Episodes { dir: PathBuf, files: Vec<PathBuf> },
    /// A whole movie or season directory to remove in one go.
    Directory(PathBuf),
    NotFound,
}

/// Walk `segments` down from `local_base`, redirecting fuzzily where the
/// local tree is named differently, then pick what to clean.
pub fn locate(
    local_base: &Path,
    segments: &[&str],
    pointer_stem: &str,
    filter: &ExclusionFilter,
) -> DeepMatch {
    let Some(dir) = descend(local_base, segments) else {
        return DeepMatch::NotFound;
    };

    if let Some(tag) = episode_tag(pointer_stem) {
        if !dir.is_dir() {
            return DeepMatch::NotFound;
        }
        let files = episode_files(&dir, &tag, filter);
        return DeepMatch::Episodes { dir, files };
    }

    if dir.as_path() == local_base {
        return DeepMatch::NotFound;
    }
    DeepMatch::Directory(dir)
}

fn descend(local_base: &Path, segments: &[&str]) -> Option<PathBuf> {
    let mut current = local_base.to_path_buf();

    for segment in segments {
        let exact = current.join(segment);
        if exact.is_dir() {
            current = exact;
            continue;
        }

        let subdirs = match subdirectories(&current) {
            Ok(dirs) => dirs,
            Err(e) => {
                warn!("-> Cannot list {}: {}", current.display(), e);
                return None;
            }
        };
        info!("-> No local directory [{}], trying fuzzy redirect...", segment);

        match redirect(segment, &subdirs) {
            Some(found) => {
                info!("-> Redirected [{}] to {}", segment, found.display());
                current = found;
            }
            None => {
                info!("-> Could not locate local directory for [{}]", segment);
                return None;
            }
        }
    }

    Some(current)
}

/// Try the `name (year)` rule, then the `Season N` rule; each must yield
/// exactly one subdirectory.
fn redirect(segment: &str, subdirs: &[PathBuf]) -> Option<PathBuf> {
    if let Some(caps) = NAME_YEAR.captures(segment) {
        let name = caps[1].trim().to_lowercase();
        let year = &caps[2];
        let hits: Vec<&PathBuf> = subdirs
            .iter()
            .filter(|d| {
                let dir_name = dir_name(d);
                dir_name.to_lowercase().contains(&name) && dir_name.contains(year)
            })
            .collect();
        if let [only] = hits.as_slice() {
            return Some((*only).clone());
        }
        if hits.len() > 1 {
            warn!("-> [{}] matches {} directories, refusing to guess", segment, hits.len());
        }
    }

    let season = SEASON
        .captures(segment)
        .and_then(|caps| caps[1].parse::<u32>().ok())?;
    let hits: Vec<&PathBuf> = subdirs
        .iter()
        .filter(|d| {
            SEASON
                .captures(&dir_name(d))
                .and_then(|caps| caps[1].parse::<u32>().ok())
                == Some(season)
        })
        .collect();
    match hits.as_slice() {
        [only] => Some((*only).clone()),
        [] => None,
        _ => {
            warn!("-> [{}] matches {} season directories, refusing to guess", segment, hits.len());
            None
        }
    }
}

fn episode_files(dir: &Path, tag: &str, filter: &ExclusionFilter) -> Vec<PathBuf> {
    let tag = tag.to_lowercase();
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("-> Cannot list {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut files: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_media_file(path))
        .filter(|path| {
            path.file_name()
                .map(|n| n.to_string_lossy().to_lowercase().contains(&tag))
                .unwrap_or(false)
        })
        .filter(|path| !filter.is_excluded(path))
        .collect();
    files.sort();
    files
}

fn subdirectories(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut dirs: Vec<PathBuf> = fs::read_dir(dir)?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();
    Ok(dirs)
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
