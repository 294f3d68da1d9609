use crate::error::Result;
use crate::index::TransferIndex;
use crate::rules::exclusion::ExclusionFilter;
use crate::rules::identity::MediaIdentity;
use crate::rules::normalize_path;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Destinations recorded for `identity` that live under `local_base` and are
/// not excluded. An empty result is not an error; a failed query is.
pub fn find_candidates(
    index: &dyn TransferIndex,
    identity: &MediaIdentity,
    local_base: &Path,
    filter: &ExclusionFilter,
) -> Result<Vec<PathBuf>> {
    let records = if identity.is_episode() {
        index.query_by_identity(
            identity.id,
            identity.season.as_deref(),
            identity.episode.as_deref(),
        )?
    } else {
        index.query_by_identity(identity.id, None, None)?
    };

    if records.is_empty() {
        info!("-> No transfer records for {}", identity);
        return Ok(Vec::new());
    }
    info!("-> Found {} transfer record(s) for {}", records.len(), identity);

    let base = normalize_path(local_base);
    let mut candidates: Vec<PathBuf> = Vec::new();
    for dest in records.iter().filter_map(|r| r.dest.as_deref()) {
        if dest.is_empty() || !dest.replace('\\', "/").starts_with(&base) {
            continue;
        }
        let path = PathBuf::from(dest);
        if let Some(token) = filter.classify(dest) {
            debug!("Candidate {} excluded by [{}]", dest, token);
            continue;
        }
        if !candidates.contains(&path) {
            candidates.push(path);
        }
    }

    if candidates.is_empty() {
        info!("-> No recorded destination lies under {}", local_base.display());
    } else {
        info!(
            "-> {} candidate file(s) under {}",
            candidates.len(),
            local_base.display()
        );
    }
    Ok(candidates)
}
