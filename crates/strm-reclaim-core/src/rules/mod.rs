pub mod exclusion;
pub mod identity;
pub mod mapping;

use std::path::Path;

/// Render a path as a forward-slash string for prefix comparisons.
pub fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
