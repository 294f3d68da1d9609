use super::normalize_path;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMapping {
    pub source_root: String,
    pub local_root: String,
}

impl PathMapping {
    /// Parse `"sourceRoot:localRoot"`, splitting on the first `:`.
    pub fn parse(line: &str) -> Option<Self> {
        let (source, local) = line.split_once(':')?;
        Some(Self {
            source_root: source.trim().replace('\\', "/"),
            local_root: local.trim().to_string(),
        })
    }
}

/// A pointer path resolved against its mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    pub source_root: String,
    pub local_base: PathBuf,
    /// Remainder below the source root, no leading or trailing `/`.
    pub relative: String,
}

impl ResolvedPath {
    /// Directory components of the relative path (everything but the file name).
    pub fn directory_segments(&self) -> Vec<&str> {
        let mut parts: Vec<&str> = self.relative.split('/').collect();
        parts.pop();
        parts.into_iter().filter(|p| !p.is_empty()).collect()
    }
}

/// First configured mapping whose source root prefixes the path wins.
pub fn resolve(path: &Path, mappings: &[PathMapping]) -> Option<ResolvedPath> {
    let path_str = normalize_path(path);
    mappings
        .iter()
        .find(|m| path_str.starts_with(&m.source_root))
        .map(|m| ResolvedPath {
            source_root: m.source_root.clone(),
            local_base: PathBuf::from(&m.local_root),
            relative: path_str[m.source_root.len()..].trim_matches('/').to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(line: &str) -> PathMapping {
        PathMapping::parse(line).unwrap()
    }

    #[test]
    fn test_first_configured_mapping_wins() {
        let mappings = vec![
            mapping("/strm:/mnt/all"),
            mapping("/strm/movie:/mnt/media/movie"),
        ];
        let resolved = resolve(Path::new("/strm/movie/Foo/Foo.strm"), &mappings).unwrap();
        assert_eq!(resolved.local_base, PathBuf::from("/mnt/all"));
        assert_eq!(resolved.relative, "movie/Foo/Foo.strm");
    }

    #[test]
    fn test_relative_path_and_segments() {
        let mappings = vec![mapping("/strm/movie:/mnt/media/movie")];
        let resolved = resolve(
            Path::new("/strm/movie/Foo (2020) {tmdb-123}/Foo.strm"),
            &mappings,
        )
        .unwrap();
        assert_eq!(resolved.source_root, "/strm/movie");
        assert_eq!(resolved.relative, "Foo (2020) {tmdb-123}/Foo.strm");
        assert_eq!(resolved.directory_segments(), vec!["Foo (2020) {tmdb-123}"]);
    }

    #[test]
    fn test_no_mapping() {
        let mappings = vec![mapping("/strm/movie:/mnt/media/movie")];
        assert_eq!(resolve(Path::new("/other/Foo.strm"), &mappings), None);
    }

    #[test]
    fn test_prefix_is_literal_not_component_aware() {
        let mappings = vec![mapping("/strm/mov:/mnt/x")];
        let resolved = resolve(Path::new("/strm/movie/a.strm"), &mappings).unwrap();
        assert_eq!(resolved.relative, "ie/a.strm");
    }

    #[test]
    fn test_parse_splits_on_first_colon() {
        let m = mapping("/strm/a:/mnt/b:c");
        assert_eq!(m.source_root, "/strm/a");
        assert_eq!(m.local_root, "/mnt/b:c");
        assert!(PathMapping::parse("/no/separator").is_none());
    }
}
