use std::path::Path;

/// Literal substring keep/exclude rules. `keep_dirs` is consulted first.
#[derive(Debug, Clone, Default)]
pub struct ExclusionFilter {
    keep_dirs: Vec<String>,
    exclude_keywords: Vec<String>,
}

impl ExclusionFilter {
    pub fn new(keep_dirs: Vec<String>, exclude_keywords: Vec<String>) -> Self {
        Self {
            keep_dirs: keep_dirs.into_iter().filter(|t| !t.is_empty()).collect(),
            exclude_keywords: exclude_keywords
                .into_iter()
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    /// Returns the first token contained in `path`, if any.
    pub fn classify(&self, path: &str) -> Option<&str> {
        self.keep_dirs
            .iter()
            .chain(self.exclude_keywords.iter())
            .find(|token| path.contains(token.as_str()))
            .map(String::as_str)
    }

    pub fn classify_path(&self, path: &Path) -> Option<&str> {
        self.classify(&path.to_string_lossy())
    }

    pub fn is_excluded(&self, path: &Path) -> bool {
        self.classify_path(path).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> ExclusionFilter {
        ExclusionFilter::new(
            vec!["/mnt/media/movie/keepers".to_string()],
            vec!["iso".to_string(), "keepers".to_string()],
        )
    }

    #[test]
    fn test_keep_dirs_win_over_keywords() {
        let f = filter();
        assert_eq!(
            f.classify("/mnt/media/movie/keepers/Foo.mkv"),
            Some("/mnt/media/movie/keepers")
        );
    }

    #[test]
    fn test_keyword_match() {
        let f = filter();
        assert_eq!(f.classify("/mnt/media/movie/Foo.iso"), Some("iso"));
    }

    #[test]
    fn test_match_is_case_sensitive() {
        let f = filter();
        assert_eq!(f.classify("/mnt/media/movie/Foo.ISO"), None);
    }

    #[test]
    fn test_empty_tokens_never_match() {
        let f = ExclusionFilter::new(vec![String::new()], vec![String::new()]);
        assert_eq!(f.classify("/anything"), None);
        assert!(!f.is_excluded(Path::new("/anything")));
    }
}
