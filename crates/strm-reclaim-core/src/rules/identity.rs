use super::normalize_path;
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;
use std::path::Path;

lazy_static! {
    static ref ID_PATTERNS: [Regex; 3] = [
        Regex::new(r"(?i)\{(?:tmdb|tmdbid)[=-]?(\d+)\}").unwrap(),
        Regex::new(r"(?i)tmdb[=-](\d+)").unwrap(),
        Regex::new(r"(?i)\[tmdbid[=-](\d+)\]").unwrap(),
    ];
    static ref SEASON_EPISODE: Regex = Regex::new(r"(?i)s(\d+)e(\d+)").unwrap();
    static ref EPISODE_TAG: Regex = Regex::new(r"(?i)(.+)s(\d+)e(\d+)").unwrap();
}

/// Catalog identity recovered from a pointer file's path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaIdentity {
    pub id: u64,
    /// `Sdd`
    pub season: Option<String>,
    /// `Edd`
    pub episode: Option<String>,
}

impl MediaIdentity {
    pub fn is_episode(&self) -> bool {
        self.season.is_some() && self.episode.is_some()
    }

    pub fn season_number(&self) -> Option<u32> {
        self.season.as_deref().and_then(|s| s.get(1..)?.parse().ok())
    }

    pub fn episode_number(&self) -> Option<u32> {
        self.episode.as_deref().and_then(|e| e.get(1..)?.parse().ok())
    }
}

impl fmt::Display for MediaIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TMDB:{}", self.id)
    }
}

fn pad2(digits: &str) -> String {
    format!("{:0>2}", digits)
}

/// Apply the id patterns in order; the first that yields a number wins.
pub fn extract_id(path: &str) -> Option<u64> {
    ID_PATTERNS.iter().find_map(|re| {
        re.captures(path)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    })
}

/// `S<d>E<d>` anywhere in the stem, normalized to (`Sdd`, `Edd`).
pub fn extract_season_episode(stem: &str) -> Option<(String, String)> {
    let caps = SEASON_EPISODE.captures(stem)?;
    Some((
        format!("S{}", pad2(&caps[1])),
        format!("E{}", pad2(&caps[2])),
    ))
}

/// Combined `SddEdd` tag used to pick episode files during deep search.
/// Requires at least one character before the tag.
pub fn episode_tag(stem: &str) -> Option<String> {
    let caps = EPISODE_TAG.captures(stem)?;
    Some(format!("S{}E{}", pad2(&caps[2]), pad2(&caps[3])))
}

pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Returns `None` when no id pattern matches; callers skip reconciliation.
pub fn extract(path: &Path) -> Option<MediaIdentity> {
    let id = extract_id(&normalize_path(path))?;
    let (season, episode) = match extract_season_episode(&file_stem(path)) {
        Some((s, e)) => (Some(s), Some(e)),
        None => (None, None),
    };
    Some(MediaIdentity {
        id,
        season,
        episode,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_braced_tag() {
        let identity = extract(Path::new("/strm/movie/Foo (2020) {tmdb-123}/Foo.strm")).unwrap();
        assert_eq!(identity.id, 123);
        assert_eq!(identity.season, None);
        assert_eq!(identity.episode, None);
        assert_eq!(identity.to_string(), "TMDB:123");
    }

    #[test]
    fn test_braced_tmdbid_without_separator() {
        assert_eq!(extract_id("/strm/Foo {tmdbid456}/Foo.strm"), Some(456));
    }

    #[test]
    fn test_dashed_and_bracketed_forms() {
        assert_eq!(extract_id("/strm/Foo tmdb=77/Foo.strm"), Some(77));
        assert_eq!(extract_id("/strm/Foo [tmdbid=88]/Foo.strm"), Some(88));
        assert_eq!(extract_id("/strm/Foo [TMDBID-99]/Foo.strm"), Some(99));
    }

    #[test]
    fn test_first_pattern_wins() {
        assert_eq!(extract_id("/strm/A tmdb=1/B {tmdb-2}/x.strm"), Some(2));
    }

    #[test]
    fn test_no_identity() {
        assert_eq!(extract(Path::new("/strm/movie/randomfile/x.mkv")), None);
    }

    #[test]
    fn test_season_episode_is_padded() {
        let identity = extract(Path::new(
            "/strm/tv/Show {tmdb-10}/Season 1/Show s1e3.strm",
        ))
        .unwrap();
        assert_eq!(identity.season.as_deref(), Some("S01"));
        assert_eq!(identity.episode.as_deref(), Some("E03"));
        assert!(identity.is_episode());
        assert_eq!(identity.season_number(), Some(1));
        assert_eq!(identity.episode_number(), Some(3));
    }

    #[test]
    fn test_season_episode_only_read_from_stem() {
        let identity = extract(Path::new("/strm/S01E01 {tmdb-5}/Movie.strm")).unwrap();
        assert!(!identity.is_episode());
    }

    #[test]
    fn test_episode_tag_needs_prefix() {
        assert_eq!(episode_tag("Show S02E10"), Some("S02E10".to_string()));
        assert_eq!(episode_tag("S02E10"), None);
    }

    #[test]
    fn test_numbers_of_hand_built_identity() {
        let identity = MediaIdentity {
            id: 1,
            season: Some("S03".to_string()),
            episode: Some(String::new()),
        };
        assert_eq!(identity.season_number(), Some(3));
        assert_eq!(identity.episode_number(), None);
    }
}
