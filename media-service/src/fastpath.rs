//! Fast-path classifier for trivially simple "<genre> <media kind>" requests.
//!
//! A match lets the orchestrator skip the analysis stage entirely. This is a
//! pure optimization: requests that do not match go through the full
//! pipeline unchanged.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::MediaType;

#[derive(Debug, Clone, PartialEq)]
pub struct FastPath {
    pub media_type: MediaType,
    pub genre: String,
}

const GENRES: &str = "(action|adventure|animation|comedy|crime|documentary|drama|family|fantasy|history|horror|music|mystery|romance|sci-fi|sci fi|science fiction|thriller|war|western)";

// Books never use the spaced "sci fi" spelling; accepting it here would let a
// suffix/genre combination outside the defined grammar slip through.
const BOOK_GENRES: &str = "(action|adventure|animation|comedy|crime|documentary|drama|family|fantasy|history|horror|music|mystery|romance|sci-fi|science fiction|thriller|war|western)";

static TYPE_PATTERNS: Lazy<Vec<(MediaType, Regex)>> = Lazy::new(|| {
    vec![
        (
            MediaType::Movie,
            Regex::new(&format!(r"^{}\s+movies?$", GENRES)).expect("valid fast-path regex"),
        ),
        (
            MediaType::Book,
            Regex::new(&format!(r"^{}\s+books?$", BOOK_GENRES)).expect("valid fast-path regex"),
        ),
        (
            MediaType::Tv,
            Regex::new(&format!(r"^{}\s+(tv|shows?|series)$", GENRES))
                .expect("valid fast-path regex"),
        ),
    ]
});

/// Classify a raw user request. Returns `None` for anything outside the
/// closed "<genre> <media-kind-suffix>" grammar.
pub fn classify(user_request: &str) -> Option<FastPath> {
    let request = user_request.to_lowercase().trim().to_string();

    for (media_type, pattern) in TYPE_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(&request) {
            let mut genre = caps[1].to_string();
            if genre == "sci fi" {
                genre = "sci-fi".to_string();
            }
            return Some(FastPath {
                media_type: *media_type,
                genre,
            });
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_genre_requests_match() {
        assert_eq!(
            classify("action movies"),
            Some(FastPath {
                media_type: MediaType::Movie,
                genre: "action".to_string()
            })
        );
        assert_eq!(
            classify("  Horror Movie "),
            Some(FastPath {
                media_type: MediaType::Movie,
                genre: "horror".to_string()
            })
        );
        assert_eq!(
            classify("drama series"),
            Some(FastPath {
                media_type: MediaType::Tv,
                genre: "drama".to_string()
            })
        );
        assert_eq!(
            classify("fantasy books"),
            Some(FastPath {
                media_type: MediaType::Book,
                genre: "fantasy".to_string()
            })
        );
    }

    #[test]
    fn sci_fi_is_canonicalized() {
        let fp = classify("sci fi shows").unwrap();
        assert_eq!(fp.genre, "sci-fi");
        assert_eq!(fp.media_type, MediaType::Tv);
    }

    #[test]
    fn only_the_defined_grammar_matches() {
        assert_eq!(classify("give me an action movie please"), None);
        assert_eq!(classify("movies"), None);
        assert_eq!(classify("something exciting"), None);
        assert_eq!(classify("best of 2020 movies"), None);
        assert_eq!(classify("sci fi books"), None);
        assert!(classify("sci-fi books").is_some());
    }
}
