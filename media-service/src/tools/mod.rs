//! Content tool adapters for the specialist agents.
//!
//! Every adapter returns a formatted text block or a human-readable error
//! string; expected failures (missing API key, non-200 response, empty
//! results) never surface as errors. Provider payloads are first mapped into
//! the normalized [`MediaHit`] record, so the formatting layer operates on
//! one concrete schema only.

pub mod book;
pub mod enrich;
pub mod movie;
pub mod shared;
pub mod tv;

pub use book::BookTools;
pub use enrich::ApiEnrichment;
pub use movie::MovieTools;
pub use shared::SharedTools;
pub use tv::TvTools;

pub(crate) const TMDB_BASE: &str = "https://api.themoviedb.org/3";
pub(crate) const TMDB_IMAGE_BASE: &str = "https://image.tmdb.org/t/p/w500";

/// Normalized intermediate record for one provider search/detail hit.
#[derive(Debug, Clone, Default)]
pub(crate) struct MediaHit {
    pub id: Option<i64>,
    pub title: String,
    pub year: String,
    pub rating: Option<f64>,
    pub genre: String,
    pub description: String,
    pub authors: Vec<String>,
    pub image_url: Option<String>,
    pub trailer_url: Option<String>,
    pub preview_url: Option<String>,
    pub seasons: Option<i64>,
    pub episodes: Option<i64>,
}

pub(crate) const MOVIE_GENRES: &[(i64, &str)] = &[
    (28, "Action"),
    (12, "Adventure"),
    (16, "Animation"),
    (35, "Comedy"),
    (80, "Crime"),
    (99, "Documentary"),
    (18, "Drama"),
    (10751, "Family"),
    (14, "Fantasy"),
    (36, "History"),
    (27, "Horror"),
    (10402, "Music"),
    (9648, "Mystery"),
    (10749, "Romance"),
    (878, "Science Fiction"),
    (10770, "TV Movie"),
    (53, "Thriller"),
    (10752, "War"),
    (37, "Western"),
];

pub(crate) const TV_GENRES: &[(i64, &str)] = &[
    (10759, "Action & Adventure"),
    (16, "Animation"),
    (35, "Comedy"),
    (80, "Crime"),
    (99, "Documentary"),
    (18, "Drama"),
    (10751, "Family"),
    (10762, "Kids"),
    (9648, "Mystery"),
    (10763, "News"),
    (10764, "Reality"),
    (10765, "Sci-Fi & Fantasy"),
    (10766, "Soap"),
    (10767, "Talk"),
    (10768, "War & Politics"),
    (37, "Western"),
];

pub(crate) fn genre_names(table: &[(i64, &str)], genre_ids: &[i64]) -> String {
    let names: Vec<&str> = genre_ids
        .iter()
        .take(3)
        .filter_map(|id| table.iter().find(|(gid, _)| gid == id).map(|(_, name)| *name))
        .collect();
    if names.is_empty() {
        "Unknown".to_string()
    } else {
        names.join(", ")
    }
}

pub(crate) const MOVIE_GENRE_ALIASES: &[(&str, &str)] = &[
    ("sci-fi", "science fiction"),
    ("sci fi", "science fiction"),
];

pub(crate) const TV_GENRE_ALIASES: &[(&str, &str)] = &[
    ("sci-fi", "sci-fi & fantasy"),
    ("sci fi", "sci-fi & fantasy"),
    ("science fiction", "sci-fi & fantasy"),
    ("fantasy", "sci-fi & fantasy"),
    ("action", "action & adventure"),
    ("adventure", "action & adventure"),
];

/// Resolve a genre name to a provider id, with a partial-match fallback so
/// "dark comedy" still lands on something sensible.
pub(crate) fn genre_id(
    table: &[(i64, &str)],
    aliases: &[(&str, &str)],
    genre: &str,
) -> Option<i64> {
    let wanted = genre.trim().to_lowercase();
    let wanted = aliases
        .iter()
        .find(|(from, _)| *from == wanted)
        .map(|(_, to)| to.to_string())
        .unwrap_or(wanted);

    table
        .iter()
        .find(|(_, name)| name.to_lowercase() == wanted)
        .or_else(|| {
            table
                .iter()
                .find(|(_, name)| wanted.contains(&name.to_lowercase()))
        })
        .map(|(id, _)| *id)
}

pub(crate) fn year_of(date: Option<&str>) -> String {
    match date {
        Some(d) if d.len() >= 4 => d[..4].to_string(),
        _ => "N/A".to_string(),
    }
}

pub(crate) fn poster_url(path: Option<&str>) -> Option<String> {
    path.filter(|p| !p.is_empty())
        .map(|p| format!("{}{}", TMDB_IMAGE_BASE, p))
}

pub(crate) fn fmt_opt(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("N/A")
}

pub(crate) fn fmt_rating(rating: Option<f64>, scale: u8) -> String {
    match rating {
        Some(r) => format!("{:.1}/{}", r, scale),
        None => "N/A".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genre_lookup_with_aliases() {
        assert_eq!(genre_id(MOVIE_GENRES, MOVIE_GENRE_ALIASES, "Action"), Some(28));
        assert_eq!(genre_id(MOVIE_GENRES, MOVIE_GENRE_ALIASES, "sci-fi"), Some(878));
        assert_eq!(genre_id(TV_GENRES, TV_GENRE_ALIASES, "sci fi"), Some(10765));
        assert_eq!(genre_id(TV_GENRES, TV_GENRE_ALIASES, "action"), Some(10759));
        assert_eq!(
            genre_id(MOVIE_GENRES, MOVIE_GENRE_ALIASES, "dark comedy"),
            Some(35)
        );
        assert_eq!(genre_id(MOVIE_GENRES, MOVIE_GENRE_ALIASES, "polka"), None);
    }

    #[test]
    fn genre_names_caps_at_three() {
        let names = genre_names(MOVIE_GENRES, &[28, 12, 35, 18]);
        assert_eq!(names, "Action, Adventure, Comedy");
        assert_eq!(genre_names(MOVIE_GENRES, &[]), "Unknown");
    }

    #[test]
    fn year_and_poster_helpers() {
        assert_eq!(year_of(Some("2010-07-16")), "2010");
        assert_eq!(year_of(Some("")), "N/A");
        assert_eq!(year_of(None), "N/A");
        assert_eq!(
            poster_url(Some("/abc.jpg")).as_deref(),
            Some("https://image.tmdb.org/t/p/w500/abc.jpg")
        );
        assert_eq!(poster_url(None), None);
    }
}
