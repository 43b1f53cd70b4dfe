//! Static curated recommendations returned whenever the pipeline cannot
//! produce a valid, non-empty list. Deterministic, no I/O, always succeeds.

use crate::model::{MediaType, Rating, Recommendation};

pub fn fallback_recommendations(media_type: MediaType) -> Vec<Recommendation> {
    match media_type {
        MediaType::Movie => vec![
            curated(
                "Inception",
                "movie",
                "2010",
                "Sci-Fi, Thriller",
                8.8,
                "A thief who steals corporate secrets through dream-sharing technology.",
                "Masterpiece of sci-fi cinema.",
                &["The Matrix"],
            ),
            curated(
                "The Dark Knight",
                "movie",
                "2008",
                "Action, Crime",
                9.0,
                "Batman sets out to dismantle the remaining criminal organizations.",
                "Defining superhero movie.",
                &["Batman Begins"],
            ),
        ],
        MediaType::Book => vec![
            curated(
                "Project Hail Mary",
                "book",
                "2021",
                "Sci-Fi",
                4.8,
                "A lone astronaut must save the earth.",
                "Engaging hard sci-fi.",
                &["The Martian"],
            ),
            curated(
                "Dune",
                "book",
                "1965",
                "Sci-Fi",
                4.7,
                "The story of Paul Atreides.",
                "Epic masterpiece.",
                &["Foundation"],
            ),
        ],
        MediaType::Tv => vec![
            curated(
                "Breaking Bad",
                "tv",
                "2008",
                "Crime, Drama",
                9.5,
                "A high school chemistry teacher turned manufacturing drug dealer.",
                "Widely considered one of the best shows ever made.",
                &["Better Call Saul", "Ozark"],
            ),
            curated(
                "Stranger Things",
                "tv",
                "2016",
                "Sci-Fi, Horror",
                8.7,
                "When a young boy vanishes, a small town uncovers a mystery.",
                "Nostalgic and thrilling.",
                &["Dark", "The OA"],
            ),
        ],
    }
}

#[allow(clippy::too_many_arguments)]
fn curated(
    title: &str,
    media_type: &str,
    year: &str,
    genre: &str,
    rating: f64,
    description: &str,
    why_recommended: &str,
    similar_titles: &[&str],
) -> Recommendation {
    Recommendation {
        title: title.to_string(),
        media_type: media_type.to_string(),
        year: year.to_string(),
        genre: genre.to_string(),
        rating: Rating::Score(rating),
        description: description.to_string(),
        why_recommended: why_recommended.to_string(),
        similar_titles: similar_titles.iter().map(|s| s.to_string()).collect(),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_media_kind_has_fully_populated_records() {
        for media_type in [MediaType::Movie, MediaType::Book, MediaType::Tv] {
            let recs = fallback_recommendations(media_type);
            assert!(recs.len() >= 2);
            for rec in &recs {
                assert!(!rec.title.is_empty());
                assert_eq!(rec.media_type, media_type.as_str());
                assert!(rec.rating.score().is_some());
                assert!(!rec.description.is_empty());
                assert!(!rec.why_recommended.is_empty());
                assert!(!rec.similar_titles.is_empty());
            }
        }
    }
}
