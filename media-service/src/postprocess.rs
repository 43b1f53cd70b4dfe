//! Fills defaults, normalizes ratings, deduplicates, and enriches records
//! after parsing. Mutates each record exactly once; running the processor on
//! its own output is a no-op.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::model::{MediaType, Rating, Recommendation};

/// Seasons/episodes facts for a TV show, fetched outside the LLM path.
#[derive(Debug, Clone, PartialEq)]
pub struct TvFacts {
    pub seasons: String,
    pub episodes: String,
}

/// Direct (non-LLM) lookups used to fill fields the pipeline left blank.
/// Implementations absorb their own failures and answer `None`.
#[async_trait]
pub trait EnrichmentSource: Send + Sync {
    async fn rating(&self, media_type: MediaType, title: &str) -> Option<f64>;
    async fn tv_facts(&self, title: &str) -> Option<TvFacts>;
}

/// Enrichment source that never answers; keeps the processor total when no
/// content API is configured.
pub struct NoEnrichment;

#[async_trait]
impl EnrichmentSource for NoEnrichment {
    async fn rating(&self, _media_type: MediaType, _title: &str) -> Option<f64> {
        None
    }

    async fn tv_facts(&self, _title: &str) -> Option<TvFacts> {
        None
    }
}

pub struct PostProcessor {
    enrichment: Arc<dyn EnrichmentSource>,
}

impl PostProcessor {
    pub fn new(enrichment: Arc<dyn EnrichmentSource>) -> Self {
        Self { enrichment }
    }

    pub async fn process(&self, recs: &mut Vec<Recommendation>, requested: MediaType) {
        recs.retain(|rec| !rec.title.trim().is_empty());

        for rec in recs.iter_mut() {
            fill_defaults(rec, requested);
        }

        dedup_by_title(recs);

        for rec in recs.iter_mut() {
            self.enrich(rec).await;
        }
    }

    /// Per-record enrichment; a failed lookup leaves the sentinel in place
    /// and never blocks the rest of the list.
    async fn enrich(&self, rec: &mut Recommendation) {
        if rec.rating.is_unrated() {
            if let Some(media_type) = MediaType::parse(&rec.media_type) {
                match self.enrichment.rating(media_type, &rec.title).await {
                    Some(score) => {
                        debug!("Enriched rating for {}: {}", rec.title, score);
                        rec.rating = Rating::Score(round1(score));
                    }
                    None => rec.rating = Rating::na(),
                }
            }
        }

        if rec.media_type == MediaType::Tv.as_str()
            && (rec.seasons.is_none() || rec.episodes.is_none())
        {
            if let Some(facts) = self.enrichment.tv_facts(&rec.title).await {
                rec.seasons.get_or_insert(facts.seasons);
                rec.episodes.get_or_insert(facts.episodes);
            }
        }
    }
}

fn fill_defaults(rec: &mut Recommendation, requested: MediaType) {
    if rec.media_type.trim().is_empty() || rec.media_type == "unknown" {
        rec.media_type = requested.as_str().to_string();
    }
    if rec.description.trim().is_empty() {
        rec.description = "No description available".to_string();
    }
    if rec.why_recommended.trim().is_empty() {
        rec.why_recommended = "Matches your preferences".to_string();
    }
    if rec.year.trim().is_empty() {
        rec.year = "N/A".to_string();
    } else {
        rec.year = truncate_year(&rec.year);
    }
    rec.rating = normalize_rating(&rec.rating);
    rec.similar_titles.truncate(3);
    if !rec.is_compromise {
        rec.compromise_explanation = None;
    }
}

/// "2023-05-01" -> "2023"; already-bare years pass through unchanged.
fn truncate_year(year: &str) -> String {
    let head = year.split('-').next().unwrap_or(year).trim();
    if head.len() > 4 && head.chars().take(4).all(|c| c.is_ascii_digit()) {
        head[..4].to_string()
    } else {
        head.to_string()
    }
}

/// Numeric ratings are rounded to 1 decimal; "8.5/10" takes the numerator;
/// anything unparseable collapses to the "N/A" sentinel. Never fails.
pub fn normalize_rating(rating: &Rating) -> Rating {
    match rating {
        Rating::Score(score) => Rating::Score(round1(*score)),
        Rating::Text(text) => {
            let candidate = match text.split_once('/') {
                Some((numerator, _)) => numerator.trim(),
                None => text.trim(),
            };
            match candidate.parse::<f64>() {
                Ok(score) => Rating::Score(round1(score)),
                Err(_) => Rating::na(),
            }
        }
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn dedup_by_title(recs: &mut Vec<Recommendation>) {
    let mut seen: HashSet<String> = HashSet::new();
    let before = recs.len();
    recs.retain(|rec| seen.insert(rec.title.trim().to_lowercase()));
    if recs.len() < before {
        warn!("Dropped {} duplicate recommendations", before - recs.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedEnrichment;

    #[async_trait]
    impl EnrichmentSource for FixedEnrichment {
        async fn rating(&self, _media_type: MediaType, title: &str) -> Option<f64> {
            (title == "Dark").then_some(8.75)
        }

        async fn tv_facts(&self, _title: &str) -> Option<TvFacts> {
            Some(TvFacts {
                seasons: "3".to_string(),
                episodes: "26".to_string(),
            })
        }
    }

    fn rec(title: &str) -> Recommendation {
        Recommendation {
            title: title.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn rating_normalization_table() {
        let cases = [
            (Rating::Text("8.5/10".into()), Rating::Score(8.5)),
            (Rating::Text("4.7".into()), Rating::Score(4.7)),
            (Rating::Text("N/A".into()), Rating::na()),
            (Rating::Score(9.0), Rating::Score(9.0)),
            (Rating::Text("garbage".into()), Rating::na()),
            (Rating::Score(8.88), Rating::Score(8.9)),
        ];
        for (input, expected) in cases {
            assert_eq!(normalize_rating(&input), expected, "input: {:?}", input);
        }
    }

    #[test]
    fn year_truncation() {
        assert_eq!(truncate_year("2023-05-01"), "2023");
        assert_eq!(truncate_year("1999"), "1999");
        assert_eq!(truncate_year("20231105"), "2023");
        assert_eq!(truncate_year("N/A"), "N/A");
    }

    #[tokio::test]
    async fn defaults_are_filled_and_type_inferred() {
        let processor = PostProcessor::new(Arc::new(NoEnrichment));
        let mut recs = vec![rec("Inception")];
        processor.process(&mut recs, MediaType::Movie).await;

        let r = &recs[0];
        assert_eq!(r.media_type, "movie");
        assert_eq!(r.description, "No description available");
        assert_eq!(r.why_recommended, "Matches your preferences");
        assert_eq!(r.rating, Rating::na());
    }

    #[tokio::test]
    async fn processing_is_idempotent() {
        let processor = PostProcessor::new(Arc::new(NoEnrichment));
        let mut recs = vec![
            Recommendation {
                title: "Dune".to_string(),
                year: "2021-10-22".to_string(),
                rating: Rating::Text("8/10".to_string()),
                similar_titles: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                ..Default::default()
            },
            rec("Arrival"),
        ];

        processor.process(&mut recs, MediaType::Movie).await;
        let first_pass = recs.clone();
        processor.process(&mut recs, MediaType::Movie).await;
        assert_eq!(recs, first_pass);

        assert_eq!(recs[0].year, "2021");
        assert_eq!(recs[0].rating, Rating::Score(8.0));
        assert_eq!(recs[0].similar_titles.len(), 3);
    }

    #[tokio::test]
    async fn duplicates_and_untitled_records_are_dropped() {
        let processor = PostProcessor::new(Arc::new(NoEnrichment));
        let mut recs = vec![rec("Dark"), rec("dark "), rec(""), rec("Ozark")];
        processor.process(&mut recs, MediaType::Tv).await;

        let titles: Vec<&str> = recs.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Dark", "Ozark"]);
    }

    #[tokio::test]
    async fn unrated_records_are_enriched_per_record() {
        let processor = PostProcessor::new(Arc::new(FixedEnrichment));
        let mut recs = vec![
            Recommendation {
                title: "Dark".to_string(),
                media_type: "tv".to_string(),
                ..Default::default()
            },
            Recommendation {
                title: "Nowhere".to_string(),
                media_type: "tv".to_string(),
                ..Default::default()
            },
            Recommendation {
                title: "Rated".to_string(),
                media_type: "tv".to_string(),
                rating: Rating::Score(9.1),
                seasons: Some("5".to_string()),
                episodes: Some("62".to_string()),
                ..Default::default()
            },
        ];
        processor.process(&mut recs, MediaType::Tv).await;

        assert_eq!(recs[0].rating, Rating::Score(8.8));
        assert_eq!(recs[0].seasons.as_deref(), Some("3"));
        // Lookup failure leaves the sentinel and does not abort the list.
        assert_eq!(recs[1].rating, Rating::na());
        // Existing values are never overwritten.
        assert_eq!(recs[2].rating, Rating::Score(9.1));
        assert_eq!(recs[2].seasons.as_deref(), Some("5"));
    }
}
