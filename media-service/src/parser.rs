//! Turns the pipeline's free-text or structured output into recommendation
//! records.
//!
//! Two pure stages composed left-to-right with short-circuit on the first
//! non-empty result: JSON extraction, then a line-oriented structured-text
//! fallback. Both feed the post-processor; if neither yields anything the
//! caller treats the run as empty and falls back.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, info};

use crate::model::{Rating, Recommendation};

static JSON_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        // Tight array of one object
        Regex::new(r"(?s)\[\s*\{[^{}]*\}\s*\]").expect("valid JSON regex"),
        // Array with any content
        Regex::new(r"(?s)\[\s*\{.*?\}\s*\]").expect("valid JSON regex"),
        // Object keyed "recommendations"
        Regex::new(r#"(?s)\{\s*"recommendations".*?\}"#).expect("valid JSON regex"),
    ]
});

/// Parse raw pipeline output. `None` means neither stage recognized anything.
pub fn parse_result(text: &str) -> Option<Vec<Recommendation>> {
    if let Some(recs) = parse_json_stage(text) {
        info!("Extracted {} recommendations from JSON", recs.len());
        return Some(recs);
    }
    let recs = parse_structured_text(text)?;
    info!("Parsed {} recommendations from structured text", recs.len());
    Some(recs)
}

fn extract_json(text: &str) -> Option<&str> {
    for pattern in JSON_PATTERNS.iter() {
        if let Some(m) = pattern.find(text) {
            debug!("Found JSON with pattern: {}", pattern.as_str());
            return Some(m.as_str());
        }
    }
    None
}

fn parse_json_stage(text: &str) -> Option<Vec<Recommendation>> {
    let fragment = extract_json(text)?;
    let parsed: Value = serde_json::from_str(fragment).ok()?;

    let items = match &parsed {
        Value::Array(items) => items,
        Value::Object(obj) => obj.get("recommendations")?.as_array()?,
        _ => return None,
    };

    let recs: Vec<Recommendation> = items.iter().filter_map(Recommendation::from_json).collect();
    if recs.is_empty() {
        None
    } else {
        Some(recs)
    }
}

/// A line beginning a new record is detected by trigger tokens or a leading
/// ordinal matching the next expected position.
fn is_new_recommendation(line: &str, current_count: usize) -> bool {
    let lower = line.to_lowercase();
    let ordinal = format!("{}.", current_count + 1);

    ["title:", "movie:", "book:", "tv:", "recommendation", "###", "---"]
        .iter()
        .any(|token| lower.contains(token))
        || lower.contains(&ordinal)
}

fn extract_field(line: &str, rec: &mut Recommendation) {
    const FIELD_PATTERNS: &[(&str, &[&str])] = &[
        ("title", &["title:", "movie:", "book:", "tv:", "show:"]),
        ("year", &["year:", "released:", "published:", "aired:"]),
        ("genre", &["genre:", "category:"]),
        ("rating", &["rating:", "score:"]),
        ("description", &["description:", "summary:", "plot:"]),
        (
            "why_recommended",
            &["why:", "recommended because:", "matches because:"],
        ),
        ("type", &["type:"]),
        ("image_url", &["image:", "cover:", "poster:"]),
        ("trailer_url", &["trailer:", "video:"]),
        ("preview_url", &["preview:", "sample:", "google books:"]),
    ];

    let lower = line.to_lowercase();
    for (field, patterns) in FIELD_PATTERNS {
        for pattern in *patterns {
            if lower.contains(pattern) {
                let value = match line.split_once(':') {
                    Some((_, rest)) => rest.trim().to_string(),
                    None => line.to_string(),
                };
                set_field(rec, field, value);
                return;
            }
        }
    }
}

fn set_field(rec: &mut Recommendation, field: &str, value: String) {
    match field {
        "title" => rec.title = value,
        "year" => rec.year = value,
        "genre" => rec.genre = value,
        "rating" => rec.rating = Rating::Text(value),
        "description" => rec.description = value,
        "why_recommended" => rec.why_recommended = value,
        "type" => rec.media_type = value,
        "image_url" => rec.image_url = non_empty(value),
        "trailer_url" => rec.trailer_url = non_empty(value),
        "preview_url" => rec.preview_url = non_empty(value),
        _ => {}
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() || value == "null" || value == "N/A" {
        None
    } else {
        Some(value)
    }
}

fn parse_structured_text(text: &str) -> Option<Vec<Recommendation>> {
    let mut recommendations: Vec<Recommendation> = Vec::new();
    let mut current = Recommendation::default();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if is_new_recommendation(line, recommendations.len()) && !current.title.is_empty() {
            recommendations.push(std::mem::take(&mut current));
        }

        extract_field(line, &mut current);
    }

    if !current.title.is_empty() {
        recommendations.push(current);
    }

    if recommendations.is_empty() {
        None
    } else {
        Some(recommendations)
    }
}
