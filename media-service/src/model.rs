use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of media a request or recommendation refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Movie,
    Book,
    Tv,
}

impl MediaType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "movie" => Some(MediaType::Movie),
            "book" => Some(MediaType::Book),
            "tv" => Some(MediaType::Tv),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Movie => "movie",
            MediaType::Book => "book",
            MediaType::Tv => "tv",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rating as it travels through the pipeline: either a numeric score or a
/// textual value. After post-processing the textual case is always the
/// "N/A" sentinel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Rating {
    Score(f64),
    Text(String),
}

impl Rating {
    pub fn na() -> Self {
        Rating::Text("N/A".to_string())
    }

    pub fn score(&self) -> Option<f64> {
        match self {
            Rating::Score(s) => Some(*s),
            Rating::Text(_) => None,
        }
    }

    /// True for the absent-rating sentinels that trigger enrichment.
    pub fn is_unrated(&self) -> bool {
        match self {
            Rating::Score(_) => false,
            Rating::Text(s) => {
                let s = s.trim();
                s.is_empty() || s == "N/A" || s == "Unknown"
            }
        }
    }
}

impl Default for Rating {
    fn default() -> Self {
        Rating::na()
    }
}

/// One recommended item, as returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub title: String,
    #[serde(rename = "type")]
    pub media_type: String,
    pub year: String,
    pub genre: String,
    pub rating: Rating,
    pub description: String,
    pub why_recommended: String,
    pub similar_titles: Vec<String>,
    pub image_url: Option<String>,
    pub trailer_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
    pub is_compromise: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compromise_explanation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seasons: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episodes: Option<String>,
}

impl Default for Recommendation {
    fn default() -> Self {
        Self {
            title: String::new(),
            media_type: "unknown".to_string(),
            year: "N/A".to_string(),
            genre: String::new(),
            rating: Rating::na(),
            description: String::new(),
            why_recommended: String::new(),
            similar_titles: Vec::new(),
            image_url: None,
            trailer_url: None,
            preview_url: None,
            is_compromise: false,
            compromise_explanation: None,
            seasons: None,
            episodes: None,
        }
    }
}

impl Recommendation {
    /// Build a recommendation from one element of the pipeline's JSON output.
    ///
    /// Tolerant of upstream sloppiness: numbers where strings are expected,
    /// a comma-joined string where a list is expected. Returns `None` when
    /// the element is not an object or lacks a non-empty title.
    pub fn from_json(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let title = obj.get("title").and_then(value_to_string)?;
        if title.trim().is_empty() {
            return None;
        }

        let similar_titles = match obj.get("similar_titles") {
            Some(Value::Array(items)) => items.iter().filter_map(value_to_string).collect(),
            Some(Value::String(s)) => s
                .split(',')
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
            _ => Vec::new(),
        };

        Some(Self {
            title,
            media_type: obj
                .get("type")
                .and_then(value_to_string)
                .unwrap_or_else(|| "unknown".to_string()),
            year: obj
                .get("year")
                .and_then(value_to_string)
                .unwrap_or_else(|| "N/A".to_string()),
            genre: obj.get("genre").and_then(value_to_string).unwrap_or_default(),
            rating: obj.get("rating").map(json_to_rating).unwrap_or_default(),
            description: obj
                .get("description")
                .and_then(value_to_string)
                .unwrap_or_default(),
            why_recommended: obj
                .get("why_recommended")
                .and_then(value_to_string)
                .unwrap_or_default(),
            similar_titles,
            image_url: obj.get("image_url").and_then(url_to_string),
            trailer_url: obj.get("trailer_url").and_then(url_to_string),
            preview_url: obj.get("preview_url").and_then(url_to_string),
            is_compromise: obj
                .get("is_compromise")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            compromise_explanation: obj
                .get("compromise_explanation")
                .and_then(value_to_string),
            seasons: obj.get("seasons").and_then(value_to_string),
            episodes: obj.get("episodes").and_then(value_to_string),
        })
    }
}

fn json_to_rating(value: &Value) -> Rating {
    match value {
        Value::Number(n) => n.as_f64().map(Rating::Score).unwrap_or_default(),
        Value::String(s) => Rating::Text(s.clone()),
        _ => Rating::na(),
    }
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// URLs are only ever passed through from upstream tool output. A JSON null,
/// an empty string, or the literal "null" all count as absent.
fn url_to_string(value: &Value) -> Option<String> {
    value_to_string(value).filter(|s| !s.is_empty() && s != "null" && s != "N/A")
}
