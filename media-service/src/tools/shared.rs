//! SerpAPI-backed shared tools: similar titles, news, trending media.
//! Used by every specialist and by the research stage; uncached because the
//! result set shifts too quickly to be worth a TTL.

use serde_json::Value;
use tracing::debug;

use crate::model::MediaType;

const SERP_BASE: &str = "https://serpapi.com/search.json";
const NO_KEY: &str =
    "SerpAPI key not configured. Please set SERPAPI_KEY in your environment variables.";

pub struct SharedTools {
    http: reqwest::Client,
    api_key: Option<String>,
}

impl SharedTools {
    pub fn new(http: reqwest::Client, api_key: Option<String>) -> Self {
        Self { http, api_key }
    }

    pub async fn find_similar_titles(&self, title: &str, media_type: MediaType) -> String {
        let Some(api_key) = self.api_key.as_deref() else {
            return NO_KEY.to_string();
        };

        let query = format!("{}s similar to {}", media_type, title);
        debug!("find_similar_titles: {:?}", query);

        let result: anyhow::Result<String> = async {
            let organic = self.google_search(api_key, &query, None).await?;
            let mut titles: Vec<String> = Vec::new();
            for item in organic.iter().take(5) {
                if let Some(text) = item["title"].as_str() {
                    let cleaned = text
                        .replace(" - Similar movies", "")
                        .replace(" - Similar books", "");
                    if !cleaned.is_empty() && !titles.contains(&cleaned) {
                        titles.push(cleaned);
                    }
                }
            }

            if titles.is_empty() {
                return Ok(format!("No similar {}s found for '{}'.", media_type, title));
            }
            Ok(format!(
                "Similar {}s to '{}':\n{}",
                media_type,
                title,
                titles
                    .iter()
                    .map(|t| format!("- {}", t))
                    .collect::<Vec<_>>()
                    .join("\n")
            ))
        }
        .await;

        result.unwrap_or_else(|e| format!("Error finding similar titles: {}", e))
    }

    pub async fn search_news(&self, query: &str) -> String {
        let Some(api_key) = self.api_key.as_deref() else {
            return NO_KEY.to_string();
        };

        debug!("search_news: {:?}", query);
        let result: anyhow::Result<String> = async {
            let organic = self.google_search(api_key, query, Some("nws")).await?;
            let mut lines = Vec::new();
            for item in organic.iter().take(5) {
                let title = item["title"].as_str().unwrap_or_default();
                let snippet = item["snippet"].as_str().unwrap_or_default();
                if !title.is_empty() {
                    lines.push(format!("- {}: {}", title, snippet));
                }
            }

            if lines.is_empty() {
                return Ok(format!("No recent news found for '{}'.", query));
            }
            Ok(format!("Recent news for '{}':\n{}", query, lines.join("\n")))
        }
        .await;

        result.unwrap_or_else(|e| format!("Error searching news: {}", e))
    }

    pub async fn get_trending_media(&self, media_type: MediaType) -> String {
        let Some(api_key) = self.api_key.as_deref() else {
            return NO_KEY.to_string();
        };

        let query = format!("trending {}s this week", media_type);
        debug!("get_trending_media: {:?}", query);

        let result: anyhow::Result<String> = async {
            let organic = self.google_search(api_key, &query, None).await?;
            let mut lines = Vec::new();
            for item in organic.iter().take(5) {
                if let Some(title) = item["title"].as_str() {
                    lines.push(format!("- {}", title));
                }
            }

            if lines.is_empty() {
                return Ok(format!("No trending {}s found.", media_type));
            }
            Ok(format!("Trending {}s:\n{}", media_type, lines.join("\n")))
        }
        .await;

        result.unwrap_or_else(|e| format!("Error fetching trending media: {}", e))
    }

    async fn google_search(
        &self,
        api_key: &str,
        query: &str,
        tbm: Option<&str>,
    ) -> anyhow::Result<Vec<Value>> {
        let mut params: Vec<(&str, &str)> = vec![
            ("q", query),
            ("api_key", api_key),
            ("engine", "google"),
            ("gl", "us"),
            ("hl", "en"),
        ];
        if let Some(tbm) = tbm {
            params.push(("tbm", tbm));
        }

        let response = self.http.get(SERP_BASE).query(&params).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("SerpAPI error: {}", response.status().as_u16());
        }

        let data: Value = response.json().await?;
        Ok(data["organic_results"].as_array().cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_key_degrades_to_error_text() {
        let tools = SharedTools::new(reqwest::Client::new(), None);
        let out = tools.find_similar_titles("Dune", MediaType::Movie).await;
        assert!(out.contains("SerpAPI key not configured"));

        let out = tools.search_news("new sci-fi shows").await;
        assert!(out.contains("SerpAPI key not configured"));
    }
}
