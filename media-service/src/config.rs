use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

/// Environment-driven configuration consumed by the service core.
///
/// Content-API keys are optional: the tool adapters degrade to descriptive
/// error text when one is missing. The LLM key is read lazily by the agent
/// itself, so config load never fails.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub model: String,
    pub temperature: f64,
    pub pipeline_timeout: Duration,
    pub rating_cache_ttl: Duration,
    pub cache_dir: PathBuf,
    pub tmdb_api_key: Option<String>,
    pub google_books_api_key: Option<String>,
    pub serpapi_key: Option<String>,
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        Self {
            model: env_or("OPENROUTER_MODEL", "openai/gpt-4.1-mini"),
            temperature: parse_env("LLM_TEMPERATURE", 0.7),
            pipeline_timeout: Duration::from_secs(parse_env("PIPELINE_TIMEOUT_SECS", 600)),
            rating_cache_ttl: Duration::from_secs(parse_env("RATING_CACHE_TTL", 86_400)),
            cache_dir: PathBuf::from(env_or("CACHE_DIR", ".cache")),
            tmdb_api_key: non_empty_env("TMDB_API_KEY"),
            google_books_api_key: non_empty_env("GOOGLE_BOOKS_API_KEY"),
            serpapi_key: non_empty_env("SERPAPI_KEY"),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            model: "openai/gpt-4.1-mini".to_string(),
            temperature: 0.7,
            pipeline_timeout: Duration::from_secs(600),
            rating_cache_ttl: Duration::from_secs(86_400),
            cache_dir: PathBuf::from(".cache"),
            tmdb_api_key: None,
            google_books_api_key: None,
            serpapi_key: None,
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T: FromStr + Copy>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("Invalid value for {}: {:?}, using default", key, raw);
            default
        }),
        Err(_) => default,
    }
}
