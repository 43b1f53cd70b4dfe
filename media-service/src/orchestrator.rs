//! Crew orchestrator: validates the request, picks the task pipeline,
//! executes it under a hard deadline, and post-processes the result. Every
//! failure past validation degrades to the static fallback list, so valid
//! input always yields a non-empty recommendation list.

use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{error, info, warn};

use crew_flow::{Context, Pipeline, PipelineBuilder, Task};

use crate::cache::PersistentTtlCache;
use crate::config::ServiceConfig;
use crate::fallback::fallback_recommendations;
use crate::fastpath::{self, FastPath};
use crate::model::{MediaType, Recommendation};
use crate::parser;
use crate::postprocess::{EnrichmentSource, PostProcessor};
use crate::tasks::types::KEY_INPUTS;
use crate::tasks::{
    AnalysisTask, BookSpecialistTask, CompletionAgent, EditorTask, MovieSpecialistTask,
    OpenRouterAgent, ResearchTask, TaskInputs, TvSpecialistTask,
};
use crate::tools::{ApiEnrichment, BookTools, MovieTools, SharedTools, TvTools};

/// Requests containing any of these get the research stage appended.
const RESEARCH_KEYWORDS: &[&str] = &[
    "trending", "new", "recent", "latest", "upcoming", "update", "news", "current",
];

#[derive(Debug, Clone)]
pub struct RecommendationRequest {
    pub user_request: String,
    pub media_type: String,
    pub genre: Option<String>,
    pub mood: Option<String>,
    pub timeframe: Option<String>,
    pub num_recommendations: usize,
    pub personalization_context: Option<String>,
}

impl RecommendationRequest {
    pub fn new(user_request: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self {
            user_request: user_request.into(),
            media_type: media_type.into(),
            genre: None,
            mood: None,
            timeframe: None,
            num_recommendations: 3,
            personalization_context: None,
        }
    }
}

/// The only error class that crosses the public boundary; everything else
/// degrades to fallback output.
#[derive(Debug, Error, PartialEq)]
pub enum InvalidRequest {
    #[error("User request cannot be empty")]
    EmptyRequest,

    #[error("Media type must be one of movie, book, tv (got {0:?})")]
    UnknownMediaType(String),

    #[error("Number of recommendations must be between 1 and 10 (got {0})")]
    CountOutOfRange(usize),
}

pub struct MediaCrew {
    config: ServiceConfig,
    agent: Arc<dyn CompletionAgent>,
    movie_tools: Arc<MovieTools>,
    book_tools: Arc<BookTools>,
    tv_tools: Arc<TvTools>,
    shared_tools: Arc<SharedTools>,
    post: PostProcessor,
}

impl MediaCrew {
    pub fn new(config: ServiceConfig) -> anyhow::Result<Self> {
        let agent: Arc<dyn CompletionAgent> =
            Arc::new(OpenRouterAgent::new(&config.model, config.temperature));
        Self::with_agent(config, agent)
    }

    /// Construct with a custom LLM agent; the enrichment source still goes
    /// through the live content APIs.
    pub fn with_agent(
        config: ServiceConfig,
        agent: Arc<dyn CompletionAgent>,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        let rating_cache = Arc::new(PersistentTtlCache::new(
            &config.cache_dir,
            "rating_cache.json",
        ));
        let enrichment: Arc<dyn EnrichmentSource> = Arc::new(ApiEnrichment::new(
            http,
            config.tmdb_api_key.clone(),
            config.google_books_api_key.clone(),
            rating_cache,
            config.rating_cache_ttl,
        ));
        Self::with_agent_and_enrichment(config, agent, enrichment)
    }

    /// Fully injected construction; used by tests and embedders that bring
    /// their own enrichment path.
    pub fn with_agent_and_enrichment(
        config: ServiceConfig,
        agent: Arc<dyn CompletionAgent>,
        enrichment: Arc<dyn EnrichmentSource>,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        let api_cache = Arc::new(PersistentTtlCache::new(&config.cache_dir, "api_cache.json"));

        let movie_tools = Arc::new(MovieTools::new(
            http.clone(),
            config.tmdb_api_key.clone(),
            api_cache.clone(),
        ));
        let tv_tools = Arc::new(TvTools::new(
            http.clone(),
            config.tmdb_api_key.clone(),
            api_cache.clone(),
        ));
        let book_tools = Arc::new(BookTools::new(
            http.clone(),
            config.google_books_api_key.clone(),
            api_cache,
        ));
        let shared_tools = Arc::new(SharedTools::new(http, config.serpapi_key.clone()));

        Ok(Self {
            config,
            agent,
            movie_tools,
            book_tools,
            tv_tools,
            shared_tools,
            post: PostProcessor::new(enrichment),
        })
    }

    /// Execute the recommendation crew for one request.
    ///
    /// Only invalid input surfaces as an error; pipeline failures, timeouts,
    /// and unparseable output all return the fallback list for the requested
    /// media kind.
    pub async fn run(
        &self,
        request: RecommendationRequest,
    ) -> Result<Vec<Recommendation>, InvalidRequest> {
        let started = Instant::now();
        info!(
            "Starting crew execution for request: {:.100}",
            request.user_request
        );

        let media_type = validate(&request)?;

        let fast_path = fastpath::classify(&request.user_request);
        if let Some(fp) = &fast_path {
            info!("Fast path triggered: {:?}", fp);
        }

        // The fast path's detected kind and genre take precedence for task
        // construction; the requested kind still governs the fallback list.
        let effective_type = fast_path
            .as_ref()
            .map(|fp| fp.media_type)
            .unwrap_or(media_type);
        let inputs = TaskInputs {
            user_request: request.user_request.clone(),
            media_type: effective_type,
            genre: fast_path
                .as_ref()
                .map(|fp| fp.genre.clone())
                .or_else(|| request.genre.clone()),
            mood: request.mood.clone(),
            timeframe: request.timeframe.clone(),
            num_recommendations: request.num_recommendations,
            personalization_context: request.personalization_context.clone(),
        };

        let pipeline =
            self.build_pipeline(fast_path.as_ref(), effective_type, &request.user_request);
        let context = Context::new();
        context.set(KEY_INPUTS, &inputs).await;

        let outcome =
            tokio::time::timeout(self.config.pipeline_timeout, pipeline.execute(context)).await;

        let raw = match outcome {
            Err(_) => {
                error!(
                    "Pipeline exceeded timeout of {:?}; using fallback",
                    self.config.pipeline_timeout
                );
                return Ok(fallback_recommendations(media_type));
            }
            Ok(Err(e)) => {
                error!("Pipeline execution failed: {}", e);
                return Ok(fallback_recommendations(media_type));
            }
            Ok(Ok(None)) => {
                warn!("Pipeline produced no output; using fallback");
                return Ok(fallback_recommendations(media_type));
            }
            Ok(Ok(Some(raw))) => raw,
        };

        let mut recommendations = match parser::parse_result(&raw) {
            Some(recs) => recs,
            None => {
                warn!("Could not parse pipeline output; using fallback");
                return Ok(fallback_recommendations(media_type));
            }
        };

        self.post.process(&mut recommendations, media_type).await;

        if recommendations.is_empty() {
            warn!("No valid recommendations after post-processing; using fallback");
            return Ok(fallback_recommendations(media_type));
        }

        info!(
            "Crew execution completed in {:.2}s. Returning {} recommendations.",
            started.elapsed().as_secs_f64(),
            recommendations.len()
        );
        Ok(recommendations)
    }

    /// Fast path: specialist + editor. Full path: analysis first, research
    /// appended for temporal/novelty requests, editor always terminal.
    fn build_pipeline(
        &self,
        fast_path: Option<&FastPath>,
        media_type: MediaType,
        user_request: &str,
    ) -> Pipeline {
        let mut builder = if fast_path.is_some() {
            PipelineBuilder::new("fast_path")
        } else {
            PipelineBuilder::new("full")
                .add_task(Arc::new(AnalysisTask::new(self.agent.clone())))
        };

        builder = builder.add_task(self.specialist_for(media_type));

        if fast_path.is_none() {
            let lower = user_request.to_lowercase();
            if RESEARCH_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
                builder = builder.add_task(Arc::new(ResearchTask::new(
                    self.agent.clone(),
                    self.shared_tools.clone(),
                )));
            }
        }

        builder
            .add_task(Arc::new(EditorTask::new(self.agent.clone())))
            .build()
    }

    fn specialist_for(&self, media_type: MediaType) -> Arc<dyn Task> {
        match media_type {
            MediaType::Movie => Arc::new(MovieSpecialistTask::new(
                self.agent.clone(),
                self.movie_tools.clone(),
                self.shared_tools.clone(),
            )),
            MediaType::Book => Arc::new(BookSpecialistTask::new(
                self.agent.clone(),
                self.book_tools.clone(),
                self.shared_tools.clone(),
            )),
            MediaType::Tv => Arc::new(TvSpecialistTask::new(
                self.agent.clone(),
                self.tv_tools.clone(),
                self.shared_tools.clone(),
            )),
        }
    }
}

fn validate(request: &RecommendationRequest) -> Result<MediaType, InvalidRequest> {
    if request.user_request.trim().is_empty() {
        return Err(InvalidRequest::EmptyRequest);
    }

    let media_type = MediaType::parse(&request.media_type)
        .ok_or_else(|| InvalidRequest::UnknownMediaType(request.media_type.clone()))?;

    if !(1..=10).contains(&request.num_recommendations) {
        return Err(InvalidRequest::CountOutOfRange(
            request.num_recommendations,
        ));
    }

    Ok(media_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_rules() {
        let ok = RecommendationRequest::new("comedy movies", "movie");
        assert_eq!(validate(&ok), Ok(MediaType::Movie));

        let empty = RecommendationRequest::new("   ", "movie");
        assert_eq!(validate(&empty), Err(InvalidRequest::EmptyRequest));

        let bad_type = RecommendationRequest::new("comedy movies", "podcast");
        assert_eq!(
            validate(&bad_type),
            Err(InvalidRequest::UnknownMediaType("podcast".to_string()))
        );

        let mut too_many = RecommendationRequest::new("comedy movies", "movie");
        too_many.num_recommendations = 11;
        assert_eq!(validate(&too_many), Err(InvalidRequest::CountOutOfRange(11)));

        let mut zero = RecommendationRequest::new("comedy movies", "movie");
        zero.num_recommendations = 0;
        assert_eq!(validate(&zero), Err(InvalidRequest::CountOutOfRange(0)));
    }
}
