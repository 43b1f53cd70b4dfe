//! End-to-end orchestrator scenarios with a scripted LLM agent. No network:
//! content-API keys are unset, so every tool degrades to its error text, and
//! enrichment is a no-op.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use media_service::postprocess::NoEnrichment;
use media_service::tasks::CompletionAgent;
use media_service::{InvalidRequest, MediaCrew, Rating, RecommendationRequest, ServiceConfig};

const EDITOR_JSON: &str = r#"Here is the final list:
[
  {"title": "The Grand Budapest Hotel", "type": "movie", "year": "2014", "genre": "Comedy",
   "rating": 8.1, "description": "A concierge and his lobby boy get entangled in a heist.",
   "why_recommended": "Stylish ensemble comedy.", "similar_titles": ["Moonrise Kingdom"],
   "image_url": "https://image.tmdb.org/t/p/w500/gbh.jpg", "trailer_url": null},
  {"title": "Superbad", "type": "movie", "year": "2007", "genre": "Comedy",
   "rating": "7.6/10", "image_url": "https://image.tmdb.org/t/p/w500/sb.jpg"},
  {"title": "Paddington 2", "type": "movie", "year": "2017-11-10", "genre": "Comedy, Family",
   "rating": 7.8, "image_url": "https://image.tmdb.org/t/p/w500/p2.jpg"}
]"#;

/// Replies to the editor prompt with a fixed payload and records which
/// prompts it saw.
struct ScriptedAgent {
    editor_reply: String,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedAgent {
    fn new(editor_reply: &str) -> Self {
        Self {
            editor_reply: editor_reply.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn prompt_kinds(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionAgent for ScriptedAgent {
    async fn complete(&self, _preamble: &str, prompt: &str) -> anyhow::Result<String> {
        let kind = prompt
            .split(|c| c == ':' || c == '\n')
            .next()
            .unwrap_or("")
            .to_string();
        self.prompts.lock().unwrap().push(kind);

        if prompt.starts_with("FINALIZE") {
            Ok(self.editor_reply.clone())
        } else {
            Ok("Candidate notes from a specialist stage.".to_string())
        }
    }
}

/// Hangs long enough to trip any sub-second deadline.
struct SlowAgent;

#[async_trait]
impl CompletionAgent for SlowAgent {
    async fn complete(&self, _preamble: &str, _prompt: &str) -> anyhow::Result<String> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok("too late".to_string())
    }
}

/// Counts invocations; used to prove validation never reaches the pipeline.
struct CountingAgent(AtomicUsize);

#[async_trait]
impl CompletionAgent for CountingAgent {
    async fn complete(&self, _preamble: &str, _prompt: &str) -> anyhow::Result<String> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok("unused".to_string())
    }
}

fn test_config(dir: &tempfile::TempDir) -> ServiceConfig {
    ServiceConfig {
        cache_dir: dir.path().to_path_buf(),
        ..ServiceConfig::default()
    }
}

fn crew_with(agent: Arc<dyn CompletionAgent>, config: ServiceConfig) -> MediaCrew {
    MediaCrew::with_agent_and_enrichment(config, agent, Arc::new(NoEnrichment))
        .expect("crew construction")
}

#[tokio::test]
async fn scenario_a_fast_path_returns_parsed_movie_list() {
    let dir = tempfile::tempdir().unwrap();
    let agent = Arc::new(ScriptedAgent::new(EDITOR_JSON));
    let crew = crew_with(agent.clone(), test_config(&dir));

    let recs = crew
        .run(RecommendationRequest::new("comedy movies", "movie"))
        .await
        .unwrap();

    assert_eq!(recs.len(), 3);
    for rec in &recs {
        assert_eq!(rec.media_type, "movie");
        assert!(rec.rating.score().is_some());
        assert!(!rec.title.is_empty());
    }
    assert_eq!(recs[0].rating, Rating::Score(8.1));
    assert_eq!(recs[1].rating, Rating::Score(7.6));
    assert_eq!(recs[2].year, "2017");
    assert_eq!(
        recs[0].image_url.as_deref(),
        Some("https://image.tmdb.org/t/p/w500/gbh.jpg")
    );

    // Fast path skips the analysis stage: specialist then editor only.
    let kinds = agent.prompt_kinds();
    assert_eq!(kinds.len(), 2);
    assert_eq!(kinds[0], "FIND MOVIE RECOMMENDATIONS");
    assert_eq!(kinds[1], "FINALIZE RECOMMENDATIONS");
}

#[tokio::test]
async fn full_pipeline_adds_analysis_and_research_stages() {
    let dir = tempfile::tempdir().unwrap();
    let agent = Arc::new(ScriptedAgent::new(
        r#"[{"title": "Severance", "type": "tv", "rating": 8.7}]"#,
    ));
    let crew = crew_with(agent.clone(), test_config(&dir));

    let recs = crew
        .run(RecommendationRequest::new(
            "what are the latest prestige dramas",
            "tv",
        ))
        .await
        .unwrap();

    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0].title, "Severance");

    let kinds = agent.prompt_kinds();
    assert_eq!(
        kinds,
        vec![
            "ANALYZE USER REQUEST".to_string(),
            "FIND TV SERIES RECOMMENDATIONS".to_string(),
            "RESEARCH ADDITIONAL CONTEXT".to_string(),
            "FINALIZE RECOMMENDATIONS".to_string(),
        ]
    );
}

#[tokio::test]
async fn scenario_b_timeout_degrades_to_fallback_within_bounds() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(&dir);
    config.pipeline_timeout = Duration::from_millis(250);
    let crew = crew_with(Arc::new(SlowAgent), config);

    let started = Instant::now();
    let recs = crew
        .run(RecommendationRequest::new("comedy movies", "movie"))
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert!(elapsed < Duration::from_secs(2), "took {:?}", elapsed);
    assert!(!recs.is_empty());
    assert_eq!(recs[0].title, "Inception");
    assert!(recs.iter().all(|r| r.media_type == "movie"));
}

#[tokio::test]
async fn scenario_c_unparseable_output_degrades_to_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let agent = Arc::new(ScriptedAgent::new(
        "I'm sorry, I could not settle on anything concrete today.",
    ));
    let crew = crew_with(agent, test_config(&dir));

    let recs = crew
        .run(RecommendationRequest::new("fantasy books", "book"))
        .await
        .unwrap();

    assert!(recs.len() >= 2);
    assert_eq!(recs[0].title, "Project Hail Mary");
    assert!(recs.iter().all(|r| r.media_type == "book"));
}

#[tokio::test]
async fn validation_errors_surface_before_any_pipeline_work() {
    let dir = tempfile::tempdir().unwrap();
    let agent = Arc::new(CountingAgent(AtomicUsize::new(0)));
    let crew = crew_with(agent.clone(), test_config(&dir));

    let empty = crew
        .run(RecommendationRequest::new("   ", "movie"))
        .await
        .unwrap_err();
    assert_eq!(empty, InvalidRequest::EmptyRequest);

    let bad_type = crew
        .run(RecommendationRequest::new("comedy movies", "vinyl"))
        .await
        .unwrap_err();
    assert_eq!(bad_type, InvalidRequest::UnknownMediaType("vinyl".to_string()));

    let mut too_many = RecommendationRequest::new("comedy movies", "movie");
    too_many.num_recommendations = 11;
    let count = crew.run(too_many).await.unwrap_err();
    assert_eq!(count, InvalidRequest::CountOutOfRange(11));

    assert_eq!(agent.0.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn fast_path_detected_kind_drives_the_specialist() {
    let dir = tempfile::tempdir().unwrap();
    let agent = Arc::new(ScriptedAgent::new(
        r#"[{"title": "Dark", "type": "tv", "rating": 8.8, "seasons": "3", "episodes": "26"}]"#,
    ));
    let crew = crew_with(agent.clone(), test_config(&dir));

    let recs = crew
        .run(RecommendationRequest::new("sci fi shows", "tv"))
        .await
        .unwrap();

    assert_eq!(recs[0].title, "Dark");
    assert_eq!(recs[0].seasons.as_deref(), Some("3"));

    let kinds = agent.prompt_kinds();
    assert_eq!(kinds[0], "FIND TV SERIES RECOMMENDATIONS");
    assert_eq!(kinds.len(), 2);
}

#[tokio::test]
async fn media_type_is_reflected_in_response_records()
{
    let dir = tempfile::tempdir().unwrap();
    // Editor output omits the type field entirely; the post-processor must
    // infer it from the requested kind.
    let agent = Arc::new(ScriptedAgent::new(
        r#"[{"title": "Piranesi", "rating": "4.5"}, {"title": "Circe"}]"#,
    ));
    let crew = crew_with(agent, test_config(&dir));

    let recs = crew
        .run(RecommendationRequest::new(
            "books about myths retold",
            "book",
        ))
        .await
        .unwrap();

    assert_eq!(recs.len(), 2);
    assert!(recs.iter().all(|r| r.media_type == "book"));
    assert_eq!(recs[0].rating, Rating::Score(4.5));
    assert_eq!(recs[1].rating, Rating::na());
}
