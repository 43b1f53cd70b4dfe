use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crew_flow::FlowError::TaskExecutionFailed;
use crew_flow::{Context, NextAction, Task, TaskResult};

use super::types::{require_inputs, KEY_ANALYSIS};
use super::utils::CompletionAgent;

const PREAMBLE: &str = "You are an expert at understanding user preferences and intent in media \
requests. You excel at discerning whether someone wants movies, books, or TV shows, and can \
extract key elements like genre, mood, themes, and specific requirements with high accuracy. \
You have a keen eye for contradictions: when users request combinations that are fundamentally \
incompatible (like 'happy Titanic movie' or 'uplifting tragedy'), you identify these conflicts \
so the recommendation team can provide the best possible compromise with clear explanations.";

/// First stage of the full pipeline: breaks the raw request into a
/// preference profile and flags contradictory requirements. Skipped entirely
/// on the fast path.
pub struct AnalysisTask {
    agent: Arc<dyn CompletionAgent>,
}

impl AnalysisTask {
    pub fn new(agent: Arc<dyn CompletionAgent>) -> Self {
        Self { agent }
    }
}

#[async_trait]
impl Task for AnalysisTask {
    fn id(&self) -> &str {
        std::any::type_name::<Self>()
    }

    async fn run(&self, context: Context) -> crew_flow::Result<TaskResult> {
        info!("Starting analysis task");
        let inputs = require_inputs(&context)?;

        let prompt = format!(
            "ANALYZE USER REQUEST:\n\n\
             User Request: {}\n\
             Personalization Context: {}\n\n\
             YOUR MISSION:\n\
             1. Determine the primary media type preference (movie/book/tv)\n\
             2. Extract specific genres, themes, and moods\n\
             3. Identify timeframe preferences\n\
             4. Note any special requirements or constraints\n\
             5. DETECT CONTRADICTIONS: identify impossible or contradictory requirements \
             (e.g. 'happy movie about the Titanic', 'relaxing horror movie', 'short 3-hour film')\n\n\
             If the request is simple (e.g. 'action movies'), skip detailed analysis and return \
             a standard profile immediately. Do not over-analyze simple queries.\n\n\
             OUTPUT FORMAT:\n\
             - Media Type: [movie/book/tv]\n\
             - Key Genres: [comma-separated list]\n\
             - Mood/Tone: [primary mood]\n\
             - Timeframe: [specific preference]\n\
             - Special Requirements: [any specific asks]\n\
             - Contradiction Detected: [yes/no - explain if yes]",
            inputs.user_request,
            inputs.personalization(),
        );

        let analysis = self
            .agent
            .complete(PREAMBLE, &prompt)
            .await
            .map_err(|e| TaskExecutionFailed(format!("Analysis failed: {}", e)))?;

        info!("Request analysis complete");
        context.set(KEY_ANALYSIS, analysis).await;
        Ok(TaskResult::new(None, NextAction::Continue))
    }
}
