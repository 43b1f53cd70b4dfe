use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crew_flow::FlowError::TaskExecutionFailed;
use crew_flow::{Context, NextAction, Task, TaskResult};

use super::types::{require_inputs, KEY_SPECIALIST};
use super::utils::CompletionAgent;
use crate::model::MediaType;
use crate::tools::{MovieTools, SharedTools};

const PREAMBLE: &str = "You are a film expert with comprehensive knowledge of cinema across all \
genres and eras. You use TMDB search results to find current, highly-rated movies that match \
user preferences, considering ratings, reviews, cultural relevance, and thematic alignment.";

/// Movie specialist. Capability set: search, details, popular, discover,
/// similar-titles. Gathers tool output first, then asks the LLM to select
/// and describe the best matches from it.
pub struct MovieSpecialistTask {
    agent: Arc<dyn CompletionAgent>,
    tools: Arc<MovieTools>,
    shared: Arc<SharedTools>,
}

impl MovieSpecialistTask {
    pub fn new(
        agent: Arc<dyn CompletionAgent>,
        tools: Arc<MovieTools>,
        shared: Arc<SharedTools>,
    ) -> Self {
        Self {
            agent,
            tools,
            shared,
        }
    }

    /// Genre requests go through discover for diverse results; everything
    /// else is searched verbatim. Popular and similar-titles blocks are
    /// added when the request asks for them.
    async fn gather_tool_output(&self, request: &str, genre: Option<&str>) -> String {
        let mut blocks = Vec::new();
        let lower = request.to_lowercase();

        match genre {
            Some(genre) => {
                blocks.push(format!(
                    "discover_movies({}):\n{}",
                    genre,
                    self.tools.discover_movies(genre, None, None).await
                ));
            }
            None => {
                blocks.push(format!(
                    "search_movies({}):\n{}",
                    request,
                    self.tools.search_movies(request, None).await
                ));
            }
        }

        if lower.contains("popular") || lower.contains("best") {
            blocks.push(format!(
                "get_popular_movies():\n{}",
                self.tools.get_popular_movies().await
            ));
        }

        if lower.contains("similar") || lower.contains("like ") {
            blocks.push(format!(
                "find_similar_titles():\n{}",
                self.shared
                    .find_similar_titles(request, MediaType::Movie)
                    .await
            ));
        }

        blocks.join("\n\n")
    }
}

#[async_trait]
impl Task for MovieSpecialistTask {
    fn id(&self) -> &str {
        std::any::type_name::<Self>()
    }

    async fn run(&self, context: Context) -> crew_flow::Result<TaskResult> {
        info!("Starting movie specialist task");
        let inputs = require_inputs(&context)?;

        let genre = match inputs.genre() {
            "Not specified" => None,
            genre => Some(genre),
        };
        let tool_output = self.gather_tool_output(&inputs.user_request, genre).await;

        let prompt = format!(
            "FIND MOVIE RECOMMENDATIONS:\n\n\
             {}\n\n\
             TOOL RESULTS:\n{}\n\n\
             REQUIREMENTS:\n\
             - Select {} highly-rated movies from the tool results that match the preferences\n\
             - Include diverse options when possible\n\n\
             FOR EACH MOVIE, PROVIDE:\n\
             - Title and release year\n\
             - Genre classification\n\
             - Rating (out of 10)\n\
             - Brief description\n\
             - Why it matches user preferences\n\
             - 2-3 similar movies\n\
             - Image/Poster URL (only if present in the tool results)\n\
             - Trailer URL (only if present in the tool results)\n\n\
             Never invent URLs; if one is missing from the tool results, omit it.",
            inputs.preferences_block(),
            tool_output,
            inputs.num_recommendations,
        );

        let output = self
            .agent
            .complete(PREAMBLE, &prompt)
            .await
            .map_err(|e| TaskExecutionFailed(format!("Movie specialist failed: {}", e)))?;

        info!("Movie specialist produced candidate list");
        context.set(KEY_SPECIALIST, output).await;
        Ok(TaskResult::new(None, NextAction::Continue))
    }
}
