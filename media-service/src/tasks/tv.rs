use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crew_flow::FlowError::TaskExecutionFailed;
use crew_flow::{Context, NextAction, Task, TaskResult};

use super::types::{require_inputs, KEY_SPECIALIST};
use super::utils::CompletionAgent;
use crate::model::MediaType;
use crate::tools::{SharedTools, TvTools};

const PREAMBLE: &str = "You are a television expert with deep knowledge of TV series across \
formats and eras. Genre requests are answered from discovery results, specific show names from \
search results. You understand the nuances of different TV formats.";

/// TV specialist. Capability set: search, details, popular, discover,
/// similar-titles.
pub struct TvSpecialistTask {
    agent: Arc<dyn CompletionAgent>,
    tools: Arc<TvTools>,
    shared: Arc<SharedTools>,
}

impl TvSpecialistTask {
    pub fn new(
        agent: Arc<dyn CompletionAgent>,
        tools: Arc<TvTools>,
        shared: Arc<SharedTools>,
    ) -> Self {
        Self {
            agent,
            tools,
            shared,
        }
    }

    /// Genre requests use discover, everything else search; popular and
    /// similar-titles blocks are added when the request asks for them.
    async fn gather_tool_output(&self, request: &str, genre: Option<&str>) -> String {
        let mut blocks = Vec::new();
        let lower = request.to_lowercase();

        match genre {
            Some(genre) => {
                blocks.push(format!(
                    "discover_tv_shows({}):\n{}",
                    genre,
                    self.tools.discover_tv_shows(genre, None).await
                ));
            }
            None => {
                blocks.push(format!(
                    "search_tv_shows({}):\n{}",
                    request,
                    self.tools.search_tv_shows(request).await
                ));
            }
        }

        if lower.contains("popular") || lower.contains("best") {
            blocks.push(format!(
                "get_popular_tv_shows():\n{}",
                self.tools.get_popular_tv_shows().await
            ));
        }

        if lower.contains("similar") || lower.contains("like ") {
            blocks.push(format!(
                "find_similar_titles():\n{}",
                self.shared.find_similar_titles(request, MediaType::Tv).await
            ));
        }

        blocks.join("\n\n")
    }
}

#[async_trait]
impl Task for TvSpecialistTask {
    fn id(&self) -> &str {
        std::any::type_name::<Self>()
    }

    async fn run(&self, context: Context) -> crew_flow::Result<TaskResult> {
        info!("Starting TV specialist task");
        let inputs = require_inputs(&context)?;

        let genre = match inputs.genre() {
            "Not specified" => None,
            genre => Some(genre),
        };
        let tool_output = self.gather_tool_output(&inputs.user_request, genre).await;

        let prompt = format!(
            "FIND TV SERIES RECOMMENDATIONS:\n\n\
             {}\n\n\
             TOOL RESULTS:\n{}\n\n\
             REQUIREMENTS:\n\
             - Select {} highly-rated TV shows from the tool results that match the preferences\n\
             - Include diverse options when possible\n\n\
             FOR EACH TV SHOW, PROVIDE:\n\
             - Title and first air year\n\
             - Genre classification\n\
             - Rating (out of 10)\n\
             - Number of seasons (Format: \"Seasons: X\")\n\
             - Number of episodes (Format: \"Episodes: Y\")\n\
             - Brief description\n\
             - Why it matches user preferences\n\
             - 2-3 similar shows\n\
             - Image/Poster URL (only if present in the tool results)\n\n\
             Never invent URLs; if one is missing from the tool results, omit it.",
            inputs.preferences_block(),
            tool_output,
            inputs.num_recommendations,
        );

        let output = self
            .agent
            .complete(PREAMBLE, &prompt)
            .await
            .map_err(|e| TaskExecutionFailed(format!("TV specialist failed: {}", e)))?;

        info!("TV specialist produced candidate list");
        context.set(KEY_SPECIALIST, output).await;
        Ok(TaskResult::new(None, NextAction::Continue))
    }
}
