use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crew_flow::FlowError::TaskExecutionFailed;
use crew_flow::{Context, NextAction, Task, TaskResult};

use super::types::{require_inputs, KEY_SPECIALIST};
use super::utils::CompletionAgent;
use crate::model::MediaType;
use crate::tools::{BookTools, SharedTools};

const PREAMBLE: &str = "You are a literary expert with extensive knowledge of books across all \
genres and time periods. You use Google Books search results to find perfect matches based on \
user preferences, considering writing style, author reputation, thematic elements, and reader \
reviews.";

/// Book specialist. Capability set: search, details, similar-titles.
pub struct BookSpecialistTask {
    agent: Arc<dyn CompletionAgent>,
    tools: Arc<BookTools>,
    shared: Arc<SharedTools>,
}

impl BookSpecialistTask {
    pub fn new(
        agent: Arc<dyn CompletionAgent>,
        tools: Arc<BookTools>,
        shared: Arc<SharedTools>,
    ) -> Self {
        Self {
            agent,
            tools,
            shared,
        }
    }

    async fn gather_tool_output(&self, request: &str, genre: Option<&str>) -> String {
        let mut blocks = Vec::new();

        // Genre requests search the genre term itself; the category filter
        // on the raw request would otherwise throw away every hit.
        let (query, filter) = match genre {
            Some(genre) => (format!("{} books", genre), Some(genre)),
            None => (request.to_string(), None),
        };
        blocks.push(format!(
            "search_books({}):\n{}",
            query,
            self.tools.search_books(&query, filter).await
        ));

        let lower = request.to_lowercase();
        if lower.contains("similar") || lower.contains("like ") {
            blocks.push(format!(
                "find_similar_titles():\n{}",
                self.shared
                    .find_similar_titles(request, MediaType::Book)
                    .await
            ));
        }

        blocks.join("\n\n")
    }
}

#[async_trait]
impl Task for BookSpecialistTask {
    fn id(&self) -> &str {
        std::any::type_name::<Self>()
    }

    async fn run(&self, context: Context) -> crew_flow::Result<TaskResult> {
        info!("Starting book specialist task");
        let inputs = require_inputs(&context)?;

        let genre = match inputs.genre() {
            "Not specified" => None,
            genre => Some(genre),
        };
        let tool_output = self.gather_tool_output(&inputs.user_request, genre).await;

        let prompt = format!(
            "FIND BOOK RECOMMENDATIONS:\n\n\
             {}\n\n\
             TOOL RESULTS:\n{}\n\n\
             REQUIREMENTS:\n\
             - Select {} highly-rated books from the tool results that match the preferences\n\
             - Include diverse authors and styles\n\n\
             FOR EACH BOOK, PROVIDE:\n\
             - Title and author\n\
             - Publication year\n\
             - Genre classification\n\
             - Rating (out of 5)\n\
             - Brief description\n\
             - Why it matches user preferences\n\
             - 2-3 similar books\n\
             - Image/Cover URL (only if present in the tool results)\n\
             - Preview URL (only if present in the tool results)\n\n\
             Never invent URLs; if one is missing from the tool results, omit it.",
            inputs.preferences_block(),
            tool_output,
            inputs.num_recommendations,
        );

        let output = self
            .agent
            .complete(PREAMBLE, &prompt)
            .await
            .map_err(|e| TaskExecutionFailed(format!("Book specialist failed: {}", e)))?;

        info!("Book specialist produced candidate list");
        context.set(KEY_SPECIALIST, output).await;
        Ok(TaskResult::new(None, NextAction::Continue))
    }
}
