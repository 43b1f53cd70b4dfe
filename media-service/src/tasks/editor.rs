use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crew_flow::FlowError::TaskExecutionFailed;
use crew_flow::{Context, NextAction, Task, TaskResult};

use super::types::{require_inputs, KEY_ANALYSIS, KEY_RESEARCH, KEY_SPECIALIST};
use super::utils::CompletionAgent;

const PREAMBLE: &str = "You are a senior editor who ensures all recommendations are \
high-quality, relevant, and personalized. You check for consistency, remove duplicates, add \
personalization touches, and ensure the final list is perfectly tailored to the user's stated \
preferences. When users request impossible combinations, you identify the best compromise and \
craft clear, empathetic explanations of why certain aspects cannot be met.";

/// Terminal stage in every path: merges all preceding task output into the
/// final JSON answer. Deliberately has no tools; this is a pure text
/// transformation over supplied context.
pub struct EditorTask {
    agent: Arc<dyn CompletionAgent>,
}

impl EditorTask {
    pub fn new(agent: Arc<dyn CompletionAgent>) -> Self {
        Self { agent }
    }
}

#[async_trait]
impl Task for EditorTask {
    fn id(&self) -> &str {
        std::any::type_name::<Self>()
    }

    async fn run(&self, context: Context) -> crew_flow::Result<TaskResult> {
        info!("Starting editor task");
        let inputs = require_inputs(&context)?;

        let mut context_blocks = String::new();
        if let Some(analysis) = context.get_sync::<String>(KEY_ANALYSIS) {
            context_blocks.push_str(&format!("REQUEST ANALYSIS:\n{}\n\n", analysis));
        }
        if let Some(specialist) = context.get_sync::<String>(KEY_SPECIALIST) {
            context_blocks.push_str(&format!("SPECIALIST RECOMMENDATIONS:\n{}\n\n", specialist));
        }
        if let Some(research) = context.get_sync::<String>(KEY_RESEARCH) {
            context_blocks.push_str(&format!("RESEARCH INSIGHTS:\n{}\n\n", research));
        }

        let prompt = format!(
            "FINALIZE RECOMMENDATIONS:\n\n\
             User Request: {}\n\
             Personalization Context: {}\n\n\
             {}\
             COMPILE AND REFINE:\n\
             - Combine recommendations from all specialists\n\
             - Remove duplicates and ensure diversity\n\
             - Add personalized explanations\n\
             - Rank by relevance and quality\n\
             - Incorporate research insights\n\n\
             IMPOSSIBLE/CONTRADICTORY REQUEST HANDLING:\n\
             If the analysis detected contradictions or you identify impossible requirements, \
             set \"is_compromise\": true on affected items and add a \"compromise_explanation\" \
             field explaining what was impossible, what was prioritized, and why the \
             recommendation is still the best match.\n\n\
             OUTPUT REQUIREMENTS:\n\
             - Valid JSON array only, no other text\n\
             - Exactly {} total recommendations\n\
             - ONLY use image_url, trailer_url and preview_url values present in the \
             specialist output; if a URL is missing, set it to null. NEVER invent URLs.\n\n\
             JSON FORMAT:\n\
             [\n\
               {{\n\
                 \"title\": \"Item Title\",\n\
                 \"type\": \"{}\",\n\
                 \"year\": \"2023\",\n\
                 \"genre\": \"Genre1, Genre2\",\n\
                 \"rating\": 8.5,\n\
                 \"description\": \"Brief description\",\n\
                 \"why_recommended\": \"Personalized explanation\",\n\
                 \"is_compromise\": false,\n\
                 \"compromise_explanation\": \"Only when is_compromise is true\",\n\
                 \"similar_titles\": [\"Title1\", \"Title2\", \"Title3\"],\n\
                 \"image_url\": \"https://... or null\",\n\
                 \"trailer_url\": \"https://... or null\",\n\
                 \"preview_url\": \"https://... or null\",\n\
                 \"seasons\": \"3 (if TV)\",\n\
                 \"episodes\": \"24 (if TV)\"\n\
               }}\n\
             ]",
            inputs.user_request,
            inputs.personalization(),
            context_blocks,
            inputs.num_recommendations,
            inputs.media_type,
        );

        let answer = self
            .agent
            .complete(PREAMBLE, &prompt)
            .await
            .map_err(|e| TaskExecutionFailed(format!("Editor failed: {}", e)))?;

        info!("Editor produced final answer");
        Ok(TaskResult::new(Some(answer), NextAction::End))
    }
}
