use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crew_flow::FlowError::TaskExecutionFailed;
use crew_flow::{Context, NextAction, Task, TaskResult};

use super::types::{require_inputs, KEY_RESEARCH};
use super::utils::CompletionAgent;
use crate::tools::SharedTools;

const PREAMBLE: &str = "You are a research expert who finds additional context, recent reviews, \
trending information, and cultural insights about recommended media to provide comprehensive \
recommendations.";

/// Research stage, appended only when the request carries temporal or
/// novelty keywords. Capability set: similar-titles, news-search,
/// trending-search.
pub struct ResearchTask {
    agent: Arc<dyn CompletionAgent>,
    shared: Arc<SharedTools>,
}

impl ResearchTask {
    pub fn new(agent: Arc<dyn CompletionAgent>, shared: Arc<SharedTools>) -> Self {
        Self { agent, shared }
    }
}

#[async_trait]
impl Task for ResearchTask {
    fn id(&self) -> &str {
        std::any::type_name::<Self>()
    }

    async fn run(&self, context: Context) -> crew_flow::Result<TaskResult> {
        info!("Starting research task");
        let inputs = require_inputs(&context)?;

        let news = self.shared.search_news(&inputs.user_request).await;
        let trending = self.shared.get_trending_media(inputs.media_type).await;

        let prompt = format!(
            "RESEARCH ADDITIONAL CONTEXT:\n\n\
             User Request: {}\n\
             Media Type: {}\n\n\
             TOOL RESULTS:\n\
             {}\n\n{}\n\n\
             PROVIDE:\n\
             - Summary of relevant trends\n\
             - Notable news or updates\n\
             - Cultural context insights\n\n\
             Keep the summary concise and focused on information that enhances \
             recommendation quality.",
            inputs.user_request, inputs.media_type, news, trending,
        );

        let summary = self
            .agent
            .complete(PREAMBLE, &prompt)
            .await
            .map_err(|e| TaskExecutionFailed(format!("Research failed: {}", e)))?;

        info!("Research summary complete");
        context.set(KEY_RESEARCH, summary).await;
        Ok(TaskResult::new(None, NextAction::Continue))
    }
}
