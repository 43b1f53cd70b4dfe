use serde::{Deserialize, Serialize};

use crate::model::MediaType;
use crew_flow::{Context, FlowError};

/// Context keys shared between pipeline tasks.
pub const KEY_INPUTS: &str = "task_inputs";
pub const KEY_ANALYSIS: &str = "analysis_output";
pub const KEY_SPECIALIST: &str = "specialist_output";
pub const KEY_RESEARCH: &str = "research_output";

/// Validated per-request parameters interpolated into every task prompt.
///
/// All fields are present before any template is rendered, so a prompt can
/// never fail interpolation halfway through a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskInputs {
    pub user_request: String,
    pub media_type: MediaType,
    pub genre: Option<String>,
    pub mood: Option<String>,
    pub timeframe: Option<String>,
    pub num_recommendations: usize,
    pub personalization_context: Option<String>,
}

impl TaskInputs {
    pub fn genre(&self) -> &str {
        or_not_specified(&self.genre)
    }

    pub fn mood(&self) -> &str {
        or_not_specified(&self.mood)
    }

    pub fn timeframe(&self) -> &str {
        or_not_specified(&self.timeframe)
    }

    pub fn personalization(&self) -> &str {
        match &self.personalization_context {
            Some(ctx) if !ctx.trim().is_empty() => ctx,
            _ => "No personalization context",
        }
    }

    /// The preferences block shared by every specialist prompt.
    pub fn preferences_block(&self) -> String {
        format!(
            "User Preferences:\n\
             - Media Type: {}\n\
             - Genre: {}\n\
             - Mood: {}\n\
             - Timeframe: {}\n\
             - Specific Request: {}\n\
             - Number Needed: {}",
            self.media_type,
            self.genre(),
            self.mood(),
            self.timeframe(),
            self.user_request,
            self.num_recommendations,
        )
    }
}

fn or_not_specified(value: &Option<String>) -> &str {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => "Not specified",
    }
}

/// Fetch the request inputs every task depends on.
pub(crate) fn require_inputs(context: &Context) -> crew_flow::Result<TaskInputs> {
    context
        .get_sync(KEY_INPUTS)
        .ok_or_else(|| FlowError::ContextValueMissing(KEY_INPUTS.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_for_missing_fields() {
        let inputs = TaskInputs {
            user_request: "something fun".to_string(),
            media_type: MediaType::Movie,
            genre: None,
            mood: Some("  ".to_string()),
            timeframe: Some("90s".to_string()),
            num_recommendations: 3,
            personalization_context: None,
        };

        assert_eq!(inputs.genre(), "Not specified");
        assert_eq!(inputs.mood(), "Not specified");
        assert_eq!(inputs.timeframe(), "90s");
        assert_eq!(inputs.personalization(), "No personalization context");

        let block = inputs.preferences_block();
        assert!(block.contains("Media Type: movie"));
        assert!(block.contains("Number Needed: 3"));
    }
}
