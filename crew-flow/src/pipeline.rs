use std::sync::Arc;

use tracing::debug;

use crate::{
    context::Context,
    error::Result,
    task::{NextAction, Task},
};

/// An ordered sequence of tasks executed one after another.
///
/// Later tasks consume the output of earlier ones through the shared
/// [`Context`], so execution order is a correctness requirement here, not an
/// optimization. A task returning [`NextAction::End`] stops the run early.
pub struct Pipeline {
    pub id: String,
    tasks: Vec<Arc<dyn Task>>,
}

impl Pipeline {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tasks: Vec::new(),
        }
    }

    pub fn add_task(&mut self, task: Arc<dyn Task>) {
        self.tasks.push(task);
    }

    pub fn task_ids(&self) -> Vec<&str> {
        self.tasks.iter().map(|t| t.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Execute every task in order against the shared context.
    ///
    /// Returns the last non-empty response produced by any task, which by
    /// pipeline construction is the final (editor) task's answer.
    pub async fn execute(&self, context: Context) -> Result<Option<String>> {
        let mut last_response: Option<String> = None;

        for task in &self.tasks {
            debug!(pipeline = %self.id, task = task.id(), "executing pipeline task");
            let result = task.run(context.clone()).await?;

            if result.response.is_some() {
                last_response = result.response;
            }

            match result.next_action {
                NextAction::Continue => continue,
                NextAction::End => break,
            }
        }

        Ok(last_response)
    }
}

/// Builder for creating pipelines
pub struct PipelineBuilder {
    pipeline: Pipeline,
}

impl PipelineBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            pipeline: Pipeline::new(id),
        }
    }

    pub fn add_task(mut self, task: Arc<dyn Task>) -> Self {
        self.pipeline.add_task(task);
        self
    }

    pub fn build(self) -> Pipeline {
        self.pipeline
    }
}
