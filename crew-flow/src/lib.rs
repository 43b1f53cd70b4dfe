pub mod context;
pub mod error;
pub mod pipeline;
pub mod task;

// Re-export commonly used types
pub use context::Context;
pub use error::{FlowError, Result};
pub use pipeline::{Pipeline, PipelineBuilder};
pub use task::{NextAction, Task, TaskResult};

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct TestTask {
        id: String,
    }

    #[async_trait]
    impl Task for TestTask {
        fn id(&self) -> &str {
            &self.id
        }

        async fn run(&self, context: Context) -> Result<TaskResult> {
            let input: String = context.get("input").await.unwrap_or_default();
            context.set("output", format!("Processed: {}", input)).await;

            Ok(TaskResult::new(
                Some("Task completed".to_string()),
                NextAction::End,
            ))
        }
    }

    struct AppendTask {
        id: String,
        ends: bool,
    }

    #[async_trait]
    impl Task for AppendTask {
        fn id(&self) -> &str {
            &self.id
        }

        async fn run(&self, context: Context) -> Result<TaskResult> {
            let mut trail: Vec<String> = context.get("trail").await.unwrap_or_default();
            trail.push(self.id.clone());
            context.set("trail", &trail).await;

            let action = if self.ends {
                NextAction::End
            } else {
                NextAction::Continue
            };
            Ok(TaskResult::new(Some(self.id.clone()), action))
        }
    }

    #[tokio::test]
    async fn test_simple_pipeline_execution() {
        let task = Arc::new(TestTask {
            id: "test_task".to_string(),
        });

        let pipeline = PipelineBuilder::new("test_pipeline").add_task(task).build();

        let context = Context::new();
        context.set("input", "Hello, World!").await;

        let response = pipeline.execute(context.clone()).await.unwrap();
        assert_eq!(response.as_deref(), Some("Task completed"));

        let output: String = context.get("output").await.unwrap();
        assert_eq!(output, "Processed: Hello, World!");
    }

    #[tokio::test]
    async fn test_tasks_run_in_order_and_end_stops_early() {
        let pipeline = PipelineBuilder::new("ordered")
            .add_task(Arc::new(AppendTask {
                id: "first".into(),
                ends: false,
            }))
            .add_task(Arc::new(AppendTask {
                id: "second".into(),
                ends: true,
            }))
            .add_task(Arc::new(AppendTask {
                id: "never".into(),
                ends: false,
            }))
            .build();

        let context = Context::new();
        let response = pipeline.execute(context.clone()).await.unwrap();

        // Last response wins; the task after End never ran.
        assert_eq!(response.as_deref(), Some("second"));
        let trail: Vec<String> = context.get("trail").await.unwrap();
        assert_eq!(trail, vec!["first".to_string(), "second".to_string()]);
    }

    #[tokio::test]
    async fn test_context_roundtrip() {
        let context = Context::new();
        context.set("k", 42u32).await;
        assert_eq!(context.get::<u32>("k").await, Some(42));
        assert_eq!(context.get_sync::<u32>("k"), Some(42));

        context.remove("k").await;
        assert_eq!(context.get::<u32>("k").await, None);
    }
}
