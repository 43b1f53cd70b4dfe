use async_trait::async_trait;
use rig::client::CompletionClient;
use rig::completion::Chat;
use rig::providers::openrouter;

/// Seam to the LLM: each pipeline task hands over a role preamble and a
/// rendered prompt, and gets text back. Tests substitute scripted agents.
#[async_trait]
pub trait CompletionAgent: Send + Sync {
    async fn complete(&self, preamble: &str, prompt: &str) -> anyhow::Result<String>;
}

/// OpenRouter-backed agent. Model and temperature are passed through
/// opaquely from configuration.
pub struct OpenRouterAgent {
    model: String,
    temperature: f64,
}

impl OpenRouterAgent {
    pub fn new(model: impl Into<String>, temperature: f64) -> Self {
        Self {
            model: model.into(),
            temperature,
        }
    }
}

#[async_trait]
impl CompletionAgent for OpenRouterAgent {
    async fn complete(&self, preamble: &str, prompt: &str) -> anyhow::Result<String> {
        let api_key = std::env::var("OPENROUTER_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENROUTER_API_KEY not set"))?;
        let client = openrouter::Client::new(&api_key);
        let agent = client
            .agent(&self.model)
            .preamble(preamble)
            .temperature(self.temperature)
            .build();

        let reply = agent
            .chat(prompt, vec![])
            .await
            .map_err(|e| anyhow::anyhow!("LLM chat failed: {}", e))?;
        Ok(reply.trim().to_string())
    }
}
