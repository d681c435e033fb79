pub mod error;
pub mod json;
pub mod openai;

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAI,
    Scripted,
}

#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    fn provider(&self) -> Provider;

    /// Returns the raw text of the first completion choice.
    async fn complete(&self, request: CompletionRequest) -> anyhow::Result<String>;
}

/// Replays a fixed reply. Used for offline runs and tests.
#[derive(Debug, Clone)]
pub struct ScriptedClient {
    reply: Result<String, String>,
}

impl ScriptedClient {
    pub fn replying(text: impl Into<String>) -> Self {
        Self {
            reply: Ok(text.into()),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            reply: Err(message.into()),
        }
    }
}

#[async_trait::async_trait]
impl LlmClient for ScriptedClient {
    fn provider(&self) -> Provider {
        Provider::Scripted
    }

    async fn complete(&self, _request: CompletionRequest) -> anyhow::Result<String> {
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(message) => Err(anyhow::anyhow!("{message}")),
        }
    }
}
