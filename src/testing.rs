//! Shared test doubles for the LLM capability.

use async_trait::async_trait;

use crate::providers::LlmClient;

/// Returns the same canned response for every completion.
pub struct FixedLlm {
    response: String,
}

impl FixedLlm {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
        }
    }
}

#[async_trait]
impl LlmClient for FixedLlm {
    async fn complete(&self, _system_prompt: &str, _user_message: &str) -> anyhow::Result<String> {
        Ok(self.response.clone())
    }
}

/// Fails every completion, for exercising fallback paths.
pub struct FailingLlm;

#[async_trait]
impl LlmClient for FailingLlm {
    async fn complete(&self, _system_prompt: &str, _user_message: &str) -> anyhow::Result<String> {
        Err(anyhow::anyhow!("LLM unavailable"))
    }
}
