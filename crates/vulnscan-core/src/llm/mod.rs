mod openai;
mod settings;

use std::{str::FromStr, sync::Arc};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use tracing::warn;

pub use openai::OpenAiClient;
pub use settings::LlmSettings;

/// Chat-style completion backend used to turn scan output into prose.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Send one system + user message pair and return the reply text.
    async fn complete(&self, system: &str, prompt: &str) -> Result<String>;
}

/// Offline backend, selected with `VULNSCAN_LLM_PROVIDER=noop`.
#[derive(Debug, Default, Clone)]
pub struct NoopSummarizer;

#[async_trait]
impl Summarizer for NoopSummarizer {
    async fn complete(&self, _system: &str, _prompt: &str) -> Result<String> {
        Ok("Automated analysis is disabled (noop provider); review the raw output above.".into())
    }
}

/// Stand-in when the real client could not be built; every call fails so the
/// caller falls back to its fixed narrative.
#[derive(Debug, Clone)]
pub struct UnavailableSummarizer {
    reason: String,
}

impl UnavailableSummarizer {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl Summarizer for UnavailableSummarizer {
    async fn complete(&self, _system: &str, _prompt: &str) -> Result<String> {
        Err(anyhow!("summarizer unavailable: {}", self.reason))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAi,
    Noop,
}

impl FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "noop" => Ok(Self::Noop),
            other => bail!("unsupported LLM provider `{other}` (expected openai or noop)"),
        }
    }
}

/// Build the configured backend. A missing credential does not fail here: the
/// returned summarizer errors on use instead.
pub fn build_summarizer(settings: &LlmSettings) -> Arc<dyn Summarizer> {
    match settings.provider {
        ProviderKind::Noop => Arc::new(NoopSummarizer),
        ProviderKind::OpenAi => match OpenAiClient::new(settings) {
            Ok(client) => Arc::new(client),
            Err(err) => {
                warn!(error = %err, "OpenAI client unavailable; narratives will use the fallback text");
                Arc::new(UnavailableSummarizer::new(err.to_string()))
            }
        },
    }
}
