use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use tracing::warn;

use super::ProviderKind;

/// Environment-driven configuration for the summarisation client.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmSettings {
    pub provider: ProviderKind,
    pub api_key: Option<String>,
    /// Vulnerability database credential. Only checked for presence.
    pub vulners_api_key: Option<String>,
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub temperature: f32,
    pub timeout_secs: Option<u64>,
    pub max_input_chars: usize,
}

impl LlmSettings {
    pub const API_KEY_ENV: &'static str = "OPENAI_API_KEY";
    pub const VULNERS_KEY_ENV: &'static str = "VULNERS_API_KEY";
    const PROVIDER_ENV: &'static str = "VULNSCAN_LLM_PROVIDER";
    const ENDPOINT_ENV: &'static str = "VULNSCAN_LLM_ENDPOINT";
    const MODEL_ENV: &'static str = "VULNSCAN_LLM_MODEL";
    const TEMPERATURE_ENV: &'static str = "VULNSCAN_LLM_TEMPERATURE";
    const TIMEOUT_ENV: &'static str = "VULNSCAN_LLM_TIMEOUT_SECS";
    const MAX_INPUT_ENV: &'static str = "VULNSCAN_LLM_MAX_INPUT_CHARS";

    pub const DEFAULT_TEMPERATURE: f32 = 0.7;
    pub const DEFAULT_MAX_INPUT_CHARS: usize = 12_000;

    /// Load settings from environment variables.
    ///
    /// * `OPENAI_API_KEY`: chat completions credential (warned about when absent).
    /// * `VULNERS_API_KEY`: vulnerability database credential (warned about when absent).
    /// * `VULNSCAN_LLM_PROVIDER`: `openai` (default) or `noop`.
    pub fn from_env() -> Result<Self> {
        let settings = Self::from_map(std::env::vars().collect())?;
        for name in settings.missing_credentials() {
            warn!("{name} not found in the environment");
        }
        Ok(settings)
    }

    fn from_map(vars: HashMap<String, String>) -> Result<Self> {
        let get = |key: &str| {
            vars.get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let provider = match get(Self::PROVIDER_ENV) {
            Some(raw) => raw
                .parse::<ProviderKind>()
                .with_context(|| format!("invalid {} value", Self::PROVIDER_ENV))?,
            None => ProviderKind::OpenAi,
        };
        let temperature = match get(Self::TEMPERATURE_ENV) {
            Some(raw) => raw.parse::<f32>().with_context(|| {
                format!("invalid {} value `{raw}`", Self::TEMPERATURE_ENV)
            })?,
            None => Self::DEFAULT_TEMPERATURE,
        };
        if !(0.0..=2.0).contains(&temperature) {
            bail!(
                "{} must be within 0.0..=2.0 (got {temperature})",
                Self::TEMPERATURE_ENV
            );
        }
        let timeout_secs = get(Self::TIMEOUT_ENV).and_then(|v| v.parse::<u64>().ok());
        let max_input_chars = get(Self::MAX_INPUT_ENV)
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(Self::DEFAULT_MAX_INPUT_CHARS);

        Ok(Self {
            provider,
            api_key: get(Self::API_KEY_ENV),
            vulners_api_key: get(Self::VULNERS_KEY_ENV),
            endpoint: get(Self::ENDPOINT_ENV),
            model: get(Self::MODEL_ENV),
            temperature,
            timeout_secs,
            max_input_chars,
        })
    }

    /// Names of credential variables that were not provided.
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.vulners_api_key.is_none() {
            missing.push(Self::VULNERS_KEY_ENV);
        }
        if self.provider != ProviderKind::Noop && self.api_key.is_none() {
            missing.push(Self::API_KEY_ENV);
        }
        missing
    }
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: ProviderKind::OpenAi,
            api_key: None,
            vulners_api_key: None,
            endpoint: None,
            model: None,
            temperature: Self::DEFAULT_TEMPERATURE,
            timeout_secs: None,
            max_input_chars: Self::DEFAULT_MAX_INPUT_CHARS,
        }
    }
}
