use super::{LlmSettings, Summarizer};
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Minimal OpenAI chat completions client. One request per call, no retries.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: Client,
    url: String,
    api_key: String,
    model: String,
    temperature: f32,
}

impl OpenAiClient {
    pub fn new(settings: &LlmSettings) -> Result<Self> {
        let api_key = settings
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                anyhow!(
                    "OpenAI API key must be provided via {}",
                    LlmSettings::API_KEY_ENV
                )
            })?;
        let base = settings
            .endpoint
            .clone()
            .unwrap_or_else(|| "https://api.openai.com".to_string());
        let url = format!("{}/v1/chat/completions", base.trim_end_matches('/'));
        let mut builder = Client::builder().user_agent("vulnscan/0.1");
        if let Some(secs) = settings.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder
            .build()
            .context("failed to build OpenAI HTTP client")?;
        Ok(Self {
            http,
            url,
            api_key,
            model: settings
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature: settings.temperature,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Summarizer for OpenAiClient {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        let payload = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.temperature,
        };

        let response = self
            .http
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .context("failed to call OpenAI chat completions API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("OpenAI API error ({}): {}", status, body);
        }

        let chat: ChatCompletionResponse = response
            .json()
            .await
            .context("failed to parse OpenAI response")?;
        let content = chat
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| anyhow!("OpenAI response missing message content"))?;
        Ok(content)
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn settings(url: String) -> LlmSettings {
        LlmSettings {
            api_key: Some("test-key".into()),
            endpoint: Some(url),
            timeout_secs: Some(5),
            ..LlmSettings::default()
        }
    }

    #[test]
    fn requires_api_key() {
        let err = OpenAiClient::new(&LlmSettings::default()).unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn uses_fixed_default_model() {
        let client = OpenAiClient::new(&settings("http://localhost".into())).unwrap();
        assert_eq!(client.model(), "gpt-3.5-turbo");
        assert_eq!(client.url, "http://localhost/v1/chat/completions");
    }

    #[tokio::test]
    #[ignore = "requires loopback networking"]
    async fn returns_trimmed_reply() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/chat/completions")
                .header("authorization", "Bearer test-key")
                .json_body_partial(r#"{"model":"gpt-3.5-turbo","temperature":0.7}"#);
            then.status(200).json_body(json!({
                "choices": [{"message": {"role": "assistant", "content": "  Close port 23.  "}}]
            }));
        });

        let client = OpenAiClient::new(&settings(server.base_url())).unwrap();
        let reply = client.complete("system", "nmap output").await.unwrap();
        assert_eq!(reply, "Close port 23.");
        mock.assert();
    }

    #[tokio::test]
    #[ignore = "requires loopback networking"]
    async fn surfaces_api_errors_without_retrying() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(429).body("quota exceeded");
        });

        let client = OpenAiClient::new(&settings(server.base_url())).unwrap();
        let err = client.complete("system", "prompt").await.unwrap_err();
        assert!(err.to_string().contains("OpenAI API error"));
        mock.assert_hits(1);
    }
}
