//! Language model backends.
//!
//! - **[`OllamaLlm`]** calls `/api/generate` on an Ollama instance with
//!   streaming disabled.
//! - **[`OpenAiLlm`]** calls an OpenAI-compatible `/v1/chat/completions`
//!   endpoint with the prompt as a single user message.
//!
//! Generation is not idempotent from the caller's point of view, so these
//! backends make exactly one attempt per call.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

pub use docvec_core::llm::LanguageModel;

use crate::config::LlmConfig;
use crate::http;

const OLLAMA_DEFAULT_URL: &str = "http://localhost:11434";
const OPENAI_DEFAULT_URL: &str = "https://api.openai.com";

pub struct OllamaLlm {
    client: reqwest::Client,
    url: String,
}

impl OllamaLlm {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        Ok(Self {
            client: http::client(config.timeout_secs)?,
            url: config
                .url
                .clone()
                .unwrap_or_else(|| OLLAMA_DEFAULT_URL.to_string()),
        })
    }
}

#[async_trait]
impl LanguageModel for OllamaLlm {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn generate(&self, prompt: &str, model: &str, temperature: f32) -> Result<String> {
        let body = serde_json::json!({
            "model": model,
            "prompt": prompt,
            "stream": false,
            "options": { "temperature": temperature },
        });
        debug!(model, prompt_chars = prompt.chars().count(), "ollama generate");

        let json = http::post_json_with_retry(
            &self.client,
            "Ollama",
            &format!("{}/api/generate", self.url.trim_end_matches('/')),
            None,
            &body,
            0,
        )
        .await?;
        parse_ollama_generation(&json)
    }
}

fn parse_ollama_generation(json: &serde_json::Value) -> Result<String> {
    json.get("response")
        .and_then(|r| r.as_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("Invalid Ollama response: missing response text"))
}

/// Chat-completions backend. Requires `OPENAI_API_KEY`.
pub struct OpenAiLlm {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl OpenAiLlm {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow!("OPENAI_API_KEY environment variable not set"))?;
        Ok(Self {
            client: http::client(config.timeout_secs)?,
            url: config
                .url
                .clone()
                .unwrap_or_else(|| OPENAI_DEFAULT_URL.to_string()),
            api_key,
        })
    }
}

#[async_trait]
impl LanguageModel for OpenAiLlm {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(&self, prompt: &str, model: &str, temperature: f32) -> Result<String> {
        let body = serde_json::json!({
            "model": model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": temperature,
        });
        debug!(model, prompt_chars = prompt.chars().count(), "openai generate");

        let json = http::post_json_with_retry(
            &self.client,
            "OpenAI",
            &format!("{}/v1/chat/completions", self.url.trim_end_matches('/')),
            Some(&self.api_key),
            &body,
            0,
        )
        .await?;
        parse_chat_completion(&json)
    }
}

fn parse_chat_completion(json: &serde_json::Value) -> Result<String> {
    json.pointer("/choices/0/message/content")
        .and_then(|c| c.as_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("Invalid OpenAI response: missing choices[0].message.content"))
}

/// Create the [`LanguageModel`] named by `config.provider`.
pub fn create_llm(config: &LlmConfig) -> Result<Arc<dyn LanguageModel>> {
    match config.provider.as_str() {
        "ollama" => Ok(Arc::new(OllamaLlm::new(config)?)),
        "openai" => Ok(Arc::new(OpenAiLlm::new(config)?)),
        other => bail!("Unknown llm provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_ollama_generation() {
        let json = json!({ "model": "llama3", "response": "Paris.", "done": true });
        assert_eq!(parse_ollama_generation(&json).unwrap(), "Paris.");
        assert!(parse_ollama_generation(&json!({ "error": "model not found" })).is_err());
    }

    #[test]
    fn parses_chat_completion() {
        let json = json!({
            "choices": [{ "index": 0, "message": { "role": "assistant", "content": "42" } }]
        });
        assert_eq!(parse_chat_completion(&json).unwrap(), "42");
        assert!(parse_chat_completion(&json!({ "choices": [] })).is_err());
    }

    #[test]
    fn factory_builds_ollama() {
        let llm = create_llm(&LlmConfig::default()).unwrap();
        assert_eq!(llm.name(), "ollama");
        let bad = LlmConfig {
            provider: "magic".to_string(),
            ..LlmConfig::default()
        };
        assert!(create_llm(&bad).is_err());
    }
}
