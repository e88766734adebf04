//! Language model trait.
//!
//! Generation backends (Ollama, OpenAI-compatible chat) implement
//! [`LanguageModel`] in the `docvec` app crate. The orchestrator only
//! depends on this trait, so tests can swap in a recording fake.

use anyhow::Result;
use async_trait::async_trait;

/// A text-completion backend.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Short backend identifier used in logs (e.g. `"ollama"`).
    fn name(&self) -> &str;

    /// Generate a completion for `prompt` using `model` at `temperature`.
    ///
    /// Returns the generated text verbatim.
    async fn generate(&self, prompt: &str, model: &str, temperature: f32) -> Result<String>;
}
