// SPDX-License-Identifier: MIT

//! AI extraction provider seam

pub mod gemini;

pub use gemini::GeminiProvider;

use async_trait::async_trait;
use serde_json::Value;
use std::error::Error;

/// Turns page content plus an instruction into structured JSON
#[async_trait]
pub trait AiProvider: Send + Sync {
    async fn extract(
        &self,
        content: &str,
        prompt: &str,
    ) -> Result<Value, Box<dyn Error + Send + Sync>>;
}

/// Provider used when no API key is configured; every extraction fails
/// with a clear message, which fails the step, not the process
pub struct DisabledProvider;

#[async_trait]
impl AiProvider for DisabledProvider {
    async fn extract(
        &self,
        _content: &str,
        _prompt: &str,
    ) -> Result<Value, Box<dyn Error + Send + Sync>> {
        Err("AI extraction is not configured (GOOGLE_API_KEY not set)".into())
    }
}
