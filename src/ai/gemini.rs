// SPDX-License-Identifier: MIT

//! Gemini-backed extraction provider

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::env;
use std::error::Error;

use super::AiProvider;

/// Google Gemini extraction provider
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    model_name: String,
}

impl GeminiProvider {
    /// Create a new GeminiProvider
    ///
    /// Requires `GOOGLE_API_KEY` environment variable to be set.
    pub fn new(model_name: String) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let api_key = env::var("GOOGLE_API_KEY").map_err(|_| "GOOGLE_API_KEY must be set")?;
        Ok(Self {
            client: Client::new(),
            api_key,
            model_name,
        })
    }
}

#[async_trait]
impl AiProvider for GeminiProvider {
    async fn extract(
        &self,
        content: &str,
        prompt: &str,
    ) -> Result<Value, Box<dyn Error + Send + Sync>> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.model_name, self.api_key
        );

        let instruction = format!(
            "{prompt}\n\nRespond with JSON only, no prose.\n\nContent:\n{content}"
        );
        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": instruction }]
            }],
            "generationConfig": {
                "responseMimeType": "application/json"
            }
        });

        log::debug!("Gemini extraction request for model {}", self.model_name);

        let resp = self.client.post(&url).json(&body).send().await?;

        if !resp.status().is_success() {
            let text = resp.text().await?;
            return Err(format!("Gemini API error: {}", text).into());
        }

        let resp_json: Value = resp.json().await?;

        let candidates = resp_json["candidates"]
            .as_array()
            .ok_or("No candidates in response")?;
        let candidate = candidates.first().ok_or("Empty candidates")?;

        if let Some(finish_reason) = candidate.get("finishReason").and_then(|v| v.as_str()) {
            if finish_reason == "SAFETY" {
                return Err("Gemini blocked response due to safety filters.".into());
            }
        }

        let text = candidate["content"]["parts"][0]["text"]
            .as_str()
            .ok_or("No text part in Gemini response")?;

        let data: Value = serde_json::from_str(text.trim())
            .map_err(|e| format!("Gemini did not return valid JSON: {e}"))?;
        Ok(data)
    }
}
