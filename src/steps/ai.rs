// SPDX-License-Identifier: MIT

//! AI-assisted extraction step

use async_trait::async_trait;
use std::error::Error;
use std::sync::Arc;

use super::StepHandler;
use crate::ai::AiProvider;
use crate::catalog::StepKind;
use crate::run::Environment;

/// Extracts structured data from page content through an [`AiProvider`]
pub struct AiExtract {
    provider: Arc<dyn AiProvider>,
}

impl AiExtract {
    pub fn new(provider: Arc<dyn AiProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl StepHandler for AiExtract {
    fn kind(&self) -> StepKind {
        StepKind::AiExtract
    }

    async fn try_run(&self, env: &mut Environment) -> Result<(), Box<dyn Error + Send + Sync>> {
        let content = env.string_input("content");
        if content.is_empty() {
            return Err("content input is empty".into());
        }
        let prompt = env.string_input("prompt");
        if prompt.is_empty() {
            return Err("prompt input is empty".into());
        }

        let data = self.provider.extract(&content, &prompt).await?;
        env.log_info("extraction returned structured data");
        env.set_output("data", data);
        Ok(())
    }
}
