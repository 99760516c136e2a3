// SPDX-License-Identifier: MIT

//! Step implementations - adapters from the environment contract to
//! external capabilities
//!
//! Each handler is the only place its capability is invoked; the
//! orchestrator never calls a browser, AI provider, or HTTP endpoint
//! directly. Handlers report failure by returning false after logging
//! through the environment; nothing propagates past `execute`.

pub mod ai;
pub mod browser;
pub mod data;
pub mod timing;
pub mod webhook;

use async_trait::async_trait;
use std::collections::HashMap;
use std::error::Error;
use std::sync::Arc;

use crate::ai::AiProvider;
use crate::catalog::StepKind;
use crate::run::Environment;

/// Marker value stored in the resolved-output table for session-typed
/// ports; the live page handle only ever travels through the environment
pub const SESSION_MARKER: &str = "attached";

#[async_trait]
pub trait StepHandler: Send + Sync {
    fn kind(&self) -> StepKind;

    /// The handler body; any error it returns is caught at the `execute`
    /// boundary, logged, and turned into a false return
    async fn try_run(&self, env: &mut Environment) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Runs the step. The boolean is the sole authoritative failure
    /// signal; logged error lines are diagnostic only.
    async fn execute(&self, env: &mut Environment) -> bool {
        match self.try_run(env).await {
            Ok(()) => true,
            Err(e) => {
                env.log_error(format!("{} failed: {}", self.kind(), e));
                false
            }
        }
    }
}

/// Immutable-after-init map from step kind to handler
///
/// Constructed once and passed by parameter so tests can substitute stub
/// handlers for any subset of kinds.
pub struct StepRegistry {
    handlers: HashMap<StepKind, Arc<dyn StepHandler>>,
}

impl StepRegistry {
    pub fn new(handlers: Vec<Arc<dyn StepHandler>>) -> Self {
        let handlers = handlers.into_iter().map(|h| (h.kind(), h)).collect();
        Self { handlers }
    }

    pub fn get(&self, kind: StepKind) -> Option<Arc<dyn StepHandler>> {
        self.handlers.get(&kind).cloned()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Registry with every standard step wired to its live capability
pub fn standard_registry(ai: Arc<dyn AiProvider>, http: reqwest::Client) -> StepRegistry {
    StepRegistry::new(vec![
        Arc::new(browser::LaunchSession),
        Arc::new(browser::NavigateUrl),
        Arc::new(browser::FillField),
        Arc::new(browser::ClickElement),
        Arc::new(browser::WaitForElement),
        Arc::new(browser::ScrollToElement),
        Arc::new(browser::GetPageHtml),
        Arc::new(browser::ExtractElementText),
        Arc::new(data::HtmlToText),
        Arc::new(data::ReadJsonProperty),
        Arc::new(data::AddJsonProperty),
        Arc::new(ai::AiExtract::new(ai)),
        Arc::new(webhook::DeliverWebhook::new(http)),
        Arc::new(timing::Delay),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::DisabledProvider;

    #[test]
    fn test_standard_registry_covers_the_standard_catalog() {
        let registry = standard_registry(Arc::new(DisabledProvider), reqwest::Client::new());
        let catalog = crate::catalog::Catalog::standard();
        assert_eq!(registry.len(), catalog.len());

        for kind in [
            StepKind::LaunchSession,
            StepKind::NavigateUrl,
            StepKind::FillField,
            StepKind::ClickElement,
            StepKind::WaitForElement,
            StepKind::ScrollToElement,
            StepKind::GetPageHtml,
            StepKind::ExtractElementText,
            StepKind::HtmlToText,
            StepKind::AiExtract,
            StepKind::ReadJsonProperty,
            StepKind::AddJsonProperty,
            StepKind::DeliverWebhook,
            StepKind::Delay,
        ] {
            assert!(registry.get(kind).is_some(), "missing handler for {kind}");
        }
    }
}
