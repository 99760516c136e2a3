// SPDX-License-Identifier: MIT

//! Webhook delivery step

use async_trait::async_trait;
use reqwest::Client;
use std::error::Error;
use std::time::Duration;
use url::Url;

use super::StepHandler;
use crate::catalog::StepKind;
use crate::run::Environment;

const DELIVERY_TIMEOUT: Duration = Duration::from_secs(30);

/// POSTs the step's JSON body to a target URL
pub struct DeliverWebhook {
    client: Client,
}

impl DeliverWebhook {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StepHandler for DeliverWebhook {
    fn kind(&self) -> StepKind {
        StepKind::DeliverWebhook
    }

    async fn try_run(&self, env: &mut Environment) -> Result<(), Box<dyn Error + Send + Sync>> {
        let target = env.string_input("targetUrl");
        let url = Url::parse(&target).map_err(|e| format!("invalid targetUrl '{target}': {e}"))?;
        let body = env.json_input("body");

        let resp = self
            .client
            .post(url)
            .json(&body)
            .timeout(DELIVERY_TIMEOUT)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(format!("webhook returned {status}").into());
        }

        env.log_info(format!("delivered to {target} ({status})"));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::error::SessionError;
    use crate::graph::Node;
    use crate::run::{LogLevel, SessionDriver, SessionSlot};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Arc;

    struct NeverDriver;

    #[async_trait]
    impl SessionDriver for NeverDriver {
        async fn open(&self) -> Result<Box<dyn crate::run::PageSession>, SessionError> {
            Err(SessionError::Launch("not available in tests".to_string()))
        }
    }

    fn env_with(node: Node) -> Environment {
        let catalog = Catalog::standard();
        let descriptor = catalog.lookup(StepKind::DeliverWebhook).unwrap();
        let slot = Arc::new(SessionSlot::new(Arc::new(NeverDriver)));
        Environment::new(node, descriptor, HashMap::new(), slot)
    }

    #[tokio::test]
    async fn test_invalid_url_fails_without_sending() {
        let step = DeliverWebhook::new(Client::new());
        let node = Node::new("hook", StepKind::DeliverWebhook)
            .with_input("targetUrl", "not a url")
            .with_input("body", json!({"a": 1}));
        let mut env = env_with(node);

        assert!(!step.execute(&mut env).await);
        let (_, log) = env.into_parts();
        assert!(log
            .iter()
            .any(|l| l.level == LogLevel::Error && l.message.contains("invalid targetUrl")));
    }

    #[tokio::test]
    async fn test_empty_url_fails() {
        let step = DeliverWebhook::new(Client::new());
        let node =
            Node::new("hook", StepKind::DeliverWebhook).with_input("body", json!({"a": 1}));
        let mut env = env_with(node);

        assert!(!step.execute(&mut env).await);
    }
}
