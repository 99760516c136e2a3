//! Timing steps

use async_trait::async_trait;
use std::error::Error;
use std::time::Duration;

use super::StepHandler;
use crate::catalog::StepKind;
use crate::run::Environment;

const MAX_DELAY_SECS: f64 = 300.0;

/// Pauses the run for a bounded number of seconds
pub struct Delay;

#[async_trait]
impl StepHandler for Delay {
    fn kind(&self) -> StepKind {
        StepKind::Delay
    }

    async fn try_run(&self, env: &mut Environment) -> Result<(), Box<dyn Error + Send + Sync>> {
        let seconds = env.number_input("seconds");
        if seconds < 0.0 {
            return Err(format!("seconds must not be negative, got {seconds}").into());
        }
        let seconds = seconds.min(MAX_DELAY_SECS);

        tokio::time::sleep(Duration::from_secs_f64(seconds)).await;
        env.log_info(format!("waited {seconds}s"));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::error::SessionError;
    use crate::graph::Node;
    use crate::run::{SessionDriver, SessionSlot};
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
        let descriptor = catalog.lookup(StepKind::Delay).unwrap();
        let slot = Arc::new(SessionSlot::new(Arc::new(NeverDriver)));
        Environment::new(node, descriptor, HashMap::new(), slot)
    }

    #[tokio::test]
    async fn test_zero_delay_succeeds() {
        let node = Node::new("wait", StepKind::Delay).with_input("seconds", json!(0));
        let mut env = env_with(node);
        assert!(Delay.execute(&mut env).await);
    }

    #[tokio::test]
    async fn test_negative_delay_fails() {
        let node = Node::new("wait", StepKind::Delay).with_input("seconds", json!(-1));
        let mut env = env_with(node);
        assert!(!Delay.execute(&mut env).await);
    }
}
