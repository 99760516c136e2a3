// SPDX-License-Identifier: MIT

//! Browser session steps
//!
//! These handlers drive the run's single page session through the
//! environment; they never hold the handle past their return. Every
//! session-consuming step re-emits the session marker so downstream
//! session edges resolve.

use async_trait::async_trait;
use serde_json::json;
use std::error::Error;

use super::{StepHandler, SESSION_MARKER};
use crate::catalog::StepKind;
use crate::run::Environment;

/// Opens the run's session and navigates to the starting URL
pub struct LaunchSession;

#[async_trait]
impl StepHandler for LaunchSession {
    fn kind(&self) -> StepKind {
        StepKind::LaunchSession
    }

    async fn try_run(&self, env: &mut Environment) -> Result<(), Box<dyn Error + Send + Sync>> {
        let url = env.string_input("websiteUrl");
        if url.is_empty() {
            return Err("websiteUrl input is empty".into());
        }

        let handle = env.acquire_session().await?;
        handle.lock().await.goto(&url).await?;

        env.log_info(format!("session opened at {url}"));
        env.set_output("session", json!(SESSION_MARKER));
        Ok(())
    }
}

pub struct NavigateUrl;

#[async_trait]
impl StepHandler for NavigateUrl {
    fn kind(&self) -> StepKind {
        StepKind::NavigateUrl
    }

    async fn try_run(&self, env: &mut Environment) -> Result<(), Box<dyn Error + Send + Sync>> {
        let url = env.string_input("url");
        if url.is_empty() {
            return Err("url input is empty".into());
        }

        let handle = env.acquire_session().await?;
        handle.lock().await.goto(&url).await?;

        env.log_info(format!("navigated to {url}"));
        env.set_output("session", json!(SESSION_MARKER));
        Ok(())
    }
}

pub struct FillField;

#[async_trait]
impl StepHandler for FillField {
    fn kind(&self) -> StepKind {
        StepKind::FillField
    }

    async fn try_run(&self, env: &mut Environment) -> Result<(), Box<dyn Error + Send + Sync>> {
        let selector = env.string_input("selector");
        if selector.is_empty() {
            return Err("selector input is empty".into());
        }
        let value = env.string_input("value");

        let handle = env.acquire_session().await?;
        handle.lock().await.fill(&selector, &value).await?;

        env.log_info(format!("filled '{selector}'"));
        env.set_output("session", json!(SESSION_MARKER));
        Ok(())
    }
}

pub struct ClickElement;

#[async_trait]
impl StepHandler for ClickElement {
    fn kind(&self) -> StepKind {
        StepKind::ClickElement
    }

    async fn try_run(&self, env: &mut Environment) -> Result<(), Box<dyn Error + Send + Sync>> {
        let selector = env.string_input("selector");
        if selector.is_empty() {
            return Err("selector input is empty".into());
        }

        let handle = env.acquire_session().await?;
        handle.lock().await.click(&selector).await?;

        env.log_info(format!("clicked '{selector}'"));
        env.set_output("session", json!(SESSION_MARKER));
        Ok(())
    }
}

/// Waits until a selector becomes visible (default) or hidden
pub struct WaitForElement;

#[async_trait]
impl StepHandler for WaitForElement {
    fn kind(&self) -> StepKind {
        StepKind::WaitForElement
    }

    async fn try_run(&self, env: &mut Environment) -> Result<(), Box<dyn Error + Send + Sync>> {
        let selector = env.string_input("selector");
        if selector.is_empty() {
            return Err("selector input is empty".into());
        }
        let visibility = env.string_input("visibility");
        let visible = match visibility.as_str() {
            "" | "visible" => true,
            "hidden" => false,
            other => return Err(format!("unknown visibility '{other}'").into()),
        };

        let handle = env.acquire_session().await?;
        handle.lock().await.wait_for(&selector, visible).await?;

        env.log_info(format!(
            "'{selector}' became {}",
            if visible { "visible" } else { "hidden" }
        ));
        env.set_output("session", json!(SESSION_MARKER));
        Ok(())
    }
}

pub struct ScrollToElement;

#[async_trait]
impl StepHandler for ScrollToElement {
    fn kind(&self) -> StepKind {
        StepKind::ScrollToElement
    }

    async fn try_run(&self, env: &mut Environment) -> Result<(), Box<dyn Error + Send + Sync>> {
        let selector = env.string_input("selector");
        if selector.is_empty() {
            return Err("selector input is empty".into());
        }

        let handle = env.acquire_session().await?;
        handle.lock().await.scroll_to(&selector).await?;

        env.log_info(format!("scrolled to '{selector}'"));
        env.set_output("session", json!(SESSION_MARKER));
        Ok(())
    }
}

/// Captures the full HTML of the current page
pub struct GetPageHtml;

#[async_trait]
impl StepHandler for GetPageHtml {
    fn kind(&self) -> StepKind {
        StepKind::GetPageHtml
    }

    async fn try_run(&self, env: &mut Environment) -> Result<(), Box<dyn Error + Send + Sync>> {
        let handle = env.acquire_session().await?;
        let html = handle.lock().await.content().await?;

        env.log_info(format!("captured {} bytes of html", html.len()));
        env.set_output("html", json!(html));
        env.set_output("session", json!(SESSION_MARKER));
        Ok(())
    }
}

/// Reads the rendered text of one element from the live page
pub struct ExtractElementText;

#[async_trait]
impl StepHandler for ExtractElementText {
    fn kind(&self) -> StepKind {
        StepKind::ExtractElementText
    }

    async fn try_run(&self, env: &mut Environment) -> Result<(), Box<dyn Error + Send + Sync>> {
        let selector = env.string_input("selector");
        if selector.is_empty() {
            return Err("selector input is empty".into());
        }

        let handle = env.acquire_session().await?;
        let text = handle.lock().await.inner_text(&selector).await?;

        env.log_info(format!("extracted {} chars from '{selector}'", text.len()));
        env.set_output("text", json!(text));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::error::SessionError;
    use crate::graph::Node;
    use crate::run::{LogLevel, PageSession, SessionDriver, SessionSlot};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex as StdMutex};

    #[derive(Clone, Default)]
    struct Script {
        actions: Arc<StdMutex<Vec<String>>>,
    }

    struct ScriptedDriver {
        script: Script,
        fail_actions: bool,
    }

    struct ScriptedSession {
        script: Script,
        fail_actions: bool,
    }

    impl Script {
        fn push(&self, action: String) {
            self.actions.lock().unwrap().push(action);
        }

        fn all(&self) -> Vec<String> {
            self.actions.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SessionDriver for ScriptedDriver {
        async fn open(&self) -> Result<Box<dyn PageSession>, SessionError> {
            self.script.push("open".to_string());
            Ok(Box::new(ScriptedSession {
                script: self.script.clone(),
                fail_actions: self.fail_actions,
            }))
        }
    }

    impl ScriptedSession {
        fn act(&self, action: String) -> Result<(), SessionError> {
            if self.fail_actions {
                return Err(SessionError::Action("scripted failure".to_string()));
            }
            self.script.push(action);
            Ok(())
        }
    }

    #[async_trait]
    impl PageSession for ScriptedSession {
        async fn goto(&mut self, url: &str) -> Result<(), SessionError> {
            self.act(format!("goto {url}"))
        }
        async fn fill(&mut self, selector: &str, value: &str) -> Result<(), SessionError> {
            self.act(format!("fill {selector}={value}"))
        }
        async fn click(&mut self, selector: &str) -> Result<(), SessionError> {
            self.act(format!("click {selector}"))
        }
        async fn wait_for(&mut self, selector: &str, visible: bool) -> Result<(), SessionError> {
            self.act(format!("wait {selector} visible={visible}"))
        }
        async fn scroll_to(&mut self, selector: &str) -> Result<(), SessionError> {
            self.act(format!("scroll {selector}"))
        }
        async fn inner_text(&mut self, selector: &str) -> Result<String, SessionError> {
            self.act(format!("text {selector}"))?;
            Ok("$19.99".to_string())
        }
        async fn content(&mut self) -> Result<String, SessionError> {
            self.act("content".to_string())?;
            Ok("<html><body>hi</body></html>".to_string())
        }
        async fn close(&mut self) -> Result<(), SessionError> {
            self.script.push("close".to_string());
            Ok(())
        }
    }

    fn env_for(kind: StepKind, node: Node, fail_actions: bool) -> (Environment, Script) {
        let script = Script::default();
        let driver = ScriptedDriver {
            script: script.clone(),
            fail_actions,
        };
        let catalog = Catalog::standard();
        let descriptor = catalog.lookup(kind).unwrap();
        let slot = Arc::new(SessionSlot::new(Arc::new(driver)));
        (
            Environment::new(node, descriptor, HashMap::new(), slot),
            script,
        )
    }

    #[tokio::test]
    async fn test_launch_session_opens_and_navigates() {
        let node = Node::new("launch", StepKind::LaunchSession)
            .with_input("websiteUrl", "https://example.com");
        let (mut env, script) = env_for(StepKind::LaunchSession, node, false);

        assert!(LaunchSession.execute(&mut env).await);
        assert_eq!(script.all(), vec!["open", "goto https://example.com"]);

        let (outputs, _) = env.into_parts();
        assert_eq!(outputs.get("session"), Some(&json!(SESSION_MARKER)));
    }

    #[tokio::test]
    async fn test_launch_session_requires_url() {
        let node = Node::new("launch", StepKind::LaunchSession);
        let (mut env, script) = env_for(StepKind::LaunchSession, node, false);

        assert!(!LaunchSession.execute(&mut env).await);
        assert!(script.all().is_empty(), "no session should be opened");

        let (_, log) = env.into_parts();
        assert!(log.iter().any(|l| l.level == LogLevel::Error));
    }

    #[tokio::test]
    async fn test_fill_field_failure_is_logged_not_thrown() {
        let node = Node::new("fill", StepKind::FillField)
            .with_input("selector", "#q")
            .with_input("value", "x");
        let (mut env, _) = env_for(StepKind::FillField, node, true);

        assert!(!FillField.execute(&mut env).await);
        let (_, log) = env.into_parts();
        assert!(log
            .iter()
            .any(|l| l.level == LogLevel::Error && l.message.contains("scripted failure")));
    }

    #[tokio::test]
    async fn test_get_page_html_outputs_html_and_session() {
        let node = Node::new("html", StepKind::GetPageHtml);
        let (mut env, _) = env_for(StepKind::GetPageHtml, node, false);

        assert!(GetPageHtml.execute(&mut env).await);
        let (outputs, _) = env.into_parts();
        assert_eq!(
            outputs.get("html"),
            Some(&json!("<html><body>hi</body></html>"))
        );
        assert_eq!(outputs.get("session"), Some(&json!(SESSION_MARKER)));
    }

    #[tokio::test]
    async fn test_extract_element_text() {
        let node =
            Node::new("price", StepKind::ExtractElementText).with_input("selector", ".price");
        let (mut env, script) = env_for(StepKind::ExtractElementText, node, false);

        assert!(ExtractElementText.execute(&mut env).await);
        assert!(script.all().contains(&"text .price".to_string()));
        let (outputs, _) = env.into_parts();
        assert_eq!(outputs.get("text"), Some(&json!("$19.99")));
    }

    #[tokio::test]
    async fn test_wait_for_element_rejects_bad_visibility() {
        let node = Node::new("wait", StepKind::WaitForElement)
            .with_input("selector", "#x")
            .with_input("visibility", "sideways");
        let (mut env, script) = env_for(StepKind::WaitForElement, node, false);

        assert!(!WaitForElement.execute(&mut env).await);
        assert!(script.all().is_empty());
    }

    #[tokio::test]
    async fn test_wait_for_element_defaults_to_visible() {
        let node = Node::new("wait", StepKind::WaitForElement).with_input("selector", "#x");
        let (mut env, script) = env_for(StepKind::WaitForElement, node, false);

        assert!(WaitForElement.execute(&mut env).await);
        assert!(script.all().contains(&"wait #x visible=true".to_string()));
    }
}
