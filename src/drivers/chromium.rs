// SPDX-License-Identifier: MIT

//! Chromium session driver over CDP
//!
//! Each opened session owns a dedicated browser process and one page.
//! Every action carries the driver's own deadline; the orchestrator
//! imposes no run-level timeout.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};

use crate::error::SessionError;
use crate::run::{PageSession, SessionDriver};

const DEFAULT_ACTION_TIMEOUT: Duration = Duration::from_secs(30);
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(250);

pub struct ChromiumDriver {
    headless: bool,
    action_timeout: Duration,
}

impl ChromiumDriver {
    pub fn new(headless: bool) -> Self {
        Self {
            headless,
            action_timeout: DEFAULT_ACTION_TIMEOUT,
        }
    }

    pub fn with_action_timeout(mut self, timeout: Duration) -> Self {
        self.action_timeout = timeout;
        self
    }
}

impl Default for ChromiumDriver {
    fn default() -> Self {
        Self::new(true)
    }
}

#[async_trait]
impl SessionDriver for ChromiumDriver {
    async fn open(&self) -> Result<Box<dyn PageSession>, SessionError> {
        let builder = if self.headless {
            BrowserConfig::builder()
        } else {
            BrowserConfig::builder().with_head()
        };
        let config = builder.build().map_err(SessionError::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| SessionError::Launch(e.to_string()))?;

        // CDP messages must keep draining for the lifetime of the browser.
        let events: JoinHandle<()> = tokio::spawn(async move {
            while handler.next().await.is_some() {}
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| SessionError::Launch(e.to_string()))?;

        log::info!("chromium session opened (headless={})", self.headless);
        Ok(Box::new(ChromiumSession {
            browser,
            page,
            events,
            action_timeout: self.action_timeout,
        }))
    }
}

struct ChromiumSession {
    browser: Browser,
    page: Page,
    events: JoinHandle<()>,
    action_timeout: Duration,
}

fn action_err(e: impl ToString) -> SessionError {
    SessionError::Action(e.to_string())
}

#[async_trait]
impl PageSession for ChromiumSession {
    async fn goto(&mut self, url: &str) -> Result<(), SessionError> {
        self.page.goto(url).await.map_err(action_err)?;
        self.page.wait_for_navigation().await.map_err(action_err)?;
        Ok(())
    }

    async fn fill(&mut self, selector: &str, value: &str) -> Result<(), SessionError> {
        let element = self.page.find_element(selector).await.map_err(action_err)?;
        element.click().await.map_err(action_err)?;
        element.type_str(value).await.map_err(action_err)?;
        Ok(())
    }

    async fn click(&mut self, selector: &str) -> Result<(), SessionError> {
        let element = self.page.find_element(selector).await.map_err(action_err)?;
        element.click().await.map_err(action_err)?;
        Ok(())
    }

    async fn wait_for(&mut self, selector: &str, visible: bool) -> Result<(), SessionError> {
        let deadline = Instant::now() + self.action_timeout;
        loop {
            let present = self.page.find_element(selector).await.is_ok();
            if present == visible {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(SessionError::WaitTimeout {
                    selector: selector.to_string(),
                });
            }
            sleep(WAIT_POLL_INTERVAL).await;
        }
    }

    async fn scroll_to(&mut self, selector: &str) -> Result<(), SessionError> {
        let element = self.page.find_element(selector).await.map_err(action_err)?;
        element.scroll_into_view().await.map_err(action_err)?;
        Ok(())
    }

    async fn inner_text(&mut self, selector: &str) -> Result<String, SessionError> {
        let element = self.page.find_element(selector).await.map_err(action_err)?;
        let text = element.inner_text().await.map_err(action_err)?;
        Ok(text.unwrap_or_default())
    }

    async fn content(&mut self) -> Result<String, SessionError> {
        self.page.content().await.map_err(action_err)
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        let closed = self.browser.close().await.map_err(action_err);
        self.events.abort();
        closed?;
        Ok(())
    }
}
