// SPDX-License-Identifier: MIT

//! The shared automation session resource
//!
//! One page session per run, opened lazily on first acquire and owned
//! exclusively by that run until release. Steps within a run share the
//! handle strictly sequentially; interleaving actions on one page would
//! corrupt its navigation/DOM state.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::SessionError;

/// Cloneable handle to the run's single open page session
pub type SessionHandle = Arc<Mutex<Box<dyn PageSession>>>;

/// Opens new page sessions; the seam a browser backend implements
#[async_trait]
pub trait SessionDriver: Send + Sync {
    async fn open(&self) -> Result<Box<dyn PageSession>, SessionError>;
}

/// Actions available on an open page session
#[async_trait]
pub trait PageSession: Send + Sync {
    async fn goto(&mut self, url: &str) -> Result<(), SessionError>;
    async fn fill(&mut self, selector: &str, value: &str) -> Result<(), SessionError>;
    async fn click(&mut self, selector: &str) -> Result<(), SessionError>;
    async fn wait_for(&mut self, selector: &str, visible: bool) -> Result<(), SessionError>;
    async fn scroll_to(&mut self, selector: &str) -> Result<(), SessionError>;
    async fn inner_text(&mut self, selector: &str) -> Result<String, SessionError>;
    async fn content(&mut self) -> Result<String, SessionError>;
    async fn close(&mut self) -> Result<(), SessionError>;
}

/// Per-run slot holding the lazily opened session
pub struct SessionSlot {
    driver: Arc<dyn SessionDriver>,
    handle: Mutex<Option<SessionHandle>>,
}

impl SessionSlot {
    pub fn new(driver: Arc<dyn SessionDriver>) -> Self {
        Self {
            driver,
            handle: Mutex::new(None),
        }
    }

    /// Opens the session on first call; later calls return the same handle
    pub async fn acquire(&self) -> Result<SessionHandle, SessionError> {
        let mut slot = self.handle.lock().await;
        if let Some(handle) = slot.as_ref() {
            return Ok(handle.clone());
        }
        let session = self.driver.open().await?;
        let handle: SessionHandle = Arc::new(Mutex::new(session));
        *slot = Some(handle.clone());
        Ok(handle)
    }

    /// Closes and drops the session if one was opened; safe to call when
    /// nothing is open
    pub async fn release(&self) -> Result<(), SessionError> {
        let mut slot = self.handle.lock().await;
        if let Some(handle) = slot.take() {
            let mut session = handle.lock().await;
            session.close().await?;
        }
        Ok(())
    }

    pub async fn is_open(&self) -> bool {
        self.handle.lock().await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct CountingDriver {
        opens: Arc<AtomicU32>,
        closes: Arc<AtomicU32>,
    }

    struct CountingSession {
        closes: Arc<AtomicU32>,
    }

    #[async_trait]
    impl SessionDriver for CountingDriver {
        async fn open(&self) -> Result<Box<dyn PageSession>, SessionError> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(CountingSession {
                closes: self.closes.clone(),
            }))
        }
    }

    #[async_trait]
    impl PageSession for CountingSession {
        async fn goto(&mut self, _url: &str) -> Result<(), SessionError> {
            Ok(())
        }
        async fn fill(&mut self, _selector: &str, _value: &str) -> Result<(), SessionError> {
            Ok(())
        }
        async fn click(&mut self, _selector: &str) -> Result<(), SessionError> {
            Ok(())
        }
        async fn wait_for(&mut self, _selector: &str, _visible: bool) -> Result<(), SessionError> {
            Ok(())
        }
        async fn scroll_to(&mut self, _selector: &str) -> Result<(), SessionError> {
            Ok(())
        }
        async fn inner_text(&mut self, _selector: &str) -> Result<String, SessionError> {
            Ok(String::new())
        }
        async fn content(&mut self) -> Result<String, SessionError> {
            Ok(String::new())
        }
        async fn close(&mut self) -> Result<(), SessionError> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_acquire_opens_once() {
        let driver = Arc::new(CountingDriver::default());
        let opens = driver.opens.clone();
        let slot = SessionSlot::new(driver);

        assert!(!slot.is_open().await);
        let _first = slot.acquire().await.unwrap();
        let _second = slot.acquire().await.unwrap();
        assert!(slot.is_open().await);
        assert_eq!(opens.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_release_closes_once_and_is_idempotent() {
        let driver = Arc::new(CountingDriver::default());
        let closes = driver.closes.clone();
        let slot = SessionSlot::new(driver);

        let _ = slot.acquire().await.unwrap();
        slot.release().await.unwrap();
        slot.release().await.unwrap();
        assert!(!slot.is_open().await);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_release_without_acquire_is_noop() {
        let driver = Arc::new(CountingDriver::default());
        let closes = driver.closes.clone();
        let slot = SessionSlot::new(driver);

        slot.release().await.unwrap();
        assert_eq!(closes.load(Ordering::SeqCst), 0);
    }
}
