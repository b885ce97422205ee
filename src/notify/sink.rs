use alloy::primitives::Address;
use async_trait::async_trait;
use std::sync::Mutex;
use thiserror::Error;
use tracing::info;

use crate::secret::Secret;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Notification rejected: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Report a freshly captured burner identity
    async fn notify_identity(
        &self,
        owner: Address,
        burner: Address,
        burner_key: Option<&Secret>,
    ) -> Result<(), NotifyError>;

    /// Report the outcome of a run
    async fn notify_status(&self, success: bool, details: &str) -> Result<(), NotifyError>;
}

/// Sink that only writes to the operator log
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl NotificationSink for LogNotifier {
    async fn notify_identity(
        &self,
        owner: Address,
        burner: Address,
        burner_key: Option<&Secret>,
    ) -> Result<(), NotifyError> {
        info!(
            owner = %owner,
            burner = %burner,
            burner_key_recovered = burner_key.is_some(),
            "Burner identity captured"
        );
        Ok(())
    }

    async fn notify_status(&self, success: bool, details: &str) -> Result<(), NotifyError> {
        info!(success, "Node status\n{}", details);
        Ok(())
    }
}

/// Event captured by [`RecordingNotifier`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Identity {
        owner: Address,
        burner: Address,
        key_recovered: bool,
    },
    Status {
        success: bool,
        details: String,
    },
}

/// Sink that keeps every event in memory, optionally failing every send
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<Notification>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record events but report every delivery as failed
    pub fn failing() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn events(&self) -> Vec<Notification> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    fn record(&self, event: Notification) -> Result<(), NotifyError> {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
        if self.fail {
            return Err(NotifyError::Http("recording sink set to fail".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationSink for RecordingNotifier {
    async fn notify_identity(
        &self,
        owner: Address,
        burner: Address,
        burner_key: Option<&Secret>,
    ) -> Result<(), NotifyError> {
        self.record(Notification::Identity {
            owner,
            burner,
            key_recovered: burner_key.is_some(),
        })
    }

    async fn notify_status(&self, success: bool, details: &str) -> Result<(), NotifyError> {
        self.record(Notification::Status {
            success,
            details: details.to_string(),
        })
    }
}
