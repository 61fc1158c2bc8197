//! Per-request correlation id and deadline.

use crate::error::{AuthzError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct RequestContext {
    pub rid: String,
    pub deadline: Option<Instant>,
}

impl RequestContext {
    pub fn new(rid: impl Into<String>) -> Self {
        Self {
            rid: rid.into(),
            deadline: None,
        }
    }

    /// A context with a freshly generated request id.
    pub fn generate() -> Self {
        Self::new(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Runs `fut` until the deadline, if any. Expiry yields `Cancelled`.
    pub async fn run<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match self.deadline {
            None => fut.await,
            Some(deadline) => tokio::time::timeout_at(deadline, fut)
                .await
                .map_err(|_| AuthzError::Cancelled {
                    rid: self.rid.clone(),
                })?,
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::generate()
    }
}
