use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

use crate::compose::ComposedPush;
use crate::targeting::Target;

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Network-level failure or timeout
    #[error("transport: {0}")]
    Transport(String),
    /// Provider answered with a non-success status
    #[error("rejected ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// External push provider. Returns the provider's message id.
#[async_trait]
pub trait PushTransport: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send(&self, target: &Target, push: &ComposedPush) -> Result<String, DispatchError>;
}

/// Logs instead of sending. Used when no push credentials are configured.
#[derive(Debug, Default)]
pub struct DryRunTransport {
    sent: AtomicU64,
}

impl DryRunTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl PushTransport for DryRunTransport {
    fn name(&self) -> &'static str {
        "dry-run"
    }

    async fn send(&self, target: &Target, push: &ComposedPush) -> Result<String, DispatchError> {
        let n = self.sent.fetch_add(1, Ordering::Relaxed) + 1;
        info!(
            %target,
            title = %push.notification.title,
            body = %push.notification.body,
            "[push] dry-run"
        );
        Ok(format!("dry-run-{n}"))
    }
}
