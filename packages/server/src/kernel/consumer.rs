//! Queue consumer for pipeline stages.
//!
//! A `StageConsumer` is a long-lived loop that:
//! - Pulls one delivery at a time from a durable queue
//! - Hands the payload to the stage's `MessageHandler`
//! - Acknowledges, requeues, or drops it depending on the outcome
//!
//! # Architecture
//!
//! ```text
//! StageConsumer
//!     │
//!     ├─► Subscription::next (one unacknowledged delivery at most)
//!     ├─► MessageHandler::handle
//!     └─► StageError -> Disposition -> ack / requeue / reject
//! ```

use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::nats::Subscription;

/// Why a stage could not finish a message.
#[derive(Debug, Error)]
pub enum StageError {
    /// Network failure, timeout, or upstream 5xx. Worth another attempt.
    #[error("retryable: {0}")]
    Retryable(String),

    /// Undecodable message or unparsable AI output.
    #[error("malformed: {0}")]
    Malformed(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Patch refused for good: unknown field, type mismatch, or a 4xx reply.
    #[error("validation: {0}")]
    Validation(String),
}

impl StageError {
    pub fn retryable(context: &str, e: impl std::fmt::Display) -> Self {
        StageError::Retryable(format!("{}: {}", context, e))
    }

    pub fn malformed(context: &str, e: impl std::fmt::Display) -> Self {
        StageError::Malformed(format!("{}: {}", context, e))
    }

    pub fn disposition(&self) -> Disposition {
        match self {
            StageError::Retryable(_) => Disposition::Requeue,
            StageError::Malformed(_) | StageError::NotFound(_) | StageError::Validation(_) => {
                Disposition::Drop
            }
        }
    }
}

/// What happens to a delivery once its handler returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Ack,
    Requeue,
    Drop,
}

impl Disposition {
    pub fn of(result: &std::result::Result<(), StageError>) -> Self {
        match result {
            Ok(()) => Disposition::Ack,
            Err(e) => e.disposition(),
        }
    }
}

#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Stage name for logs.
    fn name(&self) -> &'static str;

    async fn handle(&self, payload: &[u8]) -> std::result::Result<(), StageError>;
}

/// Totals for one consumer run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerStats {
    pub acked: usize,
    pub requeued: usize,
    pub dropped: usize,
}

pub struct StageConsumer {
    handler: Arc<dyn MessageHandler>,
    queue: String,
}

impl StageConsumer {
    pub fn new(handler: Arc<dyn MessageHandler>, queue: impl Into<String>) -> Self {
        Self {
            handler,
            queue: queue.into(),
        }
    }

    /// Consume until the subscription ends or `shutdown` resolves.
    ///
    /// Shutdown only interrupts the wait for the next delivery; a message
    /// that is being handled is always resolved first.
    pub async fn run<S>(&self, mut subscription: Box<dyn Subscription>, shutdown: S) -> Result<ConsumerStats>
    where
        S: Future<Output = ()>,
    {
        let stage = self.handler.name();
        let mut stats = ConsumerStats::default();
        tokio::pin!(shutdown);

        info!(stage, queue = %self.queue, "stage consumer starting");

        loop {
            let delivery = tokio::select! {
                _ = &mut shutdown => {
                    info!(stage, "received shutdown signal");
                    break;
                }
                next = subscription.next() => match next? {
                    Some(delivery) => delivery,
                    None => break,
                },
            };

            let attempt = delivery.delivery_count();
            debug!(stage, queue = %self.queue, attempt, "message received");

            let result = self.handler.handle(delivery.payload()).await;
            match Disposition::of(&result) {
                Disposition::Ack => {
                    delivery.ack().await?;
                    stats.acked += 1;
                    debug!(stage, "message acknowledged");
                }
                Disposition::Requeue => {
                    if let Err(e) = &result {
                        warn!(stage, attempt, error = %e, "message requeued");
                    }
                    delivery.requeue().await?;
                    stats.requeued += 1;
                }
                Disposition::Drop => {
                    if let Err(e) = &result {
                        error!(stage, error = %e, "message dropped");
                    }
                    delivery.reject().await?;
                    stats.dropped += 1;
                }
            }
        }

        info!(
            stage,
            acked = stats.acked,
            requeued = stats.requeued,
            dropped = stats.dropped,
            "stage consumer stopped"
        );
        Ok(stats)
    }

    /// Run until Ctrl+C.
    pub async fn run_until_shutdown(&self, subscription: Box<dyn Subscription>) -> Result<ConsumerStats> {
        self.run(subscription, async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
    }
}
