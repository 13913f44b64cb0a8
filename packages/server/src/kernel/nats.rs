//! Broadcast bus for production and testing.
//!
//! An exchange fans every published message out to each durable queue bound
//! to it. Production runs on NATS JetStream: one file-backed stream per
//! exchange and one durable explicit-ack pull consumer per queue with at most
//! one unacknowledged message. Tests use [`TestBus`], an in-process fan-out
//! with the same delivery semantics.

use anyhow::{Context, Result};
use async_nats::jetstream::{
    self,
    consumer::{pull, AckPolicy, DeliverPolicy, PullConsumer},
    stream::StorageType,
    AckKind,
};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info};

/// A message handed to a consumer. Must be resolved exactly once.
#[async_trait]
pub trait Delivery: Send + Sync {
    fn payload(&self) -> &[u8];

    /// 1 for a first delivery, higher for redeliveries.
    fn delivery_count(&self) -> u64;

    async fn ack(self: Box<Self>) -> Result<()>;

    /// Negative-acknowledge and put the message back on the queue.
    async fn requeue(self: Box<Self>) -> Result<()>;

    /// Negative-acknowledge without requeue; the message is discarded.
    async fn reject(self: Box<Self>) -> Result<()>;
}

#[async_trait]
pub trait Subscription: Send {
    /// Next delivery, or `None` when the subscription has ended.
    async fn next(&mut self) -> Result<Option<Box<dyn Delivery>>>;
}

#[async_trait]
pub trait BroadcastBus: Send + Sync {
    /// Declare a fan-out exchange. Idempotent.
    async fn declare_exchange(&self, exchange: &str) -> Result<()>;

    /// Declare a durable queue and bind it to an exchange. Idempotent.
    async fn declare_queue(&self, exchange: &str, queue: &str) -> Result<()>;

    async fn publish(&self, exchange: &str, payload: Bytes) -> Result<()>;

    /// Start consuming a declared queue.
    async fn subscribe(&self, exchange: &str, queue: &str) -> Result<Box<dyn Subscription>>;

    /// Flush outstanding publishes before the connection is dropped.
    async fn close(&self) -> Result<()>;
}

// =============================================================================
// JetStream
// =============================================================================

const REDELIVERY_BASE: Duration = Duration::from_secs(1);
const REDELIVERY_MAX: Duration = Duration::from_secs(60);

/// Delay before a requeued message comes back: doubles with every delivery
/// starting at one second, capped at a minute.
pub fn redelivery_delay(delivery_count: u64) -> Duration {
    let exponent = delivery_count.saturating_sub(1).min(6) as u32;
    (REDELIVERY_BASE * 2u32.pow(exponent)).min(REDELIVERY_MAX)
}

/// Stream names may not contain dots.
fn stream_name(exchange: &str) -> String {
    exchange.replace('.', "_").to_uppercase()
}

pub struct JetStreamBus {
    client: async_nats::Client,
    context: jetstream::Context,
}

impl JetStreamBus {
    pub async fn connect(url: &str) -> Result<Self> {
        let client = async_nats::connect(url)
            .await
            .with_context(|| format!("Failed to connect to NATS at {}", url))?;
        info!(url, "connected to NATS");
        Ok(Self::new(client))
    }

    pub fn new(client: async_nats::Client) -> Self {
        let context = jetstream::new(client.clone());
        Self { client, context }
    }

    async fn consumer(&self, exchange: &str, queue: &str) -> Result<PullConsumer> {
        let stream = self
            .context
            .get_stream(stream_name(exchange))
            .await
            .with_context(|| format!("exchange {} is not declared", exchange))?;

        stream
            .get_or_create_consumer(
                queue,
                pull::Config {
                    durable_name: Some(queue.to_string()),
                    filter_subject: exchange.to_string(),
                    ack_policy: AckPolicy::Explicit,
                    deliver_policy: DeliverPolicy::All,
                    max_ack_pending: 1,
                    ..Default::default()
                },
            )
            .await
            .with_context(|| format!("Failed to declare queue {}", queue))
    }
}

#[async_trait]
impl BroadcastBus for JetStreamBus {
    async fn declare_exchange(&self, exchange: &str) -> Result<()> {
        self.context
            .get_or_create_stream(jetstream::stream::Config {
                name: stream_name(exchange),
                subjects: vec![exchange.to_string()],
                storage: StorageType::File,
                ..Default::default()
            })
            .await
            .with_context(|| format!("Failed to declare exchange {}", exchange))?;
        debug!(exchange, "exchange declared");
        Ok(())
    }

    async fn declare_queue(&self, exchange: &str, queue: &str) -> Result<()> {
        self.declare_exchange(exchange).await?;
        self.consumer(exchange, queue).await?;
        debug!(exchange, queue, "queue declared");
        Ok(())
    }

    async fn publish(&self, exchange: &str, payload: Bytes) -> Result<()> {
        // Wait for the stream ack so the message is persisted before we return.
        self.context
            .publish(exchange.to_string(), payload)
            .await
            .map_err(|e| anyhow::anyhow!("{e}"))?
            .await
            .map_err(|e| anyhow::anyhow!("{e}"))?;
        Ok(())
    }

    async fn subscribe(&self, exchange: &str, queue: &str) -> Result<Box<dyn Subscription>> {
        let consumer = self.consumer(exchange, queue).await?;
        let messages = consumer
            .messages()
            .await
            .map_err(|e| anyhow::anyhow!("{e}"))?;
        Ok(Box::new(JetStreamSubscription { messages }))
    }

    async fn close(&self) -> Result<()> {
        self.client
            .flush()
            .await
            .map_err(|e| anyhow::anyhow!("{e}"))?;
        info!("NATS connection flushed");
        Ok(())
    }
}

struct JetStreamSubscription {
    messages: pull::Stream,
}

#[async_trait]
impl Subscription for JetStreamSubscription {
    async fn next(&mut self) -> Result<Option<Box<dyn Delivery>>> {
        match self.messages.next().await {
            Some(Ok(message)) => Ok(Some(Box::new(JetStreamDelivery { message }))),
            Some(Err(e)) => Err(anyhow::anyhow!("{e}")),
            None => Ok(None),
        }
    }
}

struct JetStreamDelivery {
    message: jetstream::Message,
}

#[async_trait]
impl Delivery for JetStreamDelivery {
    fn payload(&self) -> &[u8] {
        &self.message.payload
    }

    fn delivery_count(&self) -> u64 {
        self.message
            .info()
            .map(|info| info.delivered.max(1) as u64)
            .unwrap_or(1)
    }

    async fn ack(self: Box<Self>) -> Result<()> {
        self.message.ack().await.map_err(|e| anyhow::anyhow!("{e}"))
    }

    async fn requeue(self: Box<Self>) -> Result<()> {
        let delay = redelivery_delay(self.delivery_count());
        debug!(delay_ms = delay.as_millis() as u64, "requeue with delay");
        self.message
            .ack_with(AckKind::Nak(Some(delay)))
            .await
            .map_err(|e| anyhow::anyhow!("{e}"))
    }

    async fn reject(self: Box<Self>) -> Result<()> {
        self.message
            .ack_with(AckKind::Term)
            .await
            .map_err(|e| anyhow::anyhow!("{e}"))
    }
}

// =============================================================================
// In-process bus (tests, local runs)
// =============================================================================

/// A published message.
#[derive(Debug, Clone)]
pub struct PublishedMessage {
    pub exchange: String,
    pub payload: Bytes,
}

#[derive(Default)]
struct QueueState {
    ready: VecDeque<(Bytes, u64)>,
    in_flight: usize,
    acked: Vec<Bytes>,
    rejected: Vec<Bytes>,
    requeued: usize,
}

#[derive(Default)]
struct BusState {
    exchanges: HashMap<String, Vec<String>>,
    queues: HashMap<String, QueueState>,
    published: Vec<PublishedMessage>,
}

/// In-process fan-out bus.
///
/// Subscriptions never block: `next()` returns `None` once the queue is
/// drained, so a consumer loop over it runs to completion.
#[derive(Clone, Default)]
pub struct TestBus {
    state: Arc<Mutex<BusState>>,
}

impl TestBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut BusState) -> T) -> T {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut state)
    }

    /// Get all published messages.
    pub fn published_messages(&self) -> Vec<PublishedMessage> {
        self.with_state(|s| s.published.clone())
    }

    /// Get published messages for a specific exchange.
    pub fn messages_for_exchange(&self, exchange: &str) -> Vec<PublishedMessage> {
        self.with_state(|s| {
            s.published
                .iter()
                .filter(|m| m.exchange == exchange)
                .cloned()
                .collect()
        })
    }

    /// Messages waiting on a queue.
    pub fn pending(&self, queue: &str) -> usize {
        self.with_state(|s| s.queues.get(queue).map(|q| q.ready.len()).unwrap_or(0))
    }

    pub fn acked(&self, queue: &str) -> Vec<Bytes> {
        self.with_state(|s| s.queues.get(queue).map(|q| q.acked.clone()).unwrap_or_default())
    }

    pub fn rejected(&self, queue: &str) -> Vec<Bytes> {
        self.with_state(|s| {
            s.queues
                .get(queue)
                .map(|q| q.rejected.clone())
                .unwrap_or_default()
        })
    }

    pub fn requeue_count(&self, queue: &str) -> usize {
        self.with_state(|s| s.queues.get(queue).map(|q| q.requeued).unwrap_or(0))
    }

    /// Deserialize a published message payload as JSON.
    pub fn deserialize_message<T: serde::de::DeserializeOwned>(
        &self,
        msg: &PublishedMessage,
    ) -> std::result::Result<T, serde_json::Error> {
        serde_json::from_slice(&msg.payload)
    }
}

#[async_trait]
impl BroadcastBus for TestBus {
    async fn declare_exchange(&self, exchange: &str) -> Result<()> {
        self.with_state(|s| {
            s.exchanges.entry(exchange.to_string()).or_default();
        });
        Ok(())
    }

    async fn declare_queue(&self, exchange: &str, queue: &str) -> Result<()> {
        self.with_state(|s| {
            let bound = s.exchanges.entry(exchange.to_string()).or_default();
            if !bound.iter().any(|q| q == queue) {
                bound.push(queue.to_string());
            }
            s.queues.entry(queue.to_string()).or_default();
        });
        Ok(())
    }

    async fn publish(&self, exchange: &str, payload: Bytes) -> Result<()> {
        self.with_state(|s| {
            s.published.push(PublishedMessage {
                exchange: exchange.to_string(),
                payload: payload.clone(),
            });
            let bound = s.exchanges.get(exchange).cloned().unwrap_or_default();
            for queue in bound {
                s.queues
                    .entry(queue)
                    .or_default()
                    .ready
                    .push_back((payload.clone(), 1));
            }
        });
        Ok(())
    }

    async fn subscribe(&self, exchange: &str, queue: &str) -> Result<Box<dyn Subscription>> {
        let bound = self.with_state(|s| {
            s.exchanges
                .get(exchange)
                .is_some_and(|queues| queues.iter().any(|q| q == queue))
        });
        if !bound {
            anyhow::bail!("queue {} is not bound to exchange {}", queue, exchange);
        }
        Ok(Box::new(TestSubscription {
            bus: self.clone(),
            queue: queue.to_string(),
        }))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

struct TestSubscription {
    bus: TestBus,
    queue: String,
}

#[async_trait]
impl Subscription for TestSubscription {
    async fn next(&mut self) -> Result<Option<Box<dyn Delivery>>> {
        let queue = self.queue.clone();
        let next = self.bus.with_state(|s| {
            let state = s.queues.entry(queue.clone()).or_default();
            if state.in_flight > 0 {
                anyhow::bail!("queue {} already has an unacknowledged delivery", queue);
            }
            let next = state.ready.pop_front();
            if next.is_some() {
                state.in_flight += 1;
            }
            Ok(next)
        })?;

        Ok(next.map(|(payload, count)| {
            Box::new(TestDelivery {
                bus: self.bus.clone(),
                queue: self.queue.clone(),
                payload,
                count,
            }) as Box<dyn Delivery>
        }))
    }
}

struct TestDelivery {
    bus: TestBus,
    queue: String,
    payload: Bytes,
    count: u64,
}

impl TestDelivery {
    fn settle(self, f: impl FnOnce(&mut QueueState, Bytes, u64)) {
        let TestDelivery {
            bus,
            queue,
            payload,
            count,
        } = self;
        bus.with_state(|s| {
            let state = s.queues.entry(queue).or_default();
            state.in_flight = state.in_flight.saturating_sub(1);
            f(state, payload, count);
        });
    }
}

#[async_trait]
impl Delivery for TestDelivery {
    fn payload(&self) -> &[u8] {
        &self.payload
    }

    fn delivery_count(&self) -> u64 {
        self.count
    }

    async fn ack(self: Box<Self>) -> Result<()> {
        (*self).settle(|q, payload, _| q.acked.push(payload));
        Ok(())
    }

    async fn requeue(self: Box<Self>) -> Result<()> {
        (*self).settle(|q, payload, count| {
            q.requeued += 1;
            q.ready.push_front((payload, count + 1));
        });
        Ok(())
    }

    async fn reject(self: Box<Self>) -> Result<()> {
        (*self).settle(|q, payload, _| q.rejected.push(payload));
        Ok(())
    }
}
