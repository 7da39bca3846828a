//! Queue service façade over the message store and subscription registry.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::config::Settings;
use crate::metrics::{FANOUT_DELIVERIES_TOTAL, FANOUT_FAILURES_TOTAL, TOPIC_PUBLISHES_TOTAL};
use crate::queue::{
    create_message_store, MemoryMessageStore, MessageStore, QueueError, QueuedMessage,
    StoreStats, DEFAULT_PRIORITY, DEFAULT_SENDER,
};
use crate::subscription::{SubscriptionRegistry, SubscriptionStats};

/// Prefix of the sender recorded on fan-out copies
pub const TOPIC_SENDER_PREFIX: &str = "topic:";

/// Sender id used for messages published to `topic`
pub fn topic_sender(topic: &str) -> String {
    format!("{}{}", TOPIC_SENDER_PREFIX, topic)
}

/// Result of a publish call
#[derive(Debug, Clone, Serialize)]
pub struct PublishResult {
    /// Subscribers in the snapshot taken at publish time
    pub attempted: usize,
    /// Copies enqueued successfully
    pub delivered: usize,
    /// Copies the store refused
    pub failed: usize,
}

/// Per-instance counters
#[derive(Debug, Default)]
struct ServiceCounters {
    enqueued: AtomicU64,
    dequeued: AtomicU64,
    cleared: AtomicU64,
    publishes: AtomicU64,
    fanout_delivered: AtomicU64,
    fanout_failed: AtomicU64,
}

/// Snapshot of service statistics
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStats {
    pub enqueued: u64,
    pub dequeued: u64,
    pub cleared: u64,
    pub publishes: u64,
    pub fanout_delivered: u64,
    pub fanout_failed: u64,
    pub store: StoreStats,
    pub subscriptions: SubscriptionStats,
}

/// Agent message queue façade.
///
/// Creates messages, keeps them in a [`MessageStore`] and fans topic
/// publishes out through a [`SubscriptionRegistry`]. Every instance owns its
/// own store and registry; share one with `Arc<QueueService<T>>`.
///
/// All operations are non-blocking: reads on an empty or unknown receiver
/// return `None` or `0` immediately.
///
/// # Example
///
/// ```rust,ignore
/// let service = QueueService::new();
///
/// service.enqueue("agent-1", "Hello")?;
/// service.enqueue_with("agent-1", "World", "agent-0", 5)?;
///
/// assert_eq!(*service.dequeue("agent-1").unwrap().content(), "World");
/// ```
pub struct QueueService<T> {
    store: Arc<dyn MessageStore<T>>,
    registry: SubscriptionRegistry,
    next_sequence: AtomicU64,
    counters: ServiceCounters,
}

impl<T> QueueService<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a service backed by an unbounded memory store
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryMessageStore::<T>::unbounded()))
    }

    /// Create a service over an existing store
    pub fn with_store(store: Arc<dyn MessageStore<T>>) -> Self {
        Self {
            store,
            registry: SubscriptionRegistry::new(),
            next_sequence: AtomicU64::new(0),
            counters: ServiceCounters::default(),
        }
    }

    /// Create a service whose store is built from settings
    pub fn from_settings(settings: &Settings) -> Self {
        Self::with_store(create_message_store(&settings.queue))
    }

    /// Enqueue a message from `"system"` with default priority.
    ///
    /// Returns the new message's id.
    pub fn enqueue(&self, receiver: &str, content: T) -> Result<Uuid, QueueError> {
        self.enqueue_with(receiver, content, DEFAULT_SENDER, DEFAULT_PRIORITY)
    }

    /// Enqueue a message with an explicit sender and priority.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::QueueFull` only when the store is bounded with the
    /// `reject` overflow policy and `receiver`'s queue is full.
    pub fn enqueue_with(
        &self,
        receiver: &str,
        content: T,
        sender: &str,
        priority: i64,
    ) -> Result<Uuid, QueueError> {
        let sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed);
        let message = QueuedMessage::new(sender, receiver, content, priority, sequence);
        let message_id = message.id();

        self.store.enqueue(receiver, message)?;
        self.counters.enqueued.fetch_add(1, Ordering::Relaxed);

        Ok(message_id)
    }

    /// Remove and return the highest-priority message for `receiver`
    pub fn dequeue(&self, receiver: &str) -> Option<QueuedMessage<T>> {
        let message = self.store.dequeue(receiver)?;
        self.counters.dequeued.fetch_add(1, Ordering::Relaxed);
        Some(message)
    }

    /// Return the highest-priority message for `receiver` without removing it
    pub fn peek(&self, receiver: &str) -> Option<QueuedMessage<T>> {
        self.store.peek(receiver)
    }

    /// Number of messages waiting for `receiver`
    pub fn queue_size(&self, receiver: &str) -> usize {
        self.store.size(receiver)
    }

    /// Discard every message waiting for `receiver`, returning how many were removed
    pub fn clear_queue(&self, receiver: &str) -> usize {
        let removed = self.store.clear(receiver);
        self.counters.cleared.fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }

    /// Subscribe an agent to a topic; repeated calls are no-ops
    pub fn subscribe(&self, topic: &str, agent_id: &str) {
        self.registry.subscribe(topic, agent_id);
    }

    /// Unsubscribe an agent from a topic; unknown pairs are ignored
    pub fn unsubscribe(&self, topic: &str, agent_id: &str) {
        self.registry.unsubscribe(topic, agent_id);
    }

    /// Remove an agent from every topic, returning how many it left
    pub fn unsubscribe_all(&self, agent_id: &str) -> usize {
        self.registry.unsubscribe_all(agent_id)
    }

    /// Topics `agent_id` is subscribed to, sorted by name
    pub fn topics_for(&self, agent_id: &str) -> Vec<String> {
        self.registry.topics_for(agent_id)
    }

    /// Current subscribers of `topic`, in subscription order
    pub fn subscribers(&self, topic: &str) -> Vec<String> {
        self.registry.subscribers(topic)
    }

    /// Publish `content` to every current subscriber of `topic`.
    ///
    /// Returns the number of deliveries attempted, i.e. the number of
    /// subscribers at publish time.
    pub fn publish(&self, topic: &str, content: T) -> usize {
        self.publish_detailed(topic, content).attempted
    }

    /// Publish and report per-subscriber outcomes.
    ///
    /// The subscriber list is snapshotted before fan-out starts, so concurrent
    /// subscribe/unsubscribe calls only affect later publishes. Each
    /// subscriber receives its own message with sender `"topic:<topic>"` and
    /// default priority. Fan-out is not transactional: a refused copy is
    /// logged and counted, earlier copies stay queued and later subscribers
    /// are still attempted.
    #[tracing::instrument(name = "queue.publish", skip(self, content))]
    pub fn publish_detailed(&self, topic: &str, content: T) -> PublishResult {
        let subscribers = self.registry.subscribers(topic);
        let sender = topic_sender(topic);
        let mut delivered = 0;
        let mut failed = 0;

        for agent_id in &subscribers {
            match self.enqueue_with(agent_id, content.clone(), &sender, DEFAULT_PRIORITY) {
                Ok(_) => delivered += 1,
                Err(e) => {
                    failed += 1;
                    tracing::warn!(
                        topic = %topic,
                        agent_id = %agent_id,
                        error = %e,
                        "Failed to deliver topic message to subscriber"
                    );
                }
            }
        }

        self.counters.publishes.fetch_add(1, Ordering::Relaxed);
        self.counters.fanout_delivered.fetch_add(delivered as u64, Ordering::Relaxed);
        self.counters.fanout_failed.fetch_add(failed as u64, Ordering::Relaxed);

        TOPIC_PUBLISHES_TOTAL.inc();
        FANOUT_DELIVERIES_TOTAL.inc_by(delivered as u64);
        FANOUT_FAILURES_TOTAL.inc_by(failed as u64);

        tracing::info!(
            topic = %topic,
            attempted = subscribers.len(),
            delivered = delivered,
            failed = failed,
            "Published message to topic"
        );

        PublishResult {
            attempted: subscribers.len(),
            delivered,
            failed,
        }
    }

    /// Get service statistics
    pub fn stats(&self) -> ServiceStats {
        ServiceStats {
            enqueued: self.counters.enqueued.load(Ordering::Relaxed),
            dequeued: self.counters.dequeued.load(Ordering::Relaxed),
            cleared: self.counters.cleared.load(Ordering::Relaxed),
            publishes: self.counters.publishes.load(Ordering::Relaxed),
            fanout_delivered: self.counters.fanout_delivered.load(Ordering::Relaxed),
            fanout_failed: self.counters.fanout_failed.load(Ordering::Relaxed),
            store: self.store.stats(),
            subscriptions: self.registry.stats(),
        }
    }
}

impl<T> Default for QueueService<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
