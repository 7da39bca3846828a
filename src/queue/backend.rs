//! Backend trait for message storage.
//!
//! This module defines the abstraction layer for per-receiver message stores,
//! allowing different storage implementations to be plugged into the queue
//! service. Only the in-memory store exists today; a durable store would
//! implement the same trait.

use serde::Serialize;
use thiserror::Error;

use super::models::{OverflowPolicy, QueuedMessage};

/// Errors that can occur while storing a message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// Receiver's queue reached its bound under the `reject` policy
    #[error("Queue full for receiver {receiver} (capacity: {capacity})")]
    QueueFull { receiver: String, capacity: usize },
}

/// Statistics about a message store.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    /// Backend type identifier
    pub backend_type: String,

    /// Total number of messages across all receivers
    pub total_messages: usize,

    /// Number of receivers with at least one queued message
    pub receivers_with_queue: usize,

    /// Largest queue held by any single receiver
    pub max_queue_size: usize,

    /// Configured per-receiver bound (0 = unbounded)
    pub max_queue_size_config: usize,

    /// Policy applied when a bounded queue is full
    pub overflow_policy: OverflowPolicy,
}

/// Per-receiver priority message store.
///
/// # Ordering
///
/// `dequeue` and `peek` must return the message with the highest priority;
/// equal priorities are served oldest first (see [`QueuedMessage::rank_cmp`]).
///
/// # Lookups
///
/// Unknown receivers are valid input. Read operations treat them as empty
/// queues and never fail.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` and serialise operations on the same
/// receiver without holding a store-wide lock. The lock need not be per
/// receiver: the memory store locks per `DashMap` shard, so unrelated
/// receivers in the same shard still contend.
pub trait MessageStore<T>: Send + Sync {
    /// Backend type identifier
    fn backend_name(&self) -> &'static str;

    /// Insert a message into `receiver`'s queue, creating the queue on first use.
    ///
    /// Under `evict_lowest` a full queue keeps the higher-ranked of the
    /// incoming message and its current lowest entry; the other is dropped.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::QueueFull` when the store is bounded, the queue is
    /// full and the overflow policy is `reject`.
    fn enqueue(&self, receiver: &str, message: QueuedMessage<T>) -> Result<(), QueueError>;

    /// Remove and return the highest-ranked message for `receiver`.
    fn dequeue(&self, receiver: &str) -> Option<QueuedMessage<T>>;

    /// Return the highest-ranked message for `receiver` without removing it.
    fn peek(&self, receiver: &str) -> Option<QueuedMessage<T>>;

    /// Number of messages queued for `receiver`.
    fn size(&self, receiver: &str) -> usize;

    /// Discard every message queued for `receiver`.
    ///
    /// # Returns
    ///
    /// The number of messages removed.
    fn clear(&self, receiver: &str) -> usize;

    /// Get store statistics.
    fn stats(&self) -> StoreStats;
}
