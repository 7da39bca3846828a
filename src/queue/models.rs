//! Queue data models

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sender recorded on messages enqueued without an explicit origin
pub const DEFAULT_SENDER: &str = "system";

/// Priority assigned when the caller does not supply one
pub const DEFAULT_PRIORITY: i64 = 0;

/// What a bounded store does when a receiver's queue is already full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Refuse the new message
    #[default]
    Reject,
    /// Discard the lowest-ranked queued message to make room
    EvictLowest,
}

/// Configuration for a message store
#[derive(Debug, Clone, Default)]
pub struct QueueConfig {
    /// Maximum number of messages per receiver (0 = unbounded)
    pub max_queue_size_per_receiver: usize,
    /// Policy applied once a receiver reaches the bound
    pub overflow_policy: OverflowPolicy,
}

impl QueueConfig {
    /// Unbounded store, the default
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Store holding at most `capacity` messages per receiver
    pub fn bounded(capacity: usize, overflow_policy: OverflowPolicy) -> Self {
        Self {
            max_queue_size_per_receiver: capacity,
            overflow_policy,
        }
    }

    /// Per-receiver capacity, `None` when unbounded
    pub fn capacity(&self) -> Option<usize> {
        match self.max_queue_size_per_receiver {
            0 => None,
            n => Some(n),
        }
    }
}

/// A message addressed to a single receiver's inbox.
///
/// Immutable once created: the store only changes where a message lives,
/// never what it contains.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueuedMessage<T> {
    id: Uuid,
    sender: String,
    receiver: String,
    content: T,
    priority: i64,
    created_at: DateTime<Utc>,
    #[serde(skip)]
    sequence: u64,
}

impl<T> QueuedMessage<T> {
    /// Create a new message with a fresh id and the current timestamp.
    ///
    /// `sequence` must increase with creation order within one service; it
    /// breaks ties between equal priorities.
    pub fn new(
        sender: impl Into<String>,
        receiver: impl Into<String>,
        content: T,
        priority: i64,
        sequence: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender: sender.into(),
            receiver: receiver.into(),
            content,
            priority,
            created_at: Utc::now(),
            sequence,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn receiver(&self) -> &str {
        &self.receiver
    }

    pub fn content(&self) -> &T {
        &self.content
    }

    pub fn priority(&self) -> i64 {
        self.priority
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Consume the message, keeping only its payload
    pub fn into_content(self) -> T {
        self.content
    }

    /// Delivery rank: `Greater` means `self` is served before `other`.
    ///
    /// Higher priority wins; among equal priorities the older message
    /// (lower sequence) wins.
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        match self.priority.cmp(&other.priority) {
            Ordering::Equal => other.sequence.cmp(&self.sequence),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queued_message_new() {
        let msg = QueuedMessage::new("agent-1", "agent-2", "hello", 3, 7);

        assert!(!msg.id().is_nil());
        assert_eq!(msg.sender(), "agent-1");
        assert_eq!(msg.receiver(), "agent-2");
        assert_eq!(*msg.content(), "hello");
        assert_eq!(msg.priority(), 3);
        assert_eq!(msg.sequence(), 7);
    }

    #[test]
    fn test_ids_are_unique() {
        let a = QueuedMessage::new("s", "r", (), 0, 0);
        let b = QueuedMessage::new("s", "r", (), 0, 0);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_rank_prefers_higher_priority() {
        let low = QueuedMessage::new("s", "r", (), 0, 0);
        let high = QueuedMessage::new("s", "r", (), 5, 1);

        assert_eq!(high.rank_cmp(&low), Ordering::Greater);
        assert_eq!(low.rank_cmp(&high), Ordering::Less);
    }

    #[test]
    fn test_rank_prefers_older_on_tie() {
        let first = QueuedMessage::new("s", "r", (), 2, 10);
        let second = QueuedMessage::new("s", "r", (), 2, 11);

        assert_eq!(first.rank_cmp(&second), Ordering::Greater);
        assert_eq!(first.rank_cmp(&first), Ordering::Equal);
    }

    #[test]
    fn test_negative_priority_ranks_below_default() {
        let background = QueuedMessage::new("s", "r", (), -1, 0);
        let normal = QueuedMessage::new("s", "r", (), DEFAULT_PRIORITY, 1);

        assert_eq!(normal.rank_cmp(&background), Ordering::Greater);
    }

    #[test]
    fn test_config_capacity() {
        assert_eq!(QueueConfig::unbounded().capacity(), None);
        assert_eq!(
            QueueConfig::bounded(4, OverflowPolicy::EvictLowest).capacity(),
            Some(4)
        );
        assert_eq!(QueueConfig::bounded(0, OverflowPolicy::Reject).capacity(), None);
    }

    #[test]
    fn test_message_serialization_skips_sequence() {
        let msg = QueuedMessage::new("agent-1", "agent-2", "payload", 1, 42);
        let json = serde_json::to_string(&msg).unwrap();

        assert!(json.contains("\"sender\":\"agent-1\""));
        assert!(json.contains("\"content\":\"payload\""));
        assert!(!json.contains("sequence"));
    }
}
