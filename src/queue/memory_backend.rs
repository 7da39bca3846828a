//! In-memory message store using DashMap.
//!
//! This module provides a memory-based implementation of the `MessageStore` trait.
//! Messages are stored in memory and will be lost on process exit.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use dashmap::DashMap;

use crate::metrics::{
    MESSAGES_DEQUEUED_TOTAL, MESSAGES_DISCARDED_TOTAL, MESSAGES_ENQUEUED_TOTAL,
    MESSAGES_EVICTED_TOTAL, MESSAGES_REJECTED_TOTAL,
};

use super::backend::{MessageStore, QueueError, StoreStats};
use super::models::{OverflowPolicy, QueueConfig, QueuedMessage};

/// Heap wrapper ordering messages by delivery rank.
struct HeapEntry<T>(QueuedMessage<T>);

impl<T> PartialEq for HeapEntry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T> Eq for HeapEntry<T> {}

impl<T> PartialOrd for HeapEntry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for HeapEntry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.rank_cmp(&other.0)
    }
}

/// In-memory message store.
///
/// Uses `DashMap` for concurrent access to per-receiver queues. Locking is
/// per shard: receivers hashed to the same shard contend, others do not, and
/// there is never a store-wide lock.
/// Each receiver has a `BinaryHeap` ordered by priority, then age.
/// Queues are created on first enqueue and removed once drained.
pub struct MemoryMessageStore<T> {
    /// Per-receiver priority queues
    queues: DashMap<String, BinaryHeap<HeapEntry<T>>>,
    /// Configuration
    config: QueueConfig,
}

impl<T> MemoryMessageStore<T> {
    /// Create a new memory store with the given configuration.
    pub fn new(config: QueueConfig) -> Self {
        Self {
            queues: DashMap::new(),
            config,
        }
    }

    /// Create an unbounded memory store.
    pub fn unbounded() -> Self {
        Self::new(QueueConfig::unbounded())
    }
}

impl<T> Default for MemoryMessageStore<T> {
    fn default() -> Self {
        Self::unbounded()
    }
}

/// Remove the lowest-ranked entry. O(n), only used on overflow.
fn evict_lowest<T>(queue: &mut BinaryHeap<HeapEntry<T>>) -> Option<QueuedMessage<T>> {
    let mut entries = std::mem::take(queue).into_vec();
    let lowest = (0..entries.len()).min_by(|&a, &b| entries[a].cmp(&entries[b]));
    let evicted = lowest.map(|index| entries.swap_remove(index).0);
    *queue = BinaryHeap::from(entries);
    evicted
}

impl<T: Clone + Send + Sync> MessageStore<T> for MemoryMessageStore<T> {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn enqueue(&self, receiver: &str, message: QueuedMessage<T>) -> Result<(), QueueError> {
        let mut queue = self.queues.entry(receiver.to_string()).or_default();

        if let Some(capacity) = self.config.capacity() {
            if queue.len() >= capacity {
                match self.config.overflow_policy {
                    OverflowPolicy::Reject => {
                        MESSAGES_REJECTED_TOTAL.inc();
                        tracing::warn!(
                            receiver = %receiver,
                            message_id = %message.id(),
                            capacity = capacity,
                            "Rejected message for full queue"
                        );
                        return Err(QueueError::QueueFull {
                            receiver: receiver.to_string(),
                            capacity,
                        });
                    }
                    OverflowPolicy::EvictLowest => {
                        // Incoming message is newest, so it loses ties on priority
                        let outranks_lowest = queue
                            .iter()
                            .min()
                            .map_or(true, |lowest| message.rank_cmp(&lowest.0) == Ordering::Greater);

                        if !outranks_lowest {
                            MESSAGES_EVICTED_TOTAL.inc();
                            tracing::debug!(
                                receiver = %receiver,
                                evicted_id = %message.id(),
                                evicted_priority = message.priority(),
                                queue_size = queue.len(),
                                "Dropped incoming message ranked below full queue"
                            );
                            return Ok(());
                        }

                        if let Some(evicted) = evict_lowest(&mut queue) {
                            MESSAGES_EVICTED_TOTAL.inc();
                            tracing::debug!(
                                receiver = %receiver,
                                evicted_id = %evicted.id(),
                                evicted_priority = evicted.priority(),
                                queue_size = queue.len(),
                                "Evicted lowest-ranked message from full queue"
                            );
                        }
                    }
                }
            }
        }

        let message_id = message.id();
        let priority = message.priority();
        queue.push(HeapEntry(message));
        MESSAGES_ENQUEUED_TOTAL.inc();

        tracing::debug!(
            receiver = %receiver,
            message_id = %message_id,
            priority = priority,
            queue_size = queue.len(),
            "Message enqueued"
        );

        Ok(())
    }

    fn dequeue(&self, receiver: &str) -> Option<QueuedMessage<T>> {
        let mut queue = self.queues.get_mut(receiver)?;
        let entry = queue.pop();
        let drained = queue.is_empty();
        drop(queue);

        // A concurrent enqueue may have refilled the queue since the guard was dropped
        if drained {
            self.queues.remove_if(receiver, |_, q| q.is_empty());
        }

        let message = entry?.0;
        MESSAGES_DEQUEUED_TOTAL.inc();
        tracing::debug!(
            receiver = %receiver,
            message_id = %message.id(),
            priority = message.priority(),
            "Message dequeued"
        );

        Some(message)
    }

    fn peek(&self, receiver: &str) -> Option<QueuedMessage<T>> {
        self.queues
            .get(receiver)
            .and_then(|q| q.peek().map(|entry| entry.0.clone()))
    }

    fn size(&self, receiver: &str) -> usize {
        self.queues.get(receiver).map(|q| q.len()).unwrap_or(0)
    }

    fn clear(&self, receiver: &str) -> usize {
        let removed = self
            .queues
            .remove(receiver)
            .map(|(_, q)| q.len())
            .unwrap_or(0);

        if removed > 0 {
            MESSAGES_DISCARDED_TOTAL.inc_by(removed as u64);
            tracing::info!(
                receiver = %receiver,
                removed = removed,
                "Cleared receiver queue"
            );
        }

        removed
    }

    fn stats(&self) -> StoreStats {
        let mut total_messages = 0;
        let mut receivers_with_queue = 0;
        let mut max_queue_size = 0;

        for entry in self.queues.iter() {
            let size = entry.len();
            total_messages += size;
            receivers_with_queue += 1;
            max_queue_size = max_queue_size.max(size);
        }

        StoreStats {
            backend_type: self.backend_name().to_string(),
            total_messages,
            receivers_with_queue,
            max_queue_size,
            max_queue_size_config: self.config.max_queue_size_per_receiver,
            overflow_policy: self.config.overflow_policy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(receiver: &str, priority: i64, sequence: u64) -> QueuedMessage<serde_json::Value> {
        QueuedMessage::new(
            "test-sender",
            receiver,
            json!({"seq": sequence}),
            priority,
            sequence,
        )
    }

    fn seq_of(message: &QueuedMessage<serde_json::Value>) -> u64 {
        message.content()["seq"].as_u64().unwrap()
    }

    #[test]
    fn test_unknown_receiver_is_empty() {
        let store: MemoryMessageStore<serde_json::Value> = MemoryMessageStore::unbounded();

        assert_eq!(store.size("nobody"), 0);
        assert!(store.peek("nobody").is_none());
        assert!(store.dequeue("nobody").is_none());
        assert_eq!(store.clear("nobody"), 0);
    }

    #[test]
    fn test_enqueue_success() {
        let store = MemoryMessageStore::unbounded();

        for seq in 0..5 {
            store.enqueue("agent-1", message("agent-1", 0, seq)).unwrap();
        }

        assert_eq!(store.size("agent-1"), 5);
    }

    #[test]
    fn test_dequeue_highest_priority_first() {
        let store = MemoryMessageStore::unbounded();

        store.enqueue("agent-1", message("agent-1", 0, 0)).unwrap();
        store.enqueue("agent-1", message("agent-1", 5, 1)).unwrap();
        store.enqueue("agent-1", message("agent-1", -2, 2)).unwrap();
        store.enqueue("agent-1", message("agent-1", 3, 3)).unwrap();

        let order: Vec<i64> = std::iter::from_fn(|| store.dequeue("agent-1"))
            .map(|m| m.priority())
            .collect();
        assert_eq!(order, vec![5, 3, 0, -2]);
    }

    #[test]
    fn test_equal_priorities_are_fifo() {
        let store = MemoryMessageStore::unbounded();

        for seq in 0..6 {
            store.enqueue("agent-1", message("agent-1", 1, seq)).unwrap();
        }

        let order: Vec<u64> = std::iter::from_fn(|| store.dequeue("agent-1"))
            .map(|m| seq_of(&m))
            .collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_peek_is_idempotent() {
        let store = MemoryMessageStore::unbounded();

        store.enqueue("agent-1", message("agent-1", 0, 0)).unwrap();
        store.enqueue("agent-1", message("agent-1", 9, 1)).unwrap();

        let first = store.peek("agent-1").unwrap();
        let second = store.peek("agent-1").unwrap();

        assert_eq!(first.id(), second.id());
        assert_eq!(first.priority(), 9);
        assert_eq!(store.size("agent-1"), 2);

        let dequeued = store.dequeue("agent-1").unwrap();
        assert_eq!(dequeued.id(), first.id());
    }

    #[test]
    fn test_drained_queue_is_removed() {
        let store = MemoryMessageStore::unbounded();

        store.enqueue("agent-1", message("agent-1", 0, 0)).unwrap();
        assert_eq!(store.stats().receivers_with_queue, 1);

        store.dequeue("agent-1").unwrap();
        assert_eq!(store.stats().receivers_with_queue, 0);
        assert!(store.dequeue("agent-1").is_none());
    }

    #[test]
    fn test_clear_returns_removed_count() {
        let store = MemoryMessageStore::unbounded();

        for seq in 0..4 {
            store.enqueue("agent-1", message("agent-1", 0, seq)).unwrap();
        }
        store.enqueue("agent-2", message("agent-2", 0, 4)).unwrap();

        assert_eq!(store.clear("agent-1"), 4);
        assert_eq!(store.size("agent-1"), 0);
        assert_eq!(store.clear("agent-1"), 0);
        assert_eq!(store.size("agent-2"), 1);
    }

    #[test]
    fn test_bounded_reject() {
        let store = MemoryMessageStore::new(QueueConfig::bounded(2, OverflowPolicy::Reject));

        store.enqueue("agent-1", message("agent-1", 0, 0)).unwrap();
        store.enqueue("agent-1", message("agent-1", 0, 1)).unwrap();

        let result = store.enqueue("agent-1", message("agent-1", 10, 2));
        assert!(matches!(
            result,
            Err(QueueError::QueueFull { ref receiver, capacity: 2 }) if receiver == "agent-1"
        ));
        assert_eq!(store.size("agent-1"), 2);
        assert_eq!(store.peek("agent-1").unwrap().priority(), 0);

        // Other receivers have their own bound
        store.enqueue("agent-2", message("agent-2", 0, 3)).unwrap();
    }

    #[test]
    fn test_bounded_evict_lowest() {
        let store = MemoryMessageStore::new(QueueConfig::bounded(3, OverflowPolicy::EvictLowest));

        store.enqueue("agent-1", message("agent-1", 5, 0)).unwrap();
        store.enqueue("agent-1", message("agent-1", 1, 1)).unwrap();
        store.enqueue("agent-1", message("agent-1", 1, 2)).unwrap();

        // Evicts priority 1, seq 2 (newest of the lowest priority)
        store.enqueue("agent-1", message("agent-1", 3, 3)).unwrap();

        assert_eq!(store.size("agent-1"), 3);
        let order: Vec<u64> = std::iter::from_fn(|| store.dequeue("agent-1"))
            .map(|m| seq_of(&m))
            .collect();
        assert_eq!(order, vec![0, 3, 1]);
    }

    #[test]
    fn test_bounded_evict_drops_lowest_incoming() {
        let store = MemoryMessageStore::new(QueueConfig::bounded(1, OverflowPolicy::EvictLowest));

        store.enqueue("agent-1", message("agent-1", 100, 0)).unwrap();
        let evicted = MESSAGES_EVICTED_TOTAL.get();
        store.enqueue("agent-1", message("agent-1", -5, 1)).unwrap();
        assert!(MESSAGES_EVICTED_TOTAL.get() >= evicted + 1);

        assert_eq!(store.size("agent-1"), 1);
        let survivor = store.dequeue("agent-1").unwrap();
        assert_eq!(survivor.priority(), 100);
        assert_eq!(seq_of(&survivor), 0);
    }

    #[test]
    fn test_bounded_evict_keeps_older_on_equal_priority() {
        let store = MemoryMessageStore::new(QueueConfig::bounded(2, OverflowPolicy::EvictLowest));

        store.enqueue("agent-1", message("agent-1", 2, 0)).unwrap();
        store.enqueue("agent-1", message("agent-1", 1, 1)).unwrap();
        store.enqueue("agent-1", message("agent-1", 1, 2)).unwrap();

        let order: Vec<u64> = std::iter::from_fn(|| store.dequeue("agent-1"))
            .map(|m| seq_of(&m))
            .collect();
        assert_eq!(order, vec![0, 1]);
    }

    #[test]
    fn test_evict_lowest_empty_heap() {
        let mut heap: BinaryHeap<HeapEntry<()>> = BinaryHeap::new();
        assert!(evict_lowest(&mut heap).is_none());
        assert!(heap.is_empty());
    }

    #[test]
    fn test_multiple_receivers() {
        let store = MemoryMessageStore::unbounded();

        for seq in 0..3 {
            store.enqueue("agent-1", message("agent-1", 0, seq)).unwrap();
        }
        for seq in 3..8 {
            store.enqueue("agent-2", message("agent-2", 0, seq)).unwrap();
        }

        assert_eq!(store.size("agent-1"), 3);
        assert_eq!(store.size("agent-2"), 5);

        let stats = store.stats();
        assert_eq!(stats.total_messages, 8);
        assert_eq!(stats.receivers_with_queue, 2);
    }

    #[test]
    fn test_stats() {
        let store = MemoryMessageStore::new(QueueConfig::bounded(100, OverflowPolicy::Reject));

        for seq in 0..3 {
            store.enqueue("agent-1", message("agent-1", 0, seq)).unwrap();
        }
        for seq in 3..10 {
            store.enqueue("agent-2", message("agent-2", 0, seq)).unwrap();
        }

        let stats = store.stats();
        assert_eq!(stats.backend_type, "memory");
        assert_eq!(stats.total_messages, 10);
        assert_eq!(stats.receivers_with_queue, 2);
        assert_eq!(stats.max_queue_size, 7);
        assert_eq!(stats.max_queue_size_config, 100);
        assert_eq!(stats.overflow_policy, OverflowPolicy::Reject);
    }
}
