use std::collections::HashMap;

use dashmap::DashMap;

/// Topic → subscriber index.
///
/// Each topic maps to an ordered, duplicate-free list of agent ids in
/// first-subscribed order. Topics appear on first subscribe and disappear
/// once their last subscriber leaves, so an unknown topic and an abandoned
/// one look the same to readers.
pub struct SubscriptionRegistry {
    /// topic -> subscribers (insertion order)
    topics: DashMap<String, Vec<String>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self {
            topics: DashMap::new(),
        }
    }

    /// Subscribe an agent to a topic.
    ///
    /// Returns `false` if the agent was already subscribed.
    pub fn subscribe(&self, topic: &str, agent_id: &str) -> bool {
        let mut subscribers = self.topics.entry(topic.to_string()).or_default();

        if subscribers.iter().any(|s| s == agent_id) {
            return false;
        }
        subscribers.push(agent_id.to_string());

        tracing::debug!(
            topic = %topic,
            agent_id = %agent_id,
            subscribers = subscribers.len(),
            "Subscribed to topic"
        );

        true
    }

    /// Unsubscribe an agent from a topic.
    ///
    /// Returns `false` if the topic is unknown or the agent was not subscribed.
    pub fn unsubscribe(&self, topic: &str, agent_id: &str) -> bool {
        let Some(mut subscribers) = self.topics.get_mut(topic) else {
            return false;
        };

        let Some(position) = subscribers.iter().position(|s| s == agent_id) else {
            return false;
        };
        subscribers.remove(position);

        if subscribers.is_empty() {
            drop(subscribers);
            self.topics.remove_if(topic, |_, s| s.is_empty());
        }

        tracing::debug!(topic = %topic, agent_id = %agent_id, "Unsubscribed from topic");

        true
    }

    /// Remove an agent from every topic.
    ///
    /// Returns the number of topics the agent left.
    pub fn unsubscribe_all(&self, agent_id: &str) -> usize {
        let mut removed = 0;

        for mut entry in self.topics.iter_mut() {
            let before = entry.value().len();
            entry.value_mut().retain(|s| s != agent_id);
            removed += before - entry.value().len();
        }

        // Clean up empty topics
        self.topics.retain(|_, subscribers| !subscribers.is_empty());

        if removed > 0 {
            tracing::info!(agent_id = %agent_id, topics = removed, "Unsubscribed from all topics");
        }

        removed
    }

    /// Snapshot of a topic's subscribers, in subscription order.
    ///
    /// The list is copied under the topic's lock; later registry changes do
    /// not affect it.
    pub fn subscribers(&self, topic: &str) -> Vec<String> {
        self.topics
            .get(topic)
            .map(|subscribers| subscribers.value().clone())
            .unwrap_or_default()
    }

    /// Topics an agent is subscribed to, sorted by name
    pub fn topics_for(&self, agent_id: &str) -> Vec<String> {
        let mut topics: Vec<String> = self
            .topics
            .iter()
            .filter(|entry| entry.value().iter().any(|s| s == agent_id))
            .map(|entry| entry.key().clone())
            .collect();
        topics.sort();
        topics
    }

    /// Number of topics with at least one subscriber
    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }

    /// Get statistics
    pub fn stats(&self) -> SubscriptionStats {
        let mut topics = HashMap::new();
        let mut total_subscriptions = 0;

        for entry in self.topics.iter() {
            total_subscriptions += entry.value().len();
            topics.insert(entry.key().clone(), entry.value().len());
        }

        SubscriptionStats {
            total_topics: topics.len(),
            total_subscriptions,
            topics,
        }
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SubscriptionStats {
    pub total_topics: usize,
    pub total_subscriptions: usize,
    /// topic -> subscriber count
    pub topics: HashMap<String, usize>,
}
