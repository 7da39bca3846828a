//! Message store factory

use std::sync::Arc;

use crate::config::QueueSettings;

use super::backend::MessageStore;
use super::memory_backend::MemoryMessageStore;
use super::models::QueueConfig;

/// Create a message store based on configuration.
///
/// `"memory"` is the only implemented backend. Any other name is treated as a
/// request for a persistent store, which does not exist yet; a warning is
/// logged and the memory store is returned instead.
///
/// # Example
///
/// ```rust,ignore
/// let store: Arc<dyn MessageStore<String>> = create_message_store(&settings.queue);
/// ```
pub fn create_message_store<T>(settings: &QueueSettings) -> Arc<dyn MessageStore<T>>
where
    T: Clone + Send + Sync + 'static,
{
    let config = QueueConfig {
        max_queue_size_per_receiver: settings.max_size_per_receiver,
        overflow_policy: settings.overflow_policy,
    };

    match settings.backend.as_str() {
        "memory" => {
            tracing::info!(
                backend = "memory",
                max_size_per_receiver = config.max_queue_size_per_receiver,
                overflow_policy = ?config.overflow_policy,
                "Creating memory message store"
            );
        }
        other => {
            tracing::warn!(
                backend = %other,
                "Persistent message store is not implemented, falling back to memory"
            );
        }
    }

    Arc::new(MemoryMessageStore::<T>::new(config))
}
