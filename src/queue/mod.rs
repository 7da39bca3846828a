//! Per-receiver priority message queues.
//!
//! Every receiver (agent id) owns an inbox whose messages are served highest
//! priority first, oldest first among equal priorities.
//!
//! # Architecture
//!
//! Storage sits behind the `MessageStore` trait so a durable implementation
//! can be plugged in later:
//!
//! - `MemoryMessageStore`: In-memory storage using DashMap (default, and the
//!   only implementation)
//!
//! Use `create_message_store()` to create a store from configuration.

pub mod backend;
mod factory;
pub mod memory_backend;
mod models;

pub use backend::{MessageStore, QueueError, StoreStats};
pub use factory::create_message_store;
pub use memory_backend::MemoryMessageStore;
pub use models::{OverflowPolicy, QueueConfig, QueuedMessage, DEFAULT_PRIORITY, DEFAULT_SENDER};
