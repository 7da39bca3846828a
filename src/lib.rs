// Shared components
pub mod config;
pub mod error;
pub mod metrics;
pub mod telemetry;

// Core
pub mod queue;
pub mod service;
pub mod subscription;

pub use queue::{MessageStore, QueueError, QueuedMessage};
pub use service::{PublishResult, QueueService};
pub use subscription::SubscriptionRegistry;
