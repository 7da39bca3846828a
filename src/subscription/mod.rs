//! Topic subscriptions for fan-out delivery.

mod registry;

pub use registry::{SubscriptionRegistry, SubscriptionStats};
