//! Caller-facing queue service: direct messaging plus topic fan-out.

mod queue_service;

pub use queue_service::{
    topic_sender, PublishResult, QueueService, ServiceStats, TOPIC_SENDER_PREFIX,
};
