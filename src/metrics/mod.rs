//! Prometheus metrics for the agent message queue.
//!
//! Counters are registered in the default registry and shared by every
//! `QueueService` instance in the process:
//! - Message metrics (enqueued, dequeued, discarded by clear)
//! - Overflow metrics (evicted, rejected) for bounded stores
//! - Topic metrics (publishes, fan-out deliveries and failures)

use lazy_static::lazy_static;
use prometheus::{register_int_counter, Encoder, IntCounter, TextEncoder};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "amq";

lazy_static! {
    // ============================================================================
    // Message Metrics
    // ============================================================================

    /// Messages inserted into a receiver queue
    pub static ref MESSAGES_ENQUEUED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_messages_enqueued_total", METRIC_PREFIX),
        "Total messages enqueued"
    ).unwrap();

    /// Messages handed to a caller by dequeue
    pub static ref MESSAGES_DEQUEUED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_messages_dequeued_total", METRIC_PREFIX),
        "Total messages dequeued"
    ).unwrap();

    /// Messages discarded by clearing a queue
    pub static ref MESSAGES_DISCARDED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_messages_discarded_total", METRIC_PREFIX),
        "Total messages discarded by clearing a queue"
    ).unwrap();

    // ============================================================================
    // Overflow Metrics
    // ============================================================================

    /// Messages evicted to make room in a full queue
    pub static ref MESSAGES_EVICTED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_messages_evicted_total", METRIC_PREFIX),
        "Total messages evicted from full queues"
    ).unwrap();

    /// Messages refused because the queue was full
    pub static ref MESSAGES_REJECTED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_messages_rejected_total", METRIC_PREFIX),
        "Total messages rejected by full queues"
    ).unwrap();

    // ============================================================================
    // Topic Metrics
    // ============================================================================

    /// Publish calls
    pub static ref TOPIC_PUBLISHES_TOTAL: IntCounter = register_int_counter!(
        format!("{}_topic_publishes_total", METRIC_PREFIX),
        "Total publish calls"
    ).unwrap();

    /// Per-subscriber copies enqueued by publish
    pub static ref FANOUT_DELIVERIES_TOTAL: IntCounter = register_int_counter!(
        format!("{}_fanout_deliveries_total", METRIC_PREFIX),
        "Total messages delivered to topic subscribers"
    ).unwrap();

    /// Per-subscriber copies that could not be enqueued
    pub static ref FANOUT_FAILURES_TOTAL: IntCounter = register_int_counter!(
        format!("{}_fanout_failures_total", METRIC_PREFIX),
        "Total fan-out deliveries that failed"
    ).unwrap();
}

/// Encode all metrics in Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}
