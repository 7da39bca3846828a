use std::sync::Arc;

use anyhow::Result;

use agent_message_queue::config::Settings;
use agent_message_queue::metrics::encode_metrics;
use agent_message_queue::queue::DEFAULT_SENDER;
use agent_message_queue::telemetry::init_tracing;
use agent_message_queue::QueueService;

/// Producers spawned by the concurrent run
const PRODUCERS: usize = 4;

/// Messages each producer sends
const MESSAGES_PER_PRODUCER: usize = 25;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let settings = Settings::new()?;

    // Initialize tracing
    init_tracing(&settings.logging);
    tracing::info!(backend = %settings.queue.backend, "Configuration loaded");

    let service = Arc::new(QueueService::<String>::from_settings(&settings));

    direct_messages(&service)?;
    topic_fanout(&service);
    concurrent_producers(service.clone()).await?;

    let stats = serde_json::to_string(&service.stats())?;
    tracing::info!(stats = %stats, "Demo complete");
    let metrics = encode_metrics()?;
    tracing::debug!(metrics = %metrics, "Prometheus metrics");

    Ok(())
}

/// Two messages to one inbox come back in priority order.
fn direct_messages(service: &QueueService<String>) -> agent_message_queue::error::Result<()> {
    service.enqueue("agent-1", "Hello".to_string())?;
    service.enqueue_with("agent-1", "World".to_string(), DEFAULT_SENDER, 5)?;

    while let Some(message) = service.dequeue("agent-1") {
        let encoded = serde_json::to_string(&message)?;
        tracing::info!(receiver = "agent-1", message = %encoded, "Got message");
    }

    Ok(())
}

/// One publish lands in every subscriber's inbox.
fn topic_fanout(service: &QueueService<String>) {
    service.subscribe("alerts", "agent-2");
    service.subscribe("alerts", "agent-3");

    let delivered = service.publish("alerts", "fire".to_string());
    tracing::info!(topic = "alerts", delivered = delivered, "Published alert");

    for agent in service.subscribers("alerts") {
        if let Some(message) = service.dequeue(&agent) {
            tracing::info!(
                receiver = %agent,
                sender = %message.sender(),
                content = %message.content(),
                "Got topic message"
            );
        }
    }
}

/// Several producers fill their own inboxes in parallel.
async fn concurrent_producers(service: Arc<QueueService<String>>) -> Result<()> {
    let mut handles = Vec::with_capacity(PRODUCERS);

    for producer in 0..PRODUCERS {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            let receiver = format!("worker-{}", producer);
            let sender = format!("producer-{}", producer);
            for n in 0..MESSAGES_PER_PRODUCER {
                service.enqueue_with(&receiver, format!("job-{}", n), &sender, (n % 3) as i64)?;
            }
            Ok::<_, agent_message_queue::QueueError>(receiver)
        }));
    }

    for handle in handles {
        let receiver = handle.await??;
        let drained = service.clear_queue(&receiver);
        tracing::info!(receiver = %receiver, drained = drained, "Producer finished");
    }

    Ok(())
}
