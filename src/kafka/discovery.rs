//! Partition discovery
//!
//! Resolves the partition indices of a topic before any channel is built.
//! A statically configured list wins and is returned in the order given;
//! otherwise the broker is asked, bounded by `max_block`, and its answer is
//! sorted ascending so allocation over it is deterministic.

use tracing::{debug, warn};

use super::client::ProducerClient;
use super::error::ChannelError;
use super::partition::Partition;
use crate::config::KafkaConfig;

/// Resolve every partition of `topic`
///
/// # Errors
/// [`ChannelError::Discovery`] when the topic name is empty, the broker
/// cannot answer within `max_block`, reports an error for the topic, or
/// reports zero partitions.
pub fn discover_partitions(
    config: &KafkaConfig,
    producer: &dyn ProducerClient,
    topic: &str,
) -> Result<Vec<Partition>, ChannelError> {
    if topic.trim().is_empty() {
        return Err(discovery_error(topic, "topic name is empty"));
    }

    let indices = match config.static_partitions(topic) {
        Some(indices) => {
            debug!(topic = %topic, partitions = ?indices, "Using configured partitions");
            indices.to_vec()
        }
        None => {
            let mut indices = producer
                .partitions_for(topic, config.max_block)
                .map_err(|e| {
                    warn!(
                        topic = %topic,
                        max_block_ms = config.max_block.as_millis() as u64,
                        error = %e,
                        "Partition discovery failed"
                    );
                    discovery_error(topic, e.to_string())
                })?;
            debug!(topic = %topic, count = indices.len(), "Discovered partitions from broker");
            indices.sort_unstable();
            indices.dedup();
            indices
        }
    };

    if indices.is_empty() {
        return Err(discovery_error(topic, "topic has no partitions"));
    }

    Ok(Partition::for_topic(topic, &indices))
}

fn discovery_error(topic: &str, reason: impl Into<String>) -> ChannelError {
    ChannelError::Discovery {
        topic: topic.to_string(),
        reason: reason.into(),
    }
}
