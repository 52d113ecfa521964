//! Affinity routing
//!
//! Lets a submitter correlate a request with its response through partition
//! placement. The submission publisher hashes the message id onto one of the
//! response partitions its own subscriber reads, stamps that partition on the
//! request, and the processing side answers on exactly that partition.
//!
//! Hashing uses the `murmur2` crate with `KAFKA_SEED`, matching Apache
//! Kafka's default partitioner, so the placement of a keyed request agrees
//! with what a Kafka client would choose for the same key and partition
//! count.
//!
//! With routing disabled, neither side pins a partition: the broker's own
//! key-hash partitioner places requests and responses, and submitters have to
//! read the whole response topic.

use murmur2::{murmur2, KAFKA_SEED};

use super::error::RoutingError;
use super::partition::Partition;
use crate::pubsub::ReplyTo;

/// Map a routing key onto a partition position
///
/// # Arguments
/// * `key` - Routing key (the message id)
/// * `partition_count` - Number of candidate partitions (must be > 0)
///
/// # Returns
/// Position in `0..partition_count`. Identical inputs always give the same
/// position.
pub fn route_outbound(key: &[u8], partition_count: usize) -> Result<usize, RoutingError> {
    if partition_count == 0 {
        return Err(RoutingError::ZeroPartitions);
    }
    let hash = murmur2(key, KAFKA_SEED);
    // Mask sign bit (& 0x7fffffff) then modulo
    // This matches Kafka's Utils.toPositive(Utils.murmur2(key)) % numPartitions
    Ok((hash & 0x7fff_ffff) as usize % partition_count)
}

/// Chooses request and response partitions for a message id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AffinityRouter {
    enabled: bool,
}

impl AffinityRouter {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Partition a request is written to
    ///
    /// `None` leaves placement to the broker's partitioner.
    pub fn request_partition<'a>(
        &self,
        key: &str,
        write_partitions: &'a [Partition],
    ) -> Result<Option<&'a Partition>, RoutingError> {
        if !self.enabled {
            return Ok(None);
        }
        let position = route_outbound(key.as_bytes(), write_partitions.len())?;
        Ok(Some(&write_partitions[position]))
    }

    /// Response address stamped on a request
    ///
    /// Picks one of the partitions the submitting instance reads, so the
    /// response lands where that instance is listening.
    pub fn reply_to(
        &self,
        key: &str,
        response_topic: &str,
        receive_partitions: &[Partition],
    ) -> Result<ReplyTo, RoutingError> {
        if !self.enabled {
            return Ok(ReplyTo {
                topic: response_topic.to_string(),
                partition: None,
            });
        }
        let position = route_outbound(key.as_bytes(), receive_partitions.len())?;
        let partition = &receive_partitions[position];
        Ok(ReplyTo {
            topic: partition.topic.clone(),
            partition: Some(partition.index),
        })
    }

    /// The single partition a submission instance listens on for this response
    pub fn route_inbound(&self, response_topic: &str, partition_index: i32) -> Partition {
        Partition::new(response_topic, partition_index)
    }

    /// Partition a response must be written to
    ///
    /// `None` when routing is disabled or the request carried no partition.
    pub fn response_partition(&self, reply_to: &ReplyTo) -> Option<Partition> {
        if !self.enabled {
            return None;
        }
        reply_to
            .partition
            .map(|index| self.route_inbound(&reply_to.topic, index))
    }
}
