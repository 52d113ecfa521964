// Broker client abstraction layer for kafka_pubsub
//
// This module defines the traits every publisher and subscriber talks to the
// broker through. Separating them from the pub-sub logic gives:
// 1. Testability - discovery, routing and buffering can be tested with mocks
// 2. Clean separation of concerns - pub-sub logic doesn't know about librdkafka
// 3. Ownership clarity - every instance owns exactly one boxed handle
//
// The production implementation lives in `librdkafka.rs`.

pub mod librdkafka;

use std::time::Duration;

use super::error::ClientError;
use super::partition::Partition;
use crate::config::KafkaConfig;

pub use librdkafka::{RdKafkaClients, RdKafkaConsumer, RdKafkaProducer};

/// A record to be produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRecord {
    /// Destination topic
    pub topic: String,
    /// Destination partition (None = broker's partitioner decides by key)
    pub partition: Option<i32>,
    /// Record key
    pub key: String,
    /// Record value (nullable)
    pub payload: Option<Vec<u8>>,
    /// Record headers in insertion order
    pub headers: Vec<(String, Vec<u8>)>,
}

/// A record received from the broker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumedRecord {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    /// Record key (nullable)
    pub key: Option<Vec<u8>>,
    /// Record value (nullable)
    pub payload: Option<Vec<u8>>,
    /// Record headers; headers with a null value are dropped
    pub headers: Vec<(String, Vec<u8>)>,
}

/// Producer-side broker handle
///
/// Owned by exactly one publisher (or by the factory while discovering).
pub trait ProducerClient: Send {
    /// Partition indices of a topic, ascending
    ///
    /// Blocks for at most `timeout`; no metadata before then is an error.
    fn partitions_for(&self, topic: &str, timeout: Duration) -> Result<Vec<i32>, ClientError>;

    /// Produce one record and wait for its delivery report
    fn send(&self, record: &OutboundRecord) -> Result<(), ClientError>;

    /// Wait for in-flight records
    fn flush(&self, timeout: Duration) -> Result<(), ClientError>;
}

/// Consumer-side broker handle
///
/// Owned by exactly one subscriber.
pub trait ConsumerClient: Send {
    /// Manually assign partitions, replacing any previous assignment
    fn assign(&mut self, partitions: &[Partition]) -> Result<(), ClientError>;

    /// Fetch up to `max_records`, waiting at most `timeout` for the first one
    fn poll(
        &mut self,
        timeout: Duration,
        max_records: usize,
    ) -> Result<Vec<ConsumedRecord>, ClientError>;

    /// Commit the offsets of everything polled so far
    fn commit(&mut self) -> Result<(), ClientError>;

    /// Currently assigned partitions
    fn assignment(&self) -> Result<Vec<Partition>, ClientError>;

    /// Drop the assignment; the handle is unusable afterwards
    fn close(&mut self);
}

/// Creates independent client handles
///
/// Every call returns a fresh handle; handles are never shared between
/// instances.
pub trait ClientFactory: Send + Sync {
    fn producer(&self, config: &KafkaConfig) -> Result<Box<dyn ProducerClient>, ClientError>;

    fn consumer(&self, config: &KafkaConfig) -> Result<Box<dyn ConsumerClient>, ClientError>;
}
