//! kafka_pubsub
//!
//! A publish/subscribe adapter that runs a request/response workload over
//! Apache Kafka. Submitters publish queries onto a request topic and read
//! results from a response topic; processors do the reverse.
//!
//! The adapter owns three pieces of logic the broker does not provide:
//!
//! - **Partition allocation**: splitting a topic's partitions across N
//!   publisher/subscriber instances ([`kafka::allocation`])
//! - **Affinity routing**: pinning a request's response to a partition the
//!   submitter is reading ([`kafka::partitioner`])
//! - **Rate limiting**: a fixed-window cap on deliveries per subscriber
//!   ([`kafka::rate_limiter`])
//!
//! [`KafkaPubSub`] wires these together behind the broker-agnostic
//! [`pubsub`] traits.

pub mod config; // Configuration schema (YAML)
pub mod kafka; // Kafka transport: discovery, allocation, routing, clients
pub mod pubsub; // Broker-agnostic publish/subscribe contract

// Test utilities (only compiled in test builds)
#[cfg(test)]
pub mod testing;

pub use config::KafkaConfig;
pub use kafka::{
    allocate, ChannelError, KafkaPubSub, KafkaPublisher, KafkaSubscriber, Partition,
    PartitionGroup, PubSubError, Result,
};
pub use pubsub::{Context, PubSub, PubSubMessage, Publisher, ReplyTo, Subscriber};
