//! Pub-sub error types
//!
//! Construction-time failures (discovery, allocation and broker client
//! setup) are grouped under a
//! single [`PubSubError::ChannelConstruction`] category so callers only need
//! one arm to decide whether a channel set could be built. Rate-limit
//! rejections are not errors and never appear here.

use thiserror::Error;

/// Errors that can occur while building or using pub-sub channels
#[derive(Error, Debug)]
pub enum PubSubError {
    /// A required setting is missing or malformed
    #[error("Configuration error: {0}")]
    Config(String),

    /// No context has been selected yet
    #[error("No pub-sub context selected; call switch_context first")]
    NoContext,

    /// Publishers or subscribers could not be constructed
    #[error("Channel construction failed: {0}")]
    ChannelConstruction(#[from] ChannelError),

    /// Broker client call failed after construction
    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    /// A message could not be delivered
    #[error("Failed to publish message {id} to {topic}: {source}")]
    Publish {
        id: String,
        topic: String,
        #[source]
        source: ClientError,
    },

    /// The consumer failed while polling or committing
    #[error("Consumer error: {0}")]
    Consume(ClientError),

    /// A message could not be routed
    #[error("Routing error: {0}")]
    Routing(#[from] RoutingError),
}

/// Invalid router input
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RoutingError {
    /// There is no partition to route to
    #[error("cannot route over zero partitions")]
    ZeroPartitions,
}

/// Causes of a failed channel construction
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Partition metadata could not be obtained before the deadline
    #[error("Partition discovery for topic '{topic}' failed: {reason}")]
    Discovery { topic: String, reason: String },

    /// The allocator rejected its input
    #[error("Partition allocation failed: {0}")]
    Allocation(#[from] AllocationError),

    /// A broker client could not be created or assigned
    #[error("Broker client setup failed: {0}")]
    Client(#[from] ClientError),
}

/// Invalid allocator input
#[derive(Error, Debug, PartialEq, Eq)]
pub enum AllocationError {
    /// Zero instances were requested
    #[error("requested instance count must be positive")]
    ZeroInstances,

    /// There is nothing to allocate
    #[error("cannot allocate an empty partition set")]
    NoPartitions,
}

/// Errors surfaced by a broker client handle
#[derive(Error, Debug)]
pub enum ClientError {
    /// Client could not be created from its configuration
    #[error("Failed to create {kind} client: {reason}")]
    Create { kind: &'static str, reason: String },

    /// Metadata request failed or timed out
    #[error("Metadata request failed: {0}")]
    Metadata(String),

    /// Produce request failed or timed out
    #[error("Delivery failed: {0}")]
    Delivery(String),

    /// Partition assignment failed
    #[error("Assignment failed: {0}")]
    Assignment(String),

    /// Poll failed
    #[error("Poll failed: {0}")]
    Poll(String),

    /// Offset commit failed
    #[error("Commit failed: {0}")]
    Commit(String),

    /// Error reported directly by librdkafka
    #[error("Kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),
}

/// Result type alias for pub-sub operations
pub type Result<T> = std::result::Result<T, PubSubError>;
