//! Transport constants
//!
//! This module centralizes the defaults and wire-level names used by the
//! Kafka transport. Configuration loading falls back to these values when a
//! setting is absent.

// ===== Configuration Defaults =====

/// Default for affinity routing
///
/// When enabled, requests are pinned to a partition chosen from the message id
/// and the response partition travels with the request.
pub const DEFAULT_PARTITION_ROUTING_ENABLE: bool = true;

/// Default maximum time (ms) a metadata request may block during discovery
///
/// Matches the Kafka producer's default `max.block.ms`.
pub const DEFAULT_MAX_BLOCK_MS: u64 = 60_000;

/// Default delivery timeout (ms) for a single publish
pub const DEFAULT_MESSAGE_TIMEOUT_MS: u64 = 30_000;

/// Default time (ms) a single `receive()` waits on the consumer when the
/// local buffer is empty
///
/// Zero keeps `receive()` non-blocking.
pub const DEFAULT_POLL_TIMEOUT_MS: u64 = 0;

/// Default cap on messages handed out but not yet committed or failed
pub const DEFAULT_MAX_UNCOMMITTED_MESSAGES: usize = 100;

/// Default for subscriber rate limiting
pub const DEFAULT_RATE_LIMIT_ENABLE: bool = false;

/// Default messages per rate-limit window
pub const DEFAULT_RATE_LIMIT_MAX_MESSAGES: u32 = 100;

/// Default rate-limit window length (ms)
pub const DEFAULT_RATE_LIMIT_INTERVAL_MS: u64 = 100;

/// Default consumer group id
///
/// A group id is required by librdkafka for offset commits even when
/// partitions are assigned manually.
pub const DEFAULT_GROUP_ID: &str = "kafka-pubsub";

/// Default for consumer auto commit
pub const DEFAULT_ENABLE_AUTO_COMMIT: bool = true;

/// Default security protocol
pub const DEFAULT_SECURITY_PROTOCOL: &str = "PLAINTEXT";

/// Default SASL mechanism (used only with a SASL_* protocol)
pub const DEFAULT_SASL_MECHANISM: &str = "PLAIN";

// ===== Consumer Polling =====

/// Upper bound on records drained from the consumer in one poll
///
/// The first record waits up to the poll timeout; the rest are taken only if
/// already fetched.
pub const MAX_POLL_RECORDS: usize = 500;

// ===== Record Headers =====
// The response address of a request travels as record headers so the
// payload stays opaque to the transport.

/// Header carrying the topic a response must be published to
pub const HEADER_REPLY_TOPIC: &str = "kafka_pubsub.reply.topic";

/// Header carrying the partition a response must be published to
///
/// Encoded as a big-endian i32. Absent when affinity routing is disabled.
pub const HEADER_REPLY_PARTITION: &str = "kafka_pubsub.reply.partition";

// ===== Test Constants =====

/// Request topic used throughout the tests
#[cfg(test)]
pub const TEST_REQUEST_TOPIC: &str = "pubsub.queries";

/// Response topic used throughout the tests
#[cfg(test)]
pub const TEST_RESPONSE_TOPIC: &str = "pubsub.responses";

/// Bootstrap address used throughout the tests
#[cfg(test)]
pub const TEST_BOOTSTRAP_SERVERS: &str = "localhost:9092";
