// Kafka transport module
//
// This module contains all Kafka-specific code:
// - Broker client seam and its librdkafka implementation
// - Partition discovery and allocation
// - Affinity routing and the record codec
// - Publishers, subscribers and the factory that builds them
//
// Architecture Overview:
// =====================
//
//   KafkaPubSub (factory, per context)
//       │
//       ├── discovery ──► allocation ──► one PartitionGroup per instance
//       │
//       ├── KafkaPublisher  ── AffinityRouter ── ProducerClient
//       └── KafkaSubscriber ── RateLimiter    ── ConsumerClient
//
// Every publisher and subscriber owns its own client handle. Nothing here
// spawns threads or timers; the only blocking network call outside
// send/poll is discovery, bounded by max_block.

pub mod allocation;
pub mod client;
pub mod constants;
pub mod discovery;
pub mod error;
pub mod factory;
pub mod messages;
pub mod partition;
pub mod partitioner;
pub mod publisher;
pub mod rate_limiter;
pub mod subscriber;

// Re-export commonly used types for convenience
pub use allocation::allocate;
pub use client::{ClientFactory, ConsumerClient, ProducerClient, RdKafkaClients};
pub use discovery::discover_partitions;
pub use error::{AllocationError, ChannelError, ClientError, PubSubError, Result, RoutingError};
pub use factory::KafkaPubSub;
pub use partition::{Partition, PartitionGroup};
pub use partitioner::{route_outbound, AffinityRouter};
pub use publisher::{KafkaPublisher, QueryPublisher, ResponsePublisher};
pub use rate_limiter::RateLimiter;
pub use subscriber::KafkaSubscriber;
