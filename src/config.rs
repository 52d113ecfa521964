// Configuration module for kafka_pubsub
//
// Settings are read from YAML into a permissive raw form, then validated once
// into an immutable `KafkaConfig`. The factory owns it; publishers and
// subscribers copy what they need when built. Absent optional settings fall
// back to the defaults in `kafka::constants`; absent required settings are a
// hard configuration error.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::kafka::constants::{
    DEFAULT_ENABLE_AUTO_COMMIT, DEFAULT_GROUP_ID, DEFAULT_MAX_BLOCK_MS,
    DEFAULT_MAX_UNCOMMITTED_MESSAGES, DEFAULT_MESSAGE_TIMEOUT_MS,
    DEFAULT_PARTITION_ROUTING_ENABLE, DEFAULT_POLL_TIMEOUT_MS, DEFAULT_RATE_LIMIT_ENABLE,
    DEFAULT_RATE_LIMIT_INTERVAL_MS, DEFAULT_RATE_LIMIT_MAX_MESSAGES, DEFAULT_SASL_MECHANISM,
    DEFAULT_SECURITY_PROTOCOL,
};
use crate::kafka::error::{PubSubError, Result};
use crate::pubsub::Context;

/// Subscriber rate limiting settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Whether deliveries are capped at all
    pub enable: bool,
    /// Deliveries allowed per window
    pub max_messages: u32,
    /// Window length
    pub interval: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enable: DEFAULT_RATE_LIMIT_ENABLE,
            max_messages: DEFAULT_RATE_LIMIT_MAX_MESSAGES,
            interval: Duration::from_millis(DEFAULT_RATE_LIMIT_INTERVAL_MS),
        }
    }
}

/// Subscriber settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberConfig {
    /// Messages that may be handed out before any is committed or failed
    pub max_uncommitted_messages: usize,
    /// Delivery rate limit
    pub rate_limit: RateLimitConfig,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            max_uncommitted_messages: DEFAULT_MAX_UNCOMMITTED_MESSAGES,
            rate_limit: RateLimitConfig::default(),
        }
    }
}

/// Consumer group settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerConfig {
    /// Group id used for offset storage
    pub group_id: String,
    /// Let librdkafka commit offsets in the background
    pub enable_auto_commit: bool,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            group_id: DEFAULT_GROUP_ID.to_string(),
            enable_auto_commit: DEFAULT_ENABLE_AUTO_COMMIT,
        }
    }
}

/// Broker connection security settings
#[derive(Clone, PartialEq, Eq)]
pub struct SecurityConfig {
    /// PLAINTEXT, SSL, SASL_PLAINTEXT or SASL_SSL
    pub protocol: String,
    /// PLAIN, SCRAM-SHA-256 or SCRAM-SHA-512
    pub sasl_mechanism: String,
    pub sasl_username: String,
    pub sasl_password: String,
    /// CA certificate location for *_SSL protocols
    pub ssl_ca_location: String,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            protocol: DEFAULT_SECURITY_PROTOCOL.to_string(),
            sasl_mechanism: DEFAULT_SASL_MECHANISM.to_string(),
            sasl_username: String::new(),
            sasl_password: String::new(),
            ssl_ca_location: String::new(),
        }
    }
}

/// Custom Debug implementation that redacts credentials
impl std::fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("protocol", &self.protocol)
            .field("sasl_mechanism", &self.sasl_mechanism)
            .field("sasl_username", &"[REDACTED]")
            .field("sasl_password", &"[REDACTED]")
            .field("ssl_ca_location", &self.ssl_ca_location)
            .finish()
    }
}

/// Validated pub-sub configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KafkaConfig {
    /// Broker addresses, comma separated
    pub bootstrap_servers: String,
    /// Topic requests are published to
    pub request_topic: String,
    /// Topic responses are published to
    pub response_topic: String,
    /// Static request partitions (None = discover from the broker)
    pub request_partitions: Option<Vec<i32>>,
    /// Static response partitions (None = discover from the broker)
    pub response_partitions: Option<Vec<i32>>,
    /// Context selected at startup, if any
    pub context: Option<Context>,
    /// Pin requests and responses to partitions by message id
    pub partition_routing_enable: bool,
    /// Deadline for partition discovery
    pub max_block: Duration,
    /// Deadline for a single publish
    pub message_timeout: Duration,
    /// Time a receive waits on the consumer when its buffer is empty
    pub poll_timeout: Duration,
    pub subscriber: SubscriberConfig,
    pub consumer: ConsumerConfig,
    pub security: SecurityConfig,
    /// Raw librdkafka producer overrides, applied last
    pub producer_properties: BTreeMap<String, String>,
    /// Raw librdkafka consumer overrides, applied last
    pub consumer_properties: BTreeMap<String, String>,
}

impl KafkaConfig {
    /// Create a configuration with the required settings and defaults for the rest
    pub fn new(
        bootstrap_servers: impl Into<String>,
        request_topic: impl Into<String>,
        response_topic: impl Into<String>,
    ) -> Self {
        Self {
            bootstrap_servers: bootstrap_servers.into(),
            request_topic: request_topic.into(),
            response_topic: response_topic.into(),
            request_partitions: None,
            response_partitions: None,
            context: None,
            partition_routing_enable: DEFAULT_PARTITION_ROUTING_ENABLE,
            max_block: Duration::from_millis(DEFAULT_MAX_BLOCK_MS),
            message_timeout: Duration::from_millis(DEFAULT_MESSAGE_TIMEOUT_MS),
            poll_timeout: Duration::from_millis(DEFAULT_POLL_TIMEOUT_MS),
            subscriber: SubscriberConfig::default(),
            consumer: ConsumerConfig::default(),
            security: SecurityConfig::default(),
            producer_properties: BTreeMap::new(),
            consumer_properties: BTreeMap::new(),
        }
    }

    /// Load and validate configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            PubSubError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&contents)
    }

    /// Parse and validate configuration from YAML text
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let raw: RawConfig = serde_yaml::from_str(yaml)
            .map_err(|e| PubSubError::Config(format!("malformed configuration: {}", e)))?;
        let config = raw.into_config()?;
        config.validate()?;
        Ok(config)
    }

    /// Check every setting, reporting the first problem found
    pub fn validate(&self) -> Result<()> {
        require_non_empty("bootstrap_servers", &self.bootstrap_servers)?;
        require_non_empty("request_topic", &self.request_topic)?;
        require_non_empty("response_topic", &self.response_topic)?;

        if let Some(partitions) = &self.request_partitions {
            validate_partition_list("request_partitions", partitions)?;
        }
        if let Some(partitions) = &self.response_partitions {
            validate_partition_list("response_partitions", partitions)?;
        }

        require_positive_duration("max_block_ms", self.max_block)?;
        require_positive_duration("message_timeout_ms", self.message_timeout)?;

        if self.subscriber.max_uncommitted_messages == 0 {
            return Err(PubSubError::Config(
                "subscriber.max_uncommitted_messages must be positive".to_string(),
            ));
        }

        let rate_limit = &self.subscriber.rate_limit;
        if rate_limit.enable {
            if rate_limit.max_messages == 0 {
                return Err(PubSubError::Config(
                    "subscriber.rate_limit.max_messages must be positive".to_string(),
                ));
            }
            require_positive_duration("subscriber.rate_limit.interval_ms", rate_limit.interval)?;
        }

        require_non_empty("consumer.group_id", &self.consumer.group_id)?;
        Ok(())
    }

    /// Statically configured partitions for a topic, if any
    pub fn static_partitions(&self, topic: &str) -> Option<&[i32]> {
        if topic == self.request_topic {
            self.request_partitions.as_deref()
        } else if topic == self.response_topic {
            self.response_partitions.as_deref()
        } else {
            None
        }
    }

    /// Topic this context reads from
    pub fn inbound_topic(&self, context: Context) -> &str {
        match context {
            Context::Submission => &self.response_topic,
            Context::Processing => &self.request_topic,
        }
    }

    /// Topic this context writes to
    pub fn outbound_topic(&self, context: Context) -> &str {
        match context {
            Context::Submission => &self.request_topic,
            Context::Processing => &self.response_topic,
        }
    }
}

fn require_non_empty(key: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(PubSubError::Config(format!("{} is required", key)));
    }
    Ok(())
}

fn require_positive_duration(key: &str, value: Duration) -> Result<()> {
    if value.is_zero() {
        return Err(PubSubError::Config(format!("{} must be positive", key)));
    }
    Ok(())
}

fn validate_partition_list(key: &str, partitions: &[i32]) -> Result<()> {
    if partitions.is_empty() {
        return Err(PubSubError::Config(format!(
            "{} must list at least one partition",
            key
        )));
    }
    let mut seen = HashSet::with_capacity(partitions.len());
    for &partition in partitions {
        if partition < 0 {
            return Err(PubSubError::Config(format!(
                "{} contains negative partition {}",
                key, partition
            )));
        }
        if !seen.insert(partition) {
            return Err(PubSubError::Config(format!(
                "{} lists partition {} more than once",
                key, partition
            )));
        }
    }
    Ok(())
}

// ===== Raw (unvalidated) form =====

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    bootstrap_servers: Option<String>,
    request_topic: Option<String>,
    response_topic: Option<String>,
    request_partitions: Option<Vec<i32>>,
    response_partitions: Option<Vec<i32>>,
    context: Option<String>,
    partition_routing_enable: Option<bool>,
    max_block_ms: Option<u64>,
    message_timeout_ms: Option<u64>,
    poll_timeout_ms: Option<u64>,
    #[serde(default)]
    subscriber: RawSubscriber,
    #[serde(default)]
    consumer: RawConsumer,
    #[serde(default)]
    security: RawSecurity,
    #[serde(default)]
    producer_properties: BTreeMap<String, serde_yaml::Value>,
    #[serde(default)]
    consumer_properties: BTreeMap<String, serde_yaml::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSubscriber {
    max_uncommitted_messages: Option<usize>,
    #[serde(default)]
    rate_limit: RawRateLimit,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRateLimit {
    enable: Option<bool>,
    max_messages: Option<u32>,
    interval_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConsumer {
    group_id: Option<String>,
    enable_auto_commit: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSecurity {
    protocol: Option<String>,
    sasl_mechanism: Option<String>,
    sasl_username: Option<String>,
    sasl_password: Option<String>,
    ssl_ca_location: Option<String>,
}

impl RawConfig {
    fn into_config(self) -> Result<KafkaConfig> {
        let bootstrap_servers = self
            .bootstrap_servers
            .ok_or_else(|| PubSubError::Config("bootstrap_servers is required".to_string()))?;
        let request_topic = self
            .request_topic
            .ok_or_else(|| PubSubError::Config("request_topic is required".to_string()))?;
        let response_topic = self
            .response_topic
            .ok_or_else(|| PubSubError::Config("response_topic is required".to_string()))?;

        let context = match self.context {
            Some(name) => Some(Context::parse(&name).ok_or_else(|| {
                PubSubError::Config(format!("unknown context '{}'", name))
            })?),
            None => None,
        };

        let defaults = RateLimitConfig::default();
        let rate_limit = RateLimitConfig {
            enable: self.subscriber.rate_limit.enable.unwrap_or(defaults.enable),
            max_messages: self
                .subscriber
                .rate_limit
                .max_messages
                .unwrap_or(defaults.max_messages),
            interval: self
                .subscriber
                .rate_limit
                .interval_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.interval),
        };

        let security_defaults = SecurityConfig::default();
        let security = SecurityConfig {
            protocol: self.security.protocol.unwrap_or(security_defaults.protocol),
            sasl_mechanism: self
                .security
                .sasl_mechanism
                .unwrap_or(security_defaults.sasl_mechanism),
            sasl_username: self.security.sasl_username.unwrap_or_default(),
            sasl_password: self.security.sasl_password.unwrap_or_default(),
            ssl_ca_location: self.security.ssl_ca_location.unwrap_or_default(),
        };

        Ok(KafkaConfig {
            bootstrap_servers,
            request_topic,
            response_topic,
            request_partitions: self.request_partitions,
            response_partitions: self.response_partitions,
            context,
            partition_routing_enable: self
                .partition_routing_enable
                .unwrap_or(DEFAULT_PARTITION_ROUTING_ENABLE),
            max_block: Duration::from_millis(self.max_block_ms.unwrap_or(DEFAULT_MAX_BLOCK_MS)),
            message_timeout: Duration::from_millis(
                self.message_timeout_ms
                    .unwrap_or(DEFAULT_MESSAGE_TIMEOUT_MS),
            ),
            poll_timeout: Duration::from_millis(
                self.poll_timeout_ms.unwrap_or(DEFAULT_POLL_TIMEOUT_MS),
            ),
            subscriber: SubscriberConfig {
                max_uncommitted_messages: self
                    .subscriber
                    .max_uncommitted_messages
                    .unwrap_or(DEFAULT_MAX_UNCOMMITTED_MESSAGES),
                rate_limit,
            },
            consumer: ConsumerConfig {
                group_id: self
                    .consumer
                    .group_id
                    .unwrap_or_else(|| DEFAULT_GROUP_ID.to_string()),
                enable_auto_commit: self
                    .consumer
                    .enable_auto_commit
                    .unwrap_or(DEFAULT_ENABLE_AUTO_COMMIT),
            },
            security,
            producer_properties: stringify_properties(
                "producer_properties",
                self.producer_properties,
            )?,
            consumer_properties: stringify_properties(
                "consumer_properties",
                self.consumer_properties,
            )?,
        })
    }
}

/// librdkafka takes every property as a string; accept YAML scalars
fn stringify_properties(
    section: &str,
    properties: BTreeMap<String, serde_yaml::Value>,
) -> Result<BTreeMap<String, String>> {
    properties
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                serde_yaml::Value::String(s) => s,
                serde_yaml::Value::Number(n) => n.to_string(),
                serde_yaml::Value::Bool(b) => b.to_string(),
                _ => {
                    return Err(PubSubError::Config(format!(
                        "{}.{} must be a string, number or boolean",
                        section, key
                    )))
                }
            };
            Ok((key, value))
        })
        .collect()
}
