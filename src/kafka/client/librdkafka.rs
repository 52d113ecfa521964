//! librdkafka-backed broker clients
//!
//! Wraps rdkafka's `FutureProducer` and `BaseConsumer`. Both are driven
//! synchronously: publishing waits on the delivery future with
//! `futures::executor::block_on`, which needs no async runtime, and the
//! consumer is polled directly by its subscriber.
//!
//! ## OpenSSL Warning
//!
//! SSL support comes from the system OpenSSL via librdkafka. Mixing it with a
//! vendored OpenSSL in the same process is not supported.

use std::time::Duration;

use rdkafka::config::ClientConfig;
use rdkafka::consumer::{BaseConsumer, CommitMode, Consumer};
use rdkafka::error::RDKafkaErrorCode;
use rdkafka::message::{BorrowedMessage, Header, Headers, Message, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;
use rdkafka::TopicPartitionList;
use tracing::{debug, warn};

use super::{ClientFactory, ConsumedRecord, ConsumerClient, OutboundRecord, ProducerClient};
use crate::config::KafkaConfig;
use crate::kafka::error::ClientError;
use crate::kafka::partition::Partition;

/// Factory for librdkafka-backed clients
#[derive(Debug, Clone, Copy, Default)]
pub struct RdKafkaClients;

impl ClientFactory for RdKafkaClients {
    fn producer(&self, config: &KafkaConfig) -> Result<Box<dyn ProducerClient>, ClientError> {
        Ok(Box::new(RdKafkaProducer::new(config)?))
    }

    fn consumer(&self, config: &KafkaConfig) -> Result<Box<dyn ConsumerClient>, ClientError> {
        Ok(Box::new(RdKafkaConsumer::new(config)?))
    }
}

/// Settings shared by producers and consumers
fn base_client_config(config: &KafkaConfig) -> ClientConfig {
    let mut client_config = ClientConfig::new();
    let security = &config.security;

    client_config.set("bootstrap.servers", &config.bootstrap_servers);

    // Security protocol (SASL_SSL, SASL_PLAINTEXT, SSL, PLAINTEXT)
    client_config.set("security.protocol", &security.protocol);

    if security.protocol.starts_with("SASL") {
        client_config.set("sasl.mechanism", &security.sasl_mechanism);

        if !security.sasl_username.is_empty() {
            client_config.set("sasl.username", &security.sasl_username);
        }

        if !security.sasl_password.is_empty() {
            client_config.set("sasl.password", &security.sasl_password);
        }
    }

    if security.protocol.ends_with("SSL") && !security.ssl_ca_location.is_empty() {
        client_config.set("ssl.ca.location", &security.ssl_ca_location);
    }

    client_config
}

/// Producer handle owned by one publisher
pub struct RdKafkaProducer {
    producer: FutureProducer,
    message_timeout: Duration,
}

impl RdKafkaProducer {
    /// Create a producer; no network traffic happens until first use
    pub fn new(config: &KafkaConfig) -> Result<Self, ClientError> {
        let mut client_config = base_client_config(config);
        client_config.set(
            "message.timeout.ms",
            config.message_timeout.as_millis().to_string(),
        );
        for (key, value) in &config.producer_properties {
            client_config.set(key, value);
        }

        let producer: FutureProducer =
            client_config.create().map_err(|e| ClientError::Create {
                kind: "producer",
                reason: e.to_string(),
            })?;

        debug!(bootstrap_servers = %config.bootstrap_servers, "Created Kafka producer");
        Ok(Self {
            producer,
            message_timeout: config.message_timeout,
        })
    }
}

impl ProducerClient for RdKafkaProducer {
    fn partitions_for(&self, topic: &str, timeout: Duration) -> Result<Vec<i32>, ClientError> {
        let metadata = self
            .producer
            .client()
            .fetch_metadata(Some(topic), Timeout::After(timeout))
            .map_err(|e| ClientError::Metadata(e.to_string()))?;

        let topic_metadata = metadata
            .topics()
            .iter()
            .find(|t| t.name() == topic)
            .ok_or_else(|| ClientError::Metadata(format!("no metadata returned for {}", topic)))?;

        if let Some(err) = topic_metadata.error() {
            return Err(ClientError::Metadata(
                RDKafkaErrorCode::from(err).to_string(),
            ));
        }

        let mut partitions: Vec<i32> = topic_metadata.partitions().iter().map(|p| p.id()).collect();
        partitions.sort_unstable();
        Ok(partitions)
    }

    fn send(&self, record: &OutboundRecord) -> Result<(), ClientError> {
        let mut headers = OwnedHeaders::new();
        for (key, value) in &record.headers {
            headers = headers.insert(Header {
                key: key.as_str(),
                value: Some(value.as_slice()),
            });
        }

        let mut future_record = FutureRecord::<str, [u8]>::to(&record.topic)
            .key(record.key.as_str())
            .headers(headers);

        if let Some(payload) = &record.payload {
            future_record = future_record.payload(payload.as_slice());
        }

        if let Some(partition) = record.partition {
            future_record = future_record.partition(partition);
        }

        // send_result only enqueues; the delivery future resolves from
        // librdkafka's own threads, so blocking on it needs no runtime
        let delivery = self
            .producer
            .send_result(future_record)
            .map_err(|(err, _)| ClientError::Delivery(err.to_string()))?;

        match futures::executor::block_on(delivery) {
            Ok(Ok(_)) => Ok(()),
            Ok(Err((err, _))) => Err(ClientError::Delivery(err.to_string())),
            Err(_) => Err(ClientError::Delivery(format!(
                "delivery report dropped (message timeout {}ms)",
                self.message_timeout.as_millis()
            ))),
        }
    }

    fn flush(&self, timeout: Duration) -> Result<(), ClientError> {
        self.producer
            .flush(Timeout::After(timeout))
            .map_err(ClientError::from)
    }
}

impl std::fmt::Debug for RdKafkaProducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RdKafkaProducer")
            .field("message_timeout", &self.message_timeout)
            .finish()
    }
}

/// Consumer handle owned by one subscriber
pub struct RdKafkaConsumer {
    consumer: BaseConsumer,
}

impl RdKafkaConsumer {
    /// Create a consumer; partitions are assigned separately
    pub fn new(config: &KafkaConfig) -> Result<Self, ClientError> {
        let mut client_config = base_client_config(config);
        client_config
            .set("group.id", &config.consumer.group_id)
            .set(
                "enable.auto.commit",
                config.consumer.enable_auto_commit.to_string(),
            )
            .set("enable.partition.eof", "false");
        for (key, value) in &config.consumer_properties {
            client_config.set(key, value);
        }

        let consumer: BaseConsumer = client_config.create().map_err(|e| ClientError::Create {
            kind: "consumer",
            reason: e.to_string(),
        })?;

        debug!(
            bootstrap_servers = %config.bootstrap_servers,
            group_id = %config.consumer.group_id,
            "Created Kafka consumer"
        );
        Ok(Self { consumer })
    }
}

fn to_consumed(message: &BorrowedMessage<'_>) -> ConsumedRecord {
    let headers = message
        .headers()
        .map(|headers| {
            headers
                .iter()
                .filter_map(|header| {
                    header
                        .value
                        .map(|value| (header.key.to_string(), value.to_vec()))
                })
                .collect()
        })
        .unwrap_or_default();

    ConsumedRecord {
        topic: message.topic().to_string(),
        partition: message.partition(),
        offset: message.offset(),
        key: message.key().map(<[u8]>::to_vec),
        payload: message.payload().map(<[u8]>::to_vec),
        headers,
    }
}

impl ConsumerClient for RdKafkaConsumer {
    fn assign(&mut self, partitions: &[Partition]) -> Result<(), ClientError> {
        let mut tpl = TopicPartitionList::new();
        for partition in partitions {
            tpl.add_partition(&partition.topic, partition.index);
        }
        self.consumer
            .assign(&tpl)
            .map_err(|e| ClientError::Assignment(e.to_string()))
    }

    fn poll(
        &mut self,
        timeout: Duration,
        max_records: usize,
    ) -> Result<Vec<ConsumedRecord>, ClientError> {
        let mut records = Vec::new();
        let mut wait = timeout;

        while records.len() < max_records {
            match self.consumer.poll(wait) {
                None => break,
                Some(Ok(message)) => records.push(to_consumed(&message)),
                Some(Err(e)) if records.is_empty() => {
                    return Err(ClientError::Poll(e.to_string()));
                }
                Some(Err(e)) => {
                    // Keep what was already fetched; the error resurfaces on the next poll
                    warn!(error = %e, fetched = records.len(), "Consumer error mid-batch");
                    break;
                }
            }
            // Only the first record is waited for
            wait = Duration::ZERO;
        }

        Ok(records)
    }

    fn commit(&mut self) -> Result<(), ClientError> {
        self.consumer
            .commit_consumer_state(CommitMode::Async)
            .map_err(|e| ClientError::Commit(e.to_string()))
    }

    fn assignment(&self) -> Result<Vec<Partition>, ClientError> {
        let tpl = self
            .consumer
            .assignment()
            .map_err(|e| ClientError::Assignment(e.to_string()))?;
        Ok(tpl
            .elements()
            .iter()
            .map(|elem| Partition::new(elem.topic(), elem.partition()))
            .collect())
    }

    fn close(&mut self) {
        if let Err(e) = self.consumer.unassign() {
            warn!(error = %e, "Failed to unassign consumer on close");
        }
    }
}

impl std::fmt::Debug for RdKafkaConsumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RdKafkaConsumer").finish_non_exhaustive()
    }
}
