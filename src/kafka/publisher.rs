//! Kafka publishers
//!
//! Two roles exist:
//! - [`QueryPublisher`] (submission side) writes requests and stamps each
//!   with the response partition its own subscriber reads
//! - [`ResponsePublisher`] (processing side) writes each response to the
//!   address carried by its request
//!
//! [`KafkaPublisher`] is the closed set of both, returned by the factory.

use std::time::Duration;

use tracing::{debug, warn};

use super::client::ProducerClient;
use super::error::{PubSubError, Result};
use super::messages::to_record;
use super::partition::Partition;
use super::partitioner::AffinityRouter;
use crate::config::KafkaConfig;
use crate::pubsub::{PubSubMessage, Publisher};

/// Publishes requests on the submission side
pub struct QueryPublisher {
    producer: Box<dyn ProducerClient>,
    router: AffinityRouter,
    request_topic: String,
    response_topic: String,
    /// Request partitions this publisher may write to
    write_partitions: Vec<Partition>,
    /// Response partitions the paired subscriber reads
    receive_partitions: Vec<Partition>,
    flush_timeout: Duration,
}

impl QueryPublisher {
    pub(crate) fn new(
        producer: Box<dyn ProducerClient>,
        config: &KafkaConfig,
        write_partitions: Vec<Partition>,
        receive_partitions: Vec<Partition>,
    ) -> Self {
        Self {
            producer,
            router: AffinityRouter::new(config.partition_routing_enable),
            request_topic: config.request_topic.clone(),
            response_topic: config.response_topic.clone(),
            write_partitions,
            receive_partitions,
            flush_timeout: config.message_timeout,
        }
    }

    pub fn write_partitions(&self) -> &[Partition] {
        &self.write_partitions
    }

    pub fn receive_partitions(&self) -> &[Partition] {
        &self.receive_partitions
    }
}

impl Publisher for QueryPublisher {
    fn send(&mut self, message: PubSubMessage) -> Result<PubSubMessage> {
        let reply_to =
            self.router
                .reply_to(&message.id, &self.response_topic, &self.receive_partitions)?;
        let target = self
            .router
            .request_partition(&message.id, &self.write_partitions)?
            .map(|p| p.index);

        let message = message.with_reply_to(reply_to);
        let record = to_record(&message, &self.request_topic, target);
        self.producer
            .send(&record)
            .map_err(|source| PubSubError::Publish {
                id: message.id.clone(),
                topic: self.request_topic.clone(),
                source,
            })?;

        debug!(
            id = %message.id,
            topic = %self.request_topic,
            partition = ?target,
            reply_partition = ?message.reply_to.as_ref().and_then(|r| r.partition),
            "Published request"
        );
        Ok(message)
    }

    fn close(&mut self) {
        flush(self.producer.as_ref(), self.flush_timeout, &self.request_topic);
    }
}

/// Publishes responses on the processing side
///
/// Not bound to any partition: the target comes from each message.
pub struct ResponsePublisher {
    producer: Box<dyn ProducerClient>,
    router: AffinityRouter,
    /// Used when a message carries no response address
    response_topic: String,
    flush_timeout: Duration,
}

impl ResponsePublisher {
    pub(crate) fn new(producer: Box<dyn ProducerClient>, config: &KafkaConfig) -> Self {
        Self {
            producer,
            router: AffinityRouter::new(config.partition_routing_enable),
            response_topic: config.response_topic.clone(),
            flush_timeout: config.message_timeout,
        }
    }
}

impl Publisher for ResponsePublisher {
    fn send(&mut self, message: PubSubMessage) -> Result<PubSubMessage> {
        let (topic, target) = match &message.reply_to {
            Some(reply_to) => (
                reply_to.topic.clone(),
                self.router.response_partition(reply_to).map(|p| p.index),
            ),
            None => (self.response_topic.clone(), None),
        };

        // The address belongs to the request; responses carry none
        let message = PubSubMessage {
            reply_to: None,
            ..message
        };
        let record = to_record(&message, &topic, target);
        self.producer
            .send(&record)
            .map_err(|source| PubSubError::Publish {
                id: message.id.clone(),
                topic: topic.clone(),
                source,
            })?;

        debug!(id = %message.id, topic = %topic, partition = ?target, "Published response");
        Ok(message)
    }

    fn close(&mut self) {
        flush(self.producer.as_ref(), self.flush_timeout, &self.response_topic);
    }
}

fn flush(producer: &dyn ProducerClient, timeout: Duration, topic: &str) {
    if let Err(e) = producer.flush(timeout) {
        warn!(topic = %topic, error = %e, "Failed to flush producer on close");
    }
}

/// A publisher built by [`super::factory::KafkaPubSub`]
pub enum KafkaPublisher {
    Query(QueryPublisher),
    Response(ResponsePublisher),
}

impl KafkaPublisher {
    /// The submission-side publisher, if this is one
    pub fn as_query(&self) -> Option<&QueryPublisher> {
        match self {
            KafkaPublisher::Query(publisher) => Some(publisher),
            KafkaPublisher::Response(_) => None,
        }
    }

    pub fn is_response(&self) -> bool {
        matches!(self, KafkaPublisher::Response(_))
    }
}

impl Publisher for KafkaPublisher {
    fn send(&mut self, message: PubSubMessage) -> Result<PubSubMessage> {
        match self {
            KafkaPublisher::Query(publisher) => publisher.send(message),
            KafkaPublisher::Response(publisher) => publisher.send(message),
        }
    }

    fn close(&mut self) {
        match self {
            KafkaPublisher::Query(publisher) => publisher.close(),
            KafkaPublisher::Response(publisher) => publisher.close(),
        }
    }
}
