//! Test helper functions
//!
//! Fixtures for consumed records and a loopback client factory that stands in
//! for a broker: records produced through it become consumable by any
//! consumer assigned to their partition.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::config::KafkaConfig;
use crate::kafka::client::{
    ClientFactory, ConsumedRecord, ConsumerClient, OutboundRecord, ProducerClient,
};
use crate::kafka::constants::TEST_REQUEST_TOPIC;
use crate::kafka::error::ClientError;
use crate::kafka::messages::encode_reply_to;
use crate::kafka::partition::Partition;
use crate::kafka::partitioner::route_outbound;
use crate::pubsub::ReplyTo;

use super::mocks::{MockConsumerClient, MockProducerClient};

/// Creates a consumed request record
///
/// # Example
/// ```ignore
/// let record = request_record("q-1", 0, 42, None);
/// assert_eq!(record.key.as_deref(), Some(&b"q-1"[..]));
/// ```
pub fn request_record(
    id: &str,
    partition: i32,
    offset: i64,
    reply_to: Option<ReplyTo>,
) -> ConsumedRecord {
    ConsumedRecord {
        topic: TEST_REQUEST_TOPIC.to_string(),
        partition,
        offset,
        key: Some(id.as_bytes().to_vec()),
        payload: Some(format!("payload-{}", id).into_bytes()),
        headers: reply_to.as_ref().map(encode_reply_to).unwrap_or_default(),
    }
}

/// In-memory broker shared by every client a [`StubClients`] hands out
#[derive(Default)]
struct StubBroker {
    /// Partition indices per topic; unknown topics fail discovery
    topics: HashMap<String, Vec<i32>>,
    /// Produced or preloaded records not yet consumed
    pending: Vec<ConsumedRecord>,
    /// Everything produced, in order
    sent: Vec<OutboundRecord>,
}

impl StubBroker {
    fn produce(&mut self, record: &OutboundRecord) -> Result<(), ClientError> {
        let indices = self.topics.get(&record.topic).ok_or_else(|| {
            ClientError::Delivery(format!("Broker: Unknown topic ({})", record.topic))
        })?;

        // Key-hash placement when no partition is pinned
        let partition = match record.partition {
            Some(partition) => partition,
            None => {
                let position = route_outbound(record.key.as_bytes(), indices.len())
                    .map_err(|e| ClientError::Delivery(e.to_string()))?;
                indices[position]
            }
        };

        self.pending.push(ConsumedRecord {
            topic: record.topic.clone(),
            partition,
            offset: self.sent.len() as i64,
            key: Some(record.key.as_bytes().to_vec()),
            payload: record.payload.clone(),
            headers: record.headers.clone(),
        });
        self.sent.push(record.clone());
        Ok(())
    }

    fn take_assigned(&mut self, assigned: &[Partition], max_records: usize) -> Vec<ConsumedRecord> {
        let mut taken = Vec::new();
        let mut remaining = Vec::new();
        for record in self.pending.drain(..) {
            let matches = assigned
                .iter()
                .any(|p| p.topic == record.topic && p.index == record.partition);
            if matches && taken.len() < max_records {
                taken.push(record);
            } else {
                remaining.push(record);
            }
        }
        self.pending = remaining;
        taken
    }
}

/// Loopback client factory backed by mockall clients
#[derive(Default, Clone)]
pub struct StubClients {
    broker: Arc<Mutex<StubBroker>>,
}

impl StubClients {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a topic with the given partition indices
    pub fn with_topic(self, topic: &str, partitions: &[i32]) -> Self {
        self.broker
            .lock()
            .unwrap()
            .topics
            .insert(topic.to_string(), partitions.to_vec());
        self
    }

    /// Preload records for consumers to pick up
    pub fn with_records(self, records: Vec<ConsumedRecord>) -> Self {
        self.broker.lock().unwrap().pending.extend(records);
        self
    }

    /// Everything produced so far
    pub fn sent(&self) -> Vec<OutboundRecord> {
        self.broker.lock().unwrap().sent.clone()
    }

    /// Records produced or preloaded but not yet consumed
    pub fn pending(&self) -> usize {
        self.broker.lock().unwrap().pending.len()
    }
}

impl ClientFactory for StubClients {
    fn producer(&self, _config: &KafkaConfig) -> Result<Box<dyn ProducerClient>, ClientError> {
        let mut producer = MockProducerClient::new();

        let broker = Arc::clone(&self.broker);
        producer.expect_partitions_for().returning(move |topic, _| {
            broker.lock().unwrap().topics.get(topic).cloned().ok_or_else(|| {
                ClientError::Metadata(format!("Broker: Unknown topic or partition ({})", topic))
            })
        });

        let broker = Arc::clone(&self.broker);
        producer
            .expect_send()
            .returning(move |record| broker.lock().unwrap().produce(record));
        producer.expect_flush().returning(|_| Ok(()));

        Ok(Box::new(producer))
    }

    fn consumer(&self, _config: &KafkaConfig) -> Result<Box<dyn ConsumerClient>, ClientError> {
        let mut consumer = MockConsumerClient::new();
        let assigned: Arc<Mutex<Vec<Partition>>> = Arc::default();

        let slot = Arc::clone(&assigned);
        consumer.expect_assign().returning(move |partitions| {
            *slot.lock().unwrap() = partitions.to_vec();
            Ok(())
        });

        let slot = Arc::clone(&assigned);
        let broker = Arc::clone(&self.broker);
        consumer.expect_poll().returning(move |_, max_records| {
            let assigned = slot.lock().unwrap();
            Ok(broker.lock().unwrap().take_assigned(&assigned, max_records))
        });

        consumer.expect_commit().returning(|| Ok(()));

        let slot = Arc::clone(&assigned);
        consumer
            .expect_assignment()
            .returning(move || Ok(slot.lock().unwrap().clone()));

        let slot = Arc::clone(&assigned);
        consumer
            .expect_close()
            .returning(move || slot.lock().unwrap().clear());

        Ok(Box::new(consumer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kafka::constants::TEST_RESPONSE_TOPIC;
    use crate::testing::mocks::mock_config;
    use std::time::Duration;

    #[test]
    fn test_request_record() {
        let record = request_record("q-1", 2, 42, None);
        assert_eq!(record.topic, TEST_REQUEST_TOPIC);
        assert_eq!(record.partition, 2);
        assert_eq!(record.offset, 42);
        assert_eq!(record.key.as_deref(), Some(&b"q-1"[..]));
        assert!(record.headers.is_empty());
    }

    #[test]
    fn test_stub_loopback_respects_assignment() {
        let clients = StubClients::new().with_topic(TEST_RESPONSE_TOPIC, &[0, 1]);
        let config = mock_config();

        let producer = clients.producer(&config).unwrap();
        for partition in [0, 1, 1] {
            producer
                .send(&OutboundRecord {
                    topic: TEST_RESPONSE_TOPIC.to_string(),
                    partition: Some(partition),
                    key: format!("r-{}", partition),
                    payload: None,
                    headers: vec![],
                })
                .unwrap();
        }

        let mut consumer = clients.consumer(&config).unwrap();
        consumer
            .assign(&[Partition::new(TEST_RESPONSE_TOPIC, 1)])
            .unwrap();
        let records = consumer.poll(Duration::ZERO, 10).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.partition == 1));
        assert_eq!(clients.pending(), 1);
        assert_eq!(clients.sent().len(), 3);
    }

    #[test]
    fn test_stub_unknown_topic() {
        let clients = StubClients::new();
        let producer = clients.producer(&mock_config()).unwrap();
        assert!(producer
            .partitions_for("missing", Duration::from_millis(1))
            .is_err());
    }
}
