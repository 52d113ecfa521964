//! Kafka subscriber
//!
//! Owns one consumer assigned to a fixed partition group and hands messages
//! out one at a time. Polled records are buffered locally; a delivered
//! message stays tracked as uncommitted until the caller commits or fails it.
//!
//! `receive()` returns `None` when:
//! - too many delivered messages are still uncommitted
//! - nothing is buffered and the poll came back empty
//! - the rate limiter's window is exhausted (the message stays buffered)

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use tracing::{debug, warn};

use super::client::ConsumerClient;
use super::constants::MAX_POLL_RECORDS;
use super::error::{ChannelError, PubSubError, Result};
use super::messages::from_record;
use super::partition::{Partition, PartitionGroup};
use super::rate_limiter::RateLimiter;
use crate::config::KafkaConfig;
use crate::pubsub::{PubSubMessage, Subscriber};

pub struct KafkaSubscriber {
    consumer: Box<dyn ConsumerClient>,
    /// Partitions assigned at construction
    partitions: Vec<Partition>,
    /// Polled but not yet delivered, in arrival order
    buffer: VecDeque<PubSubMessage>,
    /// Delivered but neither committed nor failed, by id
    uncommitted: HashMap<String, PubSubMessage>,
    max_uncommitted: usize,
    rate_limiter: RateLimiter,
    poll_timeout: Duration,
    /// Commit consumer offsets after each poll (auto commit disabled)
    commit_offsets: bool,
}

impl KafkaSubscriber {
    /// Assign `group` to `consumer` and wrap it
    pub(crate) fn new(
        mut consumer: Box<dyn ConsumerClient>,
        config: &KafkaConfig,
        group: PartitionGroup,
    ) -> Result<Self> {
        let partitions = group.into_partitions();
        consumer.assign(&partitions).map_err(ChannelError::from)?;
        debug!(
            partitions = ?partitions.iter().map(ToString::to_string).collect::<Vec<_>>(),
            rate_limited = config.subscriber.rate_limit.enable,
            "Created subscriber"
        );

        Ok(Self {
            consumer,
            partitions,
            buffer: VecDeque::new(),
            uncommitted: HashMap::new(),
            max_uncommitted: config.subscriber.max_uncommitted_messages,
            rate_limiter: RateLimiter::from_config(&config.subscriber.rate_limit),
            poll_timeout: config.poll_timeout,
            commit_offsets: !config.consumer.enable_auto_commit,
        })
    }

    /// Partitions this subscriber was assigned
    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    /// Partitions the consumer currently reports as assigned
    pub fn assignment(&self) -> Result<Vec<Partition>> {
        Ok(self.consumer.assignment()?)
    }

    pub fn is_rate_limited(&self) -> bool {
        self.rate_limiter.is_limited()
    }

    pub fn uncommitted_count(&self) -> usize {
        self.uncommitted.len()
    }

    pub fn buffered_count(&self) -> usize {
        self.buffer.len()
    }

    /// Poll the consumer into the local buffer
    fn fill(&mut self) -> Result<()> {
        let records = self
            .consumer
            .poll(self.poll_timeout, MAX_POLL_RECORDS)
            .map_err(PubSubError::Consume)?;
        if records.is_empty() {
            return Ok(());
        }

        debug!(count = records.len(), "Polled records");
        self.buffer.extend(records.into_iter().map(from_record));

        if self.commit_offsets {
            self.consumer.commit().map_err(PubSubError::Consume)?;
        }
        Ok(())
    }
}

impl Subscriber for KafkaSubscriber {
    fn receive(&mut self) -> Result<Option<PubSubMessage>> {
        if self.uncommitted.len() >= self.max_uncommitted {
            debug!(
                uncommitted = self.uncommitted.len(),
                "Uncommitted limit reached, withholding delivery"
            );
            return Ok(None);
        }

        if self.buffer.is_empty() {
            self.fill()?;
        }

        let Some(message) = self.buffer.pop_front() else {
            return Ok(None);
        };

        if !self.rate_limiter.try_consume() {
            self.buffer.push_front(message);
            return Ok(None);
        }

        if let Some(replaced) = self.uncommitted.insert(message.id.clone(), message.clone()) {
            warn!(
                id = %replaced.id,
                "Uncommitted message replaced by a delivery with the same id"
            );
        }
        Ok(Some(message))
    }

    fn commit(&mut self, id: &str) {
        if self.uncommitted.remove(id).is_none() {
            debug!(id = %id, "Commit for unknown message ignored");
        }
    }

    fn fail(&mut self, id: &str) {
        match self.uncommitted.remove(id) {
            // Redelivered before anything newer
            Some(message) => self.buffer.push_front(message),
            None => debug!(id = %id, "Fail for unknown message ignored"),
        }
    }

    fn close(&mut self) {
        if !self.uncommitted.is_empty() {
            warn!(
                uncommitted = self.uncommitted.len(),
                "Closing subscriber with uncommitted messages"
            );
        }
        self.buffer.clear();
        self.uncommitted.clear();
        self.consumer.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kafka::client::ConsumedRecord;
    use crate::kafka::constants::TEST_REQUEST_TOPIC;
    use crate::kafka::error::ClientError;
    use crate::testing::helpers::request_record;
    use crate::testing::mocks::{mock_config, MockConsumerClient};

    fn group(indices: &[i32]) -> PartitionGroup {
        PartitionGroup::new(Partition::for_topic(TEST_REQUEST_TOPIC, indices))
    }

    /// Consumer that returns `batches` in order, then empty polls
    fn consumer_with_batches(batches: Vec<Vec<ConsumedRecord>>) -> MockConsumerClient {
        let mut batches: VecDeque<_> = batches.into();
        let mut consumer = MockConsumerClient::new();
        consumer.expect_assign().returning(|_| Ok(()));
        consumer
            .expect_poll()
            .returning(move |_, _| Ok(batches.pop_front().unwrap_or_default()));
        consumer
    }

    fn records(count: usize) -> Vec<ConsumedRecord> {
        (0..count)
            .map(|i| request_record(&format!("q-{}", i), 0, i as i64, None))
            .collect()
    }

    #[test]
    fn test_new_assigns_group() {
        let mut consumer = MockConsumerClient::new();
        consumer
            .expect_assign()
            .withf(|partitions| {
                partitions.to_vec() == Partition::for_topic(TEST_REQUEST_TOPIC, &[2, 3])
            })
            .times(1)
            .returning(|_| Ok(()));

        let subscriber =
            KafkaSubscriber::new(Box::new(consumer), &mock_config(), group(&[2, 3])).unwrap();
        assert_eq!(subscriber.partitions().len(), 2);
        assert!(!subscriber.is_rate_limited());
    }

    #[test]
    fn test_assignment_failure_fails_construction() {
        let mut consumer = MockConsumerClient::new();
        consumer
            .expect_assign()
            .returning(|_| Err(ClientError::Assignment("unknown topic".to_string())));

        let result = KafkaSubscriber::new(Box::new(consumer), &mock_config(), group(&[0]));
        assert!(matches!(
            result,
            Err(PubSubError::ChannelConstruction(ChannelError::Client(
                ClientError::Assignment(_)
            )))
        ));
    }

    #[test]
    fn test_receive_in_order_then_none() {
        let consumer = consumer_with_batches(vec![records(3)]);
        let mut subscriber =
            KafkaSubscriber::new(Box::new(consumer), &mock_config(), group(&[0])).unwrap();

        for i in 0..3 {
            let message = subscriber.receive().unwrap().unwrap();
            assert_eq!(message.id, format!("q-{}", i));
        }
        assert!(subscriber.receive().unwrap().is_none());
        assert_eq!(subscriber.uncommitted_count(), 3);
    }

    #[test]
    fn test_rate_limit_withholds_after_max_messages() {
        let mut config = mock_config();
        config.subscriber.rate_limit.enable = true;
        config.subscriber.rate_limit.max_messages = 5;
        config.subscriber.rate_limit.interval = Duration::from_secs(60);

        let consumer = consumer_with_batches(vec![records(10)]);
        let mut subscriber = KafkaSubscriber::new(Box::new(consumer), &config, group(&[0])).unwrap();
        assert!(subscriber.is_rate_limited());

        for _ in 0..5 {
            assert!(subscriber.receive().unwrap().is_some());
        }
        assert!(subscriber.receive().unwrap().is_none());
        // Throttled messages are kept, not dropped
        assert_eq!(subscriber.buffered_count(), 5);
    }

    #[test]
    fn test_uncommitted_limit_blocks_until_commit() {
        let mut config = mock_config();
        config.subscriber.max_uncommitted_messages = 2;

        let consumer = consumer_with_batches(vec![records(3)]);
        let mut subscriber = KafkaSubscriber::new(Box::new(consumer), &config, group(&[0])).unwrap();

        let first = subscriber.receive().unwrap().unwrap();
        subscriber.receive().unwrap().unwrap();
        assert!(subscriber.receive().unwrap().is_none());

        subscriber.commit(&first.id);
        assert_eq!(subscriber.receive().unwrap().unwrap().id, "q-2");
    }

    #[test]
    fn test_fail_redelivers_first() {
        let consumer = consumer_with_batches(vec![records(3)]);
        let mut subscriber =
            KafkaSubscriber::new(Box::new(consumer), &mock_config(), group(&[0])).unwrap();

        let first = subscriber.receive().unwrap().unwrap();
        subscriber.fail(&first.id);
        assert_eq!(subscriber.uncommitted_count(), 0);

        let again = subscriber.receive().unwrap().unwrap();
        assert_eq!(again, first);
        assert_eq!(subscriber.receive().unwrap().unwrap().id, "q-1");
    }

    #[test]
    fn test_keyless_records_share_one_slot() {
        let keyless: Vec<ConsumedRecord> = records(2)
            .into_iter()
            .map(|mut record| {
                record.key = None;
                record
            })
            .collect();
        let consumer = consumer_with_batches(vec![keyless]);
        let mut subscriber =
            KafkaSubscriber::new(Box::new(consumer), &mock_config(), group(&[0])).unwrap();

        assert_eq!(subscriber.receive().unwrap().unwrap().id, "");
        assert_eq!(subscriber.receive().unwrap().unwrap().id, "");
        assert_eq!(subscriber.uncommitted_count(), 1);

        subscriber.commit("");
        assert_eq!(subscriber.uncommitted_count(), 0);
    }

    #[test]
    fn test_unknown_ids_are_ignored() {
        let consumer = consumer_with_batches(vec![]);
        let mut subscriber =
            KafkaSubscriber::new(Box::new(consumer), &mock_config(), group(&[0])).unwrap();
        subscriber.commit("missing");
        subscriber.fail("missing");
        assert_eq!(subscriber.buffered_count(), 0);
    }

    #[test]
    fn test_poll_uses_timeout_and_batch_limit() {
        let mut config = mock_config();
        config.poll_timeout = Duration::from_millis(250);

        let mut consumer = MockConsumerClient::new();
        consumer.expect_assign().returning(|_| Ok(()));
        consumer
            .expect_poll()
            .with(
                mockall::predicate::eq(Duration::from_millis(250)),
                mockall::predicate::eq(MAX_POLL_RECORDS),
            )
            .times(1)
            .returning(|_, _| Ok(vec![]));

        let mut subscriber = KafkaSubscriber::new(Box::new(consumer), &config, group(&[0])).unwrap();
        assert!(subscriber.receive().unwrap().is_none());
    }

    #[test]
    fn test_manual_commit_after_non_empty_poll() {
        let mut config = mock_config();
        config.consumer.enable_auto_commit = false;

        let mut consumer = consumer_with_batches(vec![records(1)]);
        consumer.expect_commit().times(1).returning(|| Ok(()));

        let mut subscriber = KafkaSubscriber::new(Box::new(consumer), &config, group(&[0])).unwrap();
        assert!(subscriber.receive().unwrap().is_some());
        // Empty poll: no further commit
        assert!(subscriber.receive().unwrap().is_none());
    }

    #[test]
    fn test_auto_commit_never_commits_manually() {
        let mut consumer = consumer_with_batches(vec![records(1)]);
        consumer.expect_commit().never();

        let mut subscriber =
            KafkaSubscriber::new(Box::new(consumer), &mock_config(), group(&[0])).unwrap();
        assert!(subscriber.receive().unwrap().is_some());
    }

    #[test]
    fn test_poll_error_is_consume_error() {
        let mut consumer = MockConsumerClient::new();
        consumer.expect_assign().returning(|_| Ok(()));
        consumer
            .expect_poll()
            .returning(|_, _| Err(ClientError::Poll("broker down".to_string())));

        let mut subscriber =
            KafkaSubscriber::new(Box::new(consumer), &mock_config(), group(&[0])).unwrap();
        assert!(matches!(
            subscriber.receive(),
            Err(PubSubError::Consume(ClientError::Poll(_)))
        ));
    }

    #[test]
    fn test_close_drops_state() {
        let mut consumer = consumer_with_batches(vec![records(4)]);
        consumer.expect_close().times(1).return_const(());
        let mut subscriber =
            KafkaSubscriber::new(Box::new(consumer), &mock_config(), group(&[0])).unwrap();
        subscriber.receive().unwrap();

        subscriber.close();
        assert_eq!(subscriber.uncommitted_count(), 0);
        assert_eq!(subscriber.buffered_count(), 0);
    }
}
