//! Mock broker clients
//!
//! mockall doubles for the client traits, so discovery, routing and
//! buffering can be tested without a running broker.

use std::time::Duration;

use mockall::mock;

use crate::config::KafkaConfig;
use crate::kafka::client::{
    ClientFactory, ConsumedRecord, ConsumerClient, OutboundRecord, ProducerClient,
};
use crate::kafka::constants::{TEST_BOOTSTRAP_SERVERS, TEST_REQUEST_TOPIC, TEST_RESPONSE_TOPIC};
use crate::kafka::error::ClientError;
use crate::kafka::partition::Partition;

mock! {
    pub ProducerClient {}

    impl ProducerClient for ProducerClient {
        fn partitions_for(&self, topic: &str, timeout: Duration) -> Result<Vec<i32>, ClientError>;
        fn send(&self, record: &OutboundRecord) -> Result<(), ClientError>;
        fn flush(&self, timeout: Duration) -> Result<(), ClientError>;
    }
}

mock! {
    pub ConsumerClient {}

    impl ConsumerClient for ConsumerClient {
        fn assign(&mut self, partitions: &[Partition]) -> Result<(), ClientError>;
        fn poll(&mut self, timeout: Duration, max_records: usize) -> Result<Vec<ConsumedRecord>, ClientError>;
        fn commit(&mut self) -> Result<(), ClientError>;
        fn assignment(&self) -> Result<Vec<Partition>, ClientError>;
        fn close(&mut self);
    }
}

mock! {
    pub ClientFactory {}

    impl ClientFactory for ClientFactory {
        fn producer(&self, config: &KafkaConfig) -> Result<Box<dyn ProducerClient>, ClientError>;
        fn consumer(&self, config: &KafkaConfig) -> Result<Box<dyn ConsumerClient>, ClientError>;
    }
}

/// Returns a KafkaConfig with test topics and defaults for everything else
pub fn mock_config() -> KafkaConfig {
    KafkaConfig::new(
        TEST_BOOTSTRAP_SERVERS,
        TEST_REQUEST_TOPIC,
        TEST_RESPONSE_TOPIC,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_config_defaults() {
        let config = mock_config();
        assert_eq!(config.bootstrap_servers, TEST_BOOTSTRAP_SERVERS);
        assert_eq!(config.request_topic, TEST_REQUEST_TOPIC);
        assert_eq!(config.response_topic, TEST_RESPONSE_TOPIC);
        assert!(config.partition_routing_enable);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_mock_producer_is_a_client() {
        let mut producer = MockProducerClient::new();
        producer
            .expect_partitions_for()
            .with(
                mockall::predicate::eq(TEST_REQUEST_TOPIC),
                mockall::predicate::always(),
            )
            .times(1)
            .returning(|_, _| Ok(vec![0, 1]));

        let client: Box<dyn ProducerClient> = Box::new(producer);
        assert_eq!(
            client
                .partitions_for(TEST_REQUEST_TOPIC, Duration::from_millis(10))
                .unwrap(),
            vec![0, 1]
        );
    }
}
