//! Channel factory
//!
//! [`KafkaPubSub`] builds publishers and subscribers for one of two roles:
//!
//! | Context    | Publishes to    | Subscribes to   |
//! |------------|-----------------|-----------------|
//! | Submission | request topic   | response topic  |
//! | Processing | response topic  | request topic   |
//!
//! Subscribers (and submission publishers) are sized by discovering the
//! partitions they read and allocating them into contiguous groups. Each
//! instance gets its own broker client; nothing is shared between them.

use tracing::{debug, info};

use super::allocation::allocate;
use super::client::{ClientFactory, RdKafkaClients};
use super::discovery::discover_partitions;
use super::error::{AllocationError, ChannelError, PubSubError, Result};
use super::partition::{Partition, PartitionGroup};
use super::publisher::{KafkaPublisher, QueryPublisher, ResponsePublisher};
use super::subscriber::KafkaSubscriber;
use crate::config::KafkaConfig;
use crate::pubsub::{Context, PubSub};

pub struct KafkaPubSub {
    config: KafkaConfig,
    clients: Box<dyn ClientFactory>,
    context: Option<Context>,
}

impl KafkaPubSub {
    /// Create a factory backed by librdkafka
    ///
    /// Fails immediately on invalid configuration, e.g. no bootstrap servers.
    /// If the configuration names a context, it is selected right away.
    pub fn new(config: KafkaConfig) -> Result<Self> {
        Self::with_clients(config, Box::new(RdKafkaClients))
    }

    /// Create a factory with a custom client source
    pub fn with_clients(config: KafkaConfig, clients: Box<dyn ClientFactory>) -> Result<Self> {
        config.validate()?;
        let initial = config.context;
        let mut pubsub = Self {
            config,
            clients,
            context: None,
        };
        if let Some(context) = initial {
            pubsub.switch_context(context)?;
        }
        Ok(pubsub)
    }

    pub fn config(&self) -> &KafkaConfig {
        &self.config
    }

    /// Replace the configuration and select `context` under it
    ///
    /// On error the previous configuration and context stay in effect.
    pub fn switch_context_with(&mut self, context: Context, config: KafkaConfig) -> Result<()> {
        config.validate()?;
        self.config = config;
        self.switch_context(context)
    }

    fn require_context(&self) -> Result<Context> {
        self.context.ok_or(PubSubError::NoContext)
    }

    /// All partitions of `topic`, via a short-lived producer handle
    fn discover(&self, topic: &str) -> Result<Vec<Partition>> {
        let producer = self
            .clients
            .producer(&self.config)
            .map_err(ChannelError::from)?;
        Ok(discover_partitions(&self.config, producer.as_ref(), topic)?)
    }

    /// Request partitions a submission publisher writes to
    ///
    /// Only needed when requests are pinned to a partition.
    fn request_write_partitions(&self) -> Result<Vec<Partition>> {
        if self.config.partition_routing_enable {
            self.discover(&self.config.request_topic)
        } else {
            Ok(Vec::new())
        }
    }

    fn allocate_inbound(&self, context: Context, n: usize) -> Result<Vec<PartitionGroup>> {
        if n == 0 {
            return Err(ChannelError::from(AllocationError::ZeroInstances).into());
        }
        let partitions = self.discover(self.config.inbound_topic(context))?;
        let groups = allocate(partitions, n).map_err(ChannelError::from)?;
        debug!(
            context = %context,
            requested = n,
            groups = groups.len(),
            "Allocated inbound partitions"
        );
        Ok(groups)
    }

    fn query_publisher(
        &self,
        write_partitions: Vec<Partition>,
        receive_partitions: Vec<Partition>,
    ) -> Result<KafkaPublisher> {
        let producer = self
            .clients
            .producer(&self.config)
            .map_err(ChannelError::from)?;
        Ok(KafkaPublisher::Query(QueryPublisher::new(
            producer,
            &self.config,
            write_partitions,
            receive_partitions,
        )))
    }

    fn response_publisher(&self) -> Result<KafkaPublisher> {
        let producer = self
            .clients
            .producer(&self.config)
            .map_err(ChannelError::from)?;
        Ok(KafkaPublisher::Response(ResponsePublisher::new(
            producer,
            &self.config,
        )))
    }

    fn subscriber(&self, group: PartitionGroup) -> Result<KafkaSubscriber> {
        let consumer = self
            .clients
            .consumer(&self.config)
            .map_err(ChannelError::from)?;
        KafkaSubscriber::new(consumer, &self.config, group)
    }
}

impl PubSub for KafkaPubSub {
    type Publisher = KafkaPublisher;
    type Subscriber = KafkaSubscriber;

    fn context(&self) -> Option<Context> {
        self.context
    }

    fn switch_context(&mut self, context: Context) -> Result<()> {
        // Nothing is cached between contexts; every later instance is
        // resolved from scratch
        self.config.validate()?;
        self.context = Some(context);
        info!(
            context = %context,
            outbound = %self.config.outbound_topic(context),
            inbound = %self.config.inbound_topic(context),
            "Switched pub-sub context"
        );
        Ok(())
    }

    fn get_publisher(&mut self) -> Result<KafkaPublisher> {
        match self.require_context()? {
            Context::Submission => {
                let write_partitions = self.request_write_partitions()?;
                let receive_partitions = self.discover(&self.config.response_topic)?;
                self.query_publisher(write_partitions, receive_partitions)
            }
            Context::Processing => self.response_publisher(),
        }
    }

    fn get_publishers(&mut self, n: usize) -> Result<Vec<KafkaPublisher>> {
        match self.require_context()? {
            Context::Submission => {
                // Publisher i stamps the response partitions subscriber i reads
                let groups = self.allocate_inbound(Context::Submission, n)?;
                let write_partitions = self.request_write_partitions()?;
                groups
                    .into_iter()
                    .map(|group| {
                        self.query_publisher(write_partitions.clone(), group.into_partitions())
                    })
                    .collect()
            }
            Context::Processing => {
                if n == 0 {
                    return Err(ChannelError::from(AllocationError::ZeroInstances).into());
                }
                (0..n).map(|_| self.response_publisher()).collect()
            }
        }
    }

    fn get_subscriber(&mut self) -> Result<KafkaSubscriber> {
        let context = self.require_context()?;
        let group = self
            .allocate_inbound(context, 1)?
            .into_iter()
            .next()
            .ok_or(ChannelError::Allocation(AllocationError::NoPartitions))?;
        self.subscriber(group)
    }

    fn get_subscribers(&mut self, n: usize) -> Result<Vec<KafkaSubscriber>> {
        let context = self.require_context()?;
        self.allocate_inbound(context, n)?
            .into_iter()
            .map(|group| self.subscriber(group))
            .collect()
    }
}
