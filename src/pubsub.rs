//! Broker-agnostic publish/subscribe contract
//!
//! These traits describe what an application sees: publishers that send
//! messages, subscribers that hand them out one at a time, and a factory that
//! builds both for a given [`Context`]. The Kafka transport in
//! [`crate::kafka`] is one implementation.

use crate::kafka::error::Result;

/// Role an instance plays in the request/response flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Context {
    /// Publishes requests, receives responses
    Submission,
    /// Receives requests, publishes responses
    Processing,
}

impl Context {
    /// Parse from a configuration string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "submission" | "query_submission" => Some(Context::Submission),
            "processing" | "query_processing" => Some(Context::Processing),
            _ => None,
        }
    }

    /// Convert to configuration string
    pub fn as_str(&self) -> &'static str {
        match self {
            Context::Submission => "submission",
            Context::Processing => "processing",
        }
    }
}

impl std::fmt::Display for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the response to a request must be published
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyTo {
    /// Response topic
    pub topic: String,
    /// Response partition; `None` leaves placement to the broker
    pub partition: Option<i32>,
}

/// A message flowing through the pub-sub layer
///
/// The payload is opaque. The id is the correlation key shared by a request
/// and its response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PubSubMessage {
    /// Correlation id (also the record key on the wire)
    pub id: String,
    /// Opaque payload
    pub content: Option<Vec<u8>>,
    /// Response address, set on requests by the submission side
    pub reply_to: Option<ReplyTo>,
}

impl PubSubMessage {
    /// Create a message without a response address
    pub fn new(id: impl Into<String>, content: Option<Vec<u8>>) -> Self {
        Self {
            id: id.into(),
            content,
            reply_to: None,
        }
    }

    /// Attach a response address
    pub fn with_reply_to(mut self, reply_to: ReplyTo) -> Self {
        self.reply_to = Some(reply_to);
        self
    }
}

/// Sends messages
pub trait Publisher {
    /// Send a message, returning it as sent (with any routing metadata the
    /// publisher attached)
    fn send(&mut self, message: PubSubMessage) -> Result<PubSubMessage>;

    /// Flush pending deliveries and release the client
    fn close(&mut self);
}

/// Hands out received messages one at a time
pub trait Subscriber {
    /// Next message, or `None` if nothing can be delivered right now
    ///
    /// `None` covers both an empty queue and a throttled subscriber; callers
    /// cannot and need not tell them apart.
    fn receive(&mut self) -> Result<Option<PubSubMessage>>;

    /// Mark a delivered message as done
    ///
    /// Messages are tracked by id. Two uncommitted messages with the same id
    /// (e.g. records without a key) share one slot.
    fn commit(&mut self, id: &str);

    /// Mark a delivered message as failed so it is delivered again
    fn fail(&mut self, id: &str);

    /// Release the client
    fn close(&mut self);
}

/// Builds publishers and subscribers for the current context
pub trait PubSub {
    type Publisher: Publisher;
    type Subscriber: Subscriber;

    /// Current context, if one has been selected
    fn context(&self) -> Option<Context>;

    /// Select a context; every later instance is built for it
    fn switch_context(&mut self, context: Context) -> Result<()>;

    /// A single publisher for the current context
    fn get_publisher(&mut self) -> Result<Self::Publisher>;

    /// Up to `n` publishers for the current context
    fn get_publishers(&mut self, n: usize) -> Result<Vec<Self::Publisher>>;

    /// A single subscriber for the current context
    fn get_subscriber(&mut self) -> Result<Self::Subscriber>;

    /// Up to `n` subscribers for the current context
    fn get_subscribers(&mut self, n: usize) -> Result<Vec<Self::Subscriber>>;
}
