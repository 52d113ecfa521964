// Record codec for kafka_pubsub
//
// Converts between the broker-agnostic `PubSubMessage` and Kafka records.
//
// Wire layout:
// - Record key   = message id (UTF-8)
// - Record value = message content, opaque and nullable
// - Headers      = response address, present only on requests
//
// The response address never touches the payload, so applications may use
// any serialization for their content.

use tracing::warn;

use super::client::{ConsumedRecord, OutboundRecord};
use super::constants::{HEADER_REPLY_PARTITION, HEADER_REPLY_TOPIC};
use crate::pubsub::{PubSubMessage, ReplyTo};

/// Build the record for a message bound to `topic`
///
/// `partition` of `None` leaves placement to the broker's key-hash
/// partitioner.
pub fn to_record(message: &PubSubMessage, topic: &str, partition: Option<i32>) -> OutboundRecord {
    OutboundRecord {
        topic: topic.to_string(),
        partition,
        key: message.id.clone(),
        payload: message.content.clone(),
        headers: message
            .reply_to
            .as_ref()
            .map(encode_reply_to)
            .unwrap_or_default(),
    }
}

/// Rebuild a message from a consumed record
///
/// A record without a key yields an empty id; a key that is not UTF-8 is
/// decoded lossily.
pub fn from_record(record: ConsumedRecord) -> PubSubMessage {
    let id = match &record.key {
        Some(key) => String::from_utf8_lossy(key).into_owned(),
        None => {
            warn!(
                topic = %record.topic,
                partition = record.partition,
                offset = record.offset,
                "Consumed record has no key"
            );
            String::new()
        }
    };

    let reply_to = decode_reply_to(&record.headers);
    PubSubMessage {
        id,
        content: record.payload,
        reply_to,
    }
}

/// Encode a response address as record headers
pub fn encode_reply_to(reply_to: &ReplyTo) -> Vec<(String, Vec<u8>)> {
    let mut headers = vec![(
        HEADER_REPLY_TOPIC.to_string(),
        reply_to.topic.as_bytes().to_vec(),
    )];
    if let Some(partition) = reply_to.partition {
        headers.push((
            HEADER_REPLY_PARTITION.to_string(),
            partition.to_be_bytes().to_vec(),
        ));
    }
    headers
}

/// Decode a response address from record headers
///
/// No topic header means the record carries no address. A partition header
/// that is not a 4-byte big-endian integer is ignored.
pub fn decode_reply_to(headers: &[(String, Vec<u8>)]) -> Option<ReplyTo> {
    let topic = header_value(headers, HEADER_REPLY_TOPIC)?;
    let topic = String::from_utf8_lossy(topic).into_owned();

    let partition = header_value(headers, HEADER_REPLY_PARTITION).and_then(|bytes| {
        match <[u8; 4]>::try_from(bytes) {
            Ok(raw) => Some(i32::from_be_bytes(raw)),
            Err(_) => {
                warn!(
                    length = bytes.len(),
                    "Ignoring malformed reply partition header"
                );
                None
            }
        }
    });

    Some(ReplyTo { topic, partition })
}

/// Last value of a header; later headers override earlier ones
fn header_value<'a>(headers: &'a [(String, Vec<u8>)], key: &str) -> Option<&'a [u8]> {
    headers
        .iter()
        .rev()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_slice())
}
