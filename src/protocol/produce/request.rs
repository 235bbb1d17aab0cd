//! Encoding and creation for Produce requests.
//!
//! ### Protocol Def
//! ```text
//! Produce Request (Version: 0) => acks timeout_ms [topic_data]
//!   acks => INT16
//!   timeout_ms => INT32
//!   topic_data => name [partition_data]
//!     name => STRING
//!     partition_data => index message_set_size message_set
//!       index => INT32
//!       message_set => MESSAGE SET
//! ```
//!
//! With `acks` 0 the broker sends no response at all; the server side
//! answers such a request with [`Response::Nil`](crate::protocol::Response).

use bytes::{BufMut, Bytes};
use nom::{
    number::complete::{be_i16, be_i32},
    IResult,
};
use nombytes::NomBytes;

use crate::{
    encode::ToByte,
    error::{Error, Result},
    parser,
    protocol::{
        message_set::{parse_message_set, Message, MessageSet},
        parse_header_request, ApiKey, HeaderRequest,
    },
};

const API_VERSION: i16 = 0;

/// The base Produce request object.
#[derive(Debug, Clone, PartialEq)]
pub struct ProduceRequest {
    pub header: HeaderRequest,
    /// The number of acknowledgments the producer requires the leader to
    /// have received before considering a request complete. Allowed values:
    /// 0 for no acknowledgments, 1 for only the leader and -1 for the full
    /// ISR.
    pub required_acks: i16,
    /// The timeout to await a response in milliseconds.
    pub timeout_ms: i32,
    /// Each topic to produce to.
    pub topics: Vec<Topic>,
}

/// Each topic to produce to.
#[derive(Debug, Clone, PartialEq)]
pub struct Topic {
    /// The topic name.
    pub name: String,
    /// Each partition to produce to.
    pub partitions: Vec<Partition>,
}

/// Each partition to produce to.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    /// The partition index.
    pub partition: i32,
    /// The record data to be produced, carried opaquely.
    pub message_set: MessageSet,
}

impl ProduceRequest {
    pub fn new(
        required_acks: i16,
        timeout_ms: i32,
        correlation_id: i32,
        client_id: &str,
    ) -> ProduceRequest {
        ProduceRequest {
            header: HeaderRequest::new(ApiKey::Produce, API_VERSION, correlation_id, client_id),
            required_acks,
            timeout_ms,
            topics: vec![],
        }
    }

    /// Whether the request's acknowledgement mode calls for any response
    /// bytes from the peer at all.
    pub fn expects_response(&self) -> bool {
        self.required_acks != 0
    }

    /// Append messages for a topic partition, accumulating into the
    /// existing entry when one exists.
    pub fn add(&mut self, topic: &str, partition: i32, messages: &[Message]) -> Result<()> {
        for t in &mut self.topics {
            if t.name == topic {
                return t.add(partition, messages);
            }
        }
        let mut t = Topic {
            name: topic.to_owned(),
            partitions: vec![],
        };
        t.add(partition, messages)?;
        self.topics.push(t);
        Ok(())
    }
}

impl Topic {
    fn add(&mut self, partition: i32, messages: &[Message]) -> Result<()> {
        for p in &mut self.partitions {
            if p.partition == partition {
                return p.message_set.append(messages);
            }
        }
        self.partitions.push(Partition {
            partition,
            message_set: MessageSet::from_messages(messages)?,
        });
        Ok(())
    }
}

impl ToByte for ProduceRequest {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        tracing::trace!("Encoding ProduceRequest {:?}", self);
        self.header.encode(buffer)?;
        self.required_acks.encode(buffer)?;
        self.timeout_ms.encode(buffer)?;
        self.topics.encode(buffer)?;
        Ok(())
    }
}

impl ToByte for Topic {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        self.name.encode(buffer)?;
        self.partitions.encode(buffer)?;
        Ok(())
    }
}

// render: Partition MessageSetSize MessageSet
impl ToByte for Partition {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        self.partition.encode(buffer)?;
        self.message_set.encode(buffer)?;
        Ok(())
    }
}

// the server path casts an inbound frame into this type
impl TryFrom<Bytes> for ProduceRequest {
    type Error = Error;

    fn try_from(s: Bytes) -> Result<Self> {
        let (_, request) = parse_produce_request(NomBytes::new(s.clone()))
            .map_err(|_| Error::ParsingError(s))?;
        Ok(request)
    }
}

pub fn parse_produce_request(s: NomBytes) -> IResult<NomBytes, ProduceRequest> {
    let (s, header) = parse_header_request(s)?;
    parse_produce_body(s, header)
}

pub(crate) fn parse_produce_body(
    s: NomBytes,
    header: HeaderRequest,
) -> IResult<NomBytes, ProduceRequest> {
    let (s, required_acks) = be_i16(s)?;
    let (s, timeout_ms) = be_i32(s)?;
    let (s, topics) = parser::parse_array(parse_topic)(s)?;

    Ok((
        s,
        ProduceRequest {
            header,
            required_acks,
            timeout_ms,
            topics,
        },
    ))
}

fn parse_topic(s: NomBytes) -> IResult<NomBytes, Topic> {
    let (s, name) = parser::parse_utf8_string(s)?;
    let (s, partitions) = parser::parse_array(parse_partition)(s)?;

    Ok((s, Topic { name, partitions }))
}

fn parse_partition(s: NomBytes) -> IResult<NomBytes, Partition> {
    let (s, partition) = be_i32(s)?;
    let (s, message_set) = parse_message_set(s)?;

    Ok((
        s,
        Partition {
            partition,
            message_set,
        },
    ))
}
