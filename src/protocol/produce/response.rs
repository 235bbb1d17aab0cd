//! Parsing and processing for Produce responses.
//!
//! ### Example
//! ```rust,ignore
//! let response_bytes = conn.receive_response().await?;
//! let produce_response = protocol::ProduceResponse::try_from(response_bytes.freeze());
//! ```
//!
//! ### Protocol Def
//! ```text
//! Produce Response (Version: 0) => [responses]
//!   responses => name [partition_responses]
//!     name => STRING
//!     partition_responses => index error_code base_offset
//!       index => INT32
//!       error_code => INT16
//!       base_offset => INT64
//! ```
//!
//! This response also has an encoder, for the server-side path.

use bytes::{BufMut, Bytes};
use nom::{
    number::complete::{be_i32, be_i64},
    IResult,
};
use nombytes::NomBytes;

use crate::{
    encode::{KafkaString, ToByte},
    error::{Error, KafkaCode, Result},
    parser,
    protocol::{parse_header_response, HeaderResponse},
};

/// The base Produce response object.
///
/// Note, the request needs to have a non-zero value for `required_acks` to
/// receive a response at all.
#[derive(Debug, Clone, PartialEq)]
pub struct ProduceResponse {
    pub header: HeaderResponse,
    /// Each produce response.
    pub topics: Vec<Topic>,
}

/// Each topic we produced to.
#[derive(Debug, Clone, PartialEq)]
pub struct Topic {
    /// The topic name.
    pub name: Bytes,
    /// Each partition we produced to within the topic.
    pub partitions: Vec<Partition>,
}

/// Each partition we produced to.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    /// The partition index.
    pub partition: i32,
    /// The error code, or 0 if there was no error.
    pub error_code: KafkaCode,
    /// The offset assigned to the first message in the produced set.
    pub offset: i64,
}

// this helps us cast the server response into this type
impl TryFrom<Bytes> for ProduceResponse {
    type Error = Error;

    fn try_from(s: Bytes) -> Result<Self> {
        tracing::trace!("Parsing ProduceResponse {:?}", s);
        let (_, produce) = parse_produce_response(NomBytes::new(s.clone())).map_err(|err| {
            tracing::error!("ERROR: Failed parsing ProduceResponse {:?}", err);
            tracing::error!("ERROR: ProduceResponse Bytes {:?}", s);
            Error::ParsingError(s)
        })?;
        tracing::trace!("Parsed ProduceResponse {:?}", produce);
        Ok(produce)
    }
}

pub fn parse_produce_response(s: NomBytes) -> IResult<NomBytes, ProduceResponse> {
    let (s, header) = parse_header_response(s)?;
    let (s, topics) = parser::parse_array(parse_topic)(s)?;

    Ok((s, ProduceResponse { header, topics }))
}

fn parse_topic(s: NomBytes) -> IResult<NomBytes, Topic> {
    let (s, name) = parser::parse_string(s)?;
    let (s, partitions) = parser::parse_array(parse_partition)(s)?;

    Ok((s, Topic { name, partitions }))
}

fn parse_partition(s: NomBytes) -> IResult<NomBytes, Partition> {
    let (s, partition) = be_i32(s)?;
    let (s, error_code) = parser::parse_kafka_code(s)?;
    let (s, offset) = be_i64(s)?;

    Ok((
        s,
        Partition {
            partition,
            error_code,
            offset,
        },
    ))
}

impl ToByte for ProduceResponse {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        tracing::trace!("Encoding ProduceResponse {:?}", self);
        self.header.correlation_id.encode(buffer)?;
        self.topics.encode(buffer)?;
        Ok(())
    }
}

impl ToByte for Topic {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        KafkaString(&self.name).encode(buffer)?;
        self.partitions.encode(buffer)?;
        Ok(())
    }
}

impl ToByte for Partition {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        self.partition.encode(buffer)?;
        (self.error_code as i16).encode(buffer)?;
        self.offset.encode(buffer)?;
        Ok(())
    }
}
