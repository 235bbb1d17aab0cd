//! Parsing and processing for Fetch responses.
//!
//! ### Example
//! ```rust,ignore
//! let response_bytes = conn.receive_response().await?;
//! let fetch_response = protocol::FetchResponse::try_from(response_bytes.freeze());
//! ```
//!
//! ### Protocol Def
//! ```text
//! Fetch Response (Version: 0) => [responses]
//!   responses => topic [partitions]
//!     topic => STRING
//!     partitions => partition error_code highwater_mark_offset message_set_size message_set
//!       partition => INT32
//!       error_code => INT16
//!       highwater_mark_offset => INT64
//!       message_set => MESSAGE SET
//! ```
//!
//! The message set is carried opaquely; see
//! [`MessageSet`](crate::protocol::MessageSet) for entry access.

use bytes::Bytes;
use nom::{
    number::complete::{be_i32, be_i64},
    IResult,
};
use nombytes::NomBytes;

use crate::{
    error::{Error, KafkaCode, Result},
    parser,
    protocol::{
        message_set::{parse_message_set, MessageSet},
        parse_header_response, HeaderResponse,
    },
};

/// The base Fetch response object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchResponse {
    pub header: HeaderResponse,
    /// The response topics.
    pub topics: Vec<Topic>,
}

/// The response topics.
#[derive(Debug, Clone, PartialEq)]
pub struct Topic {
    /// The topic name.
    pub name: Bytes,
    /// The response partitions.
    pub partitions: Vec<Partition>,
}

/// The response partitions.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    /// The partition index.
    pub partition: i32,
    /// The error code, or 0 if there was no error.
    pub error_code: KafkaCode,
    /// The offset at the end of the log for this partition.
    pub high_watermark_offset: i64,
    /// The fetched region of the partition log.
    pub message_set: MessageSet,
}

// this helps us cast the server response into this type
impl TryFrom<Bytes> for FetchResponse {
    type Error = Error;

    fn try_from(s: Bytes) -> Result<Self> {
        tracing::trace!("Parsing FetchResponse {:?}", s);
        let (_, fetch_response) =
            parse_fetch_response(NomBytes::new(s.clone())).map_err(|err| {
                tracing::error!("ERROR: Failed parsing FetchResponse {:?}", err);
                tracing::error!("ERROR: FetchResponse Bytes {:?}", s);
                Error::ParsingError(s)
            })?;
        tracing::trace!("Parsed FetchResponse {:?}", fetch_response);
        Ok(fetch_response)
    }
}

pub fn parse_fetch_response(s: NomBytes) -> IResult<NomBytes, FetchResponse> {
    let (s, header) = parse_header_response(s)?;
    let (s, topics) = parser::parse_array(parse_topic)(s)?;

    Ok((s, FetchResponse { header, topics }))
}

fn parse_topic(s: NomBytes) -> IResult<NomBytes, Topic> {
    let (s, name) = parser::parse_string(s)?;
    let (s, partitions) = parser::parse_array(parse_partition)(s)?;

    Ok((s, Topic { name, partitions }))
}

fn parse_partition(s: NomBytes) -> IResult<NomBytes, Partition> {
    let (s, partition) = be_i32(s)?;
    let (s, error_code) = parser::parse_kafka_code(s)?;
    let (s, high_watermark_offset) = be_i64(s)?;
    let (s, message_set) = parse_message_set(s)?;

    Ok((
        s,
        Partition {
            partition,
            error_code,
            high_watermark_offset,
            message_set,
        },
    ))
}
