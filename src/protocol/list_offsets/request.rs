//! Encoding and creation for List Offsets requests.
//!
//! ### Protocol Def
//! ```text
//! ListOffsets Request (Version: 0) => replica_id [topics]
//!   replica_id => INT32
//!   topics => name [partitions]
//!     name => STRING
//!     partitions => partition_index timestamp max_num_offsets
//!       partition_index => INT32
//!       timestamp => INT64
//!       max_num_offsets => INT32
//! ```
//!
//! Timestamp -1 asks for the latest offset, -2 for the earliest.

use bytes::{BufMut, Bytes};
use nom::{
    number::complete::{be_i32, be_i64},
    IResult,
};
use nombytes::NomBytes;

use crate::{
    encode::ToByte,
    error::{Error, Result},
    parser,
    protocol::{parse_header_request, ApiKey, HeaderRequest},
};

const API_VERSION: i16 = 0;
const CONSUMER_REPLICA_ID: i32 = -1;

/// The base List Offsets request object.
#[derive(Debug, Clone, PartialEq)]
pub struct ListOffsetsRequest {
    pub header: HeaderRequest,
    /// The topics to list offsets for.
    pub topics: Vec<Topic>,
}

/// Each topic to list offsets for.
#[derive(Debug, Clone, PartialEq)]
pub struct Topic {
    /// The topic name.
    pub name: String,
    /// Each partition to list offsets for.
    pub partitions: Vec<Partition>,
}

/// Each partition to list offsets for.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    /// The partition index.
    pub partition: i32,
    /// The target timestamp, or -1 latest / -2 earliest.
    pub timestamp: i64,
    /// The maximum number of offsets to report.
    pub max_num_offsets: i32,
}

impl ListOffsetsRequest {
    pub fn new(correlation_id: i32, client_id: &str) -> ListOffsetsRequest {
        ListOffsetsRequest {
            header: HeaderRequest::new(ApiKey::ListOffsets, API_VERSION, correlation_id, client_id),
            topics: vec![],
        }
    }

    pub fn add(&mut self, topic: &str, partition: i32, timestamp: i64, max_num_offsets: i32) {
        let entry = Partition {
            partition,
            timestamp,
            max_num_offsets,
        };
        for t in &mut self.topics {
            if t.name == topic {
                t.partitions.push(entry);
                return;
            }
        }
        self.topics.push(Topic {
            name: topic.to_owned(),
            partitions: vec![entry],
        });
    }
}

impl ToByte for ListOffsetsRequest {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        tracing::trace!("Encoding ListOffsetsRequest {:?}", self);
        self.header.encode(buffer)?;
        CONSUMER_REPLICA_ID.encode(buffer)?;
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

impl ToByte for Partition {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        self.partition.encode(buffer)?;
        self.timestamp.encode(buffer)?;
        self.max_num_offsets.encode(buffer)?;
        Ok(())
    }
}

impl TryFrom<Bytes> for ListOffsetsRequest {
    type Error = Error;

    fn try_from(s: Bytes) -> Result<Self> {
        let (_, request) = parse_list_offsets_request(NomBytes::new(s.clone()))
            .map_err(|_| Error::ParsingError(s))?;
        Ok(request)
    }
}

pub fn parse_list_offsets_request(s: NomBytes) -> IResult<NomBytes, ListOffsetsRequest> {
    let (s, header) = parse_header_request(s)?;
    parse_list_offsets_body(s, header)
}

pub(crate) fn parse_list_offsets_body(
    s: NomBytes,
    header: HeaderRequest,
) -> IResult<NomBytes, ListOffsetsRequest> {
    let (s, _replica_id) = be_i32(s)?;
    let (s, topics) = parser::parse_array(parse_topic)(s)?;

    Ok((s, ListOffsetsRequest { header, topics }))
}

fn parse_topic(s: NomBytes) -> IResult<NomBytes, Topic> {
    let (s, name) = parser::parse_utf8_string(s)?;
    let (s, partitions) = parser::parse_array(parse_partition)(s)?;

    Ok((s, Topic { name, partitions }))
}

fn parse_partition(s: NomBytes) -> IResult<NomBytes, Partition> {
    let (s, partition) = be_i32(s)?;
    let (s, timestamp) = be_i64(s)?;
    let (s, max_num_offsets) = be_i32(s)?;

    Ok((
        s,
        Partition {
            partition,
            timestamp,
            max_num_offsets,
        },
    ))
}
