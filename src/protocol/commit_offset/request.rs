//! Encoding and creation for Offset Commit requests.
//!
//! ### Protocol Def
//! ```text
//! OffsetCommit Request (Version: 0) => group_id [topics]
//!   group_id => STRING
//!   topics => name [partitions]
//!     name => STRING
//!     partitions => partition_index committed_offset committed_metadata
//!       partition_index => INT32
//!       committed_offset => INT64
//!       committed_metadata => NULLABLE_STRING
//! ```

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

/// The base Offset Commit request object.
#[derive(Debug, Clone, PartialEq)]
pub struct OffsetCommitRequest {
    pub header: HeaderRequest,
    /// The consumer group the commit is for.
    pub group_id: String,
    /// The topics to commit offsets for.
    pub topics: Vec<Topic>,
}

/// Each topic to commit offsets for.
#[derive(Debug, Clone, PartialEq)]
pub struct Topic {
    /// The topic name.
    pub name: String,
    /// Each partition to commit offsets for.
    pub partitions: Vec<Partition>,
}

/// Each partition to commit offsets for.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    /// The partition index.
    pub partition: i32,
    /// The offset to commit.
    pub offset: i64,
    /// Any associated metadata the client wants to keep.
    pub metadata: Option<String>,
}

impl OffsetCommitRequest {
    pub fn new(correlation_id: i32, client_id: &str, group_id: &str) -> OffsetCommitRequest {
        OffsetCommitRequest {
            header: HeaderRequest::new(
                ApiKey::OffsetCommit,
                API_VERSION,
                correlation_id,
                client_id,
            ),
            group_id: group_id.to_owned(),
            topics: vec![],
        }
    }

    pub fn add(&mut self, topic: &str, partition: i32, offset: i64, metadata: Option<String>) {
        let entry = Partition {
            partition,
            offset,
            metadata,
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

impl ToByte for OffsetCommitRequest {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        tracing::trace!("Encoding OffsetCommitRequest {:?}", self);
        self.header.encode(buffer)?;
        self.group_id.encode(buffer)?;
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
        self.offset.encode(buffer)?;
        self.metadata.encode(buffer)?;
        Ok(())
    }
}

impl TryFrom<Bytes> for OffsetCommitRequest {
    type Error = Error;

    fn try_from(s: Bytes) -> Result<Self> {
        let (_, request) = parse_offset_commit_request(NomBytes::new(s.clone()))
            .map_err(|_| Error::ParsingError(s))?;
        Ok(request)
    }
}

pub fn parse_offset_commit_request(s: NomBytes) -> IResult<NomBytes, OffsetCommitRequest> {
    let (s, header) = parse_header_request(s)?;
    parse_offset_commit_body(s, header)
}

pub(crate) fn parse_offset_commit_body(
    s: NomBytes,
    header: HeaderRequest,
) -> IResult<NomBytes, OffsetCommitRequest> {
    let (s, group_id) = parser::parse_utf8_string(s)?;
    let (s, topics) = parser::parse_array(parse_topic)(s)?;

    Ok((
        s,
        OffsetCommitRequest {
            header,
            group_id,
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
    let (s, offset) = be_i64(s)?;
    let (s, metadata) = parser::parse_nullable_utf8_string(s)?;

    Ok((
        s,
        Partition {
            partition,
            offset,
            metadata,
        },
    ))
}
