//! Encoding and creation for Offset Fetch requests.
//!
//! ### Protocol Def
//! ```text
//! OffsetFetch Request (Version: 0) => group_id [topics]
//!   group_id => STRING
//!   topics => name [partition_indexes]
//!     name => STRING
//!     partition_indexes => INT32
//! ```

use bytes::{BufMut, Bytes};
use nom::{number::complete::be_i32, IResult};
use nombytes::NomBytes;

use crate::{
    encode::{encode_as_array, ToByte},
    error::{Error, Result},
    parser,
    protocol::{parse_header_request, ApiKey, HeaderRequest},
};

const API_VERSION: i16 = 0;

/// The base Offset Fetch request object.
#[derive(Debug, Clone, PartialEq)]
pub struct OffsetFetchRequest {
    pub header: HeaderRequest,
    /// The consumer group to look up committed offsets for.
    pub group_id: String,
    /// The topics to look up.
    pub topics: Vec<Topic>,
}

/// Each topic to look up.
#[derive(Debug, Clone, PartialEq)]
pub struct Topic {
    /// The topic name.
    pub name: String,
    /// The partition indexes to look up.
    pub partitions: Vec<i32>,
}

impl OffsetFetchRequest {
    pub fn new(correlation_id: i32, client_id: &str, group_id: &str) -> OffsetFetchRequest {
        OffsetFetchRequest {
            header: HeaderRequest::new(
                ApiKey::OffsetFetch,
                API_VERSION,
                correlation_id,
                client_id,
            ),
            group_id: group_id.to_owned(),
            topics: vec![],
        }
    }

    pub fn add(&mut self, topic: &str, partition: i32) {
        for t in &mut self.topics {
            if t.name == topic {
                t.partitions.push(partition);
                return;
            }
        }
        self.topics.push(Topic {
            name: topic.to_owned(),
            partitions: vec![partition],
        });
    }
}

impl ToByte for OffsetFetchRequest {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        tracing::trace!("Encoding OffsetFetchRequest {:?}", self);
        self.header.encode(buffer)?;
        self.group_id.encode(buffer)?;
        self.topics.encode(buffer)?;
        Ok(())
    }
}

impl ToByte for Topic {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        self.name.encode(buffer)?;
        encode_as_array(buffer, &self.partitions, |buffer, p| p.encode(buffer))?;
        Ok(())
    }
}

impl TryFrom<Bytes> for OffsetFetchRequest {
    type Error = Error;

    fn try_from(s: Bytes) -> Result<Self> {
        let (_, request) = parse_offset_fetch_request(NomBytes::new(s.clone()))
            .map_err(|_| Error::ParsingError(s))?;
        Ok(request)
    }
}

pub fn parse_offset_fetch_request(s: NomBytes) -> IResult<NomBytes, OffsetFetchRequest> {
    let (s, header) = parse_header_request(s)?;
    parse_offset_fetch_body(s, header)
}

pub(crate) fn parse_offset_fetch_body(
    s: NomBytes,
    header: HeaderRequest,
) -> IResult<NomBytes, OffsetFetchRequest> {
    let (s, group_id) = parser::parse_utf8_string(s)?;
    let (s, topics) = parser::parse_array(parse_topic)(s)?;

    Ok((
        s,
        OffsetFetchRequest {
            header,
            group_id,
            topics,
        },
    ))
}

fn parse_topic(s: NomBytes) -> IResult<NomBytes, Topic> {
    let (s, name) = parser::parse_utf8_string(s)?;
    let (s, partitions) = parser::parse_array(be_i32)(s)?;

    Ok((s, Topic { name, partitions }))
}
