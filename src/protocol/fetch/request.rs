//! Encoding and creation for Fetch requests.
//!
//! ### Protocol Def
//! ```text
//! Fetch Request (Version: 0) => replica_id max_wait_ms min_bytes [topics]
//!   replica_id => INT32
//!   max_wait_ms => INT32
//!   min_bytes => INT32
//!   topics => topic [partitions]
//!     topic => STRING
//!     partitions => partition fetch_offset partition_max_bytes
//!       partition => INT32
//!       fetch_offset => INT64
//!       partition_max_bytes => INT32
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

/// Clients always pass -1 as the replica id; real ids are for inter-broker
/// traffic.
const CONSUMER_REPLICA_ID: i32 = -1;

/// The base Fetch request object.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub header: HeaderRequest,
    /// The maximum time in milliseconds to wait for the response.
    pub max_wait_ms: i32,
    /// The minimum bytes to accumulate in the response.
    pub min_bytes: i32,
    /// The topics to fetch.
    pub topics: Vec<Topic>,
}

/// Each topic to fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct Topic {
    /// The topic name.
    pub name: String,
    /// Each partition to fetch.
    pub partitions: Vec<Partition>,
}

/// Each partition to fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    /// The partition index.
    pub partition: i32,
    /// The message offset to begin the fetch from.
    pub fetch_offset: i64,
    /// The maximum bytes to fetch from this partition.
    pub partition_max_bytes: i32,
}

impl FetchRequest {
    pub fn new(
        correlation_id: i32,
        client_id: &str,
        max_wait_ms: i32,
        min_bytes: i32,
    ) -> FetchRequest {
        FetchRequest {
            header: HeaderRequest::new(ApiKey::Fetch, API_VERSION, correlation_id, client_id),
            max_wait_ms,
            min_bytes,
            topics: vec![],
        }
    }

    pub fn add(&mut self, topic: &str, partition: i32, fetch_offset: i64, max_bytes: i32) {
        for t in &mut self.topics {
            if t.name == topic {
                t.partitions.push(Partition {
                    partition,
                    fetch_offset,
                    partition_max_bytes: max_bytes,
                });
                return;
            }
        }
        self.topics.push(Topic {
            name: topic.to_owned(),
            partitions: vec![Partition {
                partition,
                fetch_offset,
                partition_max_bytes: max_bytes,
            }],
        });
    }
}

impl ToByte for FetchRequest {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        tracing::trace!("Encoding FetchRequest {:?}", self);
        self.header.encode(buffer)?;
        CONSUMER_REPLICA_ID.encode(buffer)?;
        self.max_wait_ms.encode(buffer)?;
        self.min_bytes.encode(buffer)?;
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
        self.fetch_offset.encode(buffer)?;
        self.partition_max_bytes.encode(buffer)?;
        Ok(())
    }
}

impl TryFrom<Bytes> for FetchRequest {
    type Error = Error;

    fn try_from(s: Bytes) -> Result<Self> {
        let (_, request) =
            parse_fetch_request(NomBytes::new(s.clone())).map_err(|_| Error::ParsingError(s))?;
        Ok(request)
    }
}

pub fn parse_fetch_request(s: NomBytes) -> IResult<NomBytes, FetchRequest> {
    let (s, header) = parse_header_request(s)?;
    parse_fetch_body(s, header)
}

pub(crate) fn parse_fetch_body(
    s: NomBytes,
    header: HeaderRequest,
) -> IResult<NomBytes, FetchRequest> {
    let (s, _replica_id) = be_i32(s)?;
    let (s, max_wait_ms) = be_i32(s)?;
    let (s, min_bytes) = be_i32(s)?;
    let (s, topics) = parser::parse_array(parse_topic)(s)?;

    Ok((
        s,
        FetchRequest {
            header,
            max_wait_ms,
            min_bytes,
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
    let (s, fetch_offset) = be_i64(s)?;
    let (s, partition_max_bytes) = be_i32(s)?;

    Ok((
        s,
        Partition {
            partition,
            fetch_offset,
            partition_max_bytes,
        },
    ))
}
