//! Parsing and processing for Metadata responses.
//!
//! The response contains metadata for each partition, with partitions
//! grouped together by topic. On the wire this metadata refers to brokers
//! by their broker id; decoding builds an id lookup table from the
//! response's own broker list and resolves every reference against it, so
//! callers always see whole [`Broker`] values. A leader id of -1 (leader
//! election in progress) resolves to an absent leader, never a sentinel
//! broker. A replica or isr reference to an id missing from the broker
//! list fails the decode.
//!
//! ### Protocol Def
//! ```text
//! Metadata Response (Version: 0) => [brokers] [topics]
//!   brokers => node_id host port
//!     node_id => INT32
//!     host => STRING
//!     port => INT32
//!   topics => error_code name [partitions]
//!     error_code => INT16
//!     name => STRING
//!     partitions => error_code partition_index leader_id [replica_nodes] [isr_nodes]
//!       error_code => INT16
//!       partition_index => INT32
//!       leader_id => INT32
//!       replica_nodes => INT32
//!       isr_nodes => INT32
//! ```
//!
//! This response also has an encoder, for the server-side path.

use std::collections::HashMap;

use bytes::{BufMut, Bytes};
use nom::{number::complete::be_i32, IResult};
use nombytes::NomBytes;

use crate::{
    encode::{encode_as_array, KafkaString, ToByte},
    error::{Error, KafkaCode, Result},
    parser,
    protocol::{parse_header_response, HeaderResponse},
};

const NO_LEADER: i32 = -1;

/// The base Metadata response object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataResponse {
    pub header: HeaderResponse,
    /// Each broker in the response.
    pub brokers: Vec<Broker>,
    /// Each topic in the response.
    pub topics: Vec<TopicMetadata>,
}

/// Each broker in the response.
#[derive(Debug, Clone, PartialEq)]
pub struct Broker {
    /// The broker ID.
    pub node_id: i32,
    /// The broker hostname.
    pub host: Bytes,
    /// The broker port.
    pub port: i32,
}

/// Each topic in the response.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicMetadata {
    /// The topic error, or 0 if there was no error.
    pub error_code: KafkaCode,
    /// The topic name.
    pub name: Bytes,
    /// Each partition in the topic.
    pub partitions: Vec<PartitionMetadata>,
}

/// Each partition in the topic.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionMetadata {
    /// The partition error, or 0 if there was no error.
    pub error_code: KafkaCode,
    /// The partition index.
    pub partition: i32,
    /// The broker leading this partition, absent during leader election.
    pub leader: Option<Broker>,
    /// The set of all brokers that host this partition.
    pub replicas: Vec<Broker>,
    /// The brokers that are in sync with the leader for this partition.
    pub isr: Vec<Broker>,
}

// the raw wire shape, before broker ids are resolved
struct RawTopic {
    error_code: KafkaCode,
    name: Bytes,
    partitions: Vec<RawPartition>,
}

struct RawPartition {
    error_code: KafkaCode,
    partition: i32,
    leader_id: i32,
    replica_ids: Vec<i32>,
    isr_ids: Vec<i32>,
}

impl TryFrom<Bytes> for MetadataResponse {
    type Error = Error;

    fn try_from(s: Bytes) -> Result<Self> {
        tracing::trace!("Parsing MetadataResponse {:?}", s);
        let (_, (header, brokers, raw_topics)) = parse_raw_metadata_response(NomBytes::new(
            s.clone(),
        ))
        .map_err(|err| {
            tracing::error!("ERROR: Failed parsing MetadataResponse {:?}", err);
            tracing::error!("ERROR: MetadataResponse Bytes {:?}", s);
            Error::ParsingError(s)
        })?;

        let metadata = resolve_brokers(header, brokers, raw_topics)?;
        tracing::trace!("Parsed MetadataResponse {:?}", metadata);
        Ok(metadata)
    }
}

type RawResponse = (HeaderResponse, Vec<Broker>, Vec<RawTopic>);

fn parse_raw_metadata_response(s: NomBytes) -> IResult<NomBytes, RawResponse> {
    let (s, header) = parse_header_response(s)?;
    let (s, brokers) = parser::parse_array(parse_broker)(s)?;
    let (s, topics) = parser::parse_array(parse_raw_topic)(s)?;

    Ok((s, (header, brokers, topics)))
}

fn parse_broker(s: NomBytes) -> IResult<NomBytes, Broker> {
    let (s, node_id) = be_i32(s)?;
    let (s, host) = parser::parse_string(s)?;
    let (s, port) = be_i32(s)?;

    Ok((s, Broker { node_id, host, port }))
}

fn parse_raw_topic(s: NomBytes) -> IResult<NomBytes, RawTopic> {
    let (s, error_code) = parser::parse_kafka_code(s)?;
    let (s, name) = parser::parse_string(s)?;
    let (s, partitions) = parser::parse_array(parse_raw_partition)(s)?;

    Ok((
        s,
        RawTopic {
            error_code,
            name,
            partitions,
        },
    ))
}

fn parse_raw_partition(s: NomBytes) -> IResult<NomBytes, RawPartition> {
    let (s, error_code) = parser::parse_kafka_code(s)?;
    let (s, partition) = be_i32(s)?;
    let (s, leader_id) = be_i32(s)?;
    let (s, replica_ids) = parser::parse_array(be_i32)(s)?;
    let (s, isr_ids) = parser::parse_array(be_i32)(s)?;

    Ok((
        s,
        RawPartition {
            error_code,
            partition,
            leader_id,
            replica_ids,
            isr_ids,
        },
    ))
}

// The lookup table lives only for the duration of this one response's
// resolution.
fn resolve_brokers(
    header: HeaderResponse,
    brokers: Vec<Broker>,
    raw_topics: Vec<RawTopic>,
) -> Result<MetadataResponse> {
    let by_id: HashMap<i32, &Broker> = brokers.iter().map(|b| (b.node_id, b)).collect();
    let lookup = |node_id: i32| -> Result<Broker> {
        by_id
            .get(&node_id)
            .map(|b| (*b).clone())
            .ok_or(Error::MissingBrokerId(node_id))
    };

    let mut topics = Vec::with_capacity(raw_topics.len());
    for raw_topic in raw_topics {
        let mut partitions = Vec::with_capacity(raw_topic.partitions.len());
        for raw in raw_topic.partitions {
            let leader = if raw.leader_id == NO_LEADER {
                None
            } else {
                Some(lookup(raw.leader_id)?)
            };
            let replicas = raw
                .replica_ids
                .into_iter()
                .map(&lookup)
                .collect::<Result<Vec<Broker>>>()?;
            let isr = raw
                .isr_ids
                .into_iter()
                .map(&lookup)
                .collect::<Result<Vec<Broker>>>()?;

            partitions.push(PartitionMetadata {
                error_code: raw.error_code,
                partition: raw.partition,
                leader,
                replicas,
                isr,
            });
        }
        topics.push(TopicMetadata {
            error_code: raw_topic.error_code,
            name: raw_topic.name,
            partitions,
        });
    }

    Ok(MetadataResponse {
        header,
        brokers,
        topics,
    })
}

impl ToByte for MetadataResponse {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        tracing::trace!("Encoding MetadataResponse {:?}", self);
        self.header.correlation_id.encode(buffer)?;
        self.brokers.encode(buffer)?;
        self.topics.encode(buffer)?;
        Ok(())
    }
}

impl ToByte for Broker {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        self.node_id.encode(buffer)?;
        KafkaString(&self.host).encode(buffer)?;
        self.port.encode(buffer)?;
        Ok(())
    }
}

impl ToByte for TopicMetadata {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        (self.error_code as i16).encode(buffer)?;
        KafkaString(&self.name).encode(buffer)?;
        self.partitions.encode(buffer)?;
        Ok(())
    }
}

// render: brokers by id only; the full records live in the broker list
impl ToByte for PartitionMetadata {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        (self.error_code as i16).encode(buffer)?;
        self.partition.encode(buffer)?;
        self.leader
            .as_ref()
            .map_or(NO_LEADER, |b| b.node_id)
            .encode(buffer)?;
        encode_as_array(buffer, &self.replicas, |buffer, b| {
            b.node_id.encode(buffer)
        })?;
        encode_as_array(buffer, &self.isr, |buffer, b| b.node_id.encode(buffer))?;
        Ok(())
    }
}
