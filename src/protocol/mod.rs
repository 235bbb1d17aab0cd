//! Bytecode protocol requests & responses.
//!
//! This module aims to implement the bytecode protocol outlined in the
//! [Kafka Documentation](https://kafka.apache.org/protocol.html)
//!
//! The module is set up as a list of message pairs containing two files
//! each corresponding to the request and response.
//!
//! The request files hold the logic for creating and encoding structs that
//! will be sent to the broker. The response files hold the logic for parsing
//! and processing the messages coming from the broker. Both directions are
//! decodable, so the same definitions serve the client outbound path and the
//! server inbound path.
//!
//! On top of the per-API pairs, this module defines the [`Request`] and
//! [`Response`] unions and the frame-level entry points: [`decode_request`]
//! for a server taking apart one inbound frame, [`decode_response`] for a
//! client resolving one inbound frame against its [`RequestCorrelator`], and
//! [`encode_response`] for the response directions that have encoders.

pub mod commit_offset;
pub mod consumer_metadata;
pub mod fetch;
pub mod list_offsets;
pub mod message_set;
pub mod metadata;
pub mod offset_fetch;
pub mod produce;

use bytes::{BufMut, Bytes, BytesMut};
use nom::{
    number::complete::{be_i16, be_i32},
    IResult,
};
use nombytes::NomBytes;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive as _;

// re exporting these for ease
pub use self::{
    commit_offset::{request::OffsetCommitRequest, response::OffsetCommitResponse},
    consumer_metadata::{
        request::ConsumerMetadataRequest, response::ConsumerMetadataResponse,
    },
    fetch::{request::FetchRequest, response::FetchResponse},
    list_offsets::{request::ListOffsetsRequest, response::ListOffsetsResponse},
    message_set::{parse_message_set, Message, MessageSet},
    metadata::{request::MetadataRequest, response::MetadataResponse},
    offset_fetch::{request::OffsetFetchRequest, response::OffsetFetchResponse},
    produce::{request::ProduceRequest, response::ProduceResponse},
};
use crate::{
    correlator::RequestCorrelator,
    encode::ToByte,
    error::{Error, Result},
    parser,
    stream_fetch::StreamFetchResponse,
};

/// The API keys this crate speaks, with their wire discriminants.
///
/// [`ApiKey::LeaderAndIsr`] and [`ApiKey::StopReplica`] are inter-broker
/// APIs; their ids are recognized so frames carrying them can be routed, but
/// neither direction of their bodies is decoded here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive)]
pub enum ApiKey {
    Produce = 0,
    Fetch = 1,
    ListOffsets = 2,
    Metadata = 3,
    LeaderAndIsr = 4,
    StopReplica = 5,
    OffsetCommit = 8,
    OffsetFetch = 9,
    ConsumerMetadata = 10,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeaderRequest {
    /// The API key of this request.
    pub api_key: ApiKey,
    /// The API version of this request.
    pub api_version: i16,
    /// The correlation ID of this request.
    pub correlation_id: i32,
    /// The client ID string.
    pub client_id: String,
}

impl HeaderRequest {
    /// Create new header request.
    ///
    /// This goes at the beginning of every single request.
    pub fn new(
        api_key: ApiKey,
        api_version: i16,
        correlation_id: i32,
        client_id: &str,
    ) -> HeaderRequest {
        HeaderRequest {
            api_key,
            api_version,
            correlation_id,
            client_id: client_id.to_owned(),
        }
    }
}

impl ToByte for HeaderRequest {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        (self.api_key as i16).encode(buffer)?;
        self.api_version.encode(buffer)?;
        self.correlation_id.encode(buffer)?;
        self.client_id.encode(buffer)?;
        Ok(())
    }
}

pub fn parse_header_request(s: NomBytes) -> IResult<NomBytes, HeaderRequest> {
    let (s, api_key) = parse_api_key(s)?;
    let (s, api_version) = be_i16(s)?;
    let (s, correlation_id) = be_i32(s)?;
    let (s, client_id) = parser::parse_utf8_string(s)?;

    Ok((
        s,
        HeaderRequest {
            api_key,
            api_version,
            correlation_id,
            client_id,
        },
    ))
}

fn parse_api_key(s: NomBytes) -> IResult<NomBytes, ApiKey> {
    let (s, raw) = be_i16(s)?;
    match ApiKey::from_i16(raw) {
        Some(api_key) => Ok((s, api_key)),
        None => Err(nom::Err::Error(nom::error::Error::new(
            s,
            nom::error::ErrorKind::Verify,
        ))),
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderResponse {
    /// The correlation ID of this response.
    pub correlation_id: i32,
}

pub fn parse_header_response(s: NomBytes) -> IResult<NomBytes, HeaderResponse> {
    let (s, correlation_id) = be_i32(s)?;
    Ok((s, HeaderResponse { correlation_id }))
}

/// One decoded request, any API.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Produce(ProduceRequest),
    Fetch(FetchRequest),
    ListOffsets(ListOffsetsRequest),
    Metadata(MetadataRequest),
    OffsetCommit(OffsetCommitRequest),
    OffsetFetch(OffsetFetchRequest),
    ConsumerMetadata(ConsumerMetadataRequest),
}

impl Request {
    fn header(&self) -> &HeaderRequest {
        match self {
            Request::Produce(r) => &r.header,
            Request::Fetch(r) => &r.header,
            Request::ListOffsets(r) => &r.header,
            Request::Metadata(r) => &r.header,
            Request::OffsetCommit(r) => &r.header,
            Request::OffsetFetch(r) => &r.header,
            Request::ConsumerMetadata(r) => &r.header,
        }
    }

    pub fn api_key(&self) -> ApiKey {
        self.header().api_key
    }

    pub fn correlation_id(&self) -> i32 {
        self.header().correlation_id
    }
}

impl ToByte for Request {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        match self {
            Request::Produce(r) => r.encode(buffer),
            Request::Fetch(r) => r.encode(buffer),
            Request::ListOffsets(r) => r.encode(buffer),
            Request::Metadata(r) => r.encode(buffer),
            Request::OffsetCommit(r) => r.encode(buffer),
            Request::OffsetFetch(r) => r.encode(buffer),
            Request::ConsumerMetadata(r) => r.encode(buffer),
        }
    }
}

/// One decoded response, any API.
///
/// [`Response::StreamFetch`] carries the live handle produced by the
/// streaming fetch path rather than a fully-materialized body.
/// [`Response::Nil`] is the server-side sentinel for "write nothing back",
/// used when a produce request was sent with `required_acks = 0`.
#[derive(Debug)]
pub enum Response {
    Produce(ProduceResponse),
    Fetch(FetchResponse),
    ListOffsets(ListOffsetsResponse),
    Metadata(MetadataResponse),
    OffsetCommit(OffsetCommitResponse),
    OffsetFetch(OffsetFetchResponse),
    ConsumerMetadata(ConsumerMetadataResponse),
    StreamFetch(StreamFetchResponse),
    Nil,
}

/// The outcome of decoding one response frame.
///
/// A frame whose correlation id has no live registration, or whose api is
/// one we do not decode response bodies for, is handed back untouched so a
/// layer above can route it.
#[derive(Debug)]
pub enum Decoded {
    Emit(Response),
    Passthrough(Bytes),
}

/// Decode one length-stripped response frame against the in-flight table.
///
/// The correlation id is resolved (and retired) first; the registered api
/// key then selects the body parser. Frames for unknown correlation ids come
/// back as [`Decoded::Passthrough`].
pub fn decode_response(frame: Bytes, correlator: &RequestCorrelator) -> Result<Decoded> {
    let (_, header) = parse_header_response(NomBytes::new(frame.clone()))
        .map_err(|_| Error::ParsingError(frame.clone()))?;

    let api_key = match correlator.resolve(header.correlation_id) {
        Ok(api_key) => api_key,
        Err(Error::UnknownCorrelationId(id)) => {
            tracing::debug!(
                "Passing through response frame for unknown correlation id {}",
                id
            );
            return Ok(Decoded::Passthrough(frame));
        }
        Err(err) => return Err(err),
    };

    let response = match api_key {
        ApiKey::Produce => Response::Produce(ProduceResponse::try_from(frame)?),
        ApiKey::Fetch => Response::Fetch(FetchResponse::try_from(frame)?),
        ApiKey::ListOffsets => Response::ListOffsets(ListOffsetsResponse::try_from(frame)?),
        ApiKey::Metadata => Response::Metadata(MetadataResponse::try_from(frame)?),
        ApiKey::OffsetCommit => Response::OffsetCommit(OffsetCommitResponse::try_from(frame)?),
        ApiKey::OffsetFetch => Response::OffsetFetch(OffsetFetchResponse::try_from(frame)?),
        ApiKey::ConsumerMetadata => {
            Response::ConsumerMetadata(ConsumerMetadataResponse::try_from(frame)?)
        }
        ApiKey::LeaderAndIsr | ApiKey::StopReplica => {
            return Ok(Decoded::Passthrough(frame));
        }
    };

    Ok(Decoded::Emit(response))
}

/// Decode one length-stripped request frame.
///
/// An api key outside the decodable set fails with
/// [`Error::UnsupportedRequestApi`]; the caller decides whether that kills
/// the connection or just this request.
pub fn decode_request(frame: Bytes) -> Result<Request> {
    let raw_key: IResult<NomBytes, i16> = be_i16(NomBytes::new(frame.clone()));
    let (_, raw_key) = raw_key.map_err(|_| Error::ParsingError(frame.clone()))?;
    let api_key = ApiKey::from_i16(raw_key).ok_or(Error::UnsupportedRequestApi(raw_key))?;
    if matches!(api_key, ApiKey::LeaderAndIsr | ApiKey::StopReplica) {
        return Err(Error::UnsupportedRequestApi(raw_key));
    }

    let (s, header) = parse_header_request(NomBytes::new(frame.clone()))
        .map_err(|_| Error::ParsingError(frame.clone()))?;

    let parsed = match header.api_key {
        ApiKey::Produce => produce::request::parse_produce_body(s, header)
            .map(|(s, r)| (s, Request::Produce(r))),
        ApiKey::Fetch => {
            fetch::request::parse_fetch_body(s, header).map(|(s, r)| (s, Request::Fetch(r)))
        }
        ApiKey::ListOffsets => list_offsets::request::parse_list_offsets_body(s, header)
            .map(|(s, r)| (s, Request::ListOffsets(r))),
        ApiKey::Metadata => metadata::request::parse_metadata_body(s, header)
            .map(|(s, r)| (s, Request::Metadata(r))),
        ApiKey::OffsetCommit => commit_offset::request::parse_offset_commit_body(s, header)
            .map(|(s, r)| (s, Request::OffsetCommit(r))),
        ApiKey::OffsetFetch => offset_fetch::request::parse_offset_fetch_body(s, header)
            .map(|(s, r)| (s, Request::OffsetFetch(r))),
        ApiKey::ConsumerMetadata => {
            consumer_metadata::request::parse_consumer_metadata_body(s, header)
                .map(|(s, r)| (s, Request::ConsumerMetadata(r)))
        }
        ApiKey::LeaderAndIsr | ApiKey::StopReplica => unreachable!(),
    };

    let (_, request) = parsed.map_err(|err| {
        tracing::error!("ERROR: Failed parsing request frame {:?}", err);
        Error::ParsingError(frame)
    })?;
    Ok(request)
}

/// Encode one response into a length-unprefixed frame.
///
/// Only the Metadata and Produce directions have encoders; every other
/// variant fails loudly rather than writing bytes that would not round-trip.
pub fn encode_response(response: &Response) -> Result<Bytes> {
    let mut buffer = BytesMut::with_capacity(4096);
    match response {
        Response::Produce(r) => r.encode(&mut buffer)?,
        Response::Metadata(r) => r.encode(&mut buffer)?,
        Response::Fetch(_) => return Err(Error::UnsupportedResponseEncoding("Fetch")),
        Response::ListOffsets(_) => {
            return Err(Error::UnsupportedResponseEncoding("ListOffsets"))
        }
        Response::OffsetCommit(_) => {
            return Err(Error::UnsupportedResponseEncoding("OffsetCommit"))
        }
        Response::OffsetFetch(_) => {
            return Err(Error::UnsupportedResponseEncoding("OffsetFetch"))
        }
        Response::ConsumerMetadata(_) => {
            return Err(Error::UnsupportedResponseEncoding("ConsumerMetadata"))
        }
        Response::StreamFetch(_) => {
            return Err(Error::UnsupportedResponseEncoding("StreamFetch"))
        }
        Response::Nil => return Err(Error::UnsupportedResponseEncoding("Nil")),
    }
    Ok(buffer.freeze())
}

#[cfg(test)]
mod test {
    use super::*;

    fn encoded(request: &impl ToByte) -> Bytes {
        let mut buf = vec![];
        request.encode(&mut buf).unwrap();
        Bytes::from(buf)
    }

    #[test]
    fn header_request_round_trip() {
        let header = HeaderRequest::new(ApiKey::Metadata, 0, 7, "rust");
        let (_, parsed) = parse_header_request(NomBytes::new(encoded(&header))).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn decode_response_emits_for_registered_id() {
        let correlator = RequestCorrelator::new();
        correlator.register(11, ApiKey::OffsetCommit).unwrap();

        let mut buf = vec![];
        11i32.encode(&mut buf).unwrap();
        0i32.encode(&mut buf).unwrap();

        match decode_response(Bytes::from(buf), &correlator).unwrap() {
            Decoded::Emit(Response::OffsetCommit(response)) => {
                assert_eq!(response.header.correlation_id, 11);
            }
            other => panic!("expected OffsetCommit emit, got {:?}", other),
        }
    }

    #[test]
    fn decode_response_passes_through_unknown_id() {
        let correlator = RequestCorrelator::new();

        let mut buf = vec![];
        99i32.encode(&mut buf).unwrap();
        0i32.encode(&mut buf).unwrap();
        let frame = Bytes::from(buf);

        match decode_response(frame.clone(), &correlator).unwrap() {
            Decoded::Passthrough(bytes) => assert_eq!(bytes, frame),
            other => panic!("expected passthrough, got {:?}", other),
        }
    }

    #[test]
    fn decode_response_passes_through_undecoded_apis() {
        let correlator = RequestCorrelator::new();
        correlator.register(4, ApiKey::LeaderAndIsr).unwrap();

        let mut buf = vec![];
        4i32.encode(&mut buf).unwrap();
        buf.extend_from_slice(b"opaque inter-broker body");
        let frame = Bytes::from(buf);

        match decode_response(frame.clone(), &correlator).unwrap() {
            Decoded::Passthrough(bytes) => assert_eq!(bytes, frame),
            other => panic!("expected passthrough, got {:?}", other),
        }
        // the in-flight entry was still consumed
        assert_eq!(
            correlator.resolve(4),
            Err(Error::UnknownCorrelationId(4))
        );
    }

    #[test]
    fn decode_request_round_trips_a_produce() {
        let mut produce_req = ProduceRequest::new(1, 1000, 42, "rust");
        produce_req
            .add("orders", 0, &[Message::new(None, Some(Bytes::from("hi")))])
            .unwrap();

        match decode_request(encoded(&produce_req)).unwrap() {
            Request::Produce(decoded) => assert_eq!(decoded, produce_req),
            other => panic!("expected produce request, got {:?}", other),
        }
    }

    #[test]
    fn decode_request_rejects_unknown_api_key() {
        let mut buf = vec![];
        HeaderRequest::new(ApiKey::Metadata, 0, 1, "rust")
            .encode(&mut buf)
            .unwrap();
        // overwrite the api key with one nothing decodes
        buf[0] = 0;
        buf[1] = 77;

        assert_eq!(
            decode_request(Bytes::from(buf)),
            Err(Error::UnsupportedRequestApi(77))
        );
    }

    #[test]
    fn decode_request_rejects_inter_broker_apis() {
        let mut buf = vec![];
        HeaderRequest::new(ApiKey::StopReplica, 0, 1, "controller")
            .encode(&mut buf)
            .unwrap();

        assert_eq!(
            decode_request(Bytes::from(buf)),
            Err(Error::UnsupportedRequestApi(5))
        );
    }

    #[test]
    fn encode_response_covers_only_the_two_encodable_apis() {
        let nil = encode_response(&Response::Nil);
        assert_eq!(nil, Err(Error::UnsupportedResponseEncoding("Nil")));

        let mut buf = vec![];
        11i32.encode(&mut buf).unwrap();
        0i32.encode(&mut buf).unwrap();
        let commit = OffsetCommitResponse::try_from(Bytes::from(buf)).unwrap();
        assert_eq!(
            encode_response(&Response::OffsetCommit(commit)),
            Err(Error::UnsupportedResponseEncoding("OffsetCommit"))
        );
    }
}
