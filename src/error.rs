//! Error and result types.
//!
//! There are two distinct failure planes in this crate and they must not be
//! mixed up:
//!
//! - [`Error`] values are *transport* failures. Anything codec, correlator,
//!   or stream related is fatal for the connection it happened on; partial
//!   protocol state cannot be trusted to resume, so the connection should be
//!   closed and rebuilt by the caller.
//! - [`KafkaCode`] values are *application* data. Every decoded result
//!   carries its error code inline and a non-`None` code is returned to the
//!   caller as ordinary data. This crate never interprets the codes itself.

use std::fmt;
use std::io::ErrorKind;

use bytes::Bytes;
use num_derive::FromPrimitive;

use crate::protocol::ApiKey;

pub type Result<T> = std::result::Result<T, Error>;

/// Transport-plane failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// An IO error from the underlying connection.
    IoError(ErrorKind),
    /// The given bytes could not be decoded as the expected message.
    ///
    /// Covers malformed lengths and declared lengths that run past the end
    /// of the frame.
    ParsingError(Bytes),
    /// A value could not be represented in its wire field width.
    EncodingError,
    /// A response arrived whose correlation id has no live registration.
    UnknownCorrelationId(i32),
    /// A request was registered under a correlation id that is still in
    /// flight. This is a programming error in the caller.
    CorrelationIdInUse(i32),
    /// A metadata response referenced a broker id absent from its own
    /// broker list.
    MissingBrokerId(i32),
    /// The given response variant has no encoder defined.
    UnsupportedResponseEncoding(&'static str),
    /// An inbound request frame carried an api key with no request decoder.
    UnsupportedRequestApi(i16),
    /// A fetch stream event arrived that the decoder state does not allow.
    StreamDesync(&'static str),
    /// A response frame was decoded for an api the client never issues.
    UnexpectedApi(ApiKey),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::IoError(kind) => write!(f, "io error: {:?}", kind),
            Error::ParsingError(bytes) => {
                write!(f, "could not parse message from {} bytes", bytes.len())
            }
            Error::EncodingError => write!(f, "value does not fit its wire field"),
            Error::UnknownCorrelationId(id) => {
                write!(f, "no in-flight request for correlation id {}", id)
            }
            Error::CorrelationIdInUse(id) => {
                write!(f, "correlation id {} is already in flight", id)
            }
            Error::MissingBrokerId(id) => {
                write!(f, "metadata references unknown broker id {}", id)
            }
            Error::UnsupportedResponseEncoding(variant) => {
                write!(f, "no encoder defined for {} responses", variant)
            }
            Error::UnsupportedRequestApi(key) => {
                write!(f, "no request decoder for api key {}", key)
            }
            Error::StreamDesync(what) => write!(f, "fetch stream desync: {}", what),
            Error::UnexpectedApi(api) => write!(f, "unexpected api {:?} on this path", api),
        }
    }
}

impl std::error::Error for Error {}

/// Kafka protocol numeric error codes.
///
/// These are carried inline in decoded results, never raised as [`Error`].
/// Zero ([`KafkaCode::None`]) means success. The caller decides whether any
/// other code is retryable, fatal, or informational.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum KafkaCode {
    /// An unexpected server error.
    Unknown = -1,
    /// No error.
    None = 0,
    /// The requested offset is outside the range of offsets maintained by
    /// the server for the given topic partition.
    OffsetOutOfRange = 1,
    /// A message contents does not match its CRC.
    InvalidMessage = 2,
    /// The request is for a topic or partition that does not exist on this
    /// broker.
    UnknownTopicOrPartition = 3,
    /// The message has a negative size.
    InvalidMessageSize = 4,
    /// The partition is in the middle of leader election and has no leader.
    LeaderNotAvailable = 5,
    /// The request was made to a replica that is not the leader for the
    /// partition.
    NotLeaderForPartition = 6,
    /// The request exceeded the user-specified time limit.
    RequestTimedOut = 7,
    /// The broker is not alive.
    BrokerNotAvailable = 8,
    /// The replica is not available for the requested topic partition.
    ReplicaNotAvailable = 9,
    /// The server has a maximum message size and this message exceeds it.
    MessageSizeTooLarge = 10,
    /// An internal broker request carried a stale controller epoch.
    StaleControllerEpoch = 11,
    /// The committed metadata string exceeds the maximum size.
    OffsetMetadataTooLarge = 12,
    /// A leader epoch in the request is older than the one on the broker.
    StaleLeaderEpoch = 13,
    /// The coordinator is still loading offsets for this group.
    OffsetsLoadInProgress = 14,
    /// The offsets topic has not been created yet, or the coordinator is
    /// not live.
    ConsumerCoordinatorNotAvailable = 15,
    /// This broker is not the coordinator for the given consumer group.
    NotCoordinatorForConsumer = 16,
}
