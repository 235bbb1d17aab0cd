//! Parsing and processing for Consumer Metadata responses.
//!
//! ### Protocol Def
//! ```text
//! ConsumerMetadata Response (Version: 0) => error_code coordinator_id coordinator_host coordinator_port
//!   error_code => INT16
//!   coordinator_id => INT32
//!   coordinator_host => STRING
//!   coordinator_port => INT32
//! ```

use bytes::Bytes;
use nom::{number::complete::be_i32, IResult};
use nombytes::NomBytes;

use crate::{
    error::{Error, KafkaCode, Result},
    parser,
    protocol::{parse_header_response, HeaderResponse},
};

/// The base Consumer Metadata response object.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumerMetadataResponse {
    pub header: HeaderResponse,
    /// The error code, or 0 if there was no error.
    pub error_code: KafkaCode,
    /// The node id of the coordinator broker.
    pub coordinator_id: i32,
    /// The host of the coordinator broker.
    pub coordinator_host: Bytes,
    /// The port of the coordinator broker.
    pub coordinator_port: i32,
}

// this helps us cast the server response into this type
impl TryFrom<Bytes> for ConsumerMetadataResponse {
    type Error = Error;

    fn try_from(s: Bytes) -> Result<Self> {
        tracing::trace!("Parsing ConsumerMetadataResponse {:?}", s);
        let (_, consumer_metadata) = parse_consumer_metadata_response(NomBytes::new(s.clone()))
            .map_err(|err| {
                tracing::error!("ERROR: Failed parsing ConsumerMetadataResponse {:?}", err);
                tracing::error!("ERROR: ConsumerMetadataResponse Bytes {:?}", s);
                Error::ParsingError(s)
            })?;
        tracing::trace!("Parsed ConsumerMetadataResponse {:?}", consumer_metadata);
        Ok(consumer_metadata)
    }
}

pub fn parse_consumer_metadata_response(
    s: NomBytes,
) -> IResult<NomBytes, ConsumerMetadataResponse> {
    let (s, header) = parse_header_response(s)?;
    let (s, error_code) = parser::parse_kafka_code(s)?;
    let (s, coordinator_id) = be_i32(s)?;
    let (s, coordinator_host) = parser::parse_string(s)?;
    let (s, coordinator_port) = be_i32(s)?;

    Ok((
        s,
        ConsumerMetadataResponse {
            header,
            error_code,
            coordinator_id,
            coordinator_host,
            coordinator_port,
        },
    ))
}
