//! Encoding and creation for Consumer Metadata requests.
//!
//! ### Protocol Def
//! ```text
//! ConsumerMetadata Request (Version: 0) => group_id
//!   group_id => STRING
//! ```

use bytes::{BufMut, Bytes};
use nom::IResult;
use nombytes::NomBytes;

use crate::{
    encode::ToByte,
    error::{Error, Result},
    parser,
    protocol::{parse_header_request, ApiKey, HeaderRequest},
};

const API_VERSION: i16 = 0;

/// The base Consumer Metadata request object.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumerMetadataRequest {
    pub header: HeaderRequest,
    /// The consumer group to locate the coordinator for.
    pub group_id: String,
}

impl ConsumerMetadataRequest {
    pub fn new(correlation_id: i32, client_id: &str, group_id: &str) -> ConsumerMetadataRequest {
        ConsumerMetadataRequest {
            header: HeaderRequest::new(
                ApiKey::ConsumerMetadata,
                API_VERSION,
                correlation_id,
                client_id,
            ),
            group_id: group_id.to_owned(),
        }
    }
}

impl ToByte for ConsumerMetadataRequest {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        tracing::trace!("Encoding ConsumerMetadataRequest {:?}", self);
        self.header.encode(buffer)?;
        self.group_id.encode(buffer)?;
        Ok(())
    }
}

impl TryFrom<Bytes> for ConsumerMetadataRequest {
    type Error = Error;

    fn try_from(s: Bytes) -> Result<Self> {
        let (_, request) = parse_consumer_metadata_request(NomBytes::new(s.clone()))
            .map_err(|_| Error::ParsingError(s))?;
        Ok(request)
    }
}

pub fn parse_consumer_metadata_request(s: NomBytes) -> IResult<NomBytes, ConsumerMetadataRequest> {
    let (s, header) = parse_header_request(s)?;
    parse_consumer_metadata_body(s, header)
}

pub(crate) fn parse_consumer_metadata_body(
    s: NomBytes,
    header: HeaderRequest,
) -> IResult<NomBytes, ConsumerMetadataRequest> {
    let (s, group_id) = parser::parse_utf8_string(s)?;

    Ok((s, ConsumerMetadataRequest { header, group_id }))
}
