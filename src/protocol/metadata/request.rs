//! Encoding and creation for Metadata requests.
//!
//! ### Example
//! ```rust,ignore
//! let metadata_request = protocol::MetadataRequest::new(1, client_id, topics);
//! conn.send_request(&metadata_request).await?;
//! ```
//!
//! ### Protocol Def
//! ```text
//! Metadata Request (Version: 0) => [topics]
//!   topics => name
//!     name => STRING
//! ```
//!
//! An empty topic list asks for metadata on all topics.

use bytes::{BufMut, Bytes};
use nom::IResult;
use nombytes::NomBytes;

use crate::{
    encode::{AsStrings, ToByte},
    error::{Error, Result},
    parser,
    protocol::{parse_header_request, ApiKey, HeaderRequest},
};

const API_VERSION: i16 = 0;

/// The base Metadata request object.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataRequest {
    pub header: HeaderRequest,
    /// The topics to fetch metadata for.
    pub topics: Vec<String>,
}

impl MetadataRequest {
    pub fn new(correlation_id: i32, client_id: &str, topics: Vec<String>) -> MetadataRequest {
        MetadataRequest {
            header: HeaderRequest::new(ApiKey::Metadata, API_VERSION, correlation_id, client_id),
            topics,
        }
    }
}

impl ToByte for MetadataRequest {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        tracing::trace!("Encoding MetadataRequest {:?}", self);
        self.header.encode(buffer)?;
        AsStrings(&self.topics).encode(buffer)?;
        Ok(())
    }
}

impl TryFrom<Bytes> for MetadataRequest {
    type Error = Error;

    fn try_from(s: Bytes) -> Result<Self> {
        let (_, request) =
            parse_metadata_request(NomBytes::new(s.clone())).map_err(|_| Error::ParsingError(s))?;
        Ok(request)
    }
}

pub fn parse_metadata_request(s: NomBytes) -> IResult<NomBytes, MetadataRequest> {
    let (s, header) = parse_header_request(s)?;
    parse_metadata_body(s, header)
}

pub(crate) fn parse_metadata_body(
    s: NomBytes,
    header: HeaderRequest,
) -> IResult<NomBytes, MetadataRequest> {
    let (s, topics) = parser::parse_array(parser::parse_utf8_string)(s)?;

    Ok((s, MetadataRequest { header, topics }))
}
