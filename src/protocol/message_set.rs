//! The message-set wire region.
//!
//! On the wire a message set is a length-governed byte region containing a
//! sequence of self-delimited log entries. The codec treats the region as
//! opaque pass-through payload: fetch decoding hands it over unchanged and
//! produce encoding sends it unchanged. The entry-level helpers here are for
//! the callers on either side of that boundary.
//!
//! ### Protocol Def
//! ```text
//! MessageSet => [Offset MessageSize Message]
//!   Offset => INT64
//!   MessageSize => INT32
//!   Message => Crc MagicByte Attributes Key Value
//!     Crc => INT32
//!     MagicByte => INT8
//!     Attributes => INT8
//!     Key => BYTES (nullable)
//!     Value => BYTES (nullable)
//! ```
//!
//! MessageSets are not preceded by an int32 count like other array elements
//! in the protocol; they are bounded by the region size alone, and the
//! broker may cut the region mid-entry at its byte limit.

use bytes::Bytes;
use crc::Crc;
use nom::{
    bytes::complete::take,
    combinator::map,
    number::complete::{be_i32, be_i64, be_i8},
    IResult,
};
use nombytes::NomBytes;

use crate::{
    encode::ToByte,
    error::Result,
    parser,
};

/// The magic byte (a.k.a version) we use for sent messages.
const MESSAGE_MAGIC_BYTE: i8 = 0;

fn to_crc(data: &[u8]) -> u32 {
    Crc::<u32>::new(&crc::CRC_32_ISO_HDLC).checksum(data)
}

/// An opaque message-set byte region.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageSet {
    pub data: Bytes,
}

/// One log entry inside a message set.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// The log offset of this entry. Anything goes on the produce path;
    /// the broker assigns the real offset.
    pub offset: i64,
    pub key: Option<Bytes>,
    pub value: Option<Bytes>,
}

impl MessageSet {
    /// Render the given entries into a message-set region, computing each
    /// entry's CRC.
    pub fn from_messages(messages: &[Message]) -> Result<MessageSet> {
        let mut set = MessageSet::default();
        set.append(messages)?;
        Ok(set)
    }

    /// Append rendered entries to the region. Entries are self-delimited,
    /// so regions concatenate.
    pub fn append(&mut self, messages: &[Message]) -> Result<()> {
        let mut buf = Vec::from(self.data.as_ref());
        for message in messages {
            message.encode_entry(&mut buf)?;
        }
        self.data = Bytes::from(buf);
        Ok(())
    }

    /// Parse the entries out of the region.
    ///
    /// A truncated trailing entry is normal (the broker cuts the region at
    /// the fetch byte limit) and simply ends the sequence.
    pub fn messages(&self) -> Vec<Message> {
        let mut messages = Vec::new();
        let mut s = NomBytes::new(self.data.clone());
        while !s.to_bytes().is_empty() {
            match parse_entry(s.clone()) {
                Ok((rest, message)) => {
                    messages.push(message);
                    s = rest;
                }
                Err(_) => break,
            }
        }
        messages
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

// render: MessageSetSize MessageSet
impl ToByte for MessageSet {
    fn encode<W: bytes::BufMut>(&self, buffer: &mut W) -> Result<()> {
        self.data.as_ref().encode(buffer)
    }
}

/// Parse a length-governed message-set region, leaving its contents
/// untouched.
pub fn parse_message_set(s: NomBytes) -> IResult<NomBytes, MessageSet> {
    map(parser::parse_bytes, |data| MessageSet { data })(s)
}

fn parse_entry(s: NomBytes) -> IResult<NomBytes, Message> {
    let (s, offset) = be_i64(s)?;
    let (s, size) = be_i32(s)?;
    let (s, body) = take(size as usize)(s)?;

    let b = NomBytes::new(body.into_bytes());
    let (b, _crc) = be_i32(b)?;
    let (b, _magic) = be_i8(b)?;
    let (b, _attributes) = be_i8(b)?;
    let (b, key) = parser::parse_nullable_bytes(b)?;
    let (_, value) = parser::parse_nullable_bytes(b)?;

    Ok((s, Message { offset, key, value }))
}

impl Message {
    pub fn new(key: Option<Bytes>, value: Option<Bytes>) -> Message {
        Message {
            offset: 0,
            key,
            value,
        }
    }

    // render a single entry as: Offset MessageSize Message
    fn encode_entry(&self, buffer: &mut Vec<u8>) -> Result<()> {
        self.offset.encode(buffer)?;

        let size_pos = buffer.len();
        let mut size: i32 = 0;
        size.encode(buffer)?; // reserve space for the size to be computed later

        let crc_pos = buffer.len(); // remember the position where to update the crc later
        let mut crc: i32 = 0;
        crc.encode(buffer)?; // reserve space for the crc to be computed later
        MESSAGE_MAGIC_BYTE.encode(buffer)?;
        (0i8).encode(buffer)?; // attributes: no compression
        self.key.encode(buffer)?;
        self.value.encode(buffer)?;

        // compute the crc and store it back in the reserved space
        crc = to_crc(&buffer[(crc_pos + 4)..]) as i32;
        crc.encode(&mut &mut buffer[crc_pos..crc_pos + 4])?;

        // compute the size and store it back in the reserved space
        size = (buffer.len() - crc_pos) as i32;
        size.encode(&mut &mut buffer[size_pos..size_pos + 4])?;

        Ok(())
    }
}
