//! Deserialize data from the bytecode protocol.
//!
//! Every parser here advances its input view and fails with a regular nom
//! error when the declared length of a field exceeds the bytes remaining.
//! Nothing in this module panics or reads out of bounds on hostile input.

use bytes::Bytes;
use nom::{
    bytes::complete::take,
    combinator::map,
    error::{make_error, ErrorKind},
    multi::many_m_n,
    number::complete::{be_i16, be_i32},
    Err, IResult,
};
use nombytes::NomBytes;
use num_traits::FromPrimitive;

use crate::error::KafkaCode;

pub fn parse_kafka_code(s: NomBytes) -> IResult<NomBytes, KafkaCode> {
    map(be_i16, |n| {
        FromPrimitive::from_i16(n).unwrap_or(KafkaCode::Unknown)
    })(s)
}

/// Parse a protocol string: `int16` length followed by that many bytes.
///
/// A negative length is rejected here; use [`parse_nullable_string`] where
/// the protocol allows `-1`.
pub fn parse_string(s: NomBytes) -> IResult<NomBytes, Bytes> {
    let (s, length) = be_i16(s)?;
    if length < 0 {
        return Err(Err::Error(make_error(s, ErrorKind::LengthValue)));
    }
    let (s, string) = take(length as usize)(s)?;
    Ok((s, string.into_bytes()))
}

/// Parse a protocol string into owned UTF-8, for request fields that the
/// server path hands to application code.
pub fn parse_utf8_string(s: NomBytes) -> IResult<NomBytes, String> {
    let (rest, raw) = parse_string(s)?;
    match std::str::from_utf8(raw.as_ref()) {
        Ok(text) => Ok((rest, text.to_owned())),
        Err(_) => Err(Err::Error(make_error(rest, ErrorKind::Char))),
    }
}

pub fn parse_nullable_string(s: NomBytes) -> IResult<NomBytes, Option<Bytes>> {
    let (s, length) = be_i16(s)?;
    if length == -1 {
        return Ok((s, None));
    }
    if length < -1 {
        return Err(Err::Error(make_error(s, ErrorKind::LengthValue)));
    }
    let (s, string) = take(length as usize)(s)?;
    Ok((s, Some(string.into_bytes())))
}

pub fn parse_nullable_utf8_string(s: NomBytes) -> IResult<NomBytes, Option<String>> {
    let (rest, raw) = parse_nullable_string(s)?;
    match raw {
        None => Ok((rest, None)),
        Some(raw) => match std::str::from_utf8(raw.as_ref()) {
            Ok(text) => Ok((rest, Some(text.to_owned()))),
            Err(_) => Err(Err::Error(make_error(rest, ErrorKind::Char))),
        },
    }
}

/// Parse a protocol byte region: `int32` length followed by that many bytes.
pub fn parse_bytes(s: NomBytes) -> IResult<NomBytes, Bytes> {
    let (s, length) = be_i32(s)?;
    if length < 0 {
        return Err(Err::Error(make_error(s, ErrorKind::LengthValue)));
    }
    let (s, bytes) = take(length as usize)(s)?;
    Ok((s, bytes.into_bytes()))
}

pub fn parse_nullable_bytes(s: NomBytes) -> IResult<NomBytes, Option<Bytes>> {
    let (s, length) = be_i32(s)?;
    if length == -1 {
        return Ok((s, None));
    }
    if length < -1 {
        return Err(Err::Error(make_error(s, ErrorKind::LengthValue)));
    }
    let (s, bytes) = take(length as usize)(s)?;
    Ok((s, Some(bytes.into_bytes())))
}

/// Parse a protocol array: `int32` count followed by that many elements.
///
/// A `-1` count decodes to an empty vector, matching how a null string
/// decodes to an absent value.
pub fn parse_array<O, E, F>(f: F) -> impl FnMut(NomBytes) -> IResult<NomBytes, Vec<O>, E>
where
    F: nom::Parser<NomBytes, O, E> + Copy,
    E: nom::error::ParseError<NomBytes>,
{
    move |input: NomBytes| {
        let i = input.clone();
        let (i, length) = be_i32(i)?;
        if length == -1 {
            return Ok((i, vec![]));
        }
        many_m_n(length as usize, length as usize, f)(i)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_string() {
        let buf = NomBytes::from(b"\x00\x04\x72\x75\x73\x74" as &[u8]);

        assert_eq!(
            parse_string(buf).unwrap().1,
            Bytes::from_static(b"\x72\x75\x73\x74")
        );
    }

    #[test]
    fn string_length_past_end_of_buffer() {
        // declared length 9, only 4 bytes remain
        let buf = NomBytes::from(b"\x00\x09rust" as &[u8]);
        assert!(parse_string(buf).is_err());
    }

    #[test]
    fn negative_string_length_is_rejected() {
        let buf = NomBytes::from(b"\xff\xfe" as &[u8]);
        assert!(parse_string(buf).is_err());
    }

    #[test]
    fn null_string_parses_to_none() {
        let buf = NomBytes::from(b"\xff\xff\x01" as &[u8]);
        let (rest, value) = parse_nullable_string(buf).unwrap();
        assert_eq!(value, None);
        assert_eq!(rest.to_bytes(), Bytes::from_static(b"\x01"));
    }

    #[test]
    fn test_parse_array() {
        let buf = NomBytes::from(
            [
                0, 0, 0, 2, // array size
                0, 4, 114, 117, 115, 116, // string
                0, 4, 114, 117, 115, 116, // string
                0, 0, 0, // leftover input
            ]
            .as_slice(),
        );

        assert_eq!(
            parse_array(parse_string)(buf).unwrap().1,
            vec![Bytes::from_static(b"rust"), Bytes::from_static(b"rust")]
        );
    }

    #[test]
    fn empty_array_parses_to_empty_vec() {
        let buf = NomBytes::from(b"\x00\x00\x00\x00" as &[u8]);
        assert_eq!(
            parse_array(parse_string)(buf).unwrap().1,
            Vec::<Bytes>::new()
        );
    }

    #[test]
    fn array_count_past_end_of_buffer() {
        // two elements declared, one present
        let buf = NomBytes::from(b"\x00\x00\x00\x02\x00\x01a" as &[u8]);
        assert!(parse_array(parse_string)(buf).is_err());
    }

    #[test]
    fn kafka_code_from_wire() {
        let (_, code) = parse_kafka_code(NomBytes::from(b"\x00\x06" as &[u8])).unwrap();
        assert_eq!(code, KafkaCode::NotLeaderForPartition);

        // codes outside the known range collapse to Unknown
        let (_, code) = parse_kafka_code(NomBytes::from(b"\x7f\x00" as &[u8])).unwrap();
        assert_eq!(code, KafkaCode::Unknown);
    }
}
