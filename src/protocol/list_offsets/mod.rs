//! Find the offsets available for topic partitions.

pub mod request;
pub mod response;

#[cfg(test)]
mod test {
    use bytes::Bytes;

    use super::*;
    use crate::{encode::ToByte, error::KafkaCode};

    #[test]
    fn request_round_trip() {
        let mut offsets_req = request::ListOffsetsRequest::new(9, "rust");
        offsets_req.add("orders", 0, -1, 1);
        offsets_req.add("orders", 1, -2, 1);

        let mut buf = vec![];
        offsets_req.encode(&mut buf).unwrap();

        let decoded = request::ListOffsetsRequest::try_from(Bytes::from(buf)).unwrap();
        assert_eq!(decoded, offsets_req);
    }

    #[test]
    fn response_parses_offset_list() {
        let mut buf = vec![];
        9i32.encode(&mut buf).unwrap();
        1i32.encode(&mut buf).unwrap();
        "orders".encode(&mut buf).unwrap();
        1i32.encode(&mut buf).unwrap();
        0i32.encode(&mut buf).unwrap();
        0i16.encode(&mut buf).unwrap();
        2i32.encode(&mut buf).unwrap(); // two offsets
        2048i64.encode(&mut buf).unwrap();
        0i64.encode(&mut buf).unwrap();

        let decoded = response::ListOffsetsResponse::try_from(Bytes::from(buf)).unwrap();
        let partition = &decoded.topics[0].partitions[0];
        assert_eq!(partition.error_code, KafkaCode::None);
        assert_eq!(partition.offsets, vec![2048, 0]);
    }
}
