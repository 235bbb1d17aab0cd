//! Commit consumed offsets for a group.

pub mod request;
pub mod response;

#[cfg(test)]
mod test {
    use bytes::Bytes;

    use super::*;
    use crate::{encode::ToByte, error::KafkaCode};

    #[test]
    fn request_round_trip() {
        let mut commit_req = request::OffsetCommitRequest::new(11, "rust", "the-data-boyz");
        commit_req.add("orders", 0, 5000, Some("at shutdown".to_string()));
        commit_req.add("orders", 1, 7000, None);

        let mut buf = vec![];
        commit_req.encode(&mut buf).unwrap();

        let decoded = request::OffsetCommitRequest::try_from(Bytes::from(buf)).unwrap();
        assert_eq!(decoded, commit_req);
        assert_eq!(decoded.topics[0].partitions[1].metadata, None);
    }

    #[test]
    fn response_parses() {
        let mut buf = vec![];
        11i32.encode(&mut buf).unwrap();
        1i32.encode(&mut buf).unwrap();
        "orders".encode(&mut buf).unwrap();
        1i32.encode(&mut buf).unwrap();
        0i32.encode(&mut buf).unwrap();
        12i16.encode(&mut buf).unwrap();

        let decoded = response::OffsetCommitResponse::try_from(Bytes::from(buf)).unwrap();
        assert_eq!(
            decoded.topics[0].partitions[0].error_code,
            KafkaCode::OffsetMetadataTooLarge
        );
    }
}
