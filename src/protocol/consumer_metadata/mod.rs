//! Locate the coordinator broker for a consumer group.

pub mod request;
pub mod response;

#[cfg(test)]
mod test {
    use bytes::Bytes;

    use super::*;
    use crate::{encode::ToByte, error::KafkaCode};

    #[test]
    fn request_round_trip() {
        let coordinator_req = request::ConsumerMetadataRequest::new(17, "rust", "the-data-boyz");

        let mut buf = vec![];
        coordinator_req.encode(&mut buf).unwrap();

        let decoded = request::ConsumerMetadataRequest::try_from(Bytes::from(buf)).unwrap();
        assert_eq!(decoded, coordinator_req);
        assert_eq!(decoded.group_id, "the-data-boyz");
    }

    #[test]
    fn response_parses() {
        let mut buf = vec![];
        17i32.encode(&mut buf).unwrap();
        0i16.encode(&mut buf).unwrap();
        3i32.encode(&mut buf).unwrap();
        "localhost".encode(&mut buf).unwrap();
        9092i32.encode(&mut buf).unwrap();

        let decoded = response::ConsumerMetadataResponse::try_from(Bytes::from(buf)).unwrap();
        assert_eq!(decoded.error_code, KafkaCode::None);
        assert_eq!(decoded.coordinator_id, 3);
        assert_eq!(decoded.coordinator_host, Bytes::from("localhost"));
        assert_eq!(decoded.coordinator_port, 9092);
    }

    #[test]
    fn response_surfaces_unavailable_coordinator() {
        let mut buf = vec![];
        17i32.encode(&mut buf).unwrap();
        15i16.encode(&mut buf).unwrap();
        (-1i32).encode(&mut buf).unwrap();
        "".encode(&mut buf).unwrap();
        (-1i32).encode(&mut buf).unwrap();

        let decoded = response::ConsumerMetadataResponse::try_from(Bytes::from(buf)).unwrap();
        assert_eq!(decoded.error_code, KafkaCode::ConsumerCoordinatorNotAvailable);
    }
}
