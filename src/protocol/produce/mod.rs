//! Send messages to a broker.

pub mod request;
pub mod response;

#[cfg(test)]
mod test {
    use bytes::{BufMut, Bytes};

    use super::*;
    use crate::{
        encode::ToByte,
        error::KafkaCode,
        protocol::{Message, MessageSet},
    };

    #[test]
    fn request_round_trip() {
        let mut produce_req = request::ProduceRequest::new(1, 1000, 2, "rust");
        produce_req
            .add(
                "purchases",
                3,
                &[
                    Message::new(
                        Some(Bytes::from_static(b"Tester")),
                        Some(Bytes::from_static(b"Value 1")),
                    ),
                    Message::new(
                        Some(Bytes::from_static(b"Tester")),
                        Some(Bytes::from_static(b"Value 2")),
                    ),
                ],
            )
            .unwrap();
        produce_req
            .add(
                "purchases",
                4,
                &[Message::new(None, Some(Bytes::from_static(b"Value 3")))],
            )
            .unwrap();

        let mut buf = vec![];
        produce_req.encode(&mut buf).unwrap();

        let decoded = request::ProduceRequest::try_from(Bytes::from(buf)).unwrap();
        assert_eq!(decoded, produce_req);

        // the region passes through opaquely but its entries stay readable
        let messages = decoded.topics[0].partitions[0].message_set.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].value, Some(Bytes::from_static(b"Value 2")));
    }

    #[test]
    fn response_round_trip_concrete_bytes() {
        // correlation id 42, topic "orders", partition 0, no error,
        // offset 1024
        let response = response::ProduceResponse {
            header: crate::protocol::HeaderResponse { correlation_id: 42 },
            topics: vec![response::Topic {
                name: Bytes::from_static(b"orders"),
                partitions: vec![response::Partition {
                    partition: 0,
                    error_code: KafkaCode::None,
                    offset: 1024,
                }],
            }],
        };

        let mut expected = vec![];
        expected.put_i32(42);
        expected.put_i32(1);
        expected.put_i16(6);
        expected.put_slice(b"orders");
        expected.put_i32(1);
        expected.put_i32(0);
        expected.put_i16(0);
        expected.put_i64(1024);

        let mut buf = vec![];
        response.encode(&mut buf).unwrap();
        assert_eq!(buf, expected);

        let decoded = response::ProduceResponse::try_from(Bytes::from(buf)).unwrap();
        assert_eq!(decoded, response);
    }
}
