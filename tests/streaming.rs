//! Streaming fetch bodies end to end over TCP.

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use kafka_wire::prelude::{
    encode::ToByte, protocol, BrokerAddress, ClientConnection, Error,
};
use kafka_wire::prelude::protocol::{Message, MessageSet, Request};

/// Accept one connection, read one request frame, answer with the given
/// pre-built response frames.
async fn one_shot_server(listener: TcpListener, responses: Vec<Vec<u8>>) {
    let (mut stream, _) = listener.accept().await.unwrap();

    let mut size = [0u8; 4];
    stream.read_exact(&mut size).await.unwrap();
    let mut body = vec![0u8; i32::from_be_bytes(size) as usize];
    stream.read_exact(&mut body).await.unwrap();

    for response in responses {
        let framed_size = (response.len() as i32).to_be_bytes();
        stream.write_all(&framed_size).await.unwrap();
        stream.write_all(&response).await.unwrap();
    }
    stream.flush().await.unwrap();
    // hold the socket open until the client is done reading
    let _ = stream.read(&mut size).await;
}

fn fetch_response_body(correlation_id: i32, values: &[&'static [u8]]) -> Vec<u8> {
    let messages: Vec<Message> = values
        .iter()
        .map(|v| Message::new(None, Some(Bytes::from_static(v))))
        .collect();
    let set = MessageSet::from_messages(&messages).unwrap();

    let mut buf = vec![];
    correlation_id.encode(&mut buf).unwrap();
    1i32.encode(&mut buf).unwrap(); // one topic
    "orders".encode(&mut buf).unwrap();
    1i32.encode(&mut buf).unwrap(); // one partition
    0i32.encode(&mut buf).unwrap();
    0i16.encode(&mut buf).unwrap();
    5000i64.encode(&mut buf).unwrap();
    set.encode(&mut buf).unwrap();
    buf
}

#[tokio::test]
async fn fetch_body_streams_to_the_consumer() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        // the correlation id the client will allocate first is 0
        one_shot_server(listener, vec![fetch_response_body(0, &[b"alpha", b"beta"])]).await
    });

    let mut conn = ClientConnection::connect(vec![BrokerAddress {
        host: addr.ip().to_string(),
        port: addr.port(),
    }])
    .await
    .unwrap();

    let mut fetch_req = protocol::FetchRequest::new(conn.next_correlation_id(), "rust", 100, 1);
    fetch_req.add("orders", 0, 0, 1_000_000);
    conn.send(&Request::Fetch(fetch_req)).await.unwrap();

    let mut handle = conn.receive_fetch_stream().await.unwrap();
    assert_eq!(handle.correlation_id, 0);

    let status = handle.partitions.recv().await.unwrap();
    assert_eq!(status.topic, Bytes::from_static(b"orders"));
    assert_eq!(status.high_watermark_offset, 5000);

    let mut payloads = vec![];
    while let Some(message) = handle.messages.recv().await {
        payloads.push(message.payload.unwrap());
    }
    assert_eq!(
        payloads,
        [Bytes::from_static(b"alpha"), Bytes::from_static(b"beta")]
    );
    handle.completion.await.unwrap();
}

#[tokio::test]
async fn stale_correlation_id_is_fatal_for_the_client() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        // answer with a correlation id the client never sent
        one_shot_server(listener, vec![fetch_response_body(999, &[])]).await
    });

    let mut conn = ClientConnection::connect(vec![BrokerAddress {
        host: addr.ip().to_string(),
        port: addr.port(),
    }])
    .await
    .unwrap();

    let mut fetch_req = protocol::FetchRequest::new(conn.next_correlation_id(), "rust", 100, 1);
    fetch_req.add("orders", 0, 0, 1_000_000);
    conn.send(&Request::Fetch(fetch_req)).await.unwrap();

    assert_eq!(
        conn.receive().await.unwrap_err(),
        Error::UnknownCorrelationId(999)
    );
}
