use bytes::Bytes;
use criterion::*;

use kafka_wire::prelude::encode::ToByte;
use kafka_wire::prelude::protocol::{FetchResponse, Message, MessageSet, ProduceRequest};

fn fetch_response_frame(partitions: i32, messages_per_partition: usize) -> Bytes {
    let messages: Vec<Message> = (0..messages_per_partition)
        .map(|i| {
            Message::new(
                Some(Bytes::from(format!("key-{i}"))),
                Some(Bytes::from(format!(
                    "{{\"seq\": {i}, \"payload\": \"0123456789abcdef0123456789abcdef\"}}"
                ))),
            )
        })
        .collect();
    let set = MessageSet::from_messages(&messages).unwrap();

    let mut buf = vec![];
    42i32.encode(&mut buf).unwrap();
    1i32.encode(&mut buf).unwrap();
    "price-updates".encode(&mut buf).unwrap();
    partitions.encode(&mut buf).unwrap();
    for partition in 0..partitions {
        partition.encode(&mut buf).unwrap();
        0i16.encode(&mut buf).unwrap();
        1_000_000i64.encode(&mut buf).unwrap();
        set.encode(&mut buf).unwrap();
    }
    Bytes::from(buf)
}

fn criterion_benchmark(c: &mut Criterion) {
    let frame = fetch_response_frame(4, 50);

    let mut decode_group = c.benchmark_group("decode");
    decode_group.throughput(Throughput::Bytes(frame.len() as u64));
    decode_group.bench_with_input(
        BenchmarkId::new("fetch_response", frame.len()),
        &frame,
        |b, frame: &Bytes| {
            b.iter(|| {
                let response = FetchResponse::try_from(frame.clone()).unwrap();
                for topic in &response.topics {
                    for partition in &topic.partitions {
                        black_box(partition.message_set.messages());
                    }
                }
            });
        },
    );
    decode_group.finish();

    let messages: Vec<Message> = (0..50)
        .map(|i| Message::new(None, Some(Bytes::from(format!("payload number {i}")))))
        .collect();
    let mut encode_group = c.benchmark_group("encode");
    encode_group.bench_function("produce_request", |b| {
        b.iter(|| {
            let mut request = ProduceRequest::new(1, 1000, 42, "bench");
            request.add("price-updates", 0, &messages).unwrap();
            let mut buf = Vec::with_capacity(8192);
            request.encode(&mut buf).unwrap();
            black_box(buf);
        });
    });
    encode_group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
