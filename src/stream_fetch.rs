//! Streaming decode of Fetch response bodies.
//!
//! A fetch body can be far larger than any other response, so instead of
//! materializing it the way [`decode_response`](crate::protocol::decode_response)
//! does, the read path can hand the body to a [`StreamFetchDecoder`] piece by
//! piece. The decoder emits exactly one [`Response::StreamFetch`] handle per
//! body, at the moment the body begins; partition statuses and messages then
//! flow to the handle's receivers while the rest of the frame is still being
//! read.
//!
//! The channels are bounded at capacity 1, so a slow consumer applies
//! backpressure all the way to the socket. A consumer that drops its
//! receivers does not wedge the read path: sends to a closed channel discard
//! the item and the decoder still drains the body to its end.
//!
//! One fetch is in flight per connection at a time. An event that does not
//! fit the decoder's state means the read path lost track of frame
//! boundaries, and the connection cannot be trusted afterwards.

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;

use crate::{
    error::{Error, KafkaCode, Result},
    protocol::{FetchResponse, Response},
};

/// The per-partition status line of a fetch body.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionStatus {
    /// The topic name.
    pub topic: Bytes,
    /// The partition index.
    pub partition: i32,
    /// The error code, or 0 if there was no error.
    pub error_code: KafkaCode,
    /// The offset at the end of the log for this partition.
    pub high_watermark_offset: i64,
}

/// One log entry of a fetch body, tagged with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedMessage {
    /// The topic name.
    pub topic: Bytes,
    /// The partition index.
    pub partition: i32,
    /// The log offset of this entry.
    pub offset: i64,
    /// The entry payload.
    pub payload: Option<Bytes>,
}

/// The pieces of one fetch body, in the order the read path sees them.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchStreamEvent {
    /// The body's header has been read.
    Begin { correlation_id: i32 },
    /// A partition's status line has been read.
    Partition(PartitionStatus),
    /// A log entry has been read.
    Message(FetchedMessage),
    /// The body is complete.
    End,
}

/// The live handle to one streaming fetch body.
///
/// Statuses and messages arrive on their receivers while the body is being
/// read; `completion` resolves when the body has fully drained, which is the
/// only signal an empty body produces.
#[derive(Debug)]
pub struct StreamFetchResponse {
    pub correlation_id: i32,
    pub partitions: mpsc::Receiver<PartitionStatus>,
    pub messages: mpsc::Receiver<FetchedMessage>,
    pub completion: oneshot::Receiver<()>,
}

impl StreamFetchResponse {
    /// The messages as an async iterator, for combinator-style consumption.
    ///
    /// Consumes the handle; the statuses and the completion signal are
    /// dropped, and the stream ends when the body has drained.
    pub fn into_message_stream(self) -> ReceiverStream<FetchedMessage> {
        ReceiverStream::new(self.messages)
    }
}

#[derive(Debug, Default)]
enum State {
    #[default]
    Idle,
    Streaming(Streaming),
}

#[derive(Debug)]
struct Streaming {
    partitions: mpsc::Sender<PartitionStatus>,
    messages: mpsc::Sender<FetchedMessage>,
    completion: oneshot::Sender<()>,
}

/// Turns a sequence of [`FetchStreamEvent`]s into one
/// [`Response::StreamFetch`] handle and a flow of items on its channels.
#[derive(Debug, Default)]
pub struct StreamFetchDecoder {
    state: State,
}

impl StreamFetchDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one event in.
    ///
    /// Returns `Ok(Some(..))` exactly once per body, for its
    /// [`FetchStreamEvent::Begin`]. Item sends await channel capacity, so
    /// this call inherits the consumer's backpressure. An event the current
    /// state does not allow is a desync and fatal for the connection.
    pub async fn on_event(&mut self, event: FetchStreamEvent) -> Result<Option<Response>> {
        match (&mut self.state, event) {
            (State::Idle, FetchStreamEvent::Begin { correlation_id }) => {
                let (partition_tx, partition_rx) = mpsc::channel(1);
                let (message_tx, message_rx) = mpsc::channel(1);
                let (completion_tx, completion_rx) = oneshot::channel();
                self.state = State::Streaming(Streaming {
                    partitions: partition_tx,
                    messages: message_tx,
                    completion: completion_tx,
                });
                tracing::trace!("Fetch body {} begins streaming", correlation_id);
                Ok(Some(Response::StreamFetch(StreamFetchResponse {
                    correlation_id,
                    partitions: partition_rx,
                    messages: message_rx,
                    completion: completion_rx,
                })))
            }
            (State::Streaming(streaming), FetchStreamEvent::Partition(status)) => {
                if streaming.partitions.send(status).await.is_err() {
                    tracing::debug!("fetch consumer gone, discarding partition status");
                }
                Ok(None)
            }
            (State::Streaming(streaming), FetchStreamEvent::Message(message)) => {
                if streaming.messages.send(message).await.is_err() {
                    tracing::debug!("fetch consumer gone, discarding message");
                }
                Ok(None)
            }
            (State::Streaming(_), FetchStreamEvent::End) => {
                if let State::Streaming(streaming) = std::mem::take(&mut self.state) {
                    // a dropped completion receiver is fine, nothing is waiting
                    let _ = streaming.completion.send(());
                }
                tracing::trace!("Fetch body drained");
                Ok(None)
            }
            (State::Idle, FetchStreamEvent::Partition(_)) => {
                Err(Error::StreamDesync("partition status outside a fetch body"))
            }
            (State::Idle, FetchStreamEvent::Message(_)) => {
                Err(Error::StreamDesync("message outside a fetch body"))
            }
            (State::Idle, FetchStreamEvent::End) => {
                Err(Error::StreamDesync("end of a body that never began"))
            }
            (State::Streaming(_), FetchStreamEvent::Begin { .. }) => {
                Err(Error::StreamDesync("new body while one is still streaming"))
            }
        }
    }
}

/// Slice one complete fetch response frame into its stream events.
///
/// This is the classifier the client read path runs between the framer and
/// the decoder; entry truncation inside a partition's message set ends that
/// partition's messages, same as the materializing path.
pub fn split_fetch_frame(frame: Bytes) -> Result<Vec<FetchStreamEvent>> {
    let response = FetchResponse::try_from(frame)?;

    let mut events = vec![FetchStreamEvent::Begin {
        correlation_id: response.header.correlation_id,
    }];
    for topic in &response.topics {
        for partition in &topic.partitions {
            events.push(FetchStreamEvent::Partition(PartitionStatus {
                topic: topic.name.clone(),
                partition: partition.partition,
                error_code: partition.error_code,
                high_watermark_offset: partition.high_watermark_offset,
            }));
            for message in partition.message_set.messages() {
                events.push(FetchStreamEvent::Message(FetchedMessage {
                    topic: topic.name.clone(),
                    partition: partition.partition,
                    offset: message.offset,
                    payload: message.value,
                }));
            }
        }
    }
    events.push(FetchStreamEvent::End);
    Ok(events)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::encode::ToByte;
    use crate::protocol::{Message, MessageSet};

    fn status(partition: i32) -> PartitionStatus {
        PartitionStatus {
            topic: Bytes::from_static(b"orders"),
            partition,
            error_code: KafkaCode::None,
            high_watermark_offset: 100,
        }
    }

    fn fetched(partition: i32, offset: i64) -> FetchedMessage {
        FetchedMessage {
            topic: Bytes::from_static(b"orders"),
            partition,
            offset,
            payload: Some(Bytes::from_static(b"payload")),
        }
    }

    #[tokio::test]
    async fn begin_emits_exactly_one_handle() {
        let mut decoder = StreamFetchDecoder::new();

        let emitted = decoder
            .on_event(FetchStreamEvent::Begin { correlation_id: 5 })
            .await
            .unwrap();
        let handle = match emitted {
            Some(Response::StreamFetch(handle)) => handle,
            other => panic!("expected a stream handle, got {:?}", other),
        };
        assert_eq!(handle.correlation_id, 5);

        assert!(decoder.on_event(FetchStreamEvent::End).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn items_flow_while_the_body_streams() {
        let mut decoder = StreamFetchDecoder::new();
        let mut handle = match decoder
            .on_event(FetchStreamEvent::Begin { correlation_id: 9 })
            .await
            .unwrap()
        {
            Some(Response::StreamFetch(handle)) => handle,
            other => panic!("expected a stream handle, got {:?}", other),
        };

        let feeder = tokio::spawn(async move {
            decoder
                .on_event(FetchStreamEvent::Partition(status(0)))
                .await
                .unwrap();
            decoder
                .on_event(FetchStreamEvent::Message(fetched(0, 4)))
                .await
                .unwrap();
            decoder
                .on_event(FetchStreamEvent::Message(fetched(0, 5)))
                .await
                .unwrap();
            decoder.on_event(FetchStreamEvent::End).await.unwrap();
        });

        assert_eq!(handle.partitions.recv().await, Some(status(0)));
        assert_eq!(handle.messages.recv().await, Some(fetched(0, 4)));
        assert_eq!(handle.messages.recv().await, Some(fetched(0, 5)));

        feeder.await.unwrap();
        handle.completion.await.unwrap();
        // channels closed at End
        assert_eq!(handle.messages.recv().await, None);
        assert_eq!(handle.partitions.recv().await, None);
    }

    #[tokio::test]
    async fn message_stream_ends_when_the_body_drains() {
        use tokio_stream::StreamExt;

        let mut decoder = StreamFetchDecoder::new();
        let handle = match decoder
            .on_event(FetchStreamEvent::Begin { correlation_id: 7 })
            .await
            .unwrap()
        {
            Some(Response::StreamFetch(handle)) => handle,
            other => panic!("expected a stream handle, got {:?}", other),
        };

        let feeder = tokio::spawn(async move {
            decoder
                .on_event(FetchStreamEvent::Message(fetched(0, 1)))
                .await
                .unwrap();
            decoder
                .on_event(FetchStreamEvent::Message(fetched(0, 2)))
                .await
                .unwrap();
            decoder.on_event(FetchStreamEvent::End).await.unwrap();
        });

        let offsets: Vec<i64> = handle
            .into_message_stream()
            .map(|m| m.offset)
            .collect()
            .await;
        assert_eq!(offsets, [1, 2]);
        feeder.await.unwrap();
    }

    #[tokio::test]
    async fn empty_body_still_signals_completion() {
        let mut decoder = StreamFetchDecoder::new();
        let handle = match decoder
            .on_event(FetchStreamEvent::Begin { correlation_id: 2 })
            .await
            .unwrap()
        {
            Some(Response::StreamFetch(handle)) => handle,
            other => panic!("expected a stream handle, got {:?}", other),
        };

        decoder.on_event(FetchStreamEvent::End).await.unwrap();
        handle.completion.await.unwrap();
    }

    #[tokio::test]
    async fn abandoned_consumer_does_not_wedge_the_decoder() {
        let mut decoder = StreamFetchDecoder::new();
        let handle = decoder
            .on_event(FetchStreamEvent::Begin { correlation_id: 3 })
            .await
            .unwrap();
        drop(handle);

        // capacity is 1; without the closed-channel discard these would hang
        for offset in 0..16 {
            decoder
                .on_event(FetchStreamEvent::Message(fetched(0, offset)))
                .await
                .unwrap();
        }
        decoder.on_event(FetchStreamEvent::End).await.unwrap();
    }

    #[tokio::test]
    async fn out_of_place_events_are_desyncs() {
        let mut decoder = StreamFetchDecoder::new();

        assert!(matches!(
            decoder.on_event(FetchStreamEvent::End).await,
            Err(Error::StreamDesync(_))
        ));
        assert!(matches!(
            decoder
                .on_event(FetchStreamEvent::Message(fetched(0, 1)))
                .await,
            Err(Error::StreamDesync(_))
        ));

        let _handle = decoder
            .on_event(FetchStreamEvent::Begin { correlation_id: 1 })
            .await
            .unwrap();
        assert!(matches!(
            decoder
                .on_event(FetchStreamEvent::Begin { correlation_id: 2 })
                .await,
            Err(Error::StreamDesync(_))
        ));
    }

    #[test]
    fn split_covers_the_whole_frame() {
        let set = MessageSet::from_messages(&[
            Message::new(None, Some(Bytes::from_static(b"a"))),
            Message::new(None, Some(Bytes::from_static(b"b"))),
        ])
        .unwrap();

        let mut buf = vec![];
        8i32.encode(&mut buf).unwrap(); // correlation id
        1i32.encode(&mut buf).unwrap(); // one topic
        "orders".encode(&mut buf).unwrap();
        2i32.encode(&mut buf).unwrap(); // two partitions
        for partition in [0i32, 1i32] {
            partition.encode(&mut buf).unwrap();
            0i16.encode(&mut buf).unwrap();
            50i64.encode(&mut buf).unwrap();
            if partition == 0 {
                set.encode(&mut buf).unwrap();
            } else {
                MessageSet::default().encode(&mut buf).unwrap();
            }
        }

        let events = split_fetch_frame(Bytes::from(buf)).unwrap();
        assert_eq!(events.first(), Some(&FetchStreamEvent::Begin { correlation_id: 8 }));
        assert_eq!(events.last(), Some(&FetchStreamEvent::End));

        let partitions = events
            .iter()
            .filter(|e| matches!(e, FetchStreamEvent::Partition(_)))
            .count();
        let messages: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                FetchStreamEvent::Message(m) => Some(m.payload.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(partitions, 2);
        assert_eq!(
            messages,
            [
                Some(Bytes::from_static(b"a")),
                Some(Bytes::from_static(b"b"))
            ]
        );
    }
}
