//! # kafka-wire
//! Rust-native Kafka wire protocol codec and transport core.
//!
//! This crate provides the byte-level plumbing both sides of a Kafka v0-era
//! connection need: encoding and decoding for the produce, fetch, offset,
//! metadata, and consumer-coordination APIs, correlation-id tracking for
//! pipelined connections, and the dispatch loops that sit directly on a
//! socket. There is no librdkafka FFI anywhere; users of this crate benefit
//! from Rust all the way down.
//!
//! ## Goals
//! - Easy to understand code
//! - Leverage best in class libraries such as Tokio, Nom to do the heavy lifting
//! - Decode nothing speculatively: response frames carry no api key, so the
//!   in-flight table decides every decode
//! - Be a good building block for clients and brokers built around Kafka
//!
//! ## Getting started
//!
//! ### Talking to a broker
//! A [`ClientConnection`](prelude::ClientConnection) pairs a TCP connection
//! with an in-flight request table so requests can be pipelined.
//! ```rust,no_run
//! use kafka_wire::prelude::*;
//!
//! # async fn demo() -> Result<()> {
//! let mut conn = ClientConnection::connect(vec![BrokerAddress {
//!     host: "127.0.0.1".to_string(),
//!     port: 9092,
//! }])
//! .await?;
//!
//! let request = protocol::MetadataRequest::new(
//!     conn.next_correlation_id(),
//!     "my-client",
//!     vec!["my-topic".to_string()],
//! );
//! let response = conn.call(&protocol::Request::Metadata(request)).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Serving connections
//! The broker side is one async trait away: implement
//! [`RequestHandler`](prelude::RequestHandler) and hand each accepted socket
//! to [`serve_connection`](prelude::serve_connection). Frames are handled
//! serially per connection, which is what gives clients their in-order
//! response guarantee.
//!
//! ### Streaming large fetches
//! A fetch body can dwarf every other response, so the client read path can
//! stream one instead of materializing it; see
//! [`receive_fetch_stream`](prelude::ClientConnection::receive_fetch_stream).
//!
//! ## Resources
//! - [Kafka Protocol Spec](https://kafka.apache.org/protocol.html)
//! - [Confluence Docs](https://cwiki.apache.org/confluence/display/KAFKA/A+Guide+To+The+Kafka+Protocol)

mod client;
mod correlator;
mod encode;
mod error;
mod network;
mod parser;
mod protocol;
mod server;
mod stream_fetch;

pub mod prelude {
    //! Main export of various structures and methods
    //!
    //! The crate splits into three layers:
    //! - the codec: [`protocol`] request/response types, [`encode`]
    //!   primitives, and the parsers behind their `TryFrom<Bytes>` impls
    //! - the bookkeeping: [`RequestCorrelator`] mapping in-flight
    //!   correlation ids to the api that was requested
    //! - the dispatch: [`ClientConnection`] on the client side,
    //!   [`serve_connection`] plus [`RequestHandler`] on the server side,
    //!   and the streaming fetch machinery between them

    pub use crate::client::ClientConnection;
    pub use crate::correlator::RequestCorrelator;
    pub use crate::error::{Error, KafkaCode, Result};
    pub use crate::network::{BrokerAddress, BrokerConnection};
    pub use crate::server::{serve_connection, RequestHandler};
    pub use crate::stream_fetch::{
        split_fetch_frame, FetchStreamEvent, FetchedMessage, PartitionStatus, StreamFetchDecoder,
        StreamFetchResponse,
    };

    pub use bytes;

    pub mod encode {
        pub use crate::encode::*;
    }

    pub mod protocol {
        pub use crate::protocol::*;
    }
}
