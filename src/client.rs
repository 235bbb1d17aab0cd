//! Client-side dispatch over one broker connection.
//!
//! [`ClientConnection`] pairs a [`BrokerConnection`] with a
//! [`RequestCorrelator`] so requests can be pipelined: the broker answers in
//! send order, and every received frame is resolved against the in-flight
//! table to pick its decoder. One decoded object comes back per request.
//!
//! On this adapter a frame that does not match an in-flight request is not
//! routable anywhere else, so it is fatal for the connection rather than a
//! passthrough.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use nombytes::NomBytes;

use crate::{
    correlator::RequestCorrelator,
    error::{Error, Result},
    network::{BrokerAddress, BrokerConnection},
    protocol::{
        decode_response, parse_header_response, ApiKey, Decoded, Request, Response,
    },
    stream_fetch::{split_fetch_frame, StreamFetchDecoder, StreamFetchResponse},
};

/// One broker connection plus the bookkeeping to pipeline requests on it.
#[derive(Clone, Debug)]
pub struct ClientConnection {
    conn: BrokerConnection,
    correlator: RequestCorrelator,
    next_correlation_id: Arc<AtomicI32>,
}

impl ClientConnection {
    pub async fn connect(bootstrap_addrs: Vec<BrokerAddress>) -> Result<Self> {
        let conn = BrokerConnection::connect(bootstrap_addrs).await?;
        Ok(Self::from_broker_connection(conn))
    }

    pub fn from_broker_connection(conn: BrokerConnection) -> Self {
        Self {
            conn,
            correlator: RequestCorrelator::new(),
            next_correlation_id: Arc::new(AtomicI32::new(0)),
        }
    }

    /// Allocate a correlation id for the next request built against this
    /// connection.
    pub fn next_correlation_id(&self) -> i32 {
        self.next_correlation_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Register and write one request.
    ///
    /// The in-flight entry is live before the frame hits the socket, so the
    /// response cannot outrun it.
    pub async fn send(&mut self, request: &Request) -> Result<()> {
        self.correlator
            .register(request.correlation_id(), request.api_key())?;
        self.conn.send_request(request).await
    }

    /// Read one frame and decode it against the in-flight table.
    pub async fn receive(&mut self) -> Result<Response> {
        let frame = self.conn.receive_response().await?.freeze();
        match decode_response(frame, &self.correlator)? {
            Decoded::Emit(response) => Ok(response),
            Decoded::Passthrough(frame) => {
                let (_, header) = parse_header_response(NomBytes::new(frame.clone()))
                    .map_err(|_| Error::ParsingError(frame.clone()))?;
                tracing::error!(
                    "ERROR: response for correlation id {} matches no in-flight request",
                    header.correlation_id
                );
                Err(Error::UnknownCorrelationId(header.correlation_id))
            }
        }
    }

    /// Write one request and wait for its decoded response.
    pub async fn call(&mut self, request: &Request) -> Result<Response> {
        self.send(request).await?;
        self.receive().await
    }

    /// Read one frame that must answer an in-flight Fetch, and stream its
    /// body.
    ///
    /// The handle comes back as soon as the body's header is in; a spawned
    /// task feeds the partition statuses and messages through the handle's
    /// bounded channels while the caller consumes them.
    pub async fn receive_fetch_stream(&mut self) -> Result<StreamFetchResponse> {
        let frame = self.conn.receive_response().await?.freeze();
        let (_, header) = parse_header_response(NomBytes::new(frame.clone()))
            .map_err(|_| Error::ParsingError(frame.clone()))?;
        let api_key = self.correlator.resolve(header.correlation_id)?;
        if api_key != ApiKey::Fetch {
            return Err(Error::UnexpectedApi(api_key));
        }

        let mut events = split_fetch_frame(frame)?.into_iter();
        let mut decoder = StreamFetchDecoder::new();

        let begin = events
            .next()
            .ok_or(Error::StreamDesync("fetch body with no events"))?;
        let handle = match decoder.on_event(begin).await? {
            Some(Response::StreamFetch(handle)) => handle,
            _ => return Err(Error::StreamDesync("fetch body did not begin with a header")),
        };

        tokio::spawn(async move {
            for event in events {
                if let Err(err) = decoder.on_event(event).await {
                    tracing::error!("ERROR: fetch stream aborted {:?}", err);
                    return;
                }
            }
        });

        Ok(handle)
    }
}
