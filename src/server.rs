//! Server-side dispatch for one inbound connection.
//!
//! [`serve_connection`] runs the broker side of the wire contract: read one
//! length-prefixed frame, decode it, hand the [`Request`] to the
//! [`RequestHandler`], and write the response back framed. Requests on a
//! connection are handled serially, which is what gives the client its
//! in-order response guarantee.
//!
//! A request the connection cannot decode, or one the handler fails on, is
//! a per-request failure: it is logged and the connection moves on to the
//! next frame. [`Response::Nil`] writes nothing at all, which is the
//! correct answer to a produce request with `required_acks = 0`.

use std::io::ErrorKind;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{
    error::{Error, Result},
    protocol::{decode_request, encode_response, Request, Response},
};

/// The application seam of the server side.
///
/// One handler serves many connections, so implementations hold their state
/// behind `&self`.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn handle(&self, request: Request) -> Result<Response>;
}

/// Serve one connection until its peer hangs up.
///
/// Returns `Ok(())` on a clean close between frames. Transport errors, and
/// a handler response that has no encoder, are connection-fatal.
pub async fn serve_connection<T, H>(mut transport: T, handler: &H) -> Result<()>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
    H: RequestHandler,
{
    loop {
        let mut size = [0u8; 4];
        match transport.read_exact(&mut size).await {
            Ok(_) => {}
            // peer closed between frames
            Err(err) if err.kind() == ErrorKind::UnexpectedEof => return Ok(()),
            Err(err) => return Err(Error::IoError(err.kind())),
        }
        let length = i32::from_be_bytes(size);
        if length < 0 {
            return Err(Error::ParsingError(Bytes::copy_from_slice(&size)));
        }

        let mut frame = vec![0u8; length as usize];
        transport
            .read_exact(&mut frame)
            .await
            .map_err(|err| Error::IoError(err.kind()))?;

        let request = match decode_request(Bytes::from(frame)) {
            Ok(request) => request,
            Err(err) => {
                tracing::error!("ERROR: Dropping undecodable request {:?}", err);
                continue;
            }
        };
        let correlation_id = request.correlation_id();
        tracing::trace!(
            "Handling {:?} request, correlation id {}",
            request.api_key(),
            correlation_id
        );

        let response = match handler.handle(request).await {
            Ok(response) => response,
            Err(err) => {
                tracing::error!(
                    "ERROR: Handler failed for correlation id {} {:?}",
                    correlation_id,
                    err
                );
                continue;
            }
        };

        if matches!(response, Response::Nil) {
            tracing::trace!("No response owed for correlation id {}", correlation_id);
            continue;
        }

        let body = encode_response(&response)?;
        let frame_size = body.len() as i32;
        transport
            .write_all(&frame_size.to_be_bytes())
            .await
            .map_err(|err| Error::IoError(err.kind()))?;
        transport
            .write_all(&body)
            .await
            .map_err(|err| Error::IoError(err.kind()))?;
        transport
            .flush()
            .await
            .map_err(|err| Error::IoError(err.kind()))?;
    }
}
