//! Stream (TCP) fetch strategy
//!
//! The server writes its timestamp as soon as it accepts the connection, so an
//! attempt is connect followed by a read of exactly four bytes. One deadline
//! covers both steps.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use futures::StreamExt;
use tokio::io::AsyncRead;
use tokio::net::TcpStream;
use tokio_util::codec::FramedRead;
use tracing::trace;

use crate::core::{Endpoint, Error, Result, Transport};
use crate::protocol::{Payload, TimeCodec};
use crate::util;

/// Performs one bounded stream attempt against `endpoint`
///
/// With `timeout` set to `None` the attempt waits for as long as the connection
/// takes. The socket is closed before this returns on every path, including
/// expiry of the deadline.
pub async fn fetch_stream(endpoint: &Endpoint, timeout: Option<Duration>) -> Result<Payload> {
    let addr = endpoint.addr();

    let attempt = async {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| Error::connect(addr, e))?;
        trace!(%addr, "connected");
        read_payload(stream, addr).await
    };

    bounded(addr, timeout, attempt).await
}

/// Runs a stream attempt under `timeout`, mapping expiry to a timeout error
async fn bounded<F>(addr: SocketAddr, timeout: Option<Duration>, attempt: F) -> Result<Payload>
where
    F: Future<Output = Result<Payload>>,
{
    util::with_deadline(timeout, attempt)
        .await
        .unwrap_or_else(|after| Err(Error::timeout(addr, Transport::Stream, after)))
}

/// Reads one timestamp from `reader`, accumulating partial reads
pub(crate) async fn read_payload<R>(reader: R, addr: SocketAddr) -> Result<Payload>
where
    R: AsyncRead + Unpin,
{
    let mut frames = FramedRead::new(reader, TimeCodec::new());

    match frames.next().await {
        Some(Ok(payload)) => Ok(payload),
        Some(Err(e)) => Err(e.at(addr)),
        None => Err(Error::eof(addr)),
    }
}
