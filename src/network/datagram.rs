//! Datagram (UDP) fetch strategy
//!
//! The request is an empty datagram; the reply must be exactly one timestamp.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use tokio::net::UdpSocket;
use tracing::trace;

use crate::core::{Endpoint, Error, Result, Transport};
use crate::protocol::{Payload, PAYLOAD_LEN};
use crate::util;

/// Largest UDP payload, so an oversized reply is never truncated before its
/// length is checked
const MAX_DATAGRAM_LEN: usize = 65_507;

/// Performs one bounded datagram attempt against `endpoint`
///
/// With `timeout` set to `None` the attempt waits indefinitely for a reply.
/// A reply that is not exactly four bytes long is a protocol error: replies
/// are never truncated or padded.
pub async fn fetch_datagram(endpoint: &Endpoint, timeout: Option<Duration>) -> Result<Payload> {
    let addr = endpoint.addr();

    let attempt = async {
        let socket = UdpSocket::bind(unspecified_for(&addr))
            .await
            .map_err(|e| Error::connect(addr, e))?;
        // Connecting filters out datagrams from other peers and surfaces
        // ICMP port-unreachable as an error instead of a silent wait
        socket.connect(addr).await.map_err(|e| Error::connect(addr, e))?;
        socket.send(&[]).await.map_err(|e| Error::send(addr, e))?;
        trace!(%addr, "request sent");

        let mut buf = vec![0u8; MAX_DATAGRAM_LEN];
        let len = socket.recv(&mut buf).await.map_err(|e| Error::read(addr, e))?;
        decode_reply(&buf[..len], addr)
    };

    util::with_deadline(timeout, attempt)
        .await
        .unwrap_or_else(|after| Err(Error::timeout(addr, Transport::Datagram, after)))
}

/// Local wildcard address of the same family as `peer`
fn unspecified_for(peer: &SocketAddr) -> SocketAddr {
    match peer {
        SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
        SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
    }
}

fn decode_reply(reply: &[u8], addr: SocketAddr) -> Result<Payload> {
    match Payload::try_from(reply) {
        Ok(payload) => Ok(payload),
        Err(_) if reply.is_empty() => Err(Error::eof(addr)),
        Err(_) => Err(Error::protocol(
            addr,
            format!(
                "expected a {PAYLOAD_LEN}-byte reply from address {addr}, got {} bytes",
                reply.len()
            ),
        )),
    }
}
