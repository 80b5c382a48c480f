//! Endpoint resolution and fetch strategies
//!
//! This module turns hostnames into endpoints and performs single, bounded
//! attempts against them. The [`Resolve`] and [`Fetch`] traits are the seams
//! the orchestrator is written against; [`SystemResolver`] and
//! [`NetworkFetcher`] are the production implementations.

mod datagram;
mod resolver;
mod stream;

pub use self::datagram::fetch_datagram;
pub use self::resolver::SystemResolver;
pub use self::stream::fetch_stream;

use std::time::Duration;

use async_trait::async_trait;

use crate::core::{Endpoint, Result, Transport};
use crate::protocol::Payload;

/// Turns a host and service into an ordered list of endpoints
#[async_trait]
pub trait Resolve: Send + Sync {
    /// Resolves `host` for `service` over `transport`
    ///
    /// Every IP address family the resolution mechanism offers is kept, in
    /// the order it returned them. An empty result is reported as a resolution
    /// error, never as `Ok(vec![])`.
    async fn resolve(
        &self,
        host: &str,
        service: &str,
        transport: Transport,
    ) -> Result<Vec<Endpoint>>;
}

/// Performs one bounded attempt to get a timestamp from an endpoint
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Fetches the raw payload from `endpoint`, giving up after `timeout`
    async fn fetch(&self, endpoint: &Endpoint, timeout: Option<Duration>) -> Result<Payload>;
}

/// Fetcher that talks to real time servers
///
/// The strategy is picked from the endpoint's transport.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetworkFetcher;

impl NetworkFetcher {
    /// Creates a new network fetcher
    pub fn new() -> Self {
        NetworkFetcher
    }
}

#[async_trait]
impl Fetch for NetworkFetcher {
    async fn fetch(&self, endpoint: &Endpoint, timeout: Option<Duration>) -> Result<Payload> {
        match endpoint.transport() {
            Transport::Stream => fetch_stream(endpoint, timeout).await,
            Transport::Datagram => fetch_datagram(endpoint, timeout).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;
    use tokio::net::{TcpListener, UdpSocket};

    #[tokio::test]
    async fn test_fetcher_dispatches_on_transport() {
        // Same port number on both protocols
        let tcp = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = tcp.local_addr().unwrap();
        let udp = UdpSocket::bind(addr).await.unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = tcp.accept().await.unwrap();
            socket.write_all(&[0, 0, 0, 1]).await.unwrap();
        });
        tokio::spawn(async move {
            let mut buf = [0u8; 4];
            let (_, peer) = udp.recv_from(&mut buf).await.unwrap();
            udp.send_to(&[0, 0, 0, 2], peer).await.unwrap();
        });

        let fetcher = NetworkFetcher::new();
        let timeout = Some(Duration::from_secs(5));

        let via_tcp = fetcher.fetch(&Endpoint::new(addr, Transport::Stream), timeout).await;
        let via_udp = fetcher.fetch(&Endpoint::new(addr, Transport::Datagram), timeout).await;

        assert_eq!(via_tcp.unwrap(), [0, 0, 0, 1]);
        assert_eq!(via_udp.unwrap(), [0, 0, 0, 2]);
    }
}
