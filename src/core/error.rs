use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

use super::types::Transport;

/// Custom error types for rdate
///
/// Every variant except `Clock` is scoped to a single host: it ends that
/// host's attempt but never the run.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to lookup '{host}': {cause}")]
    Resolution { host: String, cause: String },

    #[error("{action} {endpoint}: {source}")]
    Connect {
        action: &'static str,
        endpoint: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error(
        "timed out {} {endpoint} after {} seconds.",
        .transport.waiting_for(),
        .after.as_secs()
    )]
    Timeout {
        endpoint: SocketAddr,
        transport: Transport,
        after: Duration,
    },

    #[error("{reason}")]
    Protocol { endpoint: SocketAddr, reason: String },

    #[error("{0}")]
    Clock(String),
}

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`], stable across message wording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Resolution,
    Connect,
    Timeout,
    Protocol,
    Other,
}

impl Error {
    /// Creates a new name lookup error
    pub fn resolution(host: impl Into<String>, cause: impl Into<String>) -> Self {
        Error::Resolution {
            host: host.into(),
            cause: cause.into(),
        }
    }

    /// Creates an error for a failed connection attempt
    pub fn connect(endpoint: SocketAddr, source: io::Error) -> Self {
        Error::Connect {
            action: "connect to address",
            endpoint,
            source,
        }
    }

    /// Creates an error for a request datagram that could not be sent
    pub fn send(endpoint: SocketAddr, source: io::Error) -> Self {
        Error::Connect {
            action: "failed to send UDP message to address",
            endpoint,
            source,
        }
    }

    /// Creates an error for a failed read on an established exchange
    pub fn read(endpoint: SocketAddr, source: io::Error) -> Self {
        Error::Connect {
            action: "error in read from address",
            endpoint,
            source,
        }
    }

    /// Creates a new deadline error
    pub fn timeout(endpoint: SocketAddr, transport: Transport, after: Duration) -> Self {
        Error::Timeout {
            endpoint,
            transport,
            after,
        }
    }

    /// Creates a new protocol error
    pub fn protocol(endpoint: SocketAddr, reason: impl Into<String>) -> Self {
        Error::Protocol {
            endpoint,
            reason: reason.into(),
        }
    }

    /// The server closed the exchange before sending a full timestamp
    pub fn eof(endpoint: SocketAddr) -> Self {
        Error::protocol(endpoint, "got EOF from time server")
    }

    /// Creates a new clock adjustment error
    pub fn clock(msg: impl Into<String>) -> Self {
        Error::Clock(msg.into())
    }

    /// Returns the classification of this error
    pub fn kind(&self) -> FailureKind {
        match self {
            Error::Resolution { .. } => FailureKind::Resolution,
            Error::Connect { .. } | Error::Io(_) => FailureKind::Connect,
            Error::Timeout { .. } => FailureKind::Timeout,
            Error::Protocol { .. } => FailureKind::Protocol,
            Error::Clock(_) => FailureKind::Other,
        }
    }

    /// Whether this error is scoped to one host rather than the whole run
    pub fn is_fetch_failure(&self) -> bool {
        self.kind() != FailureKind::Other
    }

    /// The endpoint a fetch failure happened on, if any
    pub fn endpoint(&self) -> Option<SocketAddr> {
        match self {
            Error::Connect { endpoint, .. }
            | Error::Timeout { endpoint, .. }
            | Error::Protocol { endpoint, .. } => Some(*endpoint),
            _ => None,
        }
    }

    /// Attaches an endpoint to a bare I/O error surfaced by a reader
    pub(crate) fn at(self, endpoint: SocketAddr) -> Self {
        match self {
            Error::Io(source) => Error::read(endpoint, source),
            other => other,
        }
    }
}
