use std::fmt;
use std::net::SocketAddr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::error::Result;
use crate::protocol::{self, Payload};

/// Transport used to talk to a time server
///
/// This is a run-wide choice: every host in a run is queried over the same
/// transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Transport {
    /// Connection-oriented (TCP): connect, then read the timestamp
    #[default]
    Stream,
    /// Connectionless (UDP): send an empty datagram, receive the timestamp
    Datagram,
}

impl Transport {
    /// Short protocol name
    pub fn name(&self) -> &'static str {
        match self {
            Transport::Stream => "tcp",
            Transport::Datagram => "udp",
        }
    }

    /// What an attempt over this transport is blocked on while it waits
    pub(crate) fn waiting_for(&self) -> &'static str {
        match self {
            Transport::Stream => "connecting to",
            Transport::Datagram => "waiting for packet from",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A resolved address at which a time service may be contacted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Endpoint {
    addr: SocketAddr,
    transport: Transport,
}

impl Endpoint {
    /// Creates a new endpoint
    pub fn new(addr: SocketAddr, transport: Transport) -> Self {
        Endpoint { addr, transport }
    }

    /// Returns the socket address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns the transport the endpoint was resolved for
    pub fn transport(&self) -> Transport {
        self.transport
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.transport)
    }
}

/// Configuration for a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Transport used for every host
    pub transport: Transport,
    /// Per-attempt timeout in seconds; 0 means wait indefinitely
    pub timeout_secs: u64,
    /// Service name or port number to contact
    pub service: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            transport: Transport::default(),
            timeout_secs: super::DEFAULT_TIMEOUT_SECS,
            service: protocol::DEFAULT_SERVICE.to_string(),
        }
    }
}

impl Config {
    /// Per-attempt deadline, `None` when attempts may wait forever
    pub fn timeout(&self) -> Option<Duration> {
        crate::util::timeout_from_secs(self.timeout_secs)
    }
}

/// A timestamp received from a time server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSample {
    /// Seconds since the Unix epoch
    secs: i64,
    /// Where the timestamp came from
    endpoint: Endpoint,
}

impl TimeSample {
    /// Decodes a raw protocol payload received from `endpoint`
    pub fn from_payload(payload: Payload, endpoint: Endpoint) -> Self {
        TimeSample {
            secs: protocol::to_unix_secs(payload),
            endpoint,
        }
    }

    /// Seconds since 1970-01-01T00:00:00Z
    pub fn unix_secs(&self) -> i64 {
        self.secs
    }

    /// The endpoint that answered
    pub fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    /// The sample as a `SystemTime`
    pub fn to_system_time(&self) -> SystemTime {
        let magnitude = Duration::from_secs(self.secs.unsigned_abs());
        if self.secs >= 0 {
            UNIX_EPOCH + magnitude
        } else {
            UNIX_EPOCH - magnitude
        }
    }
}

/// Outcome of querying one requested host
#[derive(Debug)]
pub struct HostResult {
    /// The host as it was requested
    pub host: String,
    /// The accepted sample, or why none was obtained
    pub outcome: Result<TimeSample>,
}

impl HostResult {
    /// Creates a new host result
    pub fn new(host: impl Into<String>, outcome: Result<TimeSample>) -> Self {
        HostResult {
            host: host.into(),
            outcome,
        }
    }

    /// Returns whether the host produced a sample
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Returns the sample, if any
    pub fn sample(&self) -> Option<&TimeSample> {
        self.outcome.as_ref().ok()
    }
}

/// Aggregate of all host results of one run, in request order
#[derive(Debug, Default)]
pub struct RunSummary {
    results: Vec<HostResult>,
}

impl RunSummary {
    /// Creates an empty summary
    pub fn new() -> Self {
        RunSummary::default()
    }

    /// Appends the result for the next host
    pub(crate) fn push(&mut self, result: HostResult) {
        self.results.push(result);
    }

    /// Whether at least one host produced a sample
    pub fn any_succeeded(&self) -> bool {
        self.results.iter().any(HostResult::is_success)
    }

    /// The first host that produced a sample, with its sample
    pub fn first_success(&self) -> Option<(&str, &TimeSample)> {
        self.results
            .iter()
            .find_map(|r| r.sample().map(|s| (r.host.as_str(), s)))
    }

    /// Per-host results in request order
    pub fn results(&self) -> &[HostResult] {
        &self.results
    }

    /// Consumes the summary, returning the per-host results
    pub fn into_results(self) -> Vec<HostResult> {
        self.results
    }

    /// Number of hosts processed
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Returns whether no host was processed
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}
