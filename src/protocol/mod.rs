//! RFC 868 Time Protocol wire format
//!
//! A time server answers with a single 32-bit unsigned integer in network byte
//! order: the number of seconds since 1900-01-01T00:00:00Z. Over TCP the server
//! sends it as soon as the connection is accepted; over UDP it is the reply to
//! an empty datagram. Nothing else is ever exchanged.

pub mod codec;

pub use self::codec::TimeCodec;

/// Seconds between the protocol epoch (1900) and the Unix epoch (1970)
pub const EPOCH_OFFSET: i64 = 2_208_988_800;

/// Size of the timestamp on the wire
pub const PAYLOAD_LEN: usize = 4;

/// Service name looked up when no other service or port is requested
pub const DEFAULT_SERVICE: &str = "time";

/// Raw timestamp as received from a server
pub type Payload = [u8; PAYLOAD_LEN];

/// Converts a raw payload to seconds since the Unix epoch
///
/// Times before 1970 come out negative. The subtraction is done in `i64`, so
/// every `u32` value is representable.
pub fn to_unix_secs(payload: Payload) -> i64 {
    i64::from(u32::from_be_bytes(payload)) - EPOCH_OFFSET
}

/// Converts seconds since the Unix epoch to a raw payload
///
/// Returns `None` for times outside the range the protocol can express
/// (before 1900 or after 2036-02-07T06:28:15Z).
pub fn from_unix_secs(secs: i64) -> Option<Payload> {
    let protocol_secs = secs.checked_add(EPOCH_OFFSET)?;
    u32::try_from(protocol_secs).ok().map(u32::to_be_bytes)
}
