use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use super::{Payload, PAYLOAD_LEN};
use crate::core::Error;

/// Frame codec for the 4-byte RFC 868 timestamp
///
/// The decoder accumulates partial reads until a full timestamp is buffered.
/// A stream that ends short of a full timestamp simply yields no frame; the
/// caller reports that as an EOF from the server.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeCodec;

impl TimeCodec {
    /// Creates a new time codec
    pub fn new() -> Self {
        TimeCodec
    }
}

impl Decoder for TimeCodec {
    type Item = Payload;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < PAYLOAD_LEN {
            src.reserve(PAYLOAD_LEN - src.len());
            return Ok(None);
        }

        let mut payload = [0u8; PAYLOAD_LEN];
        src.copy_to_slice(&mut payload);
        Ok(Some(payload))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // A short tail is not an error at this layer
        match self.decode(src)? {
            Some(payload) => Ok(Some(payload)),
            None => {
                src.clear();
                Ok(None)
            }
        }
    }
}

impl Encoder<Payload> for TimeCodec {
    type Error = Error;

    fn encode(&mut self, item: Payload, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(PAYLOAD_LEN);
        dst.put_slice(&item);
        Ok(())
    }
}
