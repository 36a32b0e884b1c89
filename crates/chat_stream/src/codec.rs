//! Construct/encode/decode capabilities for stream payload types.

use crate::error::{ChatStreamError, CodecError};

/// Zero-value construction shared by outbound and inbound payloads.
pub trait Codec: Sized {
    fn new_instance() -> Self;
}

/// Outbound request payload for one streaming call.
pub trait Question: Codec + Send + Sync {
    fn encode(&self) -> Result<Vec<u8>, CodecError>;
}

/// One inbound event decoded from a `data:` line or from the raw error buffer.
///
/// `decode` fills a fresh [`Codec::new_instance`] value in place.
pub trait AnswerChunk: Codec + Send + 'static {
    fn decode(&mut self, data: &[u8]) -> Result<(), CodecError>;

    /// Builds a fresh instance and decodes `data` into it.
    fn decode_new(data: &[u8]) -> Result<Self, CodecError> {
        let mut chunk = Self::new_instance();
        chunk.decode(data)?;
        Ok(chunk)
    }

    /// Final event reporting a read or framing failure after the stream
    /// opened. Types that cannot carry client-side errors return `None` and the
    /// queue simply closes.
    fn from_stream_error(_error: &ChatStreamError) -> Option<Self> {
        None
    }
}
