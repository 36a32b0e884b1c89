//! Transport-only streaming chat client primitives.
//!
//! This crate owns request encoding, response line framing and event decoding
//! for line-oriented `data:` streaming endpoints. It is generic over the
//! outbound [`Question`] and inbound [`AnswerChunk`] payload types and contains
//! no conversation state and no rendering.
//!
//! Each call to [`StreamClient::stream`] returns a bounded single-consumer
//! queue fed by one background task that owns the HTTP response body.

pub mod client;
pub mod codec;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod headers;
pub mod lines;

pub use client::{is_cancelled, CancellationSignal, ChatStream, EventQueue, StreamClient};
pub use codec::{AnswerChunk, Codec, Question};
pub use config::StreamConfig;
pub use endpoint::resolve_endpoint;
pub use error::{ChatStreamError, CodecError};
pub use lines::{LineDecoder, StreamLine, MAX_LINE_BYTES};
