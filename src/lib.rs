//! Streaming chat client with conversation memory.
//!
//! [`ChatOrchestrator`] drives one turn at a time: it records the user's
//! message in a [`HistoryStore`], streams the answer through a
//! [`chat_stream::ChatStream`] transport into a [`RenderSink`], and shrinks
//! history and retries when the backend reports that the token limit was hit.

pub mod answer;
pub mod config;
pub mod error;
pub mod history;
pub mod logging;
pub mod orchestrator;
pub mod sink;

pub use answer::{ChatChunk, ChatRequest, ChunkError, INNER_ERROR_TYPE};
pub use config::GuruConfig;
pub use error::{is_token_limit_exceeded, ChatError, TOKEN_LIMIT_SIGNATURE};
pub use history::{HistoryStore, Message, MessageHistory, Role};
pub use orchestrator::{AskOptions, ChatOrchestrator, TokenLimitPredicate, TEMPORARY_CONVERSATION_ID};
pub use sink::{RenderSink, StdoutSink};
