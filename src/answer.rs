//! Wire payloads for the chat completion backend.

use chat_stream::{AnswerChunk, ChatStreamError, Codec, CodecError, Question};
use serde::{Deserialize, Serialize};

/// Error `type` used when the client itself marks a chunk as failed.
pub const INNER_ERROR_TYPE: &str = "guru_inner_error";

/// Outbound request for one streamed answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Server-issued id, or the temporary placeholder before one is known.
    #[serde(default)]
    pub conversation_id: String,
    pub prompt: String,
}

impl ChatRequest {
    pub fn new(conversation_id: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            prompt: prompt.into(),
        }
    }
}

impl Codec for ChatRequest {
    fn new_instance() -> Self {
        Self::default()
    }
}

impl Question for ChatRequest {
    fn encode(&self) -> Result<Vec<u8>, CodecError> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Error detail the backend attaches to a chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkError {
    #[serde(default)]
    pub message: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub param: String,
    #[serde(default)]
    pub code: String,
}

impl ChunkError {
    pub fn is_empty(&self) -> bool {
        self.message.is_empty() && self.kind.is_empty() && self.code.is_empty()
    }
}

/// One streamed fragment of an answer, or a terminal error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatChunk {
    #[serde(rename = "isEnd")]
    pub is_end: bool,
    pub content: String,
    pub conversation_id: String,
    pub message_id: String,
    pub error: ChunkError,
}

impl ChatChunk {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn with_conversation_id(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = conversation_id.into();
        self
    }

    /// Returns the error carried by this chunk, if any.
    pub fn error(&self) -> Option<&ChunkError> {
        (!self.error.is_empty()).then_some(&self.error)
    }

    /// Marks the chunk as failed on the client side.
    pub fn set_error(&mut self, error: &dyn std::error::Error) {
        self.error.kind = INNER_ERROR_TYPE.to_owned();
        self.error.message = error.to_string();
    }
}

impl Codec for ChatChunk {
    fn new_instance() -> Self {
        Self::default()
    }
}

impl AnswerChunk for ChatChunk {
    fn decode(&mut self, data: &[u8]) -> Result<(), CodecError> {
        *self = serde_json::from_slice(data)?;
        Ok(())
    }

    fn from_stream_error(error: &ChatStreamError) -> Option<Self> {
        let mut chunk = Self::default();
        chunk.set_error(error);
        Some(chunk)
    }
}

#[cfg(test)]
mod tests {
    use chat_stream::{AnswerChunk, ChatStreamError, Question};

    use super::{ChatChunk, ChatRequest, INNER_ERROR_TYPE};

    #[test]
    fn request_always_carries_conversation_id() {
        let fresh = ChatRequest::new("temporary-chat", "hello")
            .encode()
            .expect("encode");
        assert_eq!(fresh, br#"{"conversation_id":"temporary-chat","prompt":"hello"}"#);
    }

    #[test]
    fn chunk_decodes_backend_fields() {
        let chunk = ChatChunk::decode_new(
            br#"{"isEnd":false,"content":"Hi","conversation_id":"c-1","message_id":"m-1"}"#,
        )
        .expect("decode");

        assert_eq!(chunk.content, "Hi");
        assert_eq!(chunk.conversation_id, "c-1");
        assert_eq!(chunk.message_id, "m-1");
        assert!(chunk.error().is_none());
    }

    #[test]
    fn error_body_decodes_as_error_chunk() {
        let chunk = ChatChunk::decode_new(
            br#"{"error":{"message":"too long","type":"invalid_request_error","param":"messages","code":"context_length_exceeded"}}"#,
        )
        .expect("decode");

        let error = chunk.error().expect("error chunk");
        assert_eq!(error.kind, "invalid_request_error");
        assert_eq!(error.code, "context_length_exceeded");
        assert_eq!(error.param, "messages");
        assert!(chunk.content.is_empty());
    }

    #[test]
    fn plain_text_does_not_decode() {
        assert!(ChatChunk::decode_new(b"boomtown").is_err());
    }

    #[test]
    fn set_error_marks_inner_error() {
        let mut chunk = ChatChunk::text("partial");
        let source = std::io::Error::other("socket closed");
        chunk.set_error(&source);

        let error = chunk.error().expect("marked");
        assert_eq!(error.kind, INNER_ERROR_TYPE);
        assert_eq!(error.message, "socket closed");
    }

    #[test]
    fn stream_failures_become_inner_error_chunks() {
        let chunk = ChatChunk::from_stream_error(&ChatStreamError::LineTooLong { limit: 8 })
            .expect("chat chunks carry stream failures");

        let error = chunk.error().expect("marked");
        assert_eq!(error.kind, INNER_ERROR_TYPE);
        assert_eq!(error.message, "stream line exceeds 8 bytes");
        assert!(chunk.content.is_empty());
    }
}
