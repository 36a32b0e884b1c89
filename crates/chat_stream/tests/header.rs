use chat_stream::headers::{build_headers, HEADER_ACCEPT, HEADER_CONTENT_TYPE, HEADER_USER_AGENT};
use chat_stream::{ChatStreamError, StreamClient, StreamConfig};

mod payloads {
    use chat_stream::{AnswerChunk, Codec, CodecError, Question};

    pub struct Empty;

    impl Codec for Empty {
        fn new_instance() -> Self {
            Self
        }
    }

    impl Question for Empty {
        fn encode(&self) -> Result<Vec<u8>, CodecError> {
            Ok(b"{}".to_vec())
        }
    }

    impl AnswerChunk for Empty {
        fn decode(&mut self, _data: &[u8]) -> Result<(), CodecError> {
            Ok(())
        }
    }
}

#[test]
fn header_map_declares_json_body_and_event_stream() {
    let config = StreamConfig::new("http://localhost/chat").insert_header("X-Trace", " abc ");

    let headers = build_headers(&config);
    assert_eq!(
        headers.get(HEADER_CONTENT_TYPE).expect("content-type"),
        "application/json"
    );
    assert_eq!(
        headers.get(HEADER_ACCEPT).expect("accept"),
        "text/event-stream"
    );
    assert_eq!(headers.get("x-trace").expect("custom"), "abc");
    assert!(headers
        .get(HEADER_USER_AGENT)
        .expect("default user-agent")
        .starts_with("guru/"));
}

#[test]
fn explicit_user_agent_wins() {
    let config = StreamConfig::new("http://localhost/chat").with_user_agent("test-agent");
    let headers = build_headers(&config);
    assert_eq!(
        headers.get(HEADER_USER_AGENT).expect("user-agent"),
        "test-agent"
    );
}

#[test]
fn invalid_header_value_fails_client_construction() {
    let config = StreamConfig::new("http://localhost/chat").insert_header("x-bad", "line\nbreak");

    let error = StreamClient::<payloads::Empty, payloads::Empty>::new(config)
        .err()
        .expect("newline in header value must fail");
    assert!(matches!(error, ChatStreamError::InvalidHeader(_)));
}

#[test]
fn request_builder_posts_to_endpoint() {
    let client = StreamClient::<payloads::Empty, payloads::Empty>::new(StreamConfig::new(
        "http://localhost:9/api/chat",
    ))
    .expect("client");

    let request = client
        .build_request(&payloads::Empty)
        .expect("build request")
        .build()
        .expect("request");

    assert_eq!(request.method(), "POST");
    assert_eq!(request.url().as_str(), "http://localhost:9/api/chat");
    assert_eq!(
        request.headers()["content-type"].to_str().expect("ascii"),
        "application/json"
    );
}
