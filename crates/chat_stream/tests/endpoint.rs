use chat_stream::endpoint::DEFAULT_ENDPOINT;
use chat_stream::{resolve_endpoint, ChatStreamError};

#[test]
fn blank_endpoint_falls_back_to_default() {
    let url = resolve_endpoint("   ").expect("default endpoint is valid");
    assert_eq!(url.as_str(), DEFAULT_ENDPOINT);
}

#[test]
fn endpoint_is_trimmed_and_kept_verbatim() {
    let url = resolve_endpoint("  https://chat.example.com/v1/stream ").expect("valid endpoint");
    assert_eq!(url.as_str(), "https://chat.example.com/v1/stream");
}

#[test]
fn non_http_scheme_is_rejected() {
    let error = resolve_endpoint("ftp://chat.example.com").expect_err("ftp must fail");
    assert!(matches!(error, ChatStreamError::InvalidEndpoint(_)));
    assert!(error.to_string().contains("unsupported scheme 'ftp'"));
}

#[test]
fn relative_endpoint_is_rejected() {
    let error = resolve_endpoint("/api/chat").expect_err("relative URL must fail");
    assert!(matches!(error, ChatStreamError::InvalidEndpoint(_)));
}
