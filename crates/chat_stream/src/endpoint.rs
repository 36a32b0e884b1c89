use reqwest::Url;

use crate::error::ChatStreamError;

/// Default chat completion endpoint.
pub const DEFAULT_ENDPOINT: &str = "http://lbrowser-admin.loongnix.cn/api/admin/lbrowser/open/chat";

/// Validate a configured endpoint and return the URL requests are posted to.
///
/// Rules:
/// 1) blank input falls back to [`DEFAULT_ENDPOINT`]
/// 2) surrounding whitespace is ignored
/// 3) only absolute `http`/`https` URLs with a host are accepted
pub fn resolve_endpoint(input: &str) -> Result<Url, ChatStreamError> {
    let raw = if input.trim().is_empty() {
        DEFAULT_ENDPOINT
    } else {
        input.trim()
    };

    let url = Url::parse(raw)
        .map_err(|error| ChatStreamError::InvalidEndpoint(format!("{raw}: {error}")))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ChatStreamError::InvalidEndpoint(format!(
            "{raw}: unsupported scheme '{}'",
            url.scheme()
        )));
    }
    if !url.host_str().is_some_and(|host| !host.is_empty()) {
        return Err(ChatStreamError::InvalidEndpoint(format!("{raw}: missing host")));
    }

    Ok(url)
}
