use axum::http::{HeaderMap, HeaderName};
use reqwest::RequestBuilder;

/// Session correlation header, set on every `/mcp` response.
pub const MCP_SESSION_ID: HeaderName = HeaderName::from_static("mcp-session-id");
pub const MCP_PROTOCOL_VERSION: HeaderName = HeaderName::from_static("mcp-protocol-version");
pub const LAST_EVENT_ID: HeaderName = HeaderName::from_static("last-event-id");

/// Generate a request id suitable for logging/correlation.
pub fn generate_request_id() -> String {
    format!("gw-{}", uuid::Uuid::new_v4().simple())
}

/// Add standard headers to an outgoing request. Returns the updated builder and the request id used.
pub fn add_standard_headers(
    builder: RequestBuilder,
    request_id: Option<String>,
) -> (RequestBuilder, String) {
    let rid = request_id.unwrap_or_else(generate_request_id);
    let b = builder.header("x-request-id", rid.as_str()).header(
        reqwest::header::USER_AGENT,
        format!("commerce-mcp-gateway/{}", env!("CARGO_PKG_VERSION")),
    );
    (b, rid)
}

/// The non-empty `mcp-session-id` the client sent, if any.
pub fn session_id(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(MCP_SESSION_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
