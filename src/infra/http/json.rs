use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::core::mcp::{parse_error as rpc_parse_error, Outgoing};
use crate::infra::http::headers::MCP_SESSION_ID;

fn with_session(mut resp: Response, session_id: &str) -> Response {
    if let Ok(v) = HeaderValue::from_str(session_id) {
        resp.headers_mut().insert(MCP_SESSION_ID, v);
    }
    resp
}

/// Serialize `body` as JSON with the session header stamped on.
pub fn json_response<T: Serialize>(status: StatusCode, body: &T, session_id: &str) -> Response {
    let resp = match serde_json::to_vec(body) {
        Ok(bytes) => Response::builder()
            .status(status)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(bytes))
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response()),
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize response");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    };
    with_session(resp, session_id)
}

/// 200 with the JSON-RPC payload, or 204 when there is nothing to send back.
pub fn rpc_response(out: Option<Outgoing>, session_id: &str) -> Response {
    match out {
        Some(out) => json_response(StatusCode::OK, &out, session_id),
        None => no_content(session_id),
    }
}

pub fn parse_error(message: impl Into<String>, session_id: &str) -> Response {
    json_response(StatusCode::BAD_REQUEST, &rpc_parse_error(message), session_id)
}

pub fn no_content(session_id: &str) -> Response {
    with_session(StatusCode::NO_CONTENT.into_response(), session_id)
}

/// Plain JSON error body for transport-level rejections (auth, missing headers).
pub fn plain_error(status: StatusCode, message: &str) -> Response {
    (status, axum::Json(serde_json::json!({ "error": message }))).into_response()
}
