//! Streamable HTTP handlers for `/mcp` plus the unauthenticated probes.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::stream::{self, Stream, StreamExt};
use serde_json::json;

use crate::api::dispatcher::Dispatcher;
use crate::core::mcp::decode;
use crate::infra::http::headers::{session_id, LAST_EVENT_ID, MCP_PROTOCOL_VERSION, MCP_SESSION_ID};
use crate::infra::http::json::{json_response, no_content, parse_error, plain_error, rpc_response};
use crate::infra::runtime::session::SessionStore;

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub auth_token: Option<Arc<str>>,
    pub sse_keep_alive: Duration,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher, auth_token: Option<String>) -> Self {
        Self {
            dispatcher,
            auth_token: auth_token.map(Arc::from),
            sse_keep_alive: Duration::from_secs(15),
        }
    }

    pub fn with_sse_keep_alive(mut self, every: Duration) -> Self {
        self.sse_keep_alive = every;
        self
    }

    fn sessions(&self) -> &Arc<dyn SessionStore> {
        self.dispatcher.sessions()
    }
}

/// JSON-RPC over POST. The resolved session id is echoed on every outcome.
pub async fn post(State(st): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let lookup = st.sessions().get_or_create(session_id(&headers));
    let sid = lookup.id;
    if let Some(v) = headers.get(MCP_PROTOCOL_VERSION).and_then(|v| v.to_str().ok()) {
        tracing::trace!(protocol_version = v, session_id = %sid, "client protocol version");
    }

    let raw = match std::str::from_utf8(&body) {
        Ok(raw) => raw,
        Err(e) => return parse_error(format!("Parse error: {e}"), &sid),
    };
    let incoming = match decode(raw) {
        Ok(incoming) => incoming,
        Err(resp) => {
            tracing::debug!(session_id = %sid, "unparseable request body");
            return json_response(StatusCode::BAD_REQUEST, &resp, &sid);
        }
    };

    let out = st.dispatcher.handle(incoming, &sid).await;
    rpc_response(out, &sid)
}

/// Server-push channel. Nothing is pushed yet beyond an opening comment and keep-alives.
pub async fn get(State(st): State<AppState>, headers: HeaderMap) -> Response {
    let Some(sid) = session_id(&headers) else {
        return plain_error(StatusCode::BAD_REQUEST, "missing mcp-session-id header");
    };
    if !st.sessions().touch(sid) {
        return plain_error(StatusCode::NOT_FOUND, "unknown session");
    }
    if let Some(last) = headers.get(LAST_EVENT_ID).and_then(|v| v.to_str().ok()) {
        tracing::info!(session_id = sid, last_event_id = last, "resume requested; replay is not available");
    }
    tracing::debug!(session_id = sid, "sse stream opened");

    let mut resp = Sse::new(event_stream())
        .keep_alive(KeepAlive::new().interval(st.sse_keep_alive))
        .into_response();
    if let Ok(v) = HeaderValue::from_str(sid) {
        resp.headers_mut().insert(MCP_SESSION_ID, v);
    }
    resp
}

fn event_stream() -> impl Stream<Item = Result<Event, Infallible>> {
    stream::once(async { Ok(Event::default().comment("stream open")) }).chain(stream::pending())
}

pub async fn delete(State(st): State<AppState>, headers: HeaderMap) -> Response {
    let Some(sid) = session_id(&headers) else {
        return plain_error(StatusCode::BAD_REQUEST, "missing mcp-session-id header");
    };
    if st.sessions().terminate(sid) {
        no_content(sid)
    } else {
        plain_error(StatusCode::NOT_FOUND, "unknown session")
    }
}

pub async fn options() -> StatusCode {
    StatusCode::NO_CONTENT
}

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Ready once discovery has run; reports the current tool count.
pub async fn ready(State(st): State<AppState>) -> Json<serde_json::Value> {
    let snapshot = st.dispatcher.registry().discover(false).await;
    Json(json!({ "status": "ready", "tools": snapshot.len() }))
}
