use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use axum::body::Body;
use axum::http::Request;
use tower_http::trace::TraceLayer;

use crate::api::mcp::{self, AppState};
use crate::infra::http::auth::require_bearer;
use crate::infra::http::cors::{cors_layer, preflight_no_content};

/// `/mcp` behind bearer auth; `/health` and `/ready` open.
pub fn build_app(state: AppState) -> Router {
    let rpc = Router::new()
        .route(
            "/mcp",
            post(mcp::post).get(mcp::get).delete(mcp::delete).options(mcp::options),
        )
        .route_layer(middleware::from_fn_with_state(state.auth_token.clone(), require_bearer));

    Router::new()
        .route("/health", get(mcp::health))
        .route("/ready", get(mcp::ready))
        .merge(rpc)
        .layer(cors_layer())
        .layer(middleware::from_fn(preflight_no_content))
        .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
            // Headers stay out of spans: they carry the bearer token.
            tracing::info_span!("http.request", method = %req.method(), path = %req.uri().path())
        }))
        .with_state(state)
}
