use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Method, Request, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use subtle::ConstantTimeEq;

use crate::infra::http::json::plain_error;

/// Bearer-token guard for `/mcp`. Preflight requests pass straight through.
///
/// With no token configured every request is refused with 500 rather than let through.
pub async fn require_bearer(
    State(expected): State<Option<Arc<str>>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS {
        return next.run(request).await;
    }
    let Some(expected) = expected else {
        tracing::error!("MCP_AUTH_TOKEN is not configured; refusing request");
        return plain_error(StatusCode::INTERNAL_SERVER_ERROR, "server authentication is not configured");
    };

    let Some(raw) = request.headers().get(header::AUTHORIZATION) else {
        return plain_error(StatusCode::UNAUTHORIZED, "missing authorization header");
    };
    let Some(presented) = raw.to_str().ok().and_then(bearer_credentials) else {
        return plain_error(StatusCode::UNAUTHORIZED, "malformed authorization header");
    };
    let matches: bool = presented.trim().as_bytes().ct_eq(expected.as_bytes()).into();
    if !matches {
        tracing::warn!("rejected request with invalid bearer token");
        return plain_error(StatusCode::UNAUTHORIZED, "invalid token");
    }

    next.run(request).await
}

/// Credentials of a `Bearer` authorization value; the scheme name is case-insensitive.
fn bearer_credentials(value: &str) -> Option<&str> {
    let (scheme, credentials) = value.trim_start().split_once(' ')?;
    scheme.eq_ignore_ascii_case("bearer").then_some(credentials)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{middleware, routing::get, Router};
    use tower::ServiceExt;

    fn app(token: Option<&str>) -> Router {
        Router::new()
            .route("/", get(|| async { "ok" }).options(|| async { StatusCode::NO_CONTENT }))
            .layer(middleware::from_fn_with_state(token.map(Arc::<str>::from), require_bearer))
    }

    async fn status(app: Router, method: Method, auth: Option<&str>) -> StatusCode {
        let mut req = Request::builder().method(method).uri("/");
        if let Some(a) = auth {
            req = req.header(header::AUTHORIZATION, a);
        }
        app.oneshot(req.body(Body::empty()).unwrap()).await.unwrap().status()
    }

    #[tokio::test]
    async fn accepts_only_the_configured_token() {
        assert_eq!(status(app(Some("t0k")), Method::GET, Some("Bearer t0k")).await, StatusCode::OK);
        assert_eq!(status(app(Some("t0k")), Method::GET, Some("Bearer nope")).await, StatusCode::UNAUTHORIZED);
        assert_eq!(status(app(Some("t0k")), Method::GET, Some("Basic t0k")).await, StatusCode::UNAUTHORIZED);
        assert_eq!(status(app(Some("t0k")), Method::GET, None).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn scheme_name_is_case_insensitive() {
        assert_eq!(status(app(Some("t0k")), Method::GET, Some("bearer t0k")).await, StatusCode::OK);
        assert_eq!(status(app(Some("t0k")), Method::GET, Some("BEARER t0k")).await, StatusCode::OK);
        assert_eq!(status(app(Some("t0k")), Method::GET, Some("Bearert0k")).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn fails_closed_without_a_token() {
        assert_eq!(status(app(None), Method::GET, Some("Bearer x")).await, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn preflight_skips_auth() {
        assert_eq!(status(app(Some("t0k")), Method::OPTIONS, None).await, StatusCode::NO_CONTENT);
    }
}
