use std::time::{Duration, Instant};

use reqwest::{Client, Method, StatusCode};
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::core::mcp::JsonObject;
use crate::infra::config::AdminApiConfig;
use crate::infra::http::headers::{add_standard_headers, generate_request_id};
use crate::infra::runtime::limits::{make_http_client, retry_async};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("admin API request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("upstream status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid admin API response: {0}")]
    Decode(String),
}

impl ClientError {
    /// Transport hiccups and 5xx are worth another attempt; 4xx and bad payloads are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            ClientError::Status { status, .. } => *status >= 500,
            ClientError::Decode(_) => false,
        }
    }
}

/// Thin client over the e-commerce admin REST API. One call per tool action.
#[derive(Clone)]
pub struct AdminApiClient {
    base: String,
    token: Option<String>,
    http: Client,
    retries: u32,
}

impl AdminApiClient {
    pub fn new(base: impl Into<String>) -> Result<Self, ClientError> {
        let http = make_http_client(Duration::from_secs(2), Duration::from_secs(10))?;
        Ok(Self { base: base.into(), token: None, http, retries: 2 })
    }

    /// `None` when no base URL is configured.
    pub fn from_config(cfg: &AdminApiConfig) -> Result<Option<Self>, ClientError> {
        let Some(base) = cfg.base_url.clone() else {
            return Ok(None);
        };
        let http = make_http_client(Duration::from_secs(2), Duration::from_secs(cfg.timeout_secs))?;
        Ok(Some(Self { base, token: cfg.access_token.clone(), http, retries: cfg.retries }))
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    pub async fn health(&self) -> bool {
        let (builder, _rid) = add_standard_headers(self.http.get(self.url("health")), None);
        match builder.send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    /// Issue one admin API call. Idempotent verbs are retried on transient failures; POST is not.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        query: Option<&JsonObject>,
        body: Option<&JsonValue>,
    ) -> Result<JsonValue, ClientError> {
        let url = self.url(path);
        let attempts = if method == Method::POST { 0 } else { self.retries };
        let query: Vec<(String, String)> = query
            .map(|q| q.iter().map(|(k, v)| (k.clone(), query_value(v))).collect())
            .unwrap_or_default();
        let req_id = generate_request_id();
        tracing::debug!(%method, endpoint = %url, request_id = %req_id, "admin_api request");

        let start = Instant::now();
        let res = retry_async(attempts, ClientError::is_retryable, |_| {
            let (builder, _rid) =
                add_standard_headers(self.http.request(method.clone(), url.as_str()), Some(req_id.clone()));
            let mut builder = builder.query(&query);
            if let Some(token) = &self.token {
                builder = builder.bearer_auth(token);
            }
            if let Some(body) = body {
                builder = builder.json(body);
            }
            async move {
                let resp = builder.send().await?;
                let status = resp.status();
                let text = resp.text().await?;
                if !status.is_success() {
                    return Err(ClientError::Status { status: status.as_u16(), body: text });
                }
                if status == StatusCode::NO_CONTENT || text.trim().is_empty() {
                    return Ok(JsonValue::Null);
                }
                serde_json::from_str(&text).map_err(|e| ClientError::Decode(e.to_string()))
            }
        })
        .await;

        let resource = path.trim_start_matches('/').split('/').next().unwrap_or(path);
        match &res {
            Ok(_) => crate::infra::logging::log_metric(
                resource,
                "admin_api_latency_ms",
                start.elapsed().as_millis() as f64,
            ),
            Err(e) => {
                tracing::warn!(%method, endpoint = %url, error = %e, "admin_api request failed");
                crate::infra::logging::count("admin_api_errors_total", "resource", resource);
            }
        }
        res
    }
}

fn query_value(v: &JsonValue) -> String {
    match v {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}
