use std::net::SocketAddr;
use std::sync::Arc;

use crate::api::dispatcher::Dispatcher;
use crate::api::mcp::AppState;
use crate::clients::admin_api::AdminApiClient;
use crate::core::error::GatewayError;
use crate::infra::config::{Config, Mode};
use crate::infra::runtime::mcp_transport::{serve_stdio, shutdown_signal};
use crate::infra::runtime::session::{spawn_sweeper, InMemorySessionStore, SessionStore};
use crate::tools::builtin_registry;
use crate::tools::registry::ToolRegistry;

pub fn build_registry(cfg: &Config) -> Result<ToolRegistry, GatewayError> {
    let client = AdminApiClient::from_config(&cfg.admin_api)
        .map_err(|e| GatewayError::Message(format!("admin API client: {e}")))?;
    if client.is_none() {
        tracing::warn!("ADMIN_API_BASE_URL is not set; tools will be listed but calls will fail");
    }
    Ok(builtin_registry(client, cfg.tool_cache_ttl()))
}

pub fn build_dispatcher(cfg: &Config, sessions: Arc<dyn SessionStore>) -> Result<Dispatcher, GatewayError> {
    let registry = Arc::new(build_registry(cfg)?);
    Ok(Dispatcher::new(registry, sessions).with_call_timeout(cfg.tool_call_timeout()))
}

pub fn build_state(cfg: &Config, sessions: Arc<dyn SessionStore>) -> Result<AppState, GatewayError> {
    let dispatcher = build_dispatcher(cfg, sessions)?;
    Ok(AppState::new(dispatcher, cfg.auth_token.clone()).with_sse_keep_alive(cfg.sse_keep_alive()))
}

pub async fn run(cfg: Config) -> anyhow::Result<()> {
    cfg.validate()?;
    tracing::info!(
        mode = %cfg.mode,
        port = cfg.port,
        admin_api = cfg.admin_api.base_url.as_deref().unwrap_or("unset"),
        "BOOT commerce-mcp-gateway"
    );

    let sessions: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new(cfg.session_ttl()));

    if cfg.mode == Mode::Stdio {
        let dispatcher = build_dispatcher(&cfg, sessions)?;
        return serve_stdio(dispatcher).await;
    }

    if cfg.auth_token.is_none() {
        tracing::warn!("MCP_AUTH_TOKEN is not set; /mcp will answer 500 until it is configured");
    }
    if let Ok(Some(client)) = AdminApiClient::from_config(&cfg.admin_api) {
        tokio::spawn(async move {
            if !client.health().await {
                tracing::warn!(base = client.base_url(), "admin API health probe failed");
            }
        });
    }
    let state = build_state(&cfg, sessions.clone())?;
    let sweeper = spawn_sweeper(sessions, cfg.session_sweep_interval());
    let app = crate::infra::http_app::build_app(state);

    let addr: SocketAddr = ([0, 0, 0, 0], cfg.port).into();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("bind {addr}: {e}"))?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    sweeper.abort();
    tracing::info!("server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn registry_without_admin_api_still_lists_tools() {
        let reg = build_registry(&Config::default()).unwrap();
        assert_eq!(reg.discover(false).await.len(), 5);
    }

    #[test]
    fn state_carries_auth_and_keep_alive() {
        let cfg = Config { auth_token: Some("t".into()), sse_keep_alive_secs: 3, ..Config::default() };
        let state = build_state(&cfg, Arc::new(InMemorySessionStore::default())).unwrap();
        assert_eq!(state.auth_token.as_deref(), Some("t"));
        assert_eq!(state.sse_keep_alive, std::time::Duration::from_secs(3));
    }

    #[tokio::test]
    async fn run_rejects_invalid_config() {
        let cfg = Config { port: 0, ..Config::default() };
        assert!(run(cfg).await.is_err());
    }
}
