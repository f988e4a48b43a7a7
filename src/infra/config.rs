use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::core::error::GatewayError;
use crate::infra::runtime::session::{DEFAULT_SESSION_TTL, DEFAULT_SWEEP_INTERVAL};
use crate::tools::registry::DEFAULT_CACHE_TTL;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Server,
    Stdio,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mode::Server => "server",
            Mode::Stdio => "stdio",
        })
    }
}

impl FromStr for Mode {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "server" => Ok(Mode::Server),
            "stdio" => Ok(Mode::Stdio),
            other => Err(GatewayError::Config(format!(
                "Invalid MODE: {other}. Must be 'server' or 'stdio'"
            ))),
        }
    }
}

/// Outbound admin REST API settings shared by every catalogue tool.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AdminApiConfig {
    pub base_url: Option<String>,
    pub access_token: Option<String>,
    pub timeout_secs: u64,
    pub retries: u32,
}

impl Default for AdminApiConfig {
    fn default() -> Self {
        Self { base_url: None, access_token: None, timeout_secs: 10, retries: 2 }
    }
}

/// Resolved configuration: defaults, then an optional TOML file, then environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub mode: Mode,
    pub port: u16,
    pub auth_token: Option<String>,
    pub admin_api: AdminApiConfig,
    pub session_ttl_secs: u64,
    pub session_sweep_secs: u64,
    pub tool_cache_ttl_secs: u64,
    /// 0 disables the per-call deadline.
    pub tool_call_timeout_secs: u64,
    pub sse_keep_alive_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: Mode::Server,
            port: 8080,
            auth_token: None,
            admin_api: AdminApiConfig::default(),
            session_ttl_secs: DEFAULT_SESSION_TTL.as_secs(),
            session_sweep_secs: DEFAULT_SWEEP_INTERVAL.as_secs(),
            tool_cache_ttl_secs: DEFAULT_CACHE_TTL.as_secs(),
            tool_call_timeout_secs: 60,
            sse_keep_alive_secs: 15,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, GatewayError> {
        let mut cfg = Self::default();
        cfg.apply_env()?;
        Ok(cfg)
    }

    /// Load from `path` (or `GATEWAY_CONFIG`) when given, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, GatewayError> {
        let path = path.map(Path::to_path_buf).or_else(|| env_var("GATEWAY_CONFIG").map(PathBuf::from));
        let mut cfg = match path {
            Some(p) => {
                let raw = std::fs::read_to_string(&p).map_err(|source| GatewayError::Io {
                    path: p.display().to_string(),
                    source,
                })?;
                Self::from_toml_str(&raw)?
            }
            None => Self::default(),
        };
        cfg.apply_env()?;
        Ok(cfg)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, GatewayError> {
        Ok(toml::from_str(raw)?)
    }

    fn apply_env(&mut self) -> Result<(), GatewayError> {
        if let Some(mode) = env_var("MODE") {
            self.mode = mode.parse()?;
        }
        if let Some(port) = env_parse("PORT")? {
            self.port = port;
        }
        if let Some(token) = env_var("MCP_AUTH_TOKEN") {
            self.auth_token = Some(token);
        }
        if let Some(base) = env_var("ADMIN_API_BASE_URL") {
            self.admin_api.base_url = Some(base);
        }
        if let Some(token) = env_var("ADMIN_API_TOKEN") {
            self.admin_api.access_token = Some(token);
        }
        if let Some(v) = env_parse("ADMIN_API_TIMEOUT_SECS")? {
            self.admin_api.timeout_secs = v;
        }
        if let Some(v) = env_parse("ADMIN_API_RETRIES")? {
            self.admin_api.retries = v;
        }
        if let Some(v) = env_parse("SESSION_TTL_SECS")? {
            self.session_ttl_secs = v;
        }
        if let Some(v) = env_parse("SESSION_SWEEP_SECS")? {
            self.session_sweep_secs = v;
        }
        if let Some(v) = env_parse("TOOL_CACHE_TTL_SECS")? {
            self.tool_cache_ttl_secs = v;
        }
        if let Some(v) = env_parse("TOOL_CALL_TIMEOUT_SECS")? {
            self.tool_call_timeout_secs = v;
        }
        if let Some(v) = env_parse("SSE_KEEP_ALIVE_SECS")? {
            self.sse_keep_alive_secs = v;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.mode == Mode::Server && self.port == 0 {
            return Err(GatewayError::Config("PORT cannot be 0".into()));
        }
        for (name, value) in [
            ("session_ttl_secs", self.session_ttl_secs),
            ("session_sweep_secs", self.session_sweep_secs),
            ("tool_cache_ttl_secs", self.tool_cache_ttl_secs),
            ("sse_keep_alive_secs", self.sse_keep_alive_secs),
            ("admin_api.timeout_secs", self.admin_api.timeout_secs),
        ] {
            if value == 0 {
                return Err(GatewayError::Config(format!("{name} must be greater than 0")));
            }
        }
        if let Some(base) = &self.admin_api.base_url {
            if !(base.starts_with("http://") || base.starts_with("https://")) {
                return Err(GatewayError::Config(format!(
                    "admin_api.base_url must start with http:// or https://, got {base}"
                )));
            }
        }
        Ok(())
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn session_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.session_sweep_secs)
    }

    pub fn tool_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.tool_cache_ttl_secs)
    }

    pub fn tool_call_timeout(&self) -> Option<Duration> {
        (self.tool_call_timeout_secs > 0).then(|| Duration::from_secs(self.tool_call_timeout_secs))
    }

    pub fn sse_keep_alive(&self) -> Duration {
        Duration::from_secs(self.sse_keep_alive_secs)
    }

    /// Human-readable summary with secrets masked.
    pub fn summary(&self) -> Vec<(&'static str, String)> {
        fn secret(v: &Option<String>) -> String {
            match v {
                Some(_) => "********".into(),
                None => "not set".into(),
            }
        }
        vec![
            ("Mode", self.mode.to_string()),
            ("Port", self.port.to_string()),
            ("Auth token", secret(&self.auth_token)),
            (
                "Admin API",
                self.admin_api.base_url.clone().unwrap_or_else(|| "Not configured".into()),
            ),
            ("Admin API token", secret(&self.admin_api.access_token)),
            ("Session TTL (s)", self.session_ttl_secs.to_string()),
            ("Tool cache TTL (s)", self.tool_cache_ttl_secs.to_string()),
            ("Tool call timeout (s)", self.tool_call_timeout_secs.to_string()),
        ]
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

fn env_parse<T: FromStr>(key: &str) -> Result<Option<T>, GatewayError> {
    env_var(key)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|_| GatewayError::Config(format!("{key} has an invalid value: {raw}")))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const KEYS: &[&str] = &[
        "MODE",
        "PORT",
        "MCP_AUTH_TOKEN",
        "ADMIN_API_BASE_URL",
        "ADMIN_API_TOKEN",
        "TOOL_CALL_TIMEOUT_SECS",
        "GATEWAY_CONFIG",
    ];

    fn clear_env() {
        for k in KEYS {
            std::env::remove_var(k);
        }
    }

    #[test]
    #[serial]
    fn defaults_to_server_8080() {
        clear_env();
        let cfg = Config::from_env().unwrap();
        assert_eq!(cfg.mode, Mode::Server);
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.session_ttl(), Duration::from_secs(1800));
        assert_eq!(cfg.session_sweep_interval(), Duration::from_secs(300));
        assert_eq!(cfg.tool_cache_ttl(), Duration::from_secs(300));
        assert!(cfg.auth_token.is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    #[serial]
    fn parses_env_overrides() {
        clear_env();
        std::env::set_var("MODE", "stdio");
        std::env::set_var("PORT", "9090");
        std::env::set_var("MCP_AUTH_TOKEN", "s3cret");
        std::env::set_var("TOOL_CALL_TIMEOUT_SECS", "0");
        let cfg = Config::from_env().unwrap();
        assert_eq!(cfg.mode, Mode::Stdio);
        assert_eq!(cfg.port, 9090);
        assert_eq!(cfg.auth_token.as_deref(), Some("s3cret"));
        assert_eq!(cfg.tool_call_timeout(), None);
        clear_env();
    }

    #[test]
    #[serial]
    fn invalid_values_are_reported() {
        clear_env();
        std::env::set_var("MODE", "invalid");
        let err = Config::from_env().unwrap_err();
        assert!(err.to_string().contains("Invalid MODE"));

        clear_env();
        std::env::set_var("PORT", "abc");
        let err = Config::from_env().unwrap_err();
        assert!(err.to_string().contains("PORT"));
        clear_env();
    }

    #[test]
    #[serial]
    fn toml_file_is_overridden_by_env() {
        clear_env();
        let cfg = Config::from_toml_str(
            r#"
            port = 7000
            tool_cache_ttl_secs = 60

            [admin_api]
            base_url = "https://shop.example/admin/api"
            retries = 5
            "#,
        )
        .unwrap();
        assert_eq!(cfg.port, 7000);
        assert_eq!(cfg.tool_cache_ttl_secs, 60);
        assert_eq!(cfg.admin_api.retries, 5);
        assert_eq!(cfg.admin_api.timeout_secs, 10);

        let path = std::env::temp_dir().join(format!("gateway-cfg-{}.toml", std::process::id()));
        std::fs::write(&path, "port = 7000\n").unwrap();
        std::env::set_var("PORT", "7100");
        let cfg = Config::load(Some(path.as_path())).unwrap();
        assert_eq!(cfg.port, 7100);
        std::fs::remove_file(&path).ok();
        clear_env();
    }

    #[test]
    fn validate_rejects_zero_port_and_bad_base_url() {
        let cfg = Config { port: 0, ..Config::default() };
        assert!(cfg.validate().unwrap_err().to_string().contains("PORT cannot be 0"));

        let mut cfg = Config::default();
        cfg.admin_api.base_url = Some("ftp://nope".into());
        assert!(cfg.validate().is_err());

        let cfg = Config { session_ttl_secs: 0, ..Config::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn summary_masks_secrets() {
        let cfg = Config { auth_token: Some("top-secret".into()), ..Config::default() };
        let lines = cfg.summary();
        assert!(lines.iter().all(|(_, v)| !v.contains("top-secret")));
    }
}
