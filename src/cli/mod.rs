use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use crate::core::error::GatewayError;
use crate::infra::config::{Config, Mode};

#[derive(Parser, Debug)]
#[command(name = "commerce-mcp-gateway")]
#[command(about = "MCP gateway exposing e-commerce admin tools over stdio or streamable HTTP")]
#[command(version)]
pub struct Cli {
    /// TOML config file (falls back to GATEWAY_CONFIG)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the streamable HTTP server (default)
    Serve {
        /// Override the listening port
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Run over stdin/stdout
    Stdio,
    /// Health check a running gateway
    Health {
        /// Service URL to check
        #[arg(short, long, default_value = "http://localhost:8080")]
        url: String,
    },
    /// Print the resolved configuration
    Config {
        /// Exit non-zero when the configuration is invalid
        #[arg(long)]
        validate: bool,
    },
}

pub async fn run() -> ExitCode {
    let cli = Cli::parse();
    run_commands(cli).await
}

pub async fn run_commands(cli: Cli) -> ExitCode {
    match cli.command {
        None | Some(Commands::Serve { .. }) | Some(Commands::Stdio) => {
            match resolve_config(cli.config.as_deref(), cli.command.as_ref()) {
                Ok(cfg) => start(cfg).await,
                Err(e) => {
                    tracing::error!(error = %e, "failed to load configuration");
                    ExitCode::FAILURE
                }
            }
        }
        Some(Commands::Health { url }) => match health_check(&url).await {
            Ok(_) => {
                println!("✅ Service is healthy");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("❌ Health check failed: {}", e);
                ExitCode::FAILURE
            }
        },
        Some(Commands::Config { validate }) => match show_config(cli.config.as_deref(), validate) {
            Ok(_) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("❌ Configuration validation failed: {}", e);
                ExitCode::FAILURE
            }
        },
    }
}

/// Load the layered config, then let an explicit `serve`/`stdio` subcommand override `MODE`.
fn resolve_config(path: Option<&Path>, command: Option<&Commands>) -> Result<Config, GatewayError> {
    let mut cfg = Config::load(path)?;
    match command {
        Some(Commands::Serve { port }) => {
            cfg.mode = Mode::Server;
            if let Some(port) = port {
                cfg.port = *port;
            }
        }
        Some(Commands::Stdio) => cfg.mode = Mode::Stdio,
        _ => {}
    }
    Ok(cfg)
}

async fn start(cfg: Config) -> ExitCode {
    match crate::infra::boot::run(cfg).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "gateway exited with an error");
            ExitCode::FAILURE
        }
    }
}

async fn health_check(url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/health", url.trim_end_matches('/')))
        .timeout(std::time::Duration::from_secs(2))
        .send()
        .await?;

    if response.status().is_success() {
        Ok(())
    } else {
        Err(format!("HTTP {}", response.status()).into())
    }
}

fn show_config(path: Option<&Path>, validate: bool) -> Result<(), Box<dyn std::error::Error>> {
    let cfg = Config::load(path)?;
    if validate {
        cfg.validate()?;
    }

    println!("📋 Configuration:");
    for (key, value) in cfg.summary() {
        println!("  {key}: {value}");
    }
    if validate {
        println!("✅ Configuration is valid");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::parse_from(["commerce-mcp-gateway"]);
        assert_eq!(cli.command, None);

        let cli = Cli::parse_from(["commerce-mcp-gateway", "--config", "gw.toml", "serve", "-p", "9000"]);
        assert_eq!(cli.config, Some(PathBuf::from("gw.toml")));
        assert_eq!(cli.command, Some(Commands::Serve { port: Some(9000) }));
    }

    #[test]
    fn global_config_flag_works_after_subcommand() {
        let cli = Cli::parse_from(["commerce-mcp-gateway", "config", "--validate", "--config", "x.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
        assert_eq!(cli.command, Some(Commands::Config { validate: true }));
    }

    #[tokio::test]
    async fn health_check_ok_and_error_paths() {
        use httpmock::prelude::*;
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/health");
            then.status(200).json_body(serde_json::json!({"status":"ok"}));
        });
        assert!(health_check(&server.base_url()).await.is_ok());

        let bad = MockServer::start();
        bad.mock(|when, then| {
            when.method(GET).path("/health");
            then.status(503);
        });
        assert!(health_check(&bad.base_url()).await.is_err());
    }

    #[tokio::test]
    async fn run_commands_health_failure() {
        let cli = Cli { config: None, command: Some(Commands::Health { url: "http://localhost:9".into() }) };
        assert_eq!(run_commands(cli).await, ExitCode::FAILURE);
    }

    #[tokio::test]
    #[serial]
    async fn run_commands_config_success_and_failure() {
        env::remove_var("GATEWAY_CONFIG");
        env::remove_var("MODE");
        env::remove_var("PORT");
        let cli = Cli { config: None, command: Some(Commands::Config { validate: true }) };
        assert_eq!(run_commands(cli).await, ExitCode::SUCCESS);

        env::set_var("PORT", "0");
        let cli = Cli { config: None, command: Some(Commands::Config { validate: true }) };
        assert_eq!(run_commands(cli).await, ExitCode::FAILURE);
        env::remove_var("PORT");
    }

    #[test]
    #[serial]
    fn default_command_honours_mode_env() {
        env::remove_var("GATEWAY_CONFIG");
        env::set_var("MODE", "stdio");
        assert_eq!(resolve_config(None, None).unwrap().mode, Mode::Stdio);

        let serve = Commands::Serve { port: Some(9100) };
        let cfg = resolve_config(None, Some(&serve)).unwrap();
        assert_eq!(cfg.mode, Mode::Server);
        assert_eq!(cfg.port, 9100);

        env::set_var("MODE", "server");
        assert_eq!(resolve_config(None, Some(&Commands::Stdio)).unwrap().mode, Mode::Stdio);
        assert_eq!(resolve_config(None, None).unwrap().mode, Mode::Server);
        env::remove_var("MODE");
    }

    #[tokio::test]
    #[serial]
    async fn missing_config_file_fails() {
        env::remove_var("GATEWAY_CONFIG");
        let cli = Cli {
            config: Some(PathBuf::from("/definitely/not/here.toml")),
            command: Some(Commands::Config { validate: false }),
        };
        assert_eq!(run_commands(cli).await, ExitCode::FAILURE);
    }
}
