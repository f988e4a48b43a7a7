//! Newline-delimited JSON-RPC over stdin/stdout.
//!
//! stdout carries protocol frames only; every diagnostic goes through `tracing` to stderr.
//! Lines are handled one at a time, so replies leave in request order.

use std::future::Future;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::api::dispatcher::Dispatcher;
use crate::core::mcp::{decode, parse_error, Outgoing};

pub async fn serve_stdio(dispatcher: Dispatcher) -> anyhow::Result<()> {
    let session = dispatcher.sessions().get_or_create(None);
    tracing::info!(session_id = %session.id, "mode=stdio");
    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    serve_lines(&dispatcher, &session.id, stdin, stdout, shutdown_signal()).await
}

/// Drive the read/dispatch/write loop until EOF or `shutdown` resolves.
///
/// Shutdown is only observed between messages, never in the middle of writing a reply.
pub async fn serve_lines<R, W, S>(
    dispatcher: &Dispatcher,
    session_id: &str,
    mut reader: R,
    mut writer: W,
    shutdown: S,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    S: Future<Output = ()>,
{
    let mut buf = Vec::new();
    tokio::pin!(shutdown);
    loop {
        buf.clear();
        let read = tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("shutdown requested; closing stdio transport");
                break;
            }
            read = reader.read_until(b'\n', &mut buf) => read?,
        };
        if read == 0 {
            tracing::info!("stdin closed");
            break;
        }

        let out = match std::str::from_utf8(&buf) {
            Ok(line) if line.trim().is_empty() => continue,
            Ok(line) => match decode(line.trim()) {
                Ok(incoming) => dispatcher.handle(incoming, session_id).await,
                Err(resp) => Some(Outgoing::Single(resp)),
            },
            Err(e) => {
                tracing::debug!(error = %e, "stdin line is not valid UTF-8");
                Some(Outgoing::Single(parse_error(format!("Parse error: {e}"))))
            }
        };
        if let Some(out) = out {
            write_jsonrpc(&mut writer, &out).await?;
        }
    }
    writer.flush().await?;
    Ok(())
}

async fn write_jsonrpc<W: AsyncWrite + Unpin>(writer: &mut W, out: &Outgoing) -> anyhow::Result<()> {
    let mut buf = serde_json::to_vec(out)?;
    buf.push(b'\n');
    writer.write_all(&buf).await?;
    writer.flush().await?;
    Ok(())
}

/// Resolves on Ctrl-C (and SIGTERM on unix).
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::runtime::session::{InMemorySessionStore, SessionStore};
    use crate::tools::registry::ToolRegistry;
    use serde_json::Value;
    use std::sync::Arc;
    use std::time::Duration;

    fn dispatcher() -> (Dispatcher, String) {
        let sessions = Arc::new(InMemorySessionStore::default());
        let sid = sessions.get_or_create(None).id;
        let reg = Arc::new(ToolRegistry::new(vec![], Duration::from_secs(300)));
        (Dispatcher::new(reg, sessions), sid)
    }

    async fn run(input: &str) -> Vec<Value> {
        run_bytes(input.as_bytes()).await
    }

    async fn run_bytes(input: &[u8]) -> Vec<Value> {
        let (d, sid) = dispatcher();
        let mut out = Vec::new();
        serve_lines(&d, &sid, input, &mut out, std::future::pending()).await.unwrap();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn replies_in_request_order_and_skips_notifications() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":3,"method":"ping"}"#,
            "\n",
        );
        let replies = run(input).await;
        let ids: Vec<_> = replies.iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, [1, 2, 3]);
        assert_eq!(replies[1]["result"]["tools"], serde_json::json!([]));
        assert_eq!(replies[2]["result"]["pong"], true);
    }

    #[tokio::test]
    async fn garbage_lines_get_a_parse_error_and_the_loop_continues() {
        let replies = run("not json\n{\"jsonrpc\":\"2.0\",\"id\":7,\"method\":\"ping\"}\n").await;
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0]["error"]["code"], -32700);
        assert_eq!(replies[0]["id"], Value::Null);
        assert_eq!(replies[1]["id"], 7);
    }

    #[tokio::test]
    async fn invalid_utf8_gets_a_parse_error_and_the_loop_continues() {
        let mut input = br#"{"jsonrpc":"2.0","id":1,"method":"ping","x":""#.to_vec();
        input.extend_from_slice(&[0xff, 0xfe]);
        input.extend_from_slice(b"\"}\n");
        input.extend_from_slice(&[0xff, 0xfe, b'\n']);
        input.extend_from_slice(br#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#);
        let replies = run_bytes(&input).await;
        assert_eq!(replies.len(), 3);
        assert_eq!(replies[0]["error"]["code"], -32700);
        assert_eq!(replies[0]["id"], Value::Null);
        assert_eq!(replies[1]["error"]["code"], -32700);
        assert_eq!(replies[2]["id"], 2);
        assert_eq!(replies[2]["result"]["pong"], true);
    }

    #[tokio::test]
    async fn shutdown_stops_the_loop() {
        let (d, sid) = dispatcher();
        let (_tx, rx) = tokio::io::duplex(64);
        let mut out = Vec::new();
        serve_lines(&d, &sid, BufReader::new(rx), &mut out, async {}).await.unwrap();
        assert!(out.is_empty());
    }
}
