use tracing_subscriber::EnvFilter;

pub fn init() {
    // Logs go to stderr: in stdio mode stdout carries the protocol stream and nothing else.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Record a latency-style sample through the `metrics` facade and mirror it to the log.
pub fn log_metric(tool: &str, metric: &'static str, value: f64) {
    metrics::histogram!(metric, "tool" => tool.to_owned()).record(value);
    tracing::debug!(tool = tool, metric = metric, value = value, "metric");
}

/// Bump a labelled counter through the `metrics` facade.
pub fn count(metric: &'static str, label: &'static str, value: &str) {
    metrics::counter!(metric, label => value.to_owned()).increment(1);
}

pub fn tool_outcome(tool: &str, ok: bool) {
    let outcome = if ok { "ok" } else { "error" };
    metrics::counter!("tool_calls_total", "tool" => tool.to_owned(), "outcome" => outcome).increment(1);
}
