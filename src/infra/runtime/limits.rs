use std::time::Duration;

/// Build a reqwest client with explicit connect/request timeouts and redirects disabled.
pub fn make_http_client(connect: Duration, total: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(connect)
        .timeout(total)
        .redirect(reqwest::redirect::Policy::none())
        .build()
}

/// Exponential backoff for async ops. `attempts` is the number of retries after the first
/// try; errors for which `should_retry` is false are returned immediately.
pub async fn retry_async<T, E, Fut, F, P>(mut attempts: u32, should_retry: P, mut op: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let mut try_num: u32 = 0;
    let mut delay_ms: u64 = 50;
    loop {
        match op(try_num).await {
            Ok(v) => return Ok(v),
            Err(e) => {
                if attempts == 0 || !should_retry(&e) {
                    return Err(e);
                }
                attempts -= 1;
                tracing::debug!(attempt = try_num, delay_ms, "retrying after failure");
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                delay_ms = (delay_ms * 2).min(1_000);
                try_num += 1;
            }
        }
    }
}
