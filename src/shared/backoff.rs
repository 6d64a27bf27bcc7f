use crate::shared::error::AppError;
use std::future::Future;
use std::time::Duration;

pub const RETRY_DELAY_BASE: Duration = Duration::from_secs(1);

/// Runs `operation` up to `max_attempts` times with exponential backoff
/// (base, 2x base, 4x base, ...). The facades do not retry on their own;
/// callers that want retry semantics wrap their calls in this.
pub async fn retry_with_backoff<T, F, Fut>(
    max_attempts: u32,
    base_delay: Duration,
    mut operation: F,
) -> Result<T, AppError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    if max_attempts == 0 {
        return Err(AppError::InvalidInput(
            "max_attempts must be at least 1".to_string(),
        ));
    }

    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                attempt += 1;
                if attempt >= max_attempts {
                    return Err(err);
                }
                let delay = base_delay * 2u32.saturating_pow(attempt - 1);
                tracing::debug!(attempt, ?delay, error = %err, "retrying after backoff");
                tokio::time::sleep(delay).await;
            }
        }
    }
}
