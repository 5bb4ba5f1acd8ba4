//! Retry Policy - 瞬态故障的本地重试
//!
//! 可重试错误（能力不可达 / 超时）带指数退避在本地重试，
//! 对调用方不可见；重试耗尽后升级为 Job 失败

use std::future::Future;
use std::time::Duration;

/// 重试 / 超时策略
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// 首次失败后的最大重试次数
    pub max_retries: u32,
    /// 退避基准：第 n 次重试前等待 base * 2^n
    pub base_delay: Duration,
    /// 单次外部调用的超时，超时按 Unavailable 计入重试
    pub call_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            call_timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// 第 attempt 次重试前的退避时长（attempt 从 0 起）
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt)
    }
}

/// 带退避地重试一个操作
///
/// `op` 自行负责把超时映射为自己的错误类型；这里只根据
/// `is_retryable` 决定是否重试以及退避多久
pub async fn retry_with_backoff<T, E, F, Fut, R>(
    policy: &RetryPolicy,
    is_retryable: R,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if is_retryable(&e) && attempt < policy.max_retries => {
                let delay = policy.backoff_delay(attempt);
                tracing::warn!(
                    attempt = attempt + 1,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Transient failure, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
