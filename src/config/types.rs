//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::time::Duration;

use crate::application::pipeline::RetryPolicy;

/// 应用主配置
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// 调度配置
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Pipeline 配置
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            pipeline: PipelineConfig::default(),
            log: LogConfig::default(),
        }
    }
}

/// 调度配置
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// 最大并发转换数
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,

    /// FIFO 队列容量，超额提交被拒绝
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_max_concurrent_jobs() -> usize {
    2
}

fn default_queue_capacity() -> usize {
    64
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: default_max_concurrent_jobs(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// Pipeline 配置
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// 瞬态故障的最大重试次数
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// 指数退避基准（毫秒）
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// 单次外部能力调用的超时（秒），超时计为 Unavailable
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,

    /// unit 级提取与段落级合成的并行上限
    #[serde(default = "default_fan_out")]
    pub fan_out: usize,
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    500
}

fn default_call_timeout_secs() -> u64 {
    30
}

fn default_fan_out() -> usize {
    4
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            call_timeout_secs: default_call_timeout_secs(),
            fan_out: default_fan_out(),
        }
    }
}

impl PipelineConfig {
    /// 转换为两个阶段共用的重试策略
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
            call_timeout: Duration::from_secs(self.call_timeout_secs),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.scheduler.max_concurrent_jobs, 2);
        assert_eq!(config.scheduler.queue_capacity, 64);
        assert_eq!(config.pipeline.max_retries, 3);
        assert_eq!(config.pipeline.call_timeout_secs, 30);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_retry_policy_conversion() {
        let policy = PipelineConfig::default().retry_policy();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.base_delay, Duration::from_millis(500));
        assert_eq!(policy.call_timeout, Duration::from_secs(30));
    }
}
