//! Event Publisher Implementation
//!
//! Job 进度事件推送：调用方可按 Job 订阅，也可订阅全局完成事件。
//! 没有订阅者时事件被丢弃（进度可随时通过快照轮询）

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::domain::{BookId, JobId};

/// 每个事件通道的缓冲容量
const CHANNEL_CAPACITY: usize = 100;

/// Job 事件
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum JobEvent {
    /// 阶段变更
    StageChanged { job_id: JobId, stage: String },
    /// 进度更新
    Progress { job_id: JobId, progress: f32 },
    /// 翻译降级（非阻塞提示，随完成的 Book 一并呈现）
    Degraded { job_id: JobId, reason: String },
    /// 转换完成
    Completed {
        job_id: JobId,
        book_id: BookId,
        degraded: bool,
    },
    /// 转换失败
    Failed {
        job_id: JobId,
        code: String,
        message: String,
    },
    /// 已取消
    Cancelled { job_id: JobId },
}

/// 事件发布器
pub struct EventPublisher {
    /// job_id -> broadcast sender
    job_channels: DashMap<JobId, broadcast::Sender<JobEvent>>,
    /// 全局通道（Completed / Failed / Cancelled）
    global_channel: broadcast::Sender<JobEvent>,
}

impl EventPublisher {
    pub fn new() -> Self {
        let (global_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            job_channels: DashMap::new(),
            global_channel: global_tx,
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 订阅全局事件
    pub fn subscribe_global(&self) -> broadcast::Receiver<JobEvent> {
        self.global_channel.subscribe()
    }

    /// 注册 Job 的事件通道
    pub fn register_job(&self, job_id: JobId) -> broadcast::Receiver<JobEvent> {
        if let Some(sender) = self.job_channels.get(&job_id) {
            return sender.subscribe();
        }

        let (tx, rx) = broadcast::channel(CHANNEL_CAPACITY);
        self.job_channels.insert(job_id, tx);
        rx
    }

    /// 订阅已注册 Job 的事件
    pub fn subscribe(&self, job_id: &JobId) -> Option<broadcast::Receiver<JobEvent>> {
        self.job_channels.get(job_id).map(|s| s.subscribe())
    }

    /// 取消注册（Book 交付后 Job 从内存清除时调用）
    pub fn unregister_job(&self, job_id: &JobId) {
        self.job_channels.remove(job_id);
    }

    pub fn publish_stage(&self, job_id: JobId, stage: &str) {
        self.publish_to_job(
            job_id,
            JobEvent::StageChanged {
                job_id,
                stage: stage.to_string(),
            },
        );
    }

    pub fn publish_progress(&self, job_id: JobId, progress: f32) {
        self.publish_to_job(job_id, JobEvent::Progress { job_id, progress });
    }

    pub fn publish_degraded(&self, job_id: JobId, reason: &str) {
        self.publish_to_job(
            job_id,
            JobEvent::Degraded {
                job_id,
                reason: reason.to_string(),
            },
        );
    }

    pub fn publish_completed(&self, job_id: JobId, book_id: BookId, degraded: bool) {
        let event = JobEvent::Completed {
            job_id,
            book_id,
            degraded,
        };
        self.publish_to_job(job_id, event.clone());
        self.publish_global(event);
    }

    pub fn publish_failed(&self, job_id: JobId, code: &str, message: &str) {
        let event = JobEvent::Failed {
            job_id,
            code: code.to_string(),
            message: message.to_string(),
        };
        self.publish_to_job(job_id, event.clone());
        self.publish_global(event);
    }

    pub fn publish_cancelled(&self, job_id: JobId) {
        let event = JobEvent::Cancelled { job_id };
        self.publish_to_job(job_id, event.clone());
        self.publish_global(event);
    }

    fn publish_to_job(&self, job_id: JobId, event: JobEvent) {
        if let Some(sender) = self.job_channels.get(&job_id) {
            if let Err(e) = sender.send(event) {
                tracing::debug!(
                    job_id = %job_id,
                    error = %e,
                    "Failed to publish event (no receivers)"
                );
            }
        }
    }

    fn publish_global(&self, event: JobEvent) {
        if let Err(e) = self.global_channel.send(event) {
            tracing::debug!(error = %e, "Failed to publish global event (no receivers)");
        }
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_job_channel_receives_events() {
        let publisher = EventPublisher::new();
        let job_id = JobId::new();
        let mut rx = publisher.register_job(job_id);

        publisher.publish_stage(job_id, "extracting");
        publisher.publish_progress(job_id, 12.5);

        match rx.try_recv().unwrap() {
            JobEvent::StageChanged { stage, .. } => assert_eq!(stage, "extracting"),
            other => panic!("unexpected event: {:?}", other),
        }
        match rx.try_recv().unwrap() {
            JobEvent::Progress { progress, .. } => assert_eq!(progress, 12.5),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_completed_reaches_global_subscribers() {
        let publisher = EventPublisher::new();
        let mut global = publisher.subscribe_global();
        let job_id = JobId::new();

        publisher.publish_completed(job_id, BookId::new(), false);

        match global.try_recv().unwrap() {
            JobEvent::Completed { degraded, .. } => assert!(!degraded),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_silent() {
        let publisher = EventPublisher::new();
        // 未注册的 Job：不 panic，不阻塞
        publisher.publish_progress(JobId::new(), 50.0);
    }
}
