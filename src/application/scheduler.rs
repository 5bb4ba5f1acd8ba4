//! Job Scheduler - 转换任务调度
//!
//! 提交永不阻塞调用方：Job 登记后进入 FIFO 队列，由后台
//! ConvertWorker 在并发上限内执行。每个 jobId 至多一次活跃执行

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};

use crate::domain::{Book, Job, JobId, JobSnapshot, SourceUnit, VoiceConfig, VoiceConfigError};
use crate::infrastructure::events::{EventPublisher, JobEvent};
use crate::infrastructure::memory::InMemoryJobStore;

/// 调度错误
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Invalid voice config: {0}")]
    InvalidConfig(#[from] VoiceConfigError),

    #[error("Submission contains no source units")]
    EmptySubmission,

    #[error("Job queue is full")]
    QueueFull,

    #[error("Job not found: {0}")]
    NotFound(JobId),
}

/// Job 调度器
///
/// 只负责受理与查询；执行在 ConvertWorker（消费同一队列）
pub struct JobScheduler {
    store: Arc<InMemoryJobStore>,
    events: Arc<EventPublisher>,
    queue_sender: mpsc::Sender<JobId>,
}

impl JobScheduler {
    pub fn new(
        store: Arc<InMemoryJobStore>,
        events: Arc<EventPublisher>,
        queue_sender: mpsc::Sender<JobId>,
    ) -> Self {
        Self {
            store,
            events,
            queue_sender,
        }
    }

    /// 提交转换任务
    ///
    /// VoiceConfig 在此拷贝进 Job：调用方之后的修改不影响在途执行
    pub fn submit(
        &self,
        source_units: Vec<SourceUnit>,
        voice_config: VoiceConfig,
    ) -> Result<JobId, SchedulerError> {
        voice_config.validate()?;
        if source_units.is_empty() {
            return Err(SchedulerError::EmptySubmission);
        }

        let job = Job::new(source_units, voice_config);
        let job_id = job.job_id;

        self.store.insert(job);
        self.events.register_job(job_id);

        if let Err(e) = self.queue_sender.try_send(job_id) {
            // 回滚登记，让调用方看到一致的失败
            self.store.remove(&job_id);
            self.events.unregister_job(&job_id);
            tracing::warn!(job_id = %job_id, error = %e, "Failed to enqueue job");
            return Err(SchedulerError::QueueFull);
        }

        tracing::info!(job_id = %job_id, "Job submitted");
        Ok(job_id)
    }

    /// 查询 Job 状态快照
    pub fn progress_of(&self, job_id: &JobId) -> Result<JobSnapshot, SchedulerError> {
        self.store
            .snapshot(job_id)
            .ok_or(SchedulerError::NotFound(*job_id))
    }

    /// 取消 Job
    ///
    /// 从调用方视角总是成功；在途外部调用被放弃而非强杀
    pub fn cancel(&self, job_id: &JobId) -> Result<(), SchedulerError> {
        self.store
            .cancel(job_id)
            .map_err(|_| SchedulerError::NotFound(*job_id))?;
        self.events.publish_cancelled(*job_id);
        Ok(())
    }

    /// 一次性领取完成的 Book
    ///
    /// 返回 Some 后 Job 即从调度器内存清除；未完成返回 None
    pub fn take_book(&self, job_id: &JobId) -> Result<Option<Book>, SchedulerError> {
        if !self.store.contains(job_id) {
            return Err(SchedulerError::NotFound(*job_id));
        }
        let book = self.store.take_book(job_id);
        if book.is_some() {
            self.events.unregister_job(job_id);
        }
        Ok(book)
    }

    /// 订阅 Job 事件
    pub fn subscribe(&self, job_id: &JobId) -> Option<broadcast::Receiver<JobEvent>> {
        self.events.subscribe(job_id)
    }

    /// 订阅全局完成事件
    pub fn subscribe_global(&self) -> broadcast::Receiver<JobEvent> {
        self.events.subscribe_global()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RawFile, RawInput};
    use crate::domain::ContentSource;

    fn units() -> Vec<SourceUnit> {
        ContentSource::normalize(RawInput::Files(vec![RawFile {
            name: "a.txt".to_string(),
            bytes: b"hello".to_vec(),
            mime_hint: None,
        }]))
        .units
    }

    fn scheduler(capacity: usize) -> (JobScheduler, mpsc::Receiver<JobId>) {
        let (tx, rx) = mpsc::channel(capacity);
        (
            JobScheduler::new(
                InMemoryJobStore::new().arc(),
                EventPublisher::new().arc(),
                tx,
            ),
            rx,
        )
    }

    #[tokio::test]
    async fn test_submit_enqueues_and_registers() {
        let (scheduler, mut rx) = scheduler(8);
        let job_id = scheduler.submit(units(), VoiceConfig::default()).unwrap();

        assert_eq!(rx.try_recv().unwrap(), job_id);
        assert!(scheduler.progress_of(&job_id).is_ok());
        assert!(scheduler.subscribe(&job_id).is_some());
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let (scheduler, _rx) = scheduler(8);
        let cfg = VoiceConfig {
            speed: 10.0,
            ..VoiceConfig::default()
        };
        assert!(matches!(
            scheduler.submit(units(), cfg),
            Err(SchedulerError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_submission_rejected() {
        let (scheduler, _rx) = scheduler(8);
        assert!(matches!(
            scheduler.submit(Vec::new(), VoiceConfig::default()),
            Err(SchedulerError::EmptySubmission)
        ));
    }

    #[tokio::test]
    async fn test_full_queue_rolls_back() {
        let (scheduler, _rx) = scheduler(1);
        scheduler.submit(units(), VoiceConfig::default()).unwrap();

        let result = scheduler.submit(units(), VoiceConfig::default());
        assert!(matches!(result, Err(SchedulerError::QueueFull)));
    }

    #[tokio::test]
    async fn test_cancel_unknown_job_is_not_found() {
        let (scheduler, _rx) = scheduler(8);
        assert!(matches!(
            scheduler.cancel(&JobId::new()),
            Err(SchedulerError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_take_book_before_done_is_none() {
        let (scheduler, _rx) = scheduler(8);
        let job_id = scheduler.submit(units(), VoiceConfig::default()).unwrap();
        assert!(scheduler.take_book(&job_id).unwrap().is_none());
    }
}
