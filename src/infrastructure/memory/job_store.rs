//! In-Memory Job Store Implementation
//!
//! Job 状态的唯一权威来源。进程重启不保留 Job 是刻意的简化：
//! Job 在 Done 之前无副作用，重新提交成本很低
//!
//! 并发模型：DashMap 的条目级独占锁序列化同一 Job 的所有簿记写入，
//! 并行段落完成的进度写不会交错；单调性由 Job::record_progress 保证

use dashmap::DashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::domain::{Book, Job, JobId, JobSnapshot, JobStage, SourceUnit, VoiceConfig};

/// Job Store 错误
#[derive(Debug, Error)]
pub enum JobStoreError {
    #[error("Job not found: {0}")]
    NotFound(JobId),

    #[error("Job already terminal: {0}")]
    Terminal(JobId),
}

/// 内存 Job 管理器
pub struct InMemoryJobStore {
    /// job_id -> Job
    jobs: DashMap<JobId, Job>,
    /// job_id -> 协作式取消令牌
    cancel_tokens: DashMap<JobId, CancellationToken>,
    /// job_id -> 完成的 Book（一次性交付）
    books: DashMap<JobId, Book>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self {
            jobs: DashMap::new(),
            cancel_tokens: DashMap::new(),
            books: DashMap::new(),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 登记新 Job，返回其取消令牌
    pub fn insert(&self, job: Job) -> CancellationToken {
        let job_id = job.job_id;
        let token = CancellationToken::new();
        self.jobs.insert(job_id, job);
        self.cancel_tokens.insert(job_id, token.clone());
        tracing::debug!(job_id = %job_id, "Job registered");
        token
    }

    /// 删除 Job（提交回滚用）
    pub fn remove(&self, job_id: &JobId) {
        self.jobs.remove(job_id);
        self.cancel_tokens.remove(job_id);
        self.books.remove(job_id);
    }

    pub fn snapshot(&self, job_id: &JobId) -> Option<JobSnapshot> {
        self.jobs.get(job_id).map(|j| j.snapshot())
    }

    /// Worker 取 Job 输入（拷贝，VoiceConfig 是值类型）
    pub fn job_inputs(&self, job_id: &JobId) -> Option<(Vec<SourceUnit>, VoiceConfig)> {
        self.jobs
            .get(job_id)
            .map(|j| (j.source_units.clone(), j.voice_config.clone()))
    }

    pub fn cancellation_token(&self, job_id: &JobId) -> Option<CancellationToken> {
        self.cancel_tokens.get(job_id).map(|t| t.clone())
    }

    pub fn is_cancelled(&self, job_id: &JobId) -> bool {
        self.cancel_tokens
            .get(job_id)
            .map(|t| t.is_cancelled())
            .unwrap_or(true) // 不存在的 Job 视为已取消
    }

    /// 状态迁移
    pub fn transition(&self, job_id: &JobId, to: JobStage) -> Result<(), JobStoreError> {
        let mut job = self
            .jobs
            .get_mut(job_id)
            .ok_or(JobStoreError::NotFound(*job_id))?;

        let from = job.stage;
        job.transition(to)
            .map_err(|_| JobStoreError::Terminal(*job_id))?;

        tracing::debug!(
            job_id = %job_id,
            from = from.as_str(),
            to = to.as_str(),
            "Job stage changed"
        );
        Ok(())
    }

    /// 记录进度（活跃状态下单调不减）
    pub fn record_progress(&self, job_id: &JobId, progress: f32) {
        if let Some(mut job) = self.jobs.get_mut(job_id) {
            job.record_progress(progress);
        }
    }

    /// 记录翻译降级
    pub fn set_degraded(&self, job_id: &JobId) {
        if let Some(mut job) = self.jobs.get_mut(job_id) {
            if !job.degraded {
                job.degraded = true;
                tracing::warn!(job_id = %job_id, "Job degraded: translation fell back");
            }
        }
    }

    /// 标记完成并暂存 Book 等待一次性交付
    pub fn complete(&self, job_id: &JobId, book: Book) -> Result<(), JobStoreError> {
        let mut job = self
            .jobs
            .get_mut(job_id)
            .ok_or(JobStoreError::NotFound(*job_id))?;

        job.mark_done(book.id)
            .map_err(|_| JobStoreError::Terminal(*job_id))?;
        drop(job);

        self.books.insert(*job_id, book);
        Ok(())
    }

    /// 标记失败
    pub fn mark_failed(
        &self,
        job_id: &JobId,
        code: &str,
        message: &str,
    ) -> Result<(), JobStoreError> {
        let mut job = self
            .jobs
            .get_mut(job_id)
            .ok_or(JobStoreError::NotFound(*job_id))?;

        job.mark_failed(code, message)
            .map_err(|_| JobStoreError::Terminal(*job_id))?;

        tracing::warn!(job_id = %job_id, code = code, message = message, "Job failed");
        Ok(())
    }

    /// 取消 Job
    ///
    /// 从调用方视角总是成功：触发取消令牌，非终态立即迁移到
    /// Cancelled。在途的外部调用不被强杀，返回后结果被丢弃
    pub fn cancel(&self, job_id: &JobId) -> Result<(), JobStoreError> {
        let token = self
            .cancel_tokens
            .get(job_id)
            .ok_or(JobStoreError::NotFound(*job_id))?;
        token.cancel();
        drop(token);

        if let Some(mut job) = self.jobs.get_mut(job_id) {
            if !job.stage.is_terminal() {
                let _ = job.transition(JobStage::Cancelled);
                tracing::info!(job_id = %job_id, "Job cancelled");
            }
        }
        Ok(())
    }

    /// 一次性交付完成的 Book，交付后 Job 从内存清除
    pub fn take_book(&self, job_id: &JobId) -> Option<Book> {
        let book = self.books.remove(job_id).map(|(_, b)| b)?;
        self.jobs.remove(job_id);
        self.cancel_tokens.remove(job_id);
        tracing::debug!(job_id = %job_id, book_id = %book.id, "Book delivered, job purged");
        Some(book)
    }

    pub fn contains(&self, job_id: &JobId) -> bool {
        self.jobs.contains_key(job_id)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

impl Default for InMemoryJobStore {
    fn default() -> Self {
        Self::new()
    }
}
