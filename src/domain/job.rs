//! Job Context - 转换任务聚合根
//!
//! 不变量:
//! - 活跃状态（Extracting / Synthesizing）下 progress 单调不减
//! - result_book_id 有值 当且仅当 stage == Done
//! - error 有值 当且仅当 stage == Failed
//! - 终态（Done / Failed / Cancelled）不再发生任何迁移

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::book::BookId;
use super::source::SourceUnit;
use super::voice::VoiceConfig;

/// Job 唯一标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Job 阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStage {
    /// 排队等待
    Queued,
    /// 文本提取中
    Extracting,
    /// 语音合成中
    Synthesizing,
    /// 完成
    Done,
    /// 失败
    Failed,
    /// 已取消
    Cancelled,
}

impl JobStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStage::Done | JobStage::Failed | JobStage::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStage::Queued => "queued",
            JobStage::Extracting => "extracting",
            JobStage::Synthesizing => "synthesizing",
            JobStage::Done => "done",
            JobStage::Failed => "failed",
            JobStage::Cancelled => "cancelled",
        }
    }
}

/// 状态迁移错误
#[derive(Debug, Error, PartialEq)]
pub enum JobTransitionError {
    #[error("Invalid transition: {from:?} -> {to:?}")]
    Invalid { from: JobStage, to: JobStage },

    #[error("Job already terminal in stage {0:?}")]
    Terminal(JobStage),
}

/// 面向调用方的失败信息：稳定错误码 + 人类可读消息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobError {
    pub code: String,
    pub message: String,
}

/// 一次 pipeline 执行
///
/// 生命周期内由 JobScheduler 独占持有，迁移是唯一的合法修改路径
#[derive(Debug, Clone)]
pub struct Job {
    pub job_id: JobId,
    pub source_units: Vec<SourceUnit>,
    pub voice_config: VoiceConfig,
    pub stage: JobStage,
    pub progress: f32,
    /// 翻译降级标记：翻译失败但旁白以原语言完成
    pub degraded: bool,
    pub created_at: DateTime<Utc>,
    pub result_book_id: Option<BookId>,
    pub error: Option<JobError>,
}

/// 轻量状态快照（不携带 source 字节）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub job_id: JobId,
    pub stage: JobStage,
    pub progress: f32,
    pub degraded: bool,
    pub created_at: DateTime<Utc>,
    pub result_book_id: Option<BookId>,
    pub error: Option<JobError>,
}

impl Job {
    pub fn new(source_units: Vec<SourceUnit>, voice_config: VoiceConfig) -> Self {
        Self {
            job_id: JobId::new(),
            source_units,
            voice_config,
            stage: JobStage::Queued,
            progress: 0.0,
            degraded: false,
            created_at: Utc::now(),
            result_book_id: None,
            error: None,
        }
    }

    /// 状态迁移
    ///
    /// 合法边:
    /// - Queued -> Extracting -> Synthesizing -> Done
    /// - Extracting / Synthesizing -> Failed
    /// - 任意非终态 -> Cancelled
    pub fn transition(&mut self, to: JobStage) -> Result<(), JobTransitionError> {
        if self.stage.is_terminal() {
            return Err(JobTransitionError::Terminal(self.stage));
        }

        let legal = matches!(
            (self.stage, to),
            (JobStage::Queued, JobStage::Extracting)
                | (JobStage::Extracting, JobStage::Synthesizing)
                | (JobStage::Synthesizing, JobStage::Done)
                | (JobStage::Extracting, JobStage::Failed)
                | (JobStage::Synthesizing, JobStage::Failed)
                | (_, JobStage::Cancelled)
        );

        if !legal {
            return Err(JobTransitionError::Invalid {
                from: self.stage,
                to,
            });
        }

        self.stage = to;
        Ok(())
    }

    /// 记录进度（夹取到 [0,100]，活跃状态下单调不减）
    pub fn record_progress(&mut self, progress: f32) {
        if !matches!(self.stage, JobStage::Extracting | JobStage::Synthesizing) {
            return;
        }
        let clamped = progress.clamp(0.0, 100.0);
        if clamped > self.progress {
            self.progress = clamped;
        }
    }

    /// 标记完成
    pub fn mark_done(&mut self, book_id: BookId) -> Result<(), JobTransitionError> {
        self.transition(JobStage::Done)?;
        self.progress = 100.0;
        self.result_book_id = Some(book_id);
        Ok(())
    }

    /// 标记失败
    pub fn mark_failed(
        &mut self,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Result<(), JobTransitionError> {
        self.transition(JobStage::Failed)?;
        self.error = Some(JobError {
            code: code.into(),
            message: message.into(),
        });
        Ok(())
    }

    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            job_id: self.job_id,
            stage: self.stage,
            progress: self.progress,
            degraded: self.degraded,
            created_at: self.created_at,
            result_book_id: self.result_book_id,
            error: self.error.clone(),
        }
    }
}
