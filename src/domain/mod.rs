//! Domain Layer - 领域层
//!
//! 包含四个上下文:
//! - Source Context: 输入归一化
//! - Voice Context: 旁白参数
//! - Job Context: 转换任务生命周期
//! - Book Context: 最终产物与同步元数据

pub mod book;
pub mod job;
pub mod source;
pub mod voice;

pub use book::{AudioSegment, Book, BookCategory, BookId, Chapter, DURATION_TOLERANCE_SECONDS};
pub use job::{Job, JobError, JobId, JobSnapshot, JobStage, JobTransitionError};
pub use source::{
    ContentSource, Diagnostic, NormalizeOutcome, RawFile, RawInput, SourceKind, SourcePayload,
    SourceUnit, UnitId,
};
pub use voice::{VoiceConfig, VoiceConfigError, PITCH_RANGE, SPEED_RANGE};
