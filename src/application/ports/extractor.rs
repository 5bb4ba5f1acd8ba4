//! Extractor Port - 文本提取能力
//!
//! 由协作方实现（OCR / 文档解析 / 网页阅读器），pipeline 只做编排

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{SourceUnit, UnitId};

/// 提取出的一个段落
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    pub text: String,
    /// 标题段落，章节推导的依据
    pub is_heading: bool,
}

impl Paragraph {
    pub fn body(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_heading: false,
        }
    }

    pub fn heading(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_heading: true,
        }
    }
}

/// ExtractionStage 的输出
///
/// 归 Job 所有，Synthesis 消费后即可丢弃
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedDocument {
    pub source_unit_id: UnitId,
    pub paragraphs: Vec<Paragraph>,
}

impl ExtractedDocument {
    pub fn word_count(&self) -> usize {
        self.paragraphs
            .iter()
            .map(|p| p.text.split_whitespace().count())
            .sum()
    }
}

/// 提取错误
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// mime 不被识别，致命
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// 能力不可达（网络 / 模型故障），可重试
    #[error("Extractor unavailable: {0}")]
    Unavailable(String),

    /// 提取结果为空，致命
    #[error("Extraction produced no content")]
    EmptyContent,
}

impl ExtractionError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ExtractionError::Unavailable(_))
    }

    /// 稳定错误码，面向调用方
    pub fn code(&self) -> &'static str {
        match self {
            ExtractionError::UnsupportedFormat(_) => "unsupported_format",
            ExtractionError::Unavailable(_) => "extractor_unavailable",
            ExtractionError::EmptyContent => "empty_content",
        }
    }
}

/// Extractor Port
///
/// 实现必须幂等：同一 unit 重复调用返回相同段落序列，
/// pipeline 依赖这一点在 Unavailable 时安全重试
#[async_trait]
pub trait ExtractorPort: Send + Sync {
    async fn extract(&self, unit: &SourceUnit) -> Result<Vec<Paragraph>, ExtractionError>;
}
