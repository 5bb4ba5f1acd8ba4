//! Synthesizer Port - 语音合成能力
//!
//! 由协作方实现（TTS 引擎），pipeline 只做编排与后处理

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 单个段落的旁白请求
///
/// pitch / emphasis 作为音色参数透传，不在 pipeline 内计算
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrateRequest {
    pub text: String,
    pub voice_id: String,
    pub pitch: f32,
    pub emphasis: u8,
}

/// 旁白结果：音频引用 + 原始时长（未按语速缩放）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Narration {
    pub audio_ref: String,
    pub duration_seconds: f64,
}

/// 合成错误
#[derive(Debug, Error)]
pub enum SynthesisError {
    /// 能力不可达 / 调用超时，可重试
    #[error("Synthesizer unavailable: {0}")]
    Unavailable(String),

    /// 音色不存在，致命，立即上报
    #[error("Unsupported voice: {0}")]
    UnsupportedVoice(String),

    /// 协作式取消：在途结果被丢弃
    #[error("Synthesis cancelled")]
    Cancelled,
}

impl SynthesisError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, SynthesisError::Unavailable(_))
    }

    /// 稳定错误码，面向调用方
    pub fn code(&self) -> &'static str {
        match self {
            SynthesisError::Unavailable(_) => "synthesizer_unavailable",
            SynthesisError::UnsupportedVoice(_) => "unsupported_voice",
            SynthesisError::Cancelled => "cancelled",
        }
    }
}

/// Synthesizer Port
#[async_trait]
pub trait SynthesizerPort: Send + Sync {
    async fn narrate(&self, request: NarrateRequest) -> Result<Narration, SynthesisError>;
}
