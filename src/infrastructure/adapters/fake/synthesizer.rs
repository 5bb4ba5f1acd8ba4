//! Fake Synthesizer - 用于测试的 TTS
//!
//! 时长按 ~150 wpm 的朗读速率推算，音频引用是文本+音色的
//! 内容哈希。支持两种故障注入：全局前 n 次失败，或命中文本
//! 标记的前 n 次失败

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use crate::application::ports::{NarrateRequest, Narration, SynthesisError, SynthesizerPort};

/// 朗读速率（词/分钟）
pub const WORDS_PER_MINUTE: f64 = 150.0;

/// 已知音色
const KNOWN_VOICES: &[&str] = &[
    "male-deep",
    "female-soft",
    "doc-narrator",
    "female-news",
    "bible-read",
];

/// Fake Synthesizer
pub struct FakeSynthesizer {
    /// 剩余的全局故障注入次数
    outages: AtomicU32,
    /// 文本标记故障注入：命中 marker 的前 n 次调用失败
    marker_failures: Option<(String, AtomicU32)>,
    /// 模拟推理延迟
    latency: Duration,
    /// 累计 narrate 调用数（含失败）
    calls: AtomicU32,
}

impl FakeSynthesizer {
    pub fn new() -> Self {
        Self {
            outages: AtomicU32::new(0),
            marker_failures: None,
            latency: Duration::ZERO,
            calls: AtomicU32::new(0),
        }
    }

    /// 前 n 次调用返回 Unavailable
    pub fn with_outages(self, n: u32) -> Self {
        self.outages.store(n, Ordering::SeqCst);
        self
    }

    /// 文本包含 marker 的前 n 次调用返回 Unavailable
    pub fn failing_on_marker(mut self, marker: impl Into<String>, n: u32) -> Self {
        self.marker_failures = Some((marker.into(), AtomicU32::new(n)));
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// 累计 narrate 调用数
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn duration_for(text: &str) -> f64 {
        let words = text.split_whitespace().count() as f64;
        words * 60.0 / WORDS_PER_MINUTE
    }
}

impl Default for FakeSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SynthesizerPort for FakeSynthesizer {
    async fn narrate(&self, request: NarrateRequest) -> Result<Narration, SynthesisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.latency > Duration::ZERO {
            tokio::time::sleep(self.latency).await;
        }

        if !KNOWN_VOICES.contains(&request.voice_id.as_str()) {
            return Err(SynthesisError::UnsupportedVoice(request.voice_id));
        }

        let remaining = self.outages.load(Ordering::SeqCst);
        if remaining > 0 {
            self.outages.store(remaining - 1, Ordering::SeqCst);
            return Err(SynthesisError::Unavailable(
                "Injected synthesizer outage".to_string(),
            ));
        }

        if let Some((marker, budget)) = &self.marker_failures {
            if request.text.contains(marker.as_str()) {
                let left = budget.load(Ordering::SeqCst);
                if left > 0 {
                    budget.store(left - 1, Ordering::SeqCst);
                    return Err(SynthesisError::Unavailable(format!(
                        "Injected outage for marker '{}'",
                        marker
                    )));
                }
            }
        }

        let digest = md5::compute(format!("{}|{}", request.text, request.voice_id).as_bytes());
        Ok(Narration {
            audio_ref: format!("fake-audio:{:x}", digest),
            duration_seconds: Self::duration_for(&request.text),
        })
    }
}
