//! Synthesis Stage - 语音合成
//!
//! ExtractedDocument + VoiceConfig -> AudioSegment 序列。
//! 段落是并行度单位：乱序完成，按原始顺序装配。
//! 翻译失败降级不致命；背景音乐闪避是确定性后处理

use futures_util::stream::{self, StreamExt, TryStreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{
    ExtractedDocument, MusicMixerPort, NarrateRequest, Narration, SynthesisError, SynthesizerPort,
    TranslatorPort,
};
use crate::domain::{AudioSegment, VoiceConfig};
use crate::infrastructure::memory::{narration_cache_key, NarrationCache};

use super::retry::{retry_with_backoff, RetryPolicy};

/// 语音段的固定音乐衰减（dB）
pub const SPEECH_ATTENUATION_DB: f32 = -18.0;

/// 合成阶段的输出
#[derive(Debug, Clone)]
pub struct SynthesisOutcome {
    /// 文档内的段序列，偏移为文档内累计值（装配时重排为全书偏移）
    pub segments: Vec<AudioSegment>,
    /// 翻译是否降级回退
    pub degraded: bool,
}

/// 合成阶段
pub struct SynthesisStage {
    synthesizer: Arc<dyn SynthesizerPort>,
    translator: Arc<dyn TranslatorPort>,
    mixer: Arc<dyn MusicMixerPort>,
    cache: Arc<NarrationCache>,
    retry: RetryPolicy,
    fan_out: usize,
}

impl SynthesisStage {
    pub fn new(
        synthesizer: Arc<dyn SynthesizerPort>,
        translator: Arc<dyn TranslatorPort>,
        mixer: Arc<dyn MusicMixerPort>,
        cache: Arc<NarrationCache>,
        retry: RetryPolicy,
        fan_out: usize,
    ) -> Self {
        Self {
            synthesizer,
            translator,
            mixer,
            cache,
            retry,
            fan_out: fan_out.max(1),
        }
    }

    /// 合成一个文档
    ///
    /// `on_paragraph_done(done, total)` 在每个段落完成时回调，
    /// 驱动 Job 级进度聚合
    pub async fn synthesize(
        &self,
        doc: &ExtractedDocument,
        cfg: &VoiceConfig,
        cancel: &CancellationToken,
        on_paragraph_done: &(dyn Fn(usize, usize) + Send + Sync),
    ) -> Result<SynthesisOutcome, SynthesisError> {
        if cancel.is_cancelled() {
            return Err(SynthesisError::Cancelled);
        }

        // 1. 翻译前置处理（失败降级，不致命）
        let (texts, degraded) = self.translate_paragraphs(doc, cfg).await;
        let total = texts.len();
        let done = AtomicUsize::new(0);

        // 2. 段落并行旁白，buffered 保证输出顺序即段落顺序
        let narrations: Vec<Narration> = stream::iter((0..texts.len()).map(
            |text_index| -> futures_util::future::BoxFuture<'_, Result<Narration, SynthesisError>> {
                Box::pin(self.narrate_paragraph(&texts[text_index], cfg, cancel, &done))
            },
        ))
        .buffered(self.fan_out)
        .inspect_ok(|_| {
            on_paragraph_done(done.load(Ordering::SeqCst), total);
        })
        .try_collect()
        .await?;

        if cancel.is_cancelled() {
            return Err(SynthesisError::Cancelled);
        }

        // 3. 语速缩放 + 文档内累计偏移
        let mut segments = Vec::with_capacity(narrations.len());
        let mut offset = 0.0f64;
        for (index, narration) in narrations.into_iter().enumerate() {
            let duration = narration.duration_seconds / f64::from(cfg.speed);
            segments.push(AudioSegment {
                paragraph_index: index,
                start_offset_seconds: offset,
                duration_seconds: duration,
                audio_ref: narration.audio_ref,
            });
            offset += duration;
        }

        // 4. 背景音乐闪避
        if let Some(track) = &cfg.background_music {
            for segment in &mut segments {
                segment.audio_ref = self
                    .mixer
                    .duck(
                        &segment.audio_ref,
                        track,
                        cfg.music_volume,
                        SPEECH_ATTENUATION_DB,
                    )
                    .await;
            }
        }

        tracing::debug!(
            unit_id = %doc.source_unit_id,
            segments = segments.len(),
            degraded = degraded,
            "Document synthesized"
        );

        Ok(SynthesisOutcome { segments, degraded })
    }

    /// 翻译段落文本
    ///
    /// 首次失败后停止继续尝试，其余段落保持原语言
    async fn translate_paragraphs(
        &self,
        doc: &ExtractedDocument,
        cfg: &VoiceConfig,
    ) -> (Vec<String>, bool) {
        let Some(lang) = &cfg.translation_language else {
            return (
                doc.paragraphs.iter().map(|p| p.text.clone()).collect(),
                false,
            );
        };

        let mut degraded = false;
        let mut texts = Vec::with_capacity(doc.paragraphs.len());
        for paragraph in &doc.paragraphs {
            if degraded {
                texts.push(paragraph.text.clone());
                continue;
            }
            match self.translator.translate(&paragraph.text, lang).await {
                Ok(translated) => texts.push(translated),
                Err(e) => {
                    tracing::warn!(
                        unit_id = %doc.source_unit_id,
                        target_lang = %lang,
                        error = %e,
                        "Translation failed, falling back to original language"
                    );
                    degraded = true;
                    texts.push(paragraph.text.clone());
                }
            }
        }
        (texts, degraded)
    }

    /// 旁白单个段落（缓存优先，Unavailable / 超时重试）
    async fn narrate_paragraph(
        &self,
        text: &str,
        cfg: &VoiceConfig,
        cancel: &CancellationToken,
        done: &AtomicUsize,
    ) -> Result<Narration, SynthesisError> {
        if cancel.is_cancelled() {
            return Err(SynthesisError::Cancelled);
        }

        let key = narration_cache_key(text, cfg);
        if let Some(hit) = self.cache.get(&key) {
            done.fetch_add(1, Ordering::SeqCst);
            return Ok(hit);
        }

        let narration = retry_with_backoff(&self.retry, SynthesisError::is_retryable, || {
            let synthesizer = self.synthesizer.clone();
            let timeout = self.retry.call_timeout;
            let request = NarrateRequest {
                text: text.to_string(),
                voice_id: cfg.voice_id.clone(),
                pitch: cfg.pitch,
                emphasis: cfg.emphasis,
            };
            async move {
                match tokio::time::timeout(timeout, synthesizer.narrate(request)).await {
                    Ok(result) => result,
                    Err(_) => Err(SynthesisError::Unavailable(format!(
                        "Narrate call timed out after {:?}",
                        timeout
                    ))),
                }
            }
        })
        .await?;

        // 取消发生在调用期间：丢弃在途结果
        if cancel.is_cancelled() {
            return Err(SynthesisError::Cancelled);
        }

        self.cache.put(key, narration.clone());
        done.fetch_add(1, Ordering::SeqCst);
        Ok(narration)
    }
}
