//! Conversion Pipeline - 转换编排
//!
//! 每个 Job 一次执行：Extraction -> Synthesis -> 装配。
//! 阶段间有栅栏（Job 级 stage 只有两个处理阶段），进度按
//! 20/80 权重聚合（对应真实 OCR / TTS 的成本占比）。
//! 取消是协作式的：在阶段边界与段落之间检查取消令牌

mod assembler;
mod extraction;
mod retry;
mod synthesis;

pub use assembler::{assemble_book, UnitOutput};
pub use extraction::ExtractionStage;
pub use retry::{retry_with_backoff, RetryPolicy};
pub use synthesis::{SynthesisOutcome, SynthesisStage, SPEECH_ATTENUATION_DB};

use futures_util::stream::{self, StreamExt, TryStreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::application::ports::{ExtractedDocument, ExtractionError, SynthesisError};
use crate::domain::{JobId, JobStage};
use crate::infrastructure::events::EventPublisher;
use crate::infrastructure::memory::InMemoryJobStore;

/// 提取阶段在单个 unit 进度中的权重（%）
const EXTRACTION_WEIGHT: f32 = 20.0;

/// 合成阶段在单个 unit 进度中的权重（%）
const SYNTHESIS_WEIGHT: f32 = 80.0;

/// 转换 pipeline
///
/// Job 状态只通过 store 写入；事件只反映 store 中已生效的状态
pub struct ConversionPipeline {
    extraction: ExtractionStage,
    synthesis: SynthesisStage,
    store: Arc<InMemoryJobStore>,
    events: Arc<EventPublisher>,
    /// unit 级提取的并行上限
    unit_fan_out: usize,
}

impl ConversionPipeline {
    pub fn new(
        extraction: ExtractionStage,
        synthesis: SynthesisStage,
        store: Arc<InMemoryJobStore>,
        events: Arc<EventPublisher>,
        unit_fan_out: usize,
    ) -> Self {
        Self {
            extraction,
            synthesis,
            store,
            events,
            unit_fan_out: unit_fan_out.max(1),
        }
    }

    /// 执行一个 Job 直到终态
    ///
    /// 所有失败都落到 store / events 上，不向 worker 传播
    pub async fn run(&self, job_id: JobId) {
        let Some((units, cfg)) = self.store.job_inputs(&job_id) else {
            tracing::warn!(job_id = %job_id, "Job not found, skipping");
            return;
        };
        let Some(token) = self.store.cancellation_token(&job_id) else {
            return;
        };
        if token.is_cancelled() {
            tracing::debug!(job_id = %job_id, "Job cancelled while queued, skipping");
            return;
        }

        let unit_count = units.len();

        // ---- EXTRACTING ----
        if self.store.transition(&job_id, JobStage::Extracting).is_err() {
            return;
        }
        self.events.publish_stage(job_id, JobStage::Extracting.as_str());

        let extracted = AtomicUsize::new(0);
        let extraction_result: Result<Vec<ExtractedDocument>, ExtractionError> =
            stream::iter((0..units.len()).map(|unit_index| -> futures_util::future::BoxFuture<'_, Result<ExtractedDocument, ExtractionError>> {
                let unit = &units[unit_index];
                let extracted = &extracted;
                let token = &token;
                Box::pin(async move {
                    if token.is_cancelled() {
                        // 哨兵值：取消检查在错误处理之前，不会被当成失败上报
                        return Err(ExtractionError::Unavailable("cancelled".to_string()));
                    }
                    let doc = self.extraction.extract(unit).await?;
                    let done = extracted.fetch_add(1, Ordering::SeqCst) + 1;
                    self.store.record_progress(
                        &job_id,
                        EXTRACTION_WEIGHT * done as f32 / unit_count as f32,
                    );
                    self.report_progress(job_id);
                    Ok(doc)
                })
            }))
            .buffered(self.unit_fan_out)
            .try_collect()
            .await;

        if token.is_cancelled() {
            self.finish_cancelled(job_id);
            return;
        }
        let documents = match extraction_result {
            Ok(documents) => documents,
            Err(e) => {
                self.fail(job_id, e.code(), &e.to_string());
                return;
            }
        };

        // ---- SYNTHESIZING ----
        if self
            .store
            .transition(&job_id, JobStage::Synthesizing)
            .is_err()
        {
            return;
        }
        self.events
            .publish_stage(job_id, JobStage::Synthesizing.as_str());

        let mut outputs = Vec::with_capacity(unit_count);
        let mut degraded = false;
        for (index, document) in documents.into_iter().enumerate() {
            if token.is_cancelled() {
                self.finish_cancelled(job_id);
                return;
            }

            let completed_units = index as f32;
            let on_paragraph_done = |done: usize, total: usize| {
                // 全部提取已完成（贡献 20），合成按段落粒度推进其 80
                let unit_fraction = done as f32 / total.max(1) as f32;
                let progress = EXTRACTION_WEIGHT
                    + SYNTHESIS_WEIGHT * (completed_units + unit_fraction) / unit_count as f32;
                self.store.record_progress(&job_id, progress);
                self.report_progress(job_id);
            };

            match self
                .synthesis
                .synthesize(&document, &cfg, &token, &on_paragraph_done)
                .await
            {
                Ok(outcome) => {
                    if outcome.degraded && !degraded {
                        degraded = true;
                        self.store.set_degraded(&job_id);
                        self.events
                            .publish_degraded(job_id, "Translation fell back to original language");
                    }
                    outputs.push(UnitOutput {
                        document,
                        segments: outcome.segments,
                        label: units[index].label.clone(),
                        kind: units[index].kind,
                    });
                }
                Err(SynthesisError::Cancelled) => {
                    self.finish_cancelled(job_id);
                    return;
                }
                Err(e) => {
                    self.fail(job_id, e.code(), &e.to_string());
                    return;
                }
            }
        }

        // ---- 装配 ----
        if token.is_cancelled() {
            self.finish_cancelled(job_id);
            return;
        }
        let book = assemble_book(outputs);
        let book_id = book.id;
        if self.store.complete(&job_id, book).is_err() {
            // 完成与取消竞争：取消已胜出
            self.finish_cancelled(job_id);
            return;
        }
        self.events.publish_completed(job_id, book_id, degraded);

        tracing::info!(
            job_id = %job_id,
            book_id = %book_id,
            units = unit_count,
            degraded = degraded,
            "Conversion completed"
        );
    }

    /// 发布 store 中已生效的（单调）进度
    fn report_progress(&self, job_id: JobId) {
        if let Some(snapshot) = self.store.snapshot(&job_id) {
            self.events.publish_progress(job_id, snapshot.progress);
        }
    }

    fn fail(&self, job_id: JobId, code: &str, message: &str) {
        if self.store.mark_failed(&job_id, code, message).is_ok() {
            self.events.publish_failed(job_id, code, message);
        }
    }

    fn finish_cancelled(&self, job_id: JobId) {
        // stage 已由 cancel() 同步迁移到 Cancelled，这里只停止工作
        tracing::debug!(job_id = %job_id, "Pipeline stopped on cancellation");
    }
}
