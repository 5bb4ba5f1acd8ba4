//! Convert Worker - Background Conversion Processor
//!
//! 从队列消费 Job 并执行 ConversionPipeline，semaphore 限制
//! 同时活跃的 pipeline 数量，超额提交按 FIFO 排队

use std::sync::Arc;
use tokio::sync::mpsc;

use crate::application::pipeline::ConversionPipeline;
use crate::domain::JobId;
use crate::infrastructure::memory::InMemoryJobStore;

/// Worker 配置
#[derive(Debug, Clone)]
pub struct ConvertWorkerConfig {
    /// 最大并发转换数
    pub max_concurrent: usize,
}

impl Default for ConvertWorkerConfig {
    fn default() -> Self {
        Self { max_concurrent: 2 }
    }
}

/// 转换 Worker
pub struct ConvertWorker {
    config: ConvertWorkerConfig,
    queue_receiver: mpsc::Receiver<JobId>,
    store: Arc<InMemoryJobStore>,
    pipeline: Arc<ConversionPipeline>,
}

impl ConvertWorker {
    pub fn new(
        config: ConvertWorkerConfig,
        queue_receiver: mpsc::Receiver<JobId>,
        store: Arc<InMemoryJobStore>,
        pipeline: Arc<ConversionPipeline>,
    ) -> Self {
        Self {
            config,
            queue_receiver,
            store,
            pipeline,
        }
    }

    /// 启动 Worker，队列关闭（所有 sender 释放）后退出
    pub async fn run(mut self) {
        tracing::info!(
            max_concurrent = self.config.max_concurrent,
            "ConvertWorker started"
        );

        let semaphore = Arc::new(tokio::sync::Semaphore::new(self.config.max_concurrent.max(1)));

        while let Some(job_id) = self.queue_receiver.recv().await {
            // 排队期间被取消的 Job 不再占用执行槽
            if self.store.is_cancelled(&job_id) {
                tracing::debug!(job_id = %job_id, "Job cancelled before start, skipping");
                continue;
            }

            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    tracing::error!("Worker semaphore closed");
                    return;
                }
            };

            let pipeline = self.pipeline.clone();
            tokio::spawn(async move {
                let _permit = permit; // 持有 permit 直到 pipeline 结束
                pipeline.run(job_id).await;
            });
        }

        tracing::info!("ConvertWorker stopped");
    }
}
