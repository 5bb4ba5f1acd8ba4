//! Application Layer - 应用层
//!
//! - Ports: 四个外部能力的出站端口
//! - Pipeline: Extraction / Synthesis 编排与 Book 装配
//! - Scheduler: Job 受理、查询、取消与一次性交付

pub mod pipeline;
pub mod ports;
pub mod scheduler;

pub use pipeline::{ConversionPipeline, ExtractionStage, RetryPolicy, SynthesisStage};
pub use scheduler::{JobScheduler, SchedulerError};
