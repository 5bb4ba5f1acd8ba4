//! Memory Layer - In-Memory State Management
//!
//! 实现 JobStore 与 NarrationCache。全部状态驻留内存：
//! 进程崩溃丢失在途与排队 Job 是刻意的设计选择（重新提交即可）

mod job_store;
mod narration_cache;

pub use job_store::{InMemoryJobStore, JobStoreError};
pub use narration_cache::{narration_cache_key, NarrationCache};
