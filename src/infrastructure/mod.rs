//! Infrastructure Layer - 基础设施层
//!
//! 提供内存状态管理、后台执行、事件发布与 fake 能力适配器

pub mod adapters;
pub mod events;
pub mod memory;
pub mod worker;

pub use events::EventPublisher;
pub use memory::{InMemoryJobStore, NarrationCache};
pub use worker::{ConvertWorker, ConvertWorkerConfig};
