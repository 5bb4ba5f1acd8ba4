//! Worker Layer - 后台转换执行

mod convert_worker;

pub use convert_worker::{ConvertWorker, ConvertWorkerConfig};
