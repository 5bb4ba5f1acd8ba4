//! VozBook - 文档转有声书转换与播放核心
//!
//! 架构设计: DDD + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Source Context: 异构输入归一化（文件 / 拍照 OCR / 链接）
//! - Voice Context: 旁白参数值类型
//! - Job Context: 转换任务状态机
//! - Book Context: 产物与文本同步元数据
//!
//! 应用层 (application/):
//! - Ports: 四个外部能力端口（Extractor / Synthesizer / Translator / MusicMixer）
//! - Pipeline: Extraction -> Synthesis 编排、进度聚合、Book 装配
//! - Scheduler: Job 受理 / 查询 / 取消 / 一次性交付
//!
//! 播放层 (playback/):
//! - PlaybackEngine 状态机与会话管理
//!
//! 基础设施层 (infrastructure/):
//! - Memory: JobStore、NarrationCache 内存实现
//! - Worker: ConvertWorker 后台任务处理
//! - Adapters: 确定性 fake 能力实现
//! - Events: Job 进度事件发布

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod playback;

pub use application::{JobScheduler, SchedulerError};
pub use config::{load_config, AppConfig};
pub use playback::{PlaybackSessionManager, PlaybackState};
