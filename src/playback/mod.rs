//! Playback Layer - 播放引擎与会话
//!
//! 运行期与转换 pipeline 无关：只消费完成的 Book

mod engine;
mod session;

pub use engine::{PlaybackEngine, PlaybackState, PlayerState};
pub use session::{PlaybackSession, PlaybackSessionManager, SessionId};
