//! Playback Session Manager - 播放会话管理
//!
//! 每个会话独占一个 PlaybackEngine；tokio Mutex 保证同一会话
//! 同一时刻只有一个 tick / seek / play / pause 在途。不同 Book
//! 上的并发会话完全独立，共享的 Book 只读，无需加锁

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::Book;

use super::engine::{PlaybackEngine, PlaybackState};

/// 会话唯一标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 播放会话句柄
///
/// 所有操作经由内部锁串行化后委托给引擎
pub struct PlaybackSession {
    id: SessionId,
    engine: Mutex<PlaybackEngine>,
}

impl PlaybackSession {
    fn new(book: Arc<Book>) -> Self {
        Self {
            id: SessionId::new(),
            engine: Mutex::new(PlaybackEngine::new(book)),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub async fn play(&self) {
        self.engine.lock().await.play();
    }

    pub async fn pause(&self) {
        self.engine.lock().await.pause();
    }

    pub async fn seek(&self, target_seconds: f64) {
        self.engine.lock().await.seek(target_seconds);
    }

    pub async fn set_speed(&self, speed: f32) {
        self.engine.lock().await.set_speed(speed);
    }

    /// 外部音频时钟驱动，返回推进后的快照
    pub async fn tick(&self, elapsed_seconds: f64) -> PlaybackState {
        let mut engine = self.engine.lock().await;
        engine.tick(elapsed_seconds);
        engine.state()
    }

    /// 只读快照（UI 绑定）
    pub async fn state(&self) -> PlaybackState {
        self.engine.lock().await.state()
    }
}

/// 播放会话管理器
pub struct PlaybackSessionManager {
    sessions: DashMap<SessionId, Arc<PlaybackSession>>,
}

impl PlaybackSessionManager {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 创建会话；同一 Book 可同时存在多个会话（如双端续播）
    pub fn create(&self, book: Arc<Book>) -> Arc<PlaybackSession> {
        let session = Arc::new(PlaybackSession::new(book));
        self.sessions.insert(session.id(), session.clone());
        tracing::info!(session_id = %session.id(), "Playback session created");
        session
    }

    pub fn get(&self, id: &SessionId) -> Option<Arc<PlaybackSession>> {
        self.sessions.get(id).map(|s| s.clone())
    }

    pub fn close(&self, id: &SessionId) -> bool {
        let removed = self.sessions.remove(id).is_some();
        if removed {
            tracing::info!(session_id = %id, "Playback session closed");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for PlaybackSessionManager {
    fn default() -> Self {
        Self::new()
    }
}
