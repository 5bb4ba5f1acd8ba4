//! Playback Engine - 播放状态机
//!
//! STOPPED -> PLAYING <-> PAUSED，SEEKING 是瞬态：从任意活跃状态
//! 进入，结束后回到被打断的状态。时间轴由外部音频时钟通过 tick
//! 驱动；引擎只做位置推进与文本同步索引维护。
//!
//! 文本同步保证：任何迁移之后 active_segment_index 都是
//! start_offset_seconds <= position_seconds 的最大索引

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::domain::{Book, BookId, SPEED_RANGE};

/// 播放状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerState {
    Stopped,
    Playing,
    Paused,
    /// 瞬态：seek 期间短暂进入，结束后恢复原状态
    Seeking,
}

/// 面向 UI 绑定的只读快照
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackState {
    pub book_id: BookId,
    pub position_seconds: f64,
    pub is_playing: bool,
    pub state: PlayerState,
    pub speed: f32,
    pub active_chapter_index: usize,
    pub active_segment_index: usize,
    /// 收听进度 0-100，持久化协作方回写 Book.progress 的数据源
    pub progress_percent: f32,
}

/// 播放引擎
///
/// 每个活跃会话独占一个实例；Book 完成后只读，可被多个
/// 并发会话安全共享
pub struct PlaybackEngine {
    book: Arc<Book>,
    state: PlayerState,
    position_seconds: f64,
    speed: f32,
    active_segment_index: usize,
    active_chapter_index: usize,
}

impl PlaybackEngine {
    /// 创建引擎，从 Book.progress 恢复上次的收听位置
    pub fn new(book: Arc<Book>) -> Self {
        let position = if book.total_seconds > 0.0 {
            f64::from(book.progress.clamp(0.0, 100.0)) / 100.0 * book.total_seconds
        } else {
            0.0
        };

        let mut engine = Self {
            book,
            state: PlayerState::Stopped,
            position_seconds: position,
            speed: 1.0,
            active_segment_index: 0,
            active_chapter_index: 0,
        };
        engine.recompute_indices();
        engine
    }

    /// STOPPED / PAUSED -> PLAYING；已在播放则无操作
    pub fn play(&mut self) {
        if matches!(self.state, PlayerState::Stopped | PlayerState::Paused) {
            self.state = PlayerState::Playing;
        }
    }

    /// PLAYING -> PAUSED；其余状态无操作
    pub fn pause(&mut self) {
        if self.state == PlayerState::Playing {
            self.state = PlayerState::Paused;
        }
    }

    /// 跳转到目标位置（夹取到 [0, total_seconds]）
    ///
    /// SEEKING 期间外部调用被会话锁序列化，结束后恢复被打断的状态
    pub fn seek(&mut self, target_seconds: f64) {
        let interrupted = self.state;
        self.state = PlayerState::Seeking;

        let target = if target_seconds.is_finite() {
            target_seconds
        } else {
            0.0
        };
        self.position_seconds = target.clamp(0.0, self.book.total_seconds);
        self.recompute_indices();

        self.state = interrupted;
    }

    /// 更新播放速率，不改变位置；下一个音频帧（tick）起生效
    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed.clamp(*SPEED_RANGE.start(), *SPEED_RANGE.end());
    }

    /// 由外部音频时钟在 PLAYING 时调用，推进位置
    ///
    /// 跨过段边界时更新 active_segment_index（驱动文本高亮），
    /// 到达结尾迁移到 STOPPED
    pub fn tick(&mut self, elapsed_seconds: f64) {
        if self.state != PlayerState::Playing || !elapsed_seconds.is_finite() {
            return;
        }

        self.position_seconds += elapsed_seconds.max(0.0) * f64::from(self.speed);
        if self.position_seconds >= self.book.total_seconds {
            self.position_seconds = self.book.total_seconds;
            self.state = PlayerState::Stopped;
        }
        self.recompute_indices();
    }

    /// 只读快照
    pub fn state(&self) -> PlaybackState {
        PlaybackState {
            book_id: self.book.id,
            position_seconds: self.position_seconds,
            is_playing: self.state == PlayerState::Playing,
            state: self.state,
            speed: self.speed,
            active_chapter_index: self.active_chapter_index,
            active_segment_index: self.active_segment_index,
            progress_percent: self.progress_percent(),
        }
    }

    /// 收听进度（0-100）
    pub fn progress_percent(&self) -> f32 {
        if self.book.total_seconds <= 0.0 {
            return 0.0;
        }
        ((self.position_seconds / self.book.total_seconds) * 100.0) as f32
    }

    /// 回写收听进度——Book.progress 唯一的合法修改路径
    pub fn write_progress(&self, book: &mut Book) {
        book.progress = self.progress_percent();
    }

    /// 二分重算文本同步索引
    fn recompute_indices(&mut self) {
        let position = self.position_seconds;

        let segment_upper = self
            .book
            .segments
            .partition_point(|s| s.start_offset_seconds <= position);
        self.active_segment_index = segment_upper.saturating_sub(1);

        let chapter_upper = self
            .book
            .chapters
            .partition_point(|c| c.start_seconds <= position);
        self.active_chapter_index = chapter_upper.saturating_sub(1);
    }
}
