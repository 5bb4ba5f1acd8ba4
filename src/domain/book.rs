//! Book Context - 最终产物
//!
//! 不变量:
//! - segments 在时间上连续且不重叠，paragraph_index 严格递增
//! - segments 总时长与 total_seconds 的偏差在 ±1s 以内
//! - Book 完成后只读；progress / is_favorite 是仅有的可变字段，
//!   且 progress 只由 PlaybackEngine 回写

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 时长不变量的舍入容差（秒）
pub const DURATION_TOLERANCE_SECONDS: f64 = 1.0;

/// Book 唯一标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookId(Uuid);

impl BookId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for BookId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BookId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 书籍分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookCategory {
    Audiobook,
    Bible,
    Podcast,
    Study,
    Document,
}

/// 章节（由标题段落推导）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub title: String,
    pub start_seconds: f64,
}

/// 一段旁白音频，文本/音频同步的最小单位
///
/// 一个段落对应一个 AudioSegment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioSegment {
    /// 全书范围内的段落索引
    pub paragraph_index: usize,
    /// 距书开头的累计偏移（秒）
    pub start_offset_seconds: f64,
    /// 时长（秒），已按语速缩放
    pub duration_seconds: f64,
    /// 音频引用（由 Synthesizer / MusicMixer 产出）
    pub audio_ref: String,
}

/// 最终产物
///
/// 该结构即持久化协作方必须无损往返的契约
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub cover_url: String,
    pub total_seconds: f64,
    pub category: BookCategory,
    pub chapters: Vec<Chapter>,
    pub segments: Vec<AudioSegment>,
    /// 全部段落文本，按提交顺序换行拼接（驱动交互阅读）
    pub text_content: String,
    pub date_added: DateTime<Utc>,
    /// 收听进度 0-100，由 PlaybackEngine 回写
    pub progress: f32,
    pub is_favorite: bool,
}

impl Book {
    /// segments 总时长与 total_seconds 是否在容差内一致
    pub fn duration_invariant_holds(&self) -> bool {
        let sum: f64 = self.segments.iter().map(|s| s.duration_seconds).sum();
        (sum - self.total_seconds).abs() <= DURATION_TOLERANCE_SECONDS
    }

    /// segments 是否按时间连续且 paragraph_index 严格递增
    pub fn ordering_invariant_holds(&self) -> bool {
        self.segments.windows(2).all(|w| {
            w[1].paragraph_index > w[0].paragraph_index
                && w[1].start_offset_seconds >= w[0].start_offset_seconds
        })
    }
}
