//! In-Memory Narration Cache
//!
//! 以内容哈希 + 音色参数为 key 缓存旁白结果，重复段落
//! （重复提交、重试后的再次合成）直接命中，跳过能力调用。
//! 缓存的是闪避前的原始旁白，背景音乐混音始终在命中后执行

use dashmap::DashMap;
use std::sync::Arc;

use crate::application::ports::Narration;
use crate::domain::VoiceConfig;

/// 生成缓存 key: md5(text):voice_id:pitch:emphasis
pub fn narration_cache_key(text: &str, cfg: &VoiceConfig) -> String {
    let digest = md5::compute(text.as_bytes());
    format!("{:x}:{}:{}:{}", digest, cfg.voice_id, cfg.pitch, cfg.emphasis)
}

/// 内存旁白缓存
pub struct NarrationCache {
    entries: DashMap<String, Narration>,
}

impl NarrationCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn get(&self, key: &str) -> Option<Narration> {
        self.entries.get(key).map(|n| n.clone())
    }

    pub fn put(&self, key: String, narration: Narration) {
        self.entries.insert(key, narration);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for NarrationCache {
    fn default() -> Self {
        Self::new()
    }
}
