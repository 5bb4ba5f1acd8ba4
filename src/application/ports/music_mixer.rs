//! Music Mixer Port - 背景音乐混音能力
//!
//! 闪避（ducking）是确定性的混音规则而非模型调用：静音段的上限
//! 增益与语音段的固定衰减都由 pipeline 决定，音频引擎只负责应用，
//! 因此该能力没有独立于引擎可用性的失败模式

use async_trait::async_trait;

/// Music Mixer Port
#[async_trait]
pub trait MusicMixerPort: Send + Sync {
    /// 将音乐床闪避到旁白之下，返回混音后的音频引用
    ///
    /// - `ceiling_volume`: 静音段的音乐增益上限（0-100）
    /// - `speech_attenuation_db`: 语音段的固定衰减（如 -18 dB）
    async fn duck(
        &self,
        audio_ref: &str,
        track_id: &str,
        ceiling_volume: u8,
        speech_attenuation_db: f32,
    ) -> String;
}
