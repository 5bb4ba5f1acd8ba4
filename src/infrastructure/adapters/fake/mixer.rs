//! Fake Music Mixer - 用于测试的混音器
//!
//! 把闪避参数编码进返回的音频引用，便于断言混音规则被应用

use async_trait::async_trait;

use crate::application::ports::MusicMixerPort;

/// Fake Music Mixer
pub struct FakeMusicMixer;

impl FakeMusicMixer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FakeMusicMixer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MusicMixerPort for FakeMusicMixer {
    async fn duck(
        &self,
        audio_ref: &str,
        track_id: &str,
        ceiling_volume: u8,
        speech_attenuation_db: f32,
    ) -> String {
        format!(
            "{}+duck({},{},{}dB)",
            audio_ref, track_id, ceiling_volume, speech_attenuation_db
        )
    }
}
