//! Voice Context - 旁白参数
//!
//! VoiceConfig 是值类型：提交时拷贝进 Job，之后调用方的修改
//! 不影响在途 Job

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use thiserror::Error;

/// 语速取值范围
pub const SPEED_RANGE: RangeInclusive<f32> = 0.5..=3.0;

/// 音调取值范围
pub const PITCH_RANGE: RangeInclusive<f32> = 0.5..=1.5;

/// 强调 / 音量取值上限（0-100）
pub const LEVEL_MAX: u8 = 100;

/// VoiceConfig 校验错误
#[derive(Debug, Error, PartialEq)]
pub enum VoiceConfigError {
    #[error("Voice id cannot be empty")]
    EmptyVoiceId,

    #[error("Speed {0} out of range [0.5, 3.0]")]
    SpeedOutOfRange(f32),

    #[error("Pitch {0} out of range [0.5, 1.5]")]
    PitchOutOfRange(f32),

    #[error("Emphasis {0} out of range [0, 100]")]
    EmphasisOutOfRange(u8),

    #[error("Music volume {0} out of range [0, 100]")]
    MusicVolumeOutOfRange(u8),
}

/// 旁白参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceConfig {
    /// 音色标识
    pub voice_id: String,

    /// 语速倍率，作用于时长缩放（duration = raw / speed）
    pub speed: f32,

    /// 音调，透传给 Synthesizer
    pub pitch: f32,

    /// 强调力度 0-100，透传给 Synthesizer
    pub emphasis: u8,

    /// 背景音乐轨道，None 表示无
    #[serde(default)]
    pub background_music: Option<String>,

    /// 背景音乐音量上限 0-100（静音段的 ceiling gain）
    pub music_volume: u8,

    /// 目标翻译语言，None 表示不翻译
    #[serde(default)]
    pub translation_language: Option<String>,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            voice_id: "male-deep".to_string(),
            speed: 1.0,
            pitch: 1.0,
            emphasis: 50,
            background_music: None,
            music_volume: 20,
            translation_language: None,
        }
    }
}

impl VoiceConfig {
    /// 校验参数范围
    pub fn validate(&self) -> Result<(), VoiceConfigError> {
        if self.voice_id.trim().is_empty() {
            return Err(VoiceConfigError::EmptyVoiceId);
        }
        if !SPEED_RANGE.contains(&self.speed) {
            return Err(VoiceConfigError::SpeedOutOfRange(self.speed));
        }
        if !PITCH_RANGE.contains(&self.pitch) {
            return Err(VoiceConfigError::PitchOutOfRange(self.pitch));
        }
        if self.emphasis > LEVEL_MAX {
            return Err(VoiceConfigError::EmphasisOutOfRange(self.emphasis));
        }
        if self.music_volume > LEVEL_MAX {
            return Err(VoiceConfigError::MusicVolumeOutOfRange(self.music_volume));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(VoiceConfig::default().validate().is_ok());
    }

    #[test]
    fn test_speed_out_of_range_rejected() {
        let cfg = VoiceConfig {
            speed: 3.5,
            ..Default::default()
        };
        assert_eq!(cfg.validate(), Err(VoiceConfigError::SpeedOutOfRange(3.5)));
    }

    #[test]
    fn test_pitch_out_of_range_rejected() {
        let cfg = VoiceConfig {
            pitch: 0.1,
            ..Default::default()
        };
        assert_eq!(cfg.validate(), Err(VoiceConfigError::PitchOutOfRange(0.1)));
    }

    #[test]
    fn test_empty_voice_id_rejected() {
        let cfg = VoiceConfig {
            voice_id: "  ".to_string(),
            ..Default::default()
        };
        assert_eq!(cfg.validate(), Err(VoiceConfigError::EmptyVoiceId));
    }

    #[test]
    fn test_boundary_values_accepted() {
        let cfg = VoiceConfig {
            speed: 3.0,
            pitch: 0.5,
            emphasis: 100,
            music_volume: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_ok());
    }
}
