//! Fake Adapters - 测试与演示用的能力实现
//!
//! 全部确定性：相同输入产生相同输出，故障注入有界

mod extractor;
mod mixer;
mod synthesizer;
mod translator;

pub use extractor::FakeExtractor;
pub use mixer::FakeMusicMixer;
pub use synthesizer::{FakeSynthesizer, WORDS_PER_MINUTE};
pub use translator::FakeTranslator;
