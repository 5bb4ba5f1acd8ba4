//! Application Ports - 出站端口定义
//!
//! 定义 pipeline 编排的四个外部能力的抽象接口，
//! 具体实现由协作方提供（测试用 fake 在 infrastructure/adapters）

mod extractor;
mod music_mixer;
mod synthesizer;
mod translator;

pub use extractor::{ExtractedDocument, ExtractionError, ExtractorPort, Paragraph};
pub use music_mixer::MusicMixerPort;
pub use synthesizer::{NarrateRequest, Narration, SynthesisError, SynthesizerPort};
pub use translator::{TranslationError, TranslatorPort};
