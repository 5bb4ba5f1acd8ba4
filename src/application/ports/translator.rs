//! Translator Port - 翻译能力
//!
//! 翻译失败不致命：pipeline 回退到原语言并在 Job 上记录降级标记

use async_trait::async_trait;
use thiserror::Error;

/// 翻译错误
#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("Translator unavailable: {0}")]
    Unavailable(String),

    #[error("Unsupported target language: {0}")]
    UnsupportedLanguage(String),
}

/// Translator Port
#[async_trait]
pub trait TranslatorPort: Send + Sync {
    async fn translate(&self, text: &str, target_lang: &str)
        -> Result<String, TranslationError>;
}
