//! Fake Translator - 用于测试的翻译器
//!
//! 正常模式在文本前加目标语言标记；broken 模式始终不可达，
//! 用于验证翻译降级路径

use async_trait::async_trait;

use crate::application::ports::{TranslationError, TranslatorPort};

/// Fake Translator
pub struct FakeTranslator {
    broken: bool,
}

impl FakeTranslator {
    pub fn new() -> Self {
        Self { broken: false }
    }

    /// 始终返回 Unavailable
    pub fn broken() -> Self {
        Self { broken: true }
    }
}

impl Default for FakeTranslator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TranslatorPort for FakeTranslator {
    async fn translate(
        &self,
        text: &str,
        target_lang: &str,
    ) -> Result<String, TranslationError> {
        if self.broken {
            return Err(TranslationError::Unavailable(
                "Injected translator outage".to_string(),
            ));
        }
        Ok(format!("[{}] {}", target_lang, text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_translation_tags_language() {
        let translator = FakeTranslator::new();
        let out = translator.translate("olá", "en").await.unwrap();
        assert_eq!(out, "[en] olá");
    }

    #[tokio::test]
    async fn test_broken_translator_always_fails() {
        let translator = FakeTranslator::broken();
        assert!(translator.translate("olá", "en").await.is_err());
    }
}
