//! Extraction Stage - 文本提取
//!
//! SourceUnit -> ExtractedDocument。mime 识别在能力调用之前，
//! Unavailable / 超时按策略重试，空结果致命

use std::sync::Arc;

use crate::application::ports::{ExtractedDocument, ExtractionError, ExtractorPort};
use crate::domain::SourceUnit;

use super::retry::{retry_with_backoff, RetryPolicy};

/// 识别的 mime 类型（前缀匹配）
const SUPPORTED_MIME_PREFIXES: &[&str] = &[
    "application/pdf",
    "application/vnd.openxmlformats-officedocument",
    "application/epub+zip",
    "text/plain",
    "text/markdown",
    "text/html",
    "image/",
];

fn is_supported_mime(mime: &str) -> bool {
    SUPPORTED_MIME_PREFIXES.iter().any(|p| mime.starts_with(p))
}

/// 提取阶段
pub struct ExtractionStage {
    extractor: Arc<dyn ExtractorPort>,
    retry: RetryPolicy,
}

impl ExtractionStage {
    pub fn new(extractor: Arc<dyn ExtractorPort>, retry: RetryPolicy) -> Self {
        Self { extractor, retry }
    }

    /// 提取单个 SourceUnit
    ///
    /// 除调用注入的 Extractor 外无副作用；Extractor 幂等，
    /// 因此 Unavailable 时重试是安全的
    pub async fn extract(&self, unit: &SourceUnit) -> Result<ExtractedDocument, ExtractionError> {
        let mime = unit.mime_hint.as_deref().unwrap_or("");
        if !is_supported_mime(mime) {
            return Err(ExtractionError::UnsupportedFormat(mime.to_string()));
        }

        let paragraphs = retry_with_backoff(&self.retry, ExtractionError::is_retryable, || {
            let extractor = self.extractor.clone();
            let timeout = self.retry.call_timeout;
            async move {
                match tokio::time::timeout(timeout, extractor.extract(unit)).await {
                    Ok(result) => result,
                    Err(_) => Err(ExtractionError::Unavailable(format!(
                        "Extract call timed out after {:?}",
                        timeout
                    ))),
                }
            }
        })
        .await?;

        if paragraphs.is_empty() {
            return Err(ExtractionError::EmptyContent);
        }

        tracing::debug!(
            unit_id = %unit.id,
            paragraphs = paragraphs.len(),
            "Unit extracted"
        );

        Ok(ExtractedDocument {
            source_unit_id: unit.id,
            paragraphs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{SourceKind, SourcePayload, UnitId};
    use crate::infrastructure::adapters::FakeExtractor;
    use std::time::Duration;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(1),
            call_timeout: Duration::from_secs(1),
        }
    }

    fn text_unit(text: &str) -> SourceUnit {
        SourceUnit {
            id: UnitId::new(),
            kind: SourceKind::File,
            payload: SourcePayload::Bytes(text.as_bytes().to_vec()),
            mime_hint: Some("text/plain".to_string()),
            label: "test".to_string(),
        }
    }

    #[tokio::test]
    async fn test_extracts_paragraphs() {
        let stage = ExtractionStage::new(Arc::new(FakeExtractor::new()), fast_policy());
        let unit = text_unit("# Title\n\nFirst paragraph.\n\nSecond paragraph.");

        let doc = stage.extract(&unit).await.unwrap();
        assert_eq!(doc.source_unit_id, unit.id);
        assert_eq!(doc.paragraphs.len(), 3);
        assert!(doc.paragraphs[0].is_heading);
        assert!(!doc.paragraphs[1].is_heading);
    }

    #[tokio::test]
    async fn test_unrecognized_mime_fails_fast() {
        let stage = ExtractionStage::new(Arc::new(FakeExtractor::new()), fast_policy());
        let mut unit = text_unit("content");
        unit.mime_hint = Some("application/x-msdownload".to_string());

        match stage.extract(&unit).await {
            Err(ExtractionError::UnsupportedFormat(mime)) => {
                assert_eq!(mime, "application/x-msdownload")
            }
            other => panic!("expected UnsupportedFormat, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_retries_through_transient_outage() {
        let extractor = Arc::new(FakeExtractor::new().with_outages(2));
        let stage = ExtractionStage::new(extractor, fast_policy());
        let unit = text_unit("Some body text.");

        let doc = stage.extract(&unit).await.unwrap();
        assert_eq!(doc.paragraphs.len(), 1);
    }

    #[tokio::test]
    async fn test_outage_beyond_retry_budget_escalates() {
        let extractor = Arc::new(FakeExtractor::new().with_outages(10));
        let stage = ExtractionStage::new(extractor, fast_policy());
        let unit = text_unit("Some body text.");

        match stage.extract(&unit).await {
            Err(ExtractionError::Unavailable(_)) => {}
            other => panic!("expected Unavailable, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_blank_content_is_fatal() {
        let stage = ExtractionStage::new(Arc::new(FakeExtractor::new()), fast_policy());
        let unit = text_unit("   \n\n   ");

        match stage.extract(&unit).await {
            Err(ExtractionError::EmptyContent) => {}
            other => panic!("expected EmptyContent, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_extraction_is_idempotent() {
        let stage = ExtractionStage::new(Arc::new(FakeExtractor::new()), fast_policy());
        let unit = text_unit("# Chapter One\n\nSame input, same output.");

        let first = stage.extract(&unit).await.unwrap();
        let second = stage.extract(&unit).await.unwrap();
        assert_eq!(first.paragraphs, second.paragraphs);
    }
}
