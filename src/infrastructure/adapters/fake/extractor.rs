//! Fake Extractor - 用于测试的提取器
//!
//! 把字节载荷当作 UTF-8 文本解析：空行分段，`#` 前缀视为标题。
//! URL 载荷返回由 URL 决定的固定文章。完全确定性，满足幂等契约

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use crate::application::ports::{ExtractionError, ExtractorPort, Paragraph};
use crate::domain::{SourcePayload, SourceUnit};

/// Fake Extractor
pub struct FakeExtractor {
    /// 剩余的故障注入次数（每次调用消耗一次，返回 Unavailable）
    outages: AtomicU32,
    /// 模拟提取延迟
    latency: Duration,
}

impl FakeExtractor {
    pub fn new() -> Self {
        Self {
            outages: AtomicU32::new(0),
            latency: Duration::ZERO,
        }
    }

    /// 前 n 次调用返回 Unavailable
    pub fn with_outages(self, n: u32) -> Self {
        self.outages.store(n, Ordering::SeqCst);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn parse_text(text: &str) -> Vec<Paragraph> {
        text.split("\n\n")
            .map(str::trim)
            .filter(|block| !block.is_empty())
            .map(|block| {
                let line = block
                    .lines()
                    .map(str::trim)
                    .collect::<Vec<_>>()
                    .join(" ");
                if let Some(heading) = line.strip_prefix('#') {
                    Paragraph::heading(heading.trim_start_matches('#').trim())
                } else {
                    Paragraph::body(line)
                }
            })
            .collect()
    }
}

impl Default for FakeExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExtractorPort for FakeExtractor {
    async fn extract(&self, unit: &SourceUnit) -> Result<Vec<Paragraph>, ExtractionError> {
        if self.latency > Duration::ZERO {
            tokio::time::sleep(self.latency).await;
        }

        let remaining = self.outages.load(Ordering::SeqCst);
        if remaining > 0 {
            self.outages.store(remaining - 1, Ordering::SeqCst);
            return Err(ExtractionError::Unavailable(
                "Injected extractor outage".to_string(),
            ));
        }

        let paragraphs = match &unit.payload {
            SourcePayload::Bytes(bytes) => Self::parse_text(&String::from_utf8_lossy(bytes)),
            SourcePayload::Url(url) => vec![
                Paragraph::heading(format!("Article: {}", url)),
                Paragraph::body(format!("Lead paragraph fetched from {}.", url)),
                Paragraph::body("Closing paragraph of the fetched article."),
            ],
        };

        tracing::debug!(
            unit_id = %unit.id,
            paragraphs = paragraphs.len(),
            "FakeExtractor: extracted"
        );
        Ok(paragraphs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_line_splits_paragraphs() {
        let paragraphs = FakeExtractor::parse_text("# Title\n\nBody one.\n\nBody two.");
        assert_eq!(paragraphs.len(), 3);
        assert!(paragraphs[0].is_heading);
        assert_eq!(paragraphs[0].text, "Title");
        assert_eq!(paragraphs[1].text, "Body one.");
    }

    #[test]
    fn test_multiline_block_joined() {
        let paragraphs = FakeExtractor::parse_text("line one\nline two\n\nnext");
        assert_eq!(paragraphs.len(), 2);
        assert_eq!(paragraphs[0].text, "line one line two");
    }

    #[test]
    fn test_whitespace_only_input_is_empty() {
        assert!(FakeExtractor::parse_text("  \n\n \n").is_empty());
    }
}
