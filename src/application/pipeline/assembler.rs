//! Book Assembler - 最终产物装配
//!
//! 按提交顺序拼接各 unit 的段序列，重排全书段落索引与累计偏移，
//! 由标题段落推导章节（无标题时回退为单章）

use chrono::Utc;

use crate::application::ports::ExtractedDocument;
use crate::domain::{AudioSegment, Book, BookCategory, BookId, Chapter, SourceKind};

/// 无作者元数据时的默认署名
const DEFAULT_AUTHOR: &str = "VozBook AI";

/// 一个 unit 的处理结果，装配输入
#[derive(Debug, Clone)]
pub struct UnitOutput {
    pub document: ExtractedDocument,
    /// 文档内偏移的段序列（来自 SynthesisStage）
    pub segments: Vec<AudioSegment>,
    pub label: String,
    pub kind: SourceKind,
}

/// 装配 Book
///
/// `outputs` 必须按 SourceUnit 提交顺序排列——并行完成的乱序
/// 结果在调用前已由 pipeline 重排
pub fn assemble_book(outputs: Vec<UnitOutput>) -> Book {
    let id = BookId::new();

    let mut segments: Vec<AudioSegment> = Vec::new();
    let mut chapters: Vec<Chapter> = Vec::new();
    let mut text_lines: Vec<String> = Vec::new();
    let mut paragraph_base = 0usize;
    let mut offset = 0.0f64;
    let mut first_heading: Option<String> = None;

    for output in &outputs {
        for segment in &output.segments {
            let paragraph = &output.document.paragraphs[segment.paragraph_index];
            let global_index = paragraph_base + segment.paragraph_index;

            if paragraph.is_heading {
                if first_heading.is_none() {
                    first_heading = Some(paragraph.text.clone());
                }
                chapters.push(Chapter {
                    title: paragraph.text.clone(),
                    start_seconds: offset,
                });
            }

            text_lines.push(paragraph.text.clone());
            segments.push(AudioSegment {
                paragraph_index: global_index,
                start_offset_seconds: offset,
                duration_seconds: segment.duration_seconds,
                audio_ref: segment.audio_ref.clone(),
            });
            offset += segment.duration_seconds;
        }
        paragraph_base += output.document.paragraphs.len();
    }

    let title = first_heading
        .or_else(|| outputs.first().map(|o| o.label.clone()))
        .unwrap_or_else(|| "Untitled".to_string());

    // 无标题段落时回退为覆盖全书的单章
    if chapters.is_empty() {
        chapters.push(Chapter {
            title: title.clone(),
            start_seconds: 0.0,
        });
    }

    let category = derive_category(&outputs);
    let total_seconds = offset;

    let book = Book {
        id,
        title,
        author: DEFAULT_AUTHOR.to_string(),
        cover_url: format!("https://picsum.photos/seed/{}/400/400", id),
        total_seconds,
        category,
        chapters,
        segments,
        text_content: text_lines.join("\n"),
        date_added: Utc::now(),
        progress: 0.0,
        is_favorite: false,
    };

    debug_assert!(book.duration_invariant_holds());
    debug_assert!(book.ordering_invariant_holds());
    book
}

/// 分类推导：纯文档输入归为 Document，其余归为 Audiobook
fn derive_category(outputs: &[UnitOutput]) -> BookCategory {
    if !outputs.is_empty() && outputs.iter().all(|o| o.kind == SourceKind::File) {
        BookCategory::Document
    } else {
        BookCategory::Audiobook
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::Paragraph;
    use crate::domain::UnitId;

    fn output(kind: SourceKind, label: &str, paragraphs: Vec<Paragraph>) -> UnitOutput {
        let mut segments = Vec::new();
        let mut offset = 0.0;
        for (index, _) in paragraphs.iter().enumerate() {
            let duration = 2.0;
            segments.push(AudioSegment {
                paragraph_index: index,
                start_offset_seconds: offset,
                duration_seconds: duration,
                audio_ref: format!("{}-{}", label, index),
            });
            offset += duration;
        }
        UnitOutput {
            document: ExtractedDocument {
                source_unit_id: UnitId::new(),
                paragraphs,
            },
            segments,
            label: label.to_string(),
            kind,
        }
    }

    #[test]
    fn test_chapters_derived_from_headings() {
        let book = assemble_book(vec![output(
            SourceKind::File,
            "novel",
            vec![
                Paragraph::heading("Chapter One"),
                Paragraph::body("First body."),
                Paragraph::heading("Chapter Two"),
                Paragraph::body("Second body."),
            ],
        )]);

        assert_eq!(book.chapters.len(), 2);
        assert_eq!(book.chapters[0].title, "Chapter One");
        assert_eq!(book.chapters[0].start_seconds, 0.0);
        assert_eq!(book.chapters[1].title, "Chapter Two");
        assert_eq!(book.chapters[1].start_seconds, 4.0);
        assert_eq!(book.title, "Chapter One");
    }

    #[test]
    fn test_fallback_single_chapter_without_headings() {
        let book = assemble_book(vec![output(
            SourceKind::File,
            "plain",
            vec![Paragraph::body("Only body text.")],
        )]);

        assert_eq!(book.chapters.len(), 1);
        assert_eq!(book.chapters[0].title, "plain");
        assert_eq!(book.chapters[0].start_seconds, 0.0);
        assert_eq!(book.title, "plain");
    }

    #[test]
    fn test_units_concatenated_in_submission_order() {
        let book = assemble_book(vec![
            output(
                SourceKind::File,
                "first",
                vec![Paragraph::body("a"), Paragraph::body("b")],
            ),
            output(SourceKind::File, "second", vec![Paragraph::body("c")]),
        ]);

        assert_eq!(book.segments.len(), 3);
        let indices: Vec<usize> = book.segments.iter().map(|s| s.paragraph_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);

        let refs: Vec<&str> = book.segments.iter().map(|s| s.audio_ref.as_str()).collect();
        assert_eq!(refs, vec!["first-0", "first-1", "second-0"]);

        // 偏移跨 unit 累计
        assert_eq!(book.segments[2].start_offset_seconds, 4.0);
        assert_eq!(book.total_seconds, 6.0);
        assert!(book.ordering_invariant_holds());
        assert!(book.duration_invariant_holds());
    }

    #[test]
    fn test_text_content_joins_paragraphs() {
        let book = assemble_book(vec![output(
            SourceKind::Url,
            "https://example.com",
            vec![Paragraph::body("line one"), Paragraph::body("line two")],
        )]);

        assert_eq!(book.text_content, "line one\nline two");
    }

    #[test]
    fn test_category_document_for_pure_file_input() {
        let files_only = assemble_book(vec![output(
            SourceKind::File,
            "doc",
            vec![Paragraph::body("x")],
        )]);
        assert_eq!(files_only.category, BookCategory::Document);

        let mixed = assemble_book(vec![
            output(SourceKind::File, "doc", vec![Paragraph::body("x")]),
            output(SourceKind::Url, "url", vec![Paragraph::body("y")]),
        ]);
        assert_eq!(mixed.category, BookCategory::Audiobook);
    }
}
