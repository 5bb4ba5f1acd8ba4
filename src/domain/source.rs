//! Source Context - 输入归一化
//!
//! 将异构输入（文件批量 / 拍照 / 链接）归一化为统一的 SourceUnit 序列。
//! normalize 是全函数：不可读或空的输入只产生诊断信息，不会失败。

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// SourceUnit 唯一标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitId(Uuid);

impl UnitId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for UnitId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 输入类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// 文档文件 (PDF / DOCX / TXT / EPUB)
    File,
    /// 拍照 / 图片 (OCR)
    Image,
    /// 网页文章链接
    Url,
}

/// 输入载荷
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourcePayload {
    /// 原始字节（文件 / 图片）
    Bytes(Vec<u8>),
    /// 文章 URL
    Url(String),
}

/// 归一化后的单个输入项
///
/// 提交前归调用方所有，进入 pipeline 后归活跃 Job 所有
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceUnit {
    pub id: UnitId,
    pub kind: SourceKind,
    pub payload: SourcePayload,
    pub mime_hint: Option<String>,
    /// 展示用标签（文件名主干或 URL），用于默认书名
    pub label: String,
}

/// 原始文件输入（文件名 + 字节 + 可选 mime）
#[derive(Debug, Clone)]
pub struct RawFile {
    pub name: String,
    pub bytes: Vec<u8>,
    pub mime_hint: Option<String>,
}

/// 异构原始输入
///
/// 原产品的三个上传入口（文件 / 拍照 OCR / 链接）收敛为一个
/// 按变体分发的归一化能力
#[derive(Debug, Clone)]
pub enum RawInput {
    Files(Vec<RawFile>),
    Photos(Vec<RawFile>),
    Link(String),
}

/// 输入诊断信息（被跳过的输入及原因）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub input: String,
    pub reason: String,
}

/// 归一化结果
#[derive(Debug, Clone, Default)]
pub struct NormalizeOutcome {
    pub units: Vec<SourceUnit>,
    pub diagnostics: Vec<Diagnostic>,
}

impl NormalizeOutcome {
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

/// 扩展名 -> mime 推断表
fn mime_from_extension(name: &str) -> Option<&'static str> {
    let ext = name.rsplit('.').next()?.to_ascii_lowercase();
    match ext.as_str() {
        "pdf" => Some("application/pdf"),
        "docx" => {
            Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document")
        }
        "txt" => Some("text/plain"),
        "md" => Some("text/markdown"),
        "epub" => Some("application/epub+zip"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// 文件名主干（去掉扩展名），用于默认书名
fn file_stem(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => name.to_string(),
    }
}

/// 输入归一化器
pub struct ContentSource;

impl ContentSource {
    /// 归一化异构输入
    ///
    /// 全函数：永不失败。空字节、空 URL、无法识别的格式只产生
    /// Diagnostic，对应输入被跳过
    pub fn normalize(input: RawInput) -> NormalizeOutcome {
        let mut outcome = NormalizeOutcome::default();

        match input {
            RawInput::Files(files) => {
                for file in files {
                    Self::normalize_file(file, SourceKind::File, &mut outcome);
                }
            }
            RawInput::Photos(photos) => {
                for photo in photos {
                    Self::normalize_file(photo, SourceKind::Image, &mut outcome);
                }
            }
            RawInput::Link(url) => {
                let trimmed = url.trim();
                if trimmed.is_empty() {
                    outcome.diagnostics.push(Diagnostic {
                        input: url,
                        reason: "URL is empty".to_string(),
                    });
                } else if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
                    outcome.diagnostics.push(Diagnostic {
                        input: url.clone(),
                        reason: format!("Not an http(s) URL: {}", trimmed),
                    });
                } else {
                    outcome.units.push(SourceUnit {
                        id: UnitId::new(),
                        kind: SourceKind::Url,
                        payload: SourcePayload::Url(trimmed.to_string()),
                        mime_hint: Some("text/html".to_string()),
                        label: trimmed.to_string(),
                    });
                }
            }
        }

        tracing::debug!(
            units = outcome.units.len(),
            skipped = outcome.diagnostics.len(),
            "Input normalized"
        );
        outcome
    }

    fn normalize_file(file: RawFile, kind: SourceKind, outcome: &mut NormalizeOutcome) {
        if file.bytes.is_empty() {
            outcome.diagnostics.push(Diagnostic {
                input: file.name,
                reason: "File is empty".to_string(),
            });
            return;
        }

        // 显式 mime 优先，其次按扩展名推断
        let mime = file
            .mime_hint
            .clone()
            .or_else(|| mime_from_extension(&file.name).map(str::to_string));

        let Some(mime) = mime else {
            outcome.diagnostics.push(Diagnostic {
                input: file.name,
                reason: "Unrecognized file type".to_string(),
            });
            return;
        };

        outcome.units.push(SourceUnit {
            id: UnitId::new(),
            kind,
            payload: SourcePayload::Bytes(file.bytes),
            mime_hint: Some(mime),
            label: file_stem(&file.name),
        });
    }
}
