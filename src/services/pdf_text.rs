//! PDF 文本 - 业务能力层
//!
//! 读取预先抽取好的 PDF 纯文本（`<pdf_dir>/<id>.txt`），超长时截断。
//! 没有文本时返回 `None`，由调用方决定是否降级。

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::models::PaperId;

const TRUNCATION_MARKER: &str = "\n\n... (内容截断)";

#[async_trait]
pub trait PdfExtractor: Send + Sync {
    async fn extract(&self, paper_id: &PaperId) -> Option<String>;
}

pub struct TextDirExtractor {
    dir: PathBuf,
    max_chars: usize,
}

impl TextDirExtractor {
    pub fn new(dir: impl Into<PathBuf>, max_chars: usize) -> Self {
        Self {
            dir: dir.into(),
            max_chars,
        }
    }

    fn text_path(&self, paper_id: &PaperId) -> PathBuf {
        self.dir.join(format!("{}.txt", paper_id.file_stem()))
    }
}

#[async_trait]
impl PdfExtractor for TextDirExtractor {
    async fn extract(&self, paper_id: &PaperId) -> Option<String> {
        let path = self.text_path(paper_id);
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("没有 PDF 文本: {}", path.display());
                return None;
            }
            Err(e) => {
                warn!("读取 PDF 文本失败 ({}): {}", path.display(), e);
                return None;
            }
        };

        if text.trim().is_empty() {
            return None;
        }
        Some(truncate_chars(&text, self.max_chars))
    }
}

/// 按字符数截断，超出部分用截断标记代替
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if max_chars == 0 {
        return text.to_string();
    }
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}{}", &text[..byte_idx], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}
