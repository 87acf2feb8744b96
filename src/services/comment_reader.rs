//! 评论文件读取
//!
//! 评论文件位于 `<comments_dir>/<id>.md`，不存在时视为没有评论。

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::models::PaperId;

#[async_trait]
pub trait CommentSource: Send + Sync {
    async fn read_file_comment(&self, paper_id: &PaperId) -> Option<String>;
}

pub struct FileCommentSource {
    dir: PathBuf,
}

impl FileCommentSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl CommentSource for FileCommentSource {
    async fn read_file_comment(&self, paper_id: &PaperId) -> Option<String> {
        let path = self.dir.join(format!("{}.md", paper_id.file_stem()));
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                debug!("读取评论文件: {}", path.display());
                Some(content)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!("读取评论文件失败 ({}): {}", path.display(), e);
                None
            }
        }
    }
}
