use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CacheError;
use crate::models::{PaperId, Payload, SourceKind, Stage};

/// 缓存条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub paper_id: PaperId,
    pub stage: Stage,
    pub source: SourceKind,
    pub payload: Payload,
    pub fetched_at: DateTime<Utc>,
}

/// 文件缓存
///
/// 目录结构：`<root>/<md5(论文ID)>/<阶段>.<来源>.json`。
/// 同一个键后写覆盖先写；一篇论文同一时间只由一个流程处理，不需要加锁。
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn paper_dir(&self, paper_id: &PaperId) -> PathBuf {
        let mut hasher = Md5::new();
        hasher.update(paper_id.as_str().as_bytes());
        self.root.join(format!("{:x}", hasher.finalize()))
    }

    fn entry_path(&self, paper_id: &PaperId, stage: Stage, source: SourceKind) -> PathBuf {
        self.paper_dir(paper_id)
            .join(format!("{}.{}.json", stage.slug(), source.as_str()))
    }

    /// 读取缓存
    ///
    /// 不指定来源时返回该阶段最新写入的条目。
    pub fn get(
        &self,
        paper_id: &PaperId,
        stage: Stage,
        source: Option<SourceKind>,
    ) -> Result<Option<CacheEntry>, CacheError> {
        match source {
            Some(source) => self.read_entry(&self.entry_path(paper_id, stage, source)),
            None => {
                let mut latest: Option<CacheEntry> = None;
                for source in SourceKind::PERSISTED {
                    let path = self.entry_path(paper_id, stage, source);
                    if let Some(entry) = self.read_entry(&path)? {
                        let newer = latest
                            .as_ref()
                            .map_or(true, |current| entry.fetched_at > current.fetched_at);
                        if newer {
                            latest = Some(entry);
                        }
                    }
                }
                Ok(latest)
            }
        }
    }

    /// 写入缓存，返回写入的条目
    pub fn put(
        &self,
        paper_id: &PaperId,
        stage: Stage,
        source: SourceKind,
        payload: Payload,
    ) -> Result<CacheEntry, CacheError> {
        let path = self.entry_path(paper_id, stage, source);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| CacheError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let entry = CacheEntry {
            paper_id: paper_id.clone(),
            stage,
            source,
            payload,
            fetched_at: Utc::now(),
        };

        let content = serde_json::to_string_pretty(&entry).map_err(|source| CacheError::Json {
            path: path.clone(),
            source,
        })?;

        // 先写临时文件再改名，中断时不会留下半个条目
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, content).map_err(|source| CacheError::Io {
            path: tmp_path.clone(),
            source,
        })?;
        fs::rename(&tmp_path, &path).map_err(|source| CacheError::Io {
            path: path.clone(),
            source,
        })?;

        debug!("缓存写入: {} [{} / {}]", paper_id, stage, source);
        Ok(entry)
    }

    /// 使缓存失效；不指定阶段时删除该论文的全部条目
    pub fn invalidate(&self, paper_id: &PaperId, stage: Option<Stage>) -> Result<(), CacheError> {
        match stage {
            None => {
                let dir = self.paper_dir(paper_id);
                match fs::remove_dir_all(&dir) {
                    Ok(()) => Ok(()),
                    Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                    Err(source) => Err(CacheError::Io { path: dir, source }),
                }
            }
            Some(stage) => {
                for source in SourceKind::PERSISTED {
                    let path = self.entry_path(paper_id, stage, source);
                    match fs::remove_file(&path) {
                        Ok(()) => {}
                        Err(e) if e.kind() == ErrorKind::NotFound => {}
                        Err(source) => return Err(CacheError::Io { path, source }),
                    }
                }
                Ok(())
            }
        }
    }

    fn read_entry(&self, path: &Path) -> Result<Option<CacheEntry>, CacheError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(CacheError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let entry = serde_json::from_str(&content).map_err(|source| CacheError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Some(entry))
    }
}
