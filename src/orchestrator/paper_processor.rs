//! 单篇论文处理器 - 编排层
//!
//! 流程：
//! 1. 最终产物已缓存 → 直接返回（`--force` 跳过）
//! 2. 获取当前模式必需的数据项，任何一项失败都终止这篇论文
//! 3. 读取 PDF 文本（可选）和评论
//! 4. 运行生成流水线

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::api::FallbackApi;
use crate::browser::BrowserLauncher;
use crate::cache::CacheStore;
use crate::config::{Config, RunOptions};
use crate::error::PaperError;
use crate::models::{
    AcquisitionResult, DataKind, FailureReason, GenerationMode, PaperId, Payload, PipelineStatus,
    SourceKind, Stage,
};
use crate::services::{CommentSource, PdfExtractor, TextGenerator};
use crate::utils::logging::truncate_text;
use crate::workflow::{comments, GenerationPipeline, PipelineRun, SourceResolver};

/// 外部协作者
#[derive(Clone)]
pub struct Collaborators {
    pub launcher: Arc<dyn BrowserLauncher>,
    pub fallback: Arc<dyn FallbackApi>,
    pub generator: Arc<dyn TextGenerator>,
    pub pdf: Arc<dyn PdfExtractor>,
    pub comments: Arc<dyn CommentSource>,
}

/// 单篇论文的处理结果
#[derive(Debug, Clone, PartialEq)]
pub struct PaperOutcome {
    pub paper_id: PaperId,
    pub mode: GenerationMode,
    pub text: String,
    /// 最终产物直接来自缓存，本次没有调用任何外部服务
    pub from_cache: bool,
}

pub struct PaperProcessor {
    config: Config,
    options: RunOptions,
    mode: GenerationMode,
    cache: CacheStore,
    collaborators: Collaborators,
}

impl PaperProcessor {
    pub fn new(config: Config, options: RunOptions, collaborators: Collaborators) -> Self {
        let mode = config.summary.effective_mode();
        let cache = CacheStore::new(config.paths.cache_dir.clone());
        Self {
            config,
            options,
            mode,
            cache,
            collaborators,
        }
    }

    pub fn mode(&self) -> GenerationMode {
        self.mode
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// 处理一篇论文
    pub async fn process(
        &self,
        paper_id: &PaperId,
        cli_comments: &[String],
    ) -> Result<PaperOutcome, PaperError> {
        info!("[论文 {}] 📄 开始处理 (模式: {})", paper_id, self.mode);

        if let Some(text) = self.cached_final(paper_id) {
            info!("[论文 {}] ✓ 已有生成结果，直接使用缓存", paper_id);
            return Ok(PaperOutcome {
                paper_id: paper_id.clone(),
                mode: self.mode,
                text,
                from_cache: true,
            });
        }

        let mut run = PipelineRun::new(paper_id.clone(), self.mode);
        run.advance(PipelineStatus::Fetching)
            .map_err(|e| PaperError::from_pipeline(paper_id, e))?;

        let mut resolver = SourceResolver::new(
            &self.cache,
            self.collaborators.launcher.as_ref(),
            self.collaborators.fallback.as_ref(),
            self.config.flex_mode,
            self.options,
            Duration::from_secs(self.config.acquisition.timeout_secs),
        );
        let acquired = self.acquire(&mut resolver, &mut run).await;
        resolver.release().await;
        if let Err(e) = acquired {
            run.fail();
            return Err(e);
        }

        if self.options.use_pdf && self.mode.uses_pdf() {
            let pdf_text = self.pdf_text(paper_id).await;
            if pdf_text.is_none() {
                warn!("[论文 {}] ⚠️ 没有可用的 PDF 文本，提示词中以占位符代替", paper_id);
            }
            run.inputs_mut().pdf_text = pdf_text;
        }

        let file_comment = self.collaborators.comments.read_file_comment(paper_id).await;
        run.inputs_mut().comments = comments::merge(file_comment.as_deref(), cli_comments);
        if !run.inputs().comments.is_empty() {
            debug!("[论文 {}] 评论: {}", paper_id, truncate_text(&run.inputs().comments, 40));
        }

        let pipeline = GenerationPipeline::new(
            self.collaborators.generator.as_ref(),
            &self.cache,
            &self.config.summary,
            self.options.force,
        );
        let text = pipeline
            .run(&mut run)
            .await
            .map_err(|e| PaperError::from_pipeline(paper_id, e))?;

        info!("[论文 {}] ✅ 生成完成 ({} 字符)", paper_id, text.chars().count());
        Ok(PaperOutcome {
            paper_id: paper_id.clone(),
            mode: self.mode,
            text,
            from_cache: false,
        })
    }

    fn cached_final(&self, paper_id: &PaperId) -> Option<String> {
        if self.options.force && !self.options.no_download {
            return None;
        }
        match self
            .cache
            .get(paper_id, Stage::FinalSummary(self.mode), Some(SourceKind::LanguageModel))
        {
            Ok(Some(entry)) => entry
                .payload
                .as_text()
                .filter(|t| !t.trim().is_empty())
                .map(str::to_string),
            Ok(None) => None,
            Err(e) => {
                warn!("[论文 {}] 读取最终结果缓存失败: {}", paper_id, e);
                None
            }
        }
    }

    async fn acquire(
        &self,
        resolver: &mut SourceResolver<'_>,
        run: &mut PipelineRun,
    ) -> Result<(), PaperError> {
        let paper_id = run.paper_id().clone();
        for &kind in self.mode.required_kinds() {
            match resolver.resolve(&paper_id, kind).await {
                AcquisitionResult::Success { source, payload, .. } => {
                    debug!("[论文 {}] {} 来源: {}", paper_id, kind, source);
                    let inputs = run.inputs_mut();
                    match (kind, payload) {
                        (DataKind::Metadata, Payload::Metadata(metadata)) => {
                            info!("[论文 {}] 标题: {}", paper_id, metadata.title);
                            inputs.metadata = Some(metadata);
                        }
                        (DataKind::KimiSummary, Payload::KimiSummary(summary)) => {
                            inputs.kimi_summary = Some(summary.text);
                        }
                        (kind, _) => {
                            return Err(PaperError::SourceUnavailable {
                                paper_id,
                                stage: kind.stage(),
                                source_kind: source,
                                reason: FailureReason::Unavailable("数据类型不符".to_string()),
                            });
                        }
                    }
                }
                AcquisitionResult::Failure { source, reason } => {
                    return Err(PaperError::from_acquisition(
                        &paper_id,
                        kind.stage(),
                        source,
                        reason,
                    ));
                }
            }
        }
        Ok(())
    }

    /// PDF 文本：优先缓存，`--no-download` 时只看缓存
    async fn pdf_text(&self, paper_id: &PaperId) -> Option<String> {
        if !self.options.force || self.options.no_download {
            match self
                .cache
                .get(paper_id, Stage::PdfExtract, Some(SourceKind::PdfExtractor))
            {
                Ok(Some(entry)) => {
                    if let Some(text) = entry.payload.as_text() {
                        return Some(text.to_string());
                    }
                }
                Ok(None) => {}
                Err(e) => warn!("[论文 {}] 读取 PDF 文本缓存失败: {}", paper_id, e),
            }
        }
        if self.options.no_download {
            return None;
        }

        let text = self.collaborators.pdf.extract(paper_id).await?;
        if let Err(e) = self.cache.put(
            paper_id,
            Stage::PdfExtract,
            SourceKind::PdfExtractor,
            Payload::Text(text.clone()),
        ) {
            warn!("[论文 {}] PDF 文本写入缓存失败: {}", paper_id, e);
        }
        Some(text)
    }
}
