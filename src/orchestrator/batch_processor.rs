//! 批量处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责组装外部适配器并顺序处理论文列表。
//!
//! 1. **应用初始化**：创建浏览器启动器、回退 API、LLM 客户端等
//! 2. **顺序处理**：一次只处理一篇论文，缓存是论文之间唯一共享的状态
//! 3. **失败隔离**：单篇失败只记录，不中断批量
//! 4. **全局统计**：汇总所有论文的处理结果

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::api::HttpFallbackApi;
use crate::browser::ChromeLauncher;
use crate::config::{Config, RunOptions};
use crate::error::PaperError;
use crate::models::PaperId;
use crate::orchestrator::paper_processor::{Collaborators, PaperOutcome, PaperProcessor};
use crate::services::{FileCommentSource, OpenAiGenerator, TextDirExtractor};
use crate::utils::logging;

/// 应用主结构
pub struct App {
    processor: PaperProcessor,
    run_log_file: PathBuf,
    flex_mode: bool,
}

/// 处理统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProcessingStats {
    pub total: usize,
    pub success: usize,
    /// 成功中直接使用缓存结果的数量
    pub cached: usize,
    pub failed: usize,
    pub failed_ids: Vec<PaperId>,
}

impl App {
    /// 用真实的外部适配器初始化应用
    pub fn initialize(config: Config, options: RunOptions) -> Result<Self> {
        if config.llm.api_key.is_empty() {
            warn!("⚠️ 未配置 LLM API 密钥，只能使用已缓存的生成结果");
        }

        let timeout = Duration::from_secs(config.acquisition.timeout_secs);
        let fallback = HttpFallbackApi::new(config.arxiv.clone(), config.papers_cool.clone(), timeout)
            .context("无法创建 HTTP 客户端")?;

        let collaborators = Collaborators {
            launcher: Arc::new(ChromeLauncher::new(
                config.browser.clone(),
                config.arxiv.clone(),
                config.papers_cool.clone(),
                timeout,
            )),
            fallback: Arc::new(fallback),
            generator: Arc::new(OpenAiGenerator::new(&config.llm)),
            pdf: Arc::new(TextDirExtractor::new(
                config.paths.pdf_dir.clone(),
                config.pdf.max_chars,
            )),
            comments: Arc::new(FileCommentSource::new(config.paths.comments_dir.clone())),
        };

        Ok(Self::with_collaborators(config, options, collaborators))
    }

    /// 使用给定的协作者创建应用
    pub fn with_collaborators(
        config: Config,
        options: RunOptions,
        collaborators: Collaborators,
    ) -> Self {
        let run_log_file = config.paths.run_log_file.clone();
        let flex_mode = config.flex_mode.enabled;
        Self {
            processor: PaperProcessor::new(config, options, collaborators),
            run_log_file,
            flex_mode,
        }
    }

    pub fn processor(&self) -> &PaperProcessor {
        &self.processor
    }

    /// 处理单篇论文
    pub async fn generate_one(
        &self,
        paper_id: &PaperId,
        cli_comments: &[String],
    ) -> Result<PaperOutcome, PaperError> {
        self.processor.process(paper_id, cli_comments).await
    }

    /// 顺序处理一批论文，结果写入 `<output_dir>/<id>_summary.md`
    pub async fn run_batch(&self, paper_ids: &[PaperId], output_dir: &Path) -> Result<ProcessingStats> {
        logging::init_run_log(&self.run_log_file)?;
        logging::log_startup(self.processor.mode().as_str(), self.flex_mode);

        let mut stats = ProcessingStats {
            total: paper_ids.len(),
            ..Default::default()
        };
        if paper_ids.is_empty() {
            warn!("⚠️ 没有找到待处理的论文，程序结束");
            return Ok(stats);
        }
        logging::log_papers_loaded(paper_ids.len());

        fs::create_dir_all(output_dir)
            .with_context(|| format!("无法创建输出目录: {}", output_dir.display()))?;

        for (idx, paper_id) in paper_ids.iter().enumerate() {
            logging::log_paper_start(idx + 1, paper_ids.len(), paper_id.as_str());

            let line = match self.process_and_save(paper_id, output_dir).await {
                Ok((outcome, path)) => {
                    stats.success += 1;
                    if outcome.from_cache {
                        stats.cached += 1;
                    }
                    info!("[论文 {}] 💾 已保存: {}", paper_id, path.display());
                    format!(
                        "✅ {} ({}{})",
                        paper_id,
                        outcome.mode,
                        if outcome.from_cache { ", 缓存" } else { "" }
                    )
                }
                Err(e) => {
                    stats.failed += 1;
                    stats.failed_ids.push(paper_id.clone());
                    error!("[论文 {}] ❌ 处理失败: {:#}", paper_id, e);
                    if let Some(paper_error) = e.downcast_ref::<PaperError>() {
                        info!("[论文 {}] 💡 {}", paper_id, paper_error.hint());
                    }
                    format!("❌ {}: {:#}", paper_id, e)
                }
            };

            if let Err(e) = logging::append_run_log(&self.run_log_file, &line) {
                warn!("写入运行日志失败: {:#}", e);
            }
        }

        logging::print_final_stats(
            stats.success,
            stats.cached,
            stats.failed,
            stats.total,
            &self.run_log_file,
        );
        Ok(stats)
    }

    async fn process_and_save(
        &self,
        paper_id: &PaperId,
        output_dir: &Path,
    ) -> Result<(PaperOutcome, PathBuf)> {
        let outcome = self.processor.process(paper_id, &[]).await?;
        let path = save_summary(output_dir, paper_id, &outcome.text)?;
        Ok((outcome, path))
    }
}

/// 读取论文列表文件：每行一个 ID，跳过空行和 `#` 开头的注释
pub fn load_paper_ids(path: &Path) -> Result<Vec<PaperId>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("无法读取论文列表: {}", path.display()))?;

    let mut ids = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match PaperId::parse(line) {
            Ok(id) => ids.push(id),
            Err(e) => warn!("⚠️ 第 {} 行: {}，已跳过", line_no + 1, e),
        }
    }
    Ok(ids)
}

/// 保存生成结果到 `<output_dir>/<id>_summary.md`
pub fn save_summary(output_dir: &Path, paper_id: &PaperId, text: &str) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("无法创建输出目录: {}", output_dir.display()))?;
    let path = output_dir.join(format!("{}_summary.md", paper_id.file_stem()));
    fs::write(&path, text).with_context(|| format!("无法写入结果: {}", path.display()))?;
    Ok(path)
}
