//! 错误类型
//!
//! 各层使用各自的错误枚举，只有编排层决定一篇论文是否失败。
//! 命令行和批量处理的边界使用 `anyhow`。

use std::path::PathBuf;

use crate::models::{FailureReason, PaperId, Phase, PipelineStatus, SourceKind, Stage};

/// 非法的论文标识
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("无效的论文ID: '{raw}'")]
pub struct InvalidPaperId {
    pub raw: String,
}

/// 数据来源适配器（浏览器抓取 / 回退 API）返回的错误
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// 请求超时
    #[error("请求超时")]
    Timeout,
    /// 浏览器操作失败
    #[error("浏览器错误: {0}")]
    Browser(String),
    /// 网络请求失败
    #[error("HTTP 请求失败 ({endpoint}): {message}")]
    Http { endpoint: String, message: String },
    /// 论文不存在
    #[error("未找到论文: {0}")]
    NotFound(String),
    /// 页面或响应解析失败
    #[error("解析失败: {0}")]
    Parse(String),
    /// 返回内容为空
    #[error("返回内容为空: {0}")]
    Empty(String),
}

impl From<chromiumoxide::error::CdpError> for FetchError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        match err {
            chromiumoxide::error::CdpError::Timeout => FetchError::Timeout,
            other => FetchError::Browser(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return FetchError::Timeout;
        }
        FetchError::Http {
            endpoint: err.url().map(|u| u.to_string()).unwrap_or_default(),
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Parse(format!("JSON: {}", err))
    }
}

impl From<quick_xml::DeError> for FetchError {
    fn from(err: quick_xml::DeError) -> Self {
        FetchError::Parse(format!("XML: {}", err))
    }
}

impl From<FetchError> for FailureReason {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Timeout => FailureReason::Timeout,
            other => FailureReason::Unavailable(other.to_string()),
        }
    }
}

/// 语言模型调用错误
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// API 调用失败
    #[error("LLM API调用失败 (模型: {model}): {message}")]
    ApiCallFailed { model: String, message: String },
    /// 返回内容为空
    #[error("LLM返回内容为空 (模型: {model})")]
    EmptyContent { model: String },
    /// 构建请求失败
    #[error("构建 LLM 请求失败: {0}")]
    InvalidRequest(String),
}

impl From<async_openai::error::OpenAIError> for LlmError {
    fn from(err: async_openai::error::OpenAIError) -> Self {
        LlmError::InvalidRequest(err.to_string())
    }
}

/// 缓存读写错误
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("缓存文件读写失败 ({path}): {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("缓存内容解析失败 ({path}): {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// 生成流水线错误，总是带有出错的阶段
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("{phase} 阶段生成失败: {source}")]
    Generation { phase: Phase, source: LlmError },
    #[error("{phase} 阶段返回了空内容")]
    EmptyOutput { phase: Phase },
    #[error("{phase} 阶段出现非法状态转换: {from} -> {to}")]
    InvalidTransition {
        phase: Phase,
        from: PipelineStatus,
        to: PipelineStatus,
    },
    #[error("{phase} 阶段写入缓存失败 ({stage}): {source}")]
    Storage {
        phase: Phase,
        stage: Stage,
        source: CacheError,
    },
}

impl PipelineError {
    pub fn phase(&self) -> Phase {
        match self {
            PipelineError::Generation { phase, .. }
            | PipelineError::EmptyOutput { phase }
            | PipelineError::InvalidTransition { phase, .. }
            | PipelineError::Storage { phase, .. } => *phase,
        }
    }
}

/// 单篇论文处理失败，对这篇论文而言总是终止性的
#[derive(Debug, thiserror::Error)]
pub enum PaperError {
    /// 主来源失败，且回退被禁止或同样失败
    #[error("[{paper_id}] 数据源不可用 (阶段: {stage}, 来源: {source_kind}): {reason}")]
    SourceUnavailable {
        paper_id: PaperId,
        stage: Stage,
        source_kind: SourceKind,
        reason: FailureReason,
    },
    /// --no-download 模式下缓存中没有数据
    #[error("[{paper_id}] 缓存未命中 (阶段: {stage})，--no-download 模式下不会访问网络")]
    CacheMiss { paper_id: PaperId, stage: Stage },
    /// 语言模型调用失败或返回不可用的内容
    #[error("[{paper_id}] 生成失败 (阶段: {phase}): {cause}")]
    GenerationFailure {
        paper_id: PaperId,
        phase: Phase,
        cause: String,
    },
    /// 灵活模式关闭时出现了对外部 API 的依赖，不应发生
    #[error("[{paper_id}] 策略违规 (阶段: {stage}, 来源: {source_kind}): 灵活模式未开启")]
    PolicyViolation {
        paper_id: PaperId,
        stage: Stage,
        source_kind: SourceKind,
    },
    /// 产物无法写入缓存
    #[error("[{paper_id}] 缓存写入失败 (阶段: {stage}): {source}")]
    Storage {
        paper_id: PaperId,
        stage: Stage,
        source: CacheError,
    },
}

impl PaperError {
    /// 把一次失败的获取结果转换为论文级错误
    pub fn from_acquisition(
        paper_id: &PaperId,
        stage: Stage,
        source_kind: SourceKind,
        reason: FailureReason,
    ) -> Self {
        match reason {
            FailureReason::CacheMiss => PaperError::CacheMiss {
                paper_id: paper_id.clone(),
                stage,
            },
            FailureReason::PolicyViolation => PaperError::PolicyViolation {
                paper_id: paper_id.clone(),
                stage,
                source_kind,
            },
            reason => PaperError::SourceUnavailable {
                paper_id: paper_id.clone(),
                stage,
                source_kind,
                reason,
            },
        }
    }

    pub fn from_pipeline(paper_id: &PaperId, err: PipelineError) -> Self {
        match err {
            PipelineError::Storage { stage, source, .. } => PaperError::Storage {
                paper_id: paper_id.clone(),
                stage,
                source,
            },
            other => PaperError::GenerationFailure {
                paper_id: paper_id.clone(),
                phase: other.phase(),
                cause: other.to_string(),
            },
        }
    }

    pub fn paper_id(&self) -> &PaperId {
        match self {
            PaperError::SourceUnavailable { paper_id, .. }
            | PaperError::CacheMiss { paper_id, .. }
            | PaperError::GenerationFailure { paper_id, .. }
            | PaperError::PolicyViolation { paper_id, .. }
            | PaperError::Storage { paper_id, .. } => paper_id,
        }
    }

    /// 给用户的处理建议
    pub fn hint(&self) -> &'static str {
        match self {
            PaperError::SourceUnavailable {
                source_kind: SourceKind::BrowserScraper,
                stage: Stage::Metadata,
                ..
            } => {
                "浏览器抓取失败，可稍后使用 --force 重试，或开启 flex_mode.enabled 和 flex_mode.arxiv_api 允许回退到 arXiv API"
            }
            PaperError::SourceUnavailable {
                source_kind: SourceKind::BrowserScraper,
                stage: Stage::KimiSummary,
                ..
            } => {
                "浏览器抓取失败，可稍后使用 --force 重试，或开启 flex_mode.enabled 和 flex_mode.papers_cool_api 允许回退到 papers.cool API"
            }
            PaperError::SourceUnavailable {
                source_kind: SourceKind::BrowserScraper,
                ..
            } => "浏览器抓取失败，可稍后使用 --force 重试",
            PaperError::SourceUnavailable { .. } => {
                "主来源和回退 API 均失败，网络可能不稳定，请稍后使用 --force 重试"
            }
            PaperError::CacheMiss { .. } => "缓存中没有该论文的数据，去掉 --no-download 后重试",
            PaperError::GenerationFailure { .. } => {
                "语言模型调用失败，已获取的数据已缓存，可直接重试（无需 --force）"
            }
            PaperError::PolicyViolation { .. } => "内部策略检查失败，请检查 flex_mode 配置",
            PaperError::Storage { .. } => "请检查缓存目录的写入权限和磁盘空间",
        }
    }
}
