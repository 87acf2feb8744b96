//! 程序配置
//!
//! 配置在运行开始时加载一次（TOML 文件 + 环境变量覆盖），
//! 之后作为不可变的值传给编排层。

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::{DataKind, GenerationMode};

/// 默认配置文件名（当前工作目录下）
pub const DEFAULT_CONFIG_FILE: &str = "paper-summary.toml";

/// 程序配置文件
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmSettings,
    pub browser: BrowserSettings,
    pub flex_mode: FlexModePolicy,
    pub arxiv: ArxivSettings,
    pub papers_cool: PapersCoolSettings,
    pub paths: PathsSettings,
    pub pdf: PdfSettings,
    pub summary: SummarySettings,
    pub acquisition: AcquisitionSettings,
}

/// 语言模型配置（兼容 OpenAI API 的服务）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub api_key: String,
    pub api_base_url: String,
    pub model_name: String,
    /// 客户端自身的重试次数，流水线不会重试
    pub max_retries: u32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base_url: "https://api.siliconflow.cn/v1".to_string(),
            model_name: "deepseek-ai/DeepSeek-V3.2".to_string(),
            max_retries: 3,
        }
    }
}

/// 浏览器（主来源）配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    pub enabled: bool,
    pub headless: bool,
    /// 浏览器可执行文件，留空则自动查找
    pub executable: Option<PathBuf>,
    pub user_agent: String,
    /// 代理地址，例如 "http://127.0.0.1:7890"
    pub proxy: String,
    /// papers.cool 点击 Kimi 按钮后等待内容加载的时间
    pub kimi_wait_millis: u64,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            headless: true,
            executable: None,
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36"
                .to_string(),
            proxy: String::new(),
            kimi_wait_millis: 3000,
        }
    }
}

/// 灵活模式：主来源失败时是否允许回退到外部 API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlexModePolicy {
    pub enabled: bool,
    /// 元数据是否允许回退到 arXiv API
    pub arxiv_api: bool,
    /// Kimi 解读是否允许回退到 papers.cool API
    pub papers_cool_api: bool,
}

impl Default for FlexModePolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            arxiv_api: true,
            papers_cool_api: false,
        }
    }
}

impl FlexModePolicy {
    /// 该数据项是否允许回退
    pub fn allows_fallback(&self, kind: DataKind) -> bool {
        if !self.enabled {
            return false;
        }
        match kind {
            DataKind::Metadata => self.arxiv_api,
            DataKind::KimiSummary => self.papers_cool_api,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArxivSettings {
    pub api_url: String,
    /// 论文摘要页，`{id}` 会被替换
    pub abs_url: String,
    pub user_agent: String,
}

impl Default for ArxivSettings {
    fn default() -> Self {
        Self {
            api_url: "http://export.arxiv.org/api/query".to_string(),
            abs_url: "https://arxiv.org/abs/{id}".to_string(),
            user_agent: "PaperSummaryBot/1.0".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PapersCoolSettings {
    pub base_url: String,
    pub kimi_endpoint: String,
}

impl Default for PapersCoolSettings {
    fn default() -> Self {
        Self {
            base_url: "https://papers.cool".to_string(),
            kimi_endpoint: "/arxiv/kimi".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsSettings {
    pub cache_dir: PathBuf,
    /// 预先抽取好的 PDF 文本（`<id>.txt`）所在目录
    pub pdf_dir: PathBuf,
    pub summaries_dir: PathBuf,
    /// 评论文件（`<id>.md`）所在目录
    pub comments_dir: PathBuf,
    /// 批量运行日志
    pub run_log_file: PathBuf,
}

impl Default for PathsSettings {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("./cache/store"),
            pdf_dir: PathBuf::from("./cache/pdfs"),
            summaries_dir: PathBuf::from("./cache/summaries"),
            comments_dir: PathBuf::from("./data/comments"),
            run_log_file: PathBuf::from("./cache/logs/run.txt"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfSettings {
    pub max_chars: usize,
}

impl Default for PdfSettings {
    fn default() -> Self {
        Self { max_chars: 50_000 }
    }
}

/// 生成参数
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarySettings {
    pub mode: GenerationMode,
    /// 为 false 时 two-phase 模式按 full 模式执行
    pub pdf_enhance_enabled: bool,
    pub temperature: f32,
    pub full_max_tokens: u32,
    pub lightweight_max_tokens: u32,
    pub phase1_max_tokens: u32,
    pub phase2_max_tokens: u32,
}

impl Default for SummarySettings {
    fn default() -> Self {
        Self {
            mode: GenerationMode::Full,
            pdf_enhance_enabled: true,
            temperature: 0.3,
            full_max_tokens: 4096,
            lightweight_max_tokens: 1024,
            phase1_max_tokens: 1024,
            phase2_max_tokens: 2048,
        }
    }
}

impl SummarySettings {
    /// 实际执行的模式
    pub fn effective_mode(&self) -> GenerationMode {
        match self.mode {
            GenerationMode::TwoPhase if !self.pdf_enhance_enabled => GenerationMode::Full,
            mode => mode,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionSettings {
    /// 单次获取（浏览器或 API）的超时时间
    pub timeout_secs: u64,
}

impl Default for AcquisitionSettings {
    fn default() -> Self {
        Self { timeout_secs: 60 }
    }
}

/// 单次运行的开关，运行期间不变
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// 忽略已有缓存重新获取和生成，结果仍会写回缓存
    pub force: bool,
    /// 只使用缓存，绝不访问网络或浏览器
    pub no_download: bool,
    /// 是否把 PDF 文本作为生成输入
    pub use_pdf: bool,
}

impl Config {
    /// 加载配置
    ///
    /// 指定了路径时该文件必须存在；否则尝试当前目录下的默认文件，
    /// 都没有则使用默认值。最后应用环境变量覆盖。
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    Self::default()
                }
            }
        };
        Ok(config.with_env_overrides())
    }

    /// 从 TOML 文件读取
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("无法读取配置文件: {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("无法解析配置文件: {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// 环境变量覆盖
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    fn with_overrides_from(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(v) = var("LLM_API_KEY") {
            self.llm.api_key = v;
        }
        if let Some(v) = var("LLM_API_BASE_URL") {
            self.llm.api_base_url = v;
        }
        if let Some(v) = var("LLM_MODEL_NAME") {
            self.llm.model_name = v;
        }
        if let Some(v) = var("FLEX_MODE").and_then(|v| v.parse().ok()) {
            self.flex_mode.enabled = v;
        }
        if let Some(v) = var("SUMMARY_MODE").and_then(|v| v.parse().ok()) {
            self.summary.mode = v;
        }
        if let Some(v) = var("CACHE_DIR") {
            self.paths.cache_dir = PathBuf::from(v);
        }
        if self.browser.proxy.is_empty() {
            if let Some(v) = var("HTTPS_PROXY").or_else(|| var("HTTP_PROXY")) {
                self.browser.proxy = v;
            }
        }
        self
    }

    /// 遮盖后的 API 密钥，用于展示
    pub fn masked_api_key(&self) -> String {
        let key = &self.llm.api_key;
        if key.is_empty() {
            return "✗ 未配置".to_string();
        }
        let visible: String = key.chars().take(4).collect();
        format!("✓ 已配置 ({}****)", visible)
    }
}
