#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use paper_summary::api::FallbackApi;
use paper_summary::browser::{BrowserLauncher, BrowserSession};
use paper_summary::config::{Config, RunOptions};
use paper_summary::error::{FetchError, LlmError};
use paper_summary::models::{DataKind, GenerationMode, KimiSummary, PaperId, PaperMetadata, Payload, Phase};
use paper_summary::services::{CommentSource, GenerationRequest, PdfExtractor, TextGenerator};
use paper_summary::{App, Collaborators};

/// 数据来源桩的行为
#[derive(Debug, Clone)]
pub enum Behavior {
    Ok,
    Fail,
    /// 返回空内容
    Empty,
    /// 一直不返回
    Hang,
}

pub fn pid(raw: &str) -> PaperId {
    PaperId::parse(raw).unwrap()
}

pub fn metadata(paper_id: &PaperId) -> PaperMetadata {
    PaperMetadata {
        paper_id: paper_id.to_string(),
        title: format!("Paper {}", paper_id),
        authors: vec!["Alice".to_string(), "Bob".to_string()],
        abstract_text: "An abstract.".to_string(),
        categories: vec!["cs.CL".to_string()],
        published: "2024-01-02".to_string(),
        pdf_url: format!("https://arxiv.org/pdf/{}", paper_id),
        doi: None,
        comment: None,
    }
}

pub fn kimi(paper_id: &PaperId) -> KimiSummary {
    KimiSummary {
        paper_id: paper_id.to_string(),
        text: format!("Q1: 解决什么问题？\n{} 的问题", paper_id),
        key_points: Vec::new(),
    }
}

async fn respond(
    behavior: &Behavior,
    paper_id: &PaperId,
    kind: DataKind,
    label: &str,
) -> Result<Payload, FetchError> {
    match behavior {
        Behavior::Ok => Ok(match kind {
            DataKind::Metadata => Payload::Metadata(metadata(paper_id)),
            DataKind::KimiSummary => Payload::KimiSummary(kimi(paper_id)),
        }),
        Behavior::Fail => Err(FetchError::Browser(format!("{} 桩失败", label))),
        Behavior::Empty => Ok(match kind {
            DataKind::Metadata => Payload::Metadata(PaperMetadata {
                title: String::new(),
                ..metadata(paper_id)
            }),
            DataKind::KimiSummary => Payload::KimiSummary(KimiSummary {
                text: String::new(),
                ..kimi(paper_id)
            }),
        }),
        Behavior::Hang => {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Err(FetchError::Timeout)
        }
    }
}

// ========== 浏览器 ==========

#[derive(Default)]
pub struct BrowserCounters {
    pub opens: AtomicUsize,
    pub closes: AtomicUsize,
    pub fetches: AtomicUsize,
    pub metadata_fetches: AtomicUsize,
    pub kimi_fetches: AtomicUsize,
}

pub struct StubLauncher {
    pub counters: Arc<BrowserCounters>,
    pub metadata: Behavior,
    pub kimi: Behavior,
    /// 为 true 时浏览器启动失败
    pub launch_fails: bool,
    /// 某些论文的所有抓取都失败
    pub failing_ids: Vec<String>,
}

impl StubLauncher {
    pub fn ok() -> Self {
        Self::with(Behavior::Ok, Behavior::Ok)
    }

    pub fn with(metadata: Behavior, kimi: Behavior) -> Self {
        Self {
            counters: Arc::new(BrowserCounters::default()),
            metadata,
            kimi,
            launch_fails: false,
            failing_ids: Vec::new(),
        }
    }
}

struct StubSession {
    counters: Arc<BrowserCounters>,
    metadata: Behavior,
    kimi: Behavior,
    failing_ids: Vec<String>,
    closed: bool,
}

#[async_trait]
impl BrowserLauncher for StubLauncher {
    async fn open(&self) -> Result<Box<dyn BrowserSession>, FetchError> {
        self.counters.opens.fetch_add(1, Ordering::SeqCst);
        if self.launch_fails {
            return Err(FetchError::Browser("无法启动浏览器".to_string()));
        }
        Ok(Box::new(StubSession {
            counters: self.counters.clone(),
            metadata: self.metadata.clone(),
            kimi: self.kimi.clone(),
            failing_ids: self.failing_ids.clone(),
            closed: false,
        }))
    }
}

#[async_trait]
impl BrowserSession for StubSession {
    async fn fetch(&mut self, paper_id: &PaperId, kind: DataKind) -> Result<Payload, FetchError> {
        self.counters.fetches.fetch_add(1, Ordering::SeqCst);
        let behavior = match kind {
            DataKind::Metadata => {
                self.counters.metadata_fetches.fetch_add(1, Ordering::SeqCst);
                &self.metadata
            }
            DataKind::KimiSummary => {
                self.counters.kimi_fetches.fetch_add(1, Ordering::SeqCst);
                &self.kimi
            }
        };
        if self.failing_ids.iter().any(|id| id == paper_id.as_str()) {
            return Err(FetchError::NotFound(paper_id.to_string()));
        }
        respond(behavior, paper_id, kind, "浏览器").await
    }

    async fn close(&mut self) -> Result<(), FetchError> {
        if !self.closed {
            self.closed = true;
            self.counters.closes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

// ========== 回退 API ==========

pub struct StubFallback {
    pub calls: AtomicUsize,
    pub metadata: Behavior,
    pub kimi: Behavior,
}

impl StubFallback {
    pub fn with(metadata: Behavior, kimi: Behavior) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            metadata,
            kimi,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FallbackApi for StubFallback {
    async fn fetch(&self, paper_id: &PaperId, kind: DataKind) -> Result<Payload, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let behavior = match kind {
            DataKind::Metadata => &self.metadata,
            DataKind::KimiSummary => &self.kimi,
        };
        respond(behavior, paper_id, kind, "回退 API").await
    }
}

// ========== 语言模型 ==========

pub struct ScriptedGenerator {
    pub requests: Mutex<Vec<GenerationRequest>>,
    /// 这些阶段返回错误
    pub failing_phases: Vec<Phase>,
    /// 这些阶段返回空白内容
    pub blank_phases: Vec<Phase>,
}

impl ScriptedGenerator {
    pub fn ok() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            failing_phases: Vec::new(),
            blank_phases: Vec::new(),
        }
    }

    pub fn failing(phase: Phase) -> Self {
        Self {
            failing_phases: vec![phase],
            ..Self::ok()
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn phases(&self) -> Vec<Phase> {
        self.requests.lock().unwrap().iter().map(|r| r.phase).collect()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.user.clone())
            .collect()
    }

    pub fn last_prompt(&self) -> String {
        self.requests
            .lock()
            .unwrap()
            .last()
            .map(|r| r.user.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        if self.failing_phases.contains(&request.phase) {
            return Err(LlmError::ApiCallFailed {
                model: "stub".to_string(),
                message: format!("{} 桩失败", request.phase),
            });
        }
        if self.blank_phases.contains(&request.phase) {
            return Ok("   \n".to_string());
        }
        Ok(format!("# 解读 ({})", request.phase))
    }
}

// ========== PDF 与评论 ==========

pub struct StubPdf {
    pub calls: AtomicUsize,
    pub text: Option<String>,
}

impl StubPdf {
    pub fn with(text: Option<&str>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            text: text.map(str::to_string),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PdfExtractor for StubPdf {
    async fn extract(&self, _paper_id: &PaperId) -> Option<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.text.clone()
    }
}

pub struct StubComments {
    pub calls: AtomicUsize,
    pub text: Option<String>,
}

impl StubComments {
    pub fn with(text: Option<&str>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            text: text.map(str::to_string),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CommentSource for StubComments {
    async fn read_file_comment(&self, _paper_id: &PaperId) -> Option<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.text.clone()
    }
}

// ========== 组装 ==========

/// 一组桩协作者，保留各自的 Arc 以便检查调用次数
pub struct Harness {
    pub launcher: Arc<StubLauncher>,
    pub fallback: Arc<StubFallback>,
    pub generator: Arc<ScriptedGenerator>,
    pub pdf: Arc<StubPdf>,
    pub comments: Arc<StubComments>,
}

impl Harness {
    pub fn ok() -> Self {
        Self {
            launcher: Arc::new(StubLauncher::ok()),
            fallback: Arc::new(StubFallback::with(Behavior::Ok, Behavior::Ok)),
            generator: Arc::new(ScriptedGenerator::ok()),
            pdf: Arc::new(StubPdf::with(Some("PDF 正文"))),
            comments: Arc::new(StubComments::with(None)),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            launcher: self.launcher.clone(),
            fallback: self.fallback.clone(),
            generator: self.generator.clone(),
            pdf: self.pdf.clone(),
            comments: self.comments.clone(),
        }
    }

    pub fn app(&self, config: &Config, options: RunOptions) -> App {
        App::with_collaborators(config.clone(), options, self.collaborators())
    }

    pub fn opens(&self) -> usize {
        self.launcher.counters.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.launcher.counters.closes.load(Ordering::SeqCst)
    }

    pub fn browser_fetches(&self) -> usize {
        self.launcher.counters.fetches.load(Ordering::SeqCst)
    }

    /// 所有外部协作者的调用总数
    pub fn total_calls(&self) -> usize {
        self.opens()
            + self.browser_fetches()
            + self.fallback.calls()
            + self.generator.calls()
            + self.pdf.calls()
            + self.comments.calls()
    }
}

/// 缓存和日志都放在临时目录下的配置
pub fn test_config(root: &Path, mode: GenerationMode) -> Config {
    let mut config = Config::default();
    config.paths.cache_dir = root.join("cache");
    config.paths.pdf_dir = root.join("pdfs");
    config.paths.summaries_dir = root.join("summaries");
    config.paths.comments_dir = root.join("comments");
    config.paths.run_log_file = root.join("logs").join("run.txt");
    config.summary.mode = mode;
    config.summary.pdf_enhance_enabled = true;
    config.acquisition.timeout_secs = 1;
    config
}

pub fn options() -> RunOptions {
    RunOptions {
        force: false,
        no_download: false,
        use_pdf: true,
    }
}
