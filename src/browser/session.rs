//! Chromium 会话 - 基础设施层
//!
//! 每个数据项在新标签页里抓取，抓取完关闭标签页；
//! 整个浏览器进程在 `close` 时退出。

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::{Browser, Page};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::BrowserSession;
use crate::config::{ArxivSettings, PapersCoolSettings};
use crate::error::FetchError;
use crate::models::{DataKind, KimiSummary, PaperId, PaperMetadata, Payload};

pub struct ChromeSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
    arxiv: ArxivSettings,
    papers_cool: PapersCoolSettings,
    kimi_wait: Duration,
    closed: bool,
}

/// arXiv 摘要页上抓取到的原始字段
#[derive(Debug, Deserialize)]
struct AbsPageFields {
    #[serde(default)]
    title: String,
    #[serde(default)]
    authors: Vec<String>,
    #[serde(default, rename = "abstract")]
    abstract_text: String,
    #[serde(default)]
    categories: Vec<String>,
    #[serde(default)]
    dateline: String,
    #[serde(default)]
    doi: Option<String>,
    #[serde(default)]
    comment: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QaPair {
    #[serde(default)]
    q: String,
    #[serde(default)]
    a: String,
}

impl ChromeSession {
    pub(crate) fn new(
        browser: Browser,
        handler_task: JoinHandle<()>,
        arxiv: ArxivSettings,
        papers_cool: PapersCoolSettings,
        kimi_wait: Duration,
    ) -> Self {
        Self {
            browser,
            handler_task,
            arxiv,
            papers_cool,
            kimi_wait,
            closed: false,
        }
    }

    async fn open_page(&self, url: &str) -> Result<Page, FetchError> {
        debug!("打开页面: {}", url);
        let page = self.browser.new_page(url).await?;
        page.wait_for_navigation().await?;
        Ok(page)
    }

    async fn eval_as<T: DeserializeOwned>(page: &Page, script: &str) -> Result<T, FetchError> {
        let value = page.evaluate(script).await?.into_value::<T>()?;
        Ok(value)
    }

    async fn fetch_metadata(&self, paper_id: &PaperId) -> Result<PaperMetadata, FetchError> {
        let url = self.arxiv.abs_url.replace("{id}", paper_id.as_str());
        let page = self.open_page(&url).await?;
        let result = Self::eval_as::<AbsPageFields>(&page, ABS_PAGE_SCRIPT).await;
        if let Err(e) = page.close().await {
            debug!("关闭标签页失败: {}", e);
        }
        let fields = result?;

        let title = fields.title.trim_start_matches("Title:").trim().to_string();
        if title.is_empty() {
            return Err(FetchError::NotFound(format!("arXiv 页面上没有论文 {}", paper_id)));
        }

        Ok(PaperMetadata {
            paper_id: paper_id.to_string(),
            title,
            authors: fields.authors,
            abstract_text: fields
                .abstract_text
                .trim_start_matches("Abstract:")
                .trim()
                .to_string(),
            categories: fields.categories,
            published: fields.dateline.trim().trim_matches(['[', ']']).to_string(),
            pdf_url: format!("https://arxiv.org/pdf/{}", paper_id),
            doi: fields.doi.filter(|d| !d.trim().is_empty()),
            comment: fields.comment.filter(|c| !c.trim().is_empty()),
        })
    }

    async fn fetch_kimi_summary(&self, paper_id: &PaperId) -> Result<KimiSummary, FetchError> {
        let url = format!(
            "{}/arxiv/{}",
            self.papers_cool.base_url.trim_end_matches('/'),
            paper_id
        );
        let page = self.open_page(&url).await?;
        let result = self.read_kimi_panel(&page, paper_id).await;
        if let Err(e) = page.close().await {
            debug!("关闭标签页失败: {}", e);
        }

        let pairs = result?;
        let pairs: Vec<(String, String)> = pairs.into_iter().map(|p| (p.q, p.a)).collect();
        let summary = KimiSummary::from_qa_pairs(paper_id.as_str(), &pairs);
        if summary.text.trim().is_empty() {
            return Err(FetchError::Empty(format!("papers.cool 上没有 {} 的 Kimi 解读", paper_id)));
        }
        Ok(summary)
    }

    async fn read_kimi_panel(
        &self,
        page: &Page,
        paper_id: &PaperId,
    ) -> Result<Vec<QaPair>, FetchError> {
        let click_script = format!(
            r#"(() => {{
                const link = document.querySelector("a[id='kimi-{id}']");
                if (!link) return false;
                link.click();
                return true;
            }})()"#,
            id = paper_id.as_str().replace('"', "")
        );
        let clicked: bool = Self::eval_as(page, &click_script).await?;
        if !clicked {
            return Err(FetchError::NotFound(format!("页面上没有 {} 的 Kimi 按钮", paper_id)));
        }

        // Kimi 面板是异步加载的
        sleep(self.kimi_wait).await;

        Self::eval_as(page, KIMI_PANEL_SCRIPT).await
    }
}

#[async_trait]
impl BrowserSession for ChromeSession {
    async fn fetch(&mut self, paper_id: &PaperId, kind: DataKind) -> Result<Payload, FetchError> {
        info!("[论文 {}] 🌐 浏览器抓取 {}", paper_id, kind);
        match kind {
            DataKind::Metadata => self.fetch_metadata(paper_id).await.map(Payload::Metadata),
            DataKind::KimiSummary => self
                .fetch_kimi_summary(paper_id)
                .await
                .map(Payload::KimiSummary),
        }
    }

    async fn close(&mut self) -> Result<(), FetchError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let result = self.browser.close().await;
        if let Err(e) = self.browser.wait().await {
            warn!("等待浏览器进程退出失败: {}", e);
        }
        self.handler_task.abort();
        result?;
        debug!("浏览器已关闭");
        Ok(())
    }
}

const ABS_PAGE_SCRIPT: &str = r#"
(() => {
    const text = (sel) => {
        const el = document.querySelector(sel);
        return el ? el.innerText.trim() : "";
    };
    const subjects = text("td.tablecell.subjects");
    const categories = [];
    const re = /\(([a-zA-Z\-]+\.[A-Za-z\-]+|[a-zA-Z\-]+)\)/g;
    let m;
    while ((m = re.exec(subjects)) !== null) {
        categories.push(m[1]);
    }
    const doiEl = document.querySelector("td.tablecell.doi a, td.tablecell.arxivdoi a");
    const comment = text("td.tablecell.comments");
    return {
        title: text("h1.title"),
        authors: Array.from(document.querySelectorAll("div.authors a")).map(a => a.innerText.trim()),
        abstract: text("blockquote.abstract"),
        categories: categories,
        dateline: text("div.dateline"),
        doi: doiEl ? doiEl.innerText.trim() : null,
        comment: comment || null,
    };
})()
"#;

const KIMI_PANEL_SCRIPT: &str = r#"
(() => {
    const pairs = [];
    document.querySelectorAll("p.faq-q").forEach(q => {
        let a = q.nextElementSibling;
        while (a && !(a.tagName === "DIV" && a.classList.contains("faq-a"))) {
            if (a.classList && a.classList.contains("faq-q")) { a = null; break; }
            a = a.nextElementSibling;
        }
        pairs.push({ q: q.innerText.trim(), a: a ? a.innerText.trim() : "" });
    });
    return pairs;
})()
"#;
