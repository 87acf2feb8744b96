//! 回退 API - 基础设施层
//!
//! 只有在灵活模式允许时才会被调用：
//! - 元数据走 arXiv Atom API
//! - Kimi 解读走 papers.cool 的 kimi 接口

pub mod arxiv;
pub mod papers_cool;

use std::borrow::Cow;
use std::time::Duration;

use async_trait::async_trait;
use quick_xml::escape::unescape_with;
use regex::Regex;

use crate::config::{ArxivSettings, PapersCoolSettings};
use crate::error::FetchError;
use crate::models::{DataKind, PaperId, Payload};

pub use arxiv::ArxivApi;
pub use papers_cool::PapersCoolApi;

/// 直接访问外部 API 的数据来源
#[async_trait]
pub trait FallbackApi: Send + Sync {
    async fn fetch(&self, paper_id: &PaperId, kind: DataKind) -> Result<Payload, FetchError>;
}

/// 按数据项分发到对应 API 的回退来源
pub struct HttpFallbackApi {
    arxiv: ArxivApi,
    papers_cool: PapersCoolApi,
}

impl HttpFallbackApi {
    pub fn new(
        arxiv: ArxivSettings,
        papers_cool: PapersCoolSettings,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(arxiv.user_agent.clone())
            .build()?;

        Ok(Self {
            arxiv: ArxivApi::new(client.clone(), arxiv),
            papers_cool: PapersCoolApi::new(client, papers_cool),
        })
    }
}

#[async_trait]
impl FallbackApi for HttpFallbackApi {
    async fn fetch(&self, paper_id: &PaperId, kind: DataKind) -> Result<Payload, FetchError> {
        match kind {
            DataKind::Metadata => self.arxiv.fetch_metadata(paper_id).await.map(Payload::Metadata),
            DataKind::KimiSummary => self
                .papers_cool
                .fetch_kimi_summary(paper_id)
                .await
                .map(Payload::KimiSummary),
        }
    }
}

/// 把 HTML 片段转成纯文本：`<br>` 变换行，去掉其余标签并解码实体，行内空白压成一个空格
pub(crate) struct HtmlText {
    breaks: Regex,
    tags: Regex,
}

impl HtmlText {
    pub(crate) fn new() -> Result<Self, FetchError> {
        Ok(Self {
            breaks: compile(r"(?i)<br\s*/?>")?,
            tags: compile(r"(?s)<[^>]*>")?,
        })
    }

    pub(crate) fn convert(&self, fragment: &str) -> String {
        let with_breaks = self.breaks.replace_all(fragment, "\n");
        let stripped = self.tags.replace_all(&with_breaks, "");
        // 无法识别的实体保留原文
        let decoded = unescape_with(&stripped, |entity| match entity {
            "nbsp" => Some(" "),
            "lt" => Some("<"),
            "gt" => Some(">"),
            "amp" => Some("&"),
            "quot" => Some("\""),
            "apos" => Some("'"),
            _ => None,
        })
        .unwrap_or(Cow::Borrowed(&*stripped));

        decoded
            .lines()
            .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub(crate) fn compile(pattern: &str) -> Result<Regex, FetchError> {
    Regex::new(pattern).map_err(|e| FetchError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_to_text() {
        let html = "<div class=\"faq-a\"><p>第一段 &amp; <b>加粗</b></p><br/>  第二段&#39;  </div>";
        let text = HtmlText::new().unwrap();
        assert_eq!(text.convert(html), "第一段 & 加粗\n第二段'");
    }

    #[test]
    fn test_unknown_entity_keeps_raw_text() {
        let text = HtmlText::new().unwrap();
        assert_eq!(text.convert("<p>A &copy; B</p>"), "A &copy; B");
    }
}
