//! arXiv Atom API 客户端

use serde::Deserialize;
use tracing::{debug, info};

use crate::config::ArxivSettings;
use crate::error::FetchError;
use crate::models::{PaperId, PaperMetadata};

pub struct ArxivApi {
    client: reqwest::Client,
    settings: ArxivSettings,
}

impl ArxivApi {
    pub fn new(client: reqwest::Client, settings: ArxivSettings) -> Self {
        Self { client, settings }
    }

    pub async fn fetch_metadata(&self, paper_id: &PaperId) -> Result<PaperMetadata, FetchError> {
        let url = format!("{}?id_list={}", self.settings.api_url, paper_id);
        info!("[论文 {}] 📡 通过 arXiv API 获取元数据", paper_id);
        debug!("请求: {}", url);

        let response = self
            .client
            .get(&url)
            .header("User-Agent", &self.settings.user_agent)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                endpoint: url,
                message: format!("状态码 {}", status),
            });
        }

        let body = response.text().await?;
        parse_atom_entry(&body, paper_id)
    }
}

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(default)]
    entry: Vec<Entry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Entry {
    title: String,
    summary: String,
    published: String,
    author: Vec<Author>,
    link: Vec<Link>,
    category: Vec<Category>,
    #[serde(alias = "arxiv:doi")]
    doi: Option<String>,
    #[serde(alias = "arxiv:comment")]
    comment: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Author {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Link {
    #[serde(rename = "@href")]
    href: String,
    #[serde(rename = "@title", default)]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Category {
    #[serde(rename = "@term")]
    term: String,
}

/// 解析 Atom 响应中的第一个 entry
pub fn parse_atom_entry(xml: &str, paper_id: &PaperId) -> Result<PaperMetadata, FetchError> {
    let feed: Feed = quick_xml::de::from_str(xml)?;
    let not_found = || FetchError::NotFound(format!("arXiv API 中没有论文 {}", paper_id));
    let entry = feed.entry.into_iter().next().ok_or_else(not_found)?;

    let title = collapse(&entry.title);
    // 不存在的 ID 会返回一个标题为 Error 的 entry
    if title.is_empty() || title == "Error" {
        return Err(not_found());
    }

    let pdf_url = entry
        .link
        .iter()
        .find(|link| link.title.as_deref() == Some("pdf"))
        .map(|link| link.href.clone())
        .unwrap_or_else(|| format!("https://arxiv.org/pdf/{}", paper_id));

    Ok(PaperMetadata {
        paper_id: paper_id.to_string(),
        title,
        authors: entry
            .author
            .iter()
            .map(|a| collapse(&a.name))
            .filter(|name| !name.is_empty())
            .collect(),
        abstract_text: collapse(&entry.summary),
        categories: entry.category.into_iter().map(|c| c.term).collect(),
        published: entry.published.trim().to_string(),
        pdf_url,
        doi: non_blank(entry.doi),
        comment: non_blank(entry.comment),
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| collapse(&v)).filter(|v| !v.is_empty())
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
