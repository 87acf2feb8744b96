//! papers.cool Kimi 解读接口客户端

use tracing::{debug, info};

use super::{compile, HtmlText};
use crate::config::PapersCoolSettings;
use crate::error::FetchError;
use crate::models::{KimiSummary, PaperId};

pub struct PapersCoolApi {
    client: reqwest::Client,
    settings: PapersCoolSettings,
}

impl PapersCoolApi {
    pub fn new(client: reqwest::Client, settings: PapersCoolSettings) -> Self {
        Self { client, settings }
    }

    pub async fn fetch_kimi_summary(&self, paper_id: &PaperId) -> Result<KimiSummary, FetchError> {
        let url = format!(
            "{}{}?paper={}",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.kimi_endpoint,
            paper_id
        );
        info!("[论文 {}] 📡 通过 papers.cool API 获取 Kimi 解读", paper_id);
        debug!("请求: {}", url);

        let response = self
            .client
            .post(&url)
            .header("Accept", "text/html,application/xhtml+xml")
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                endpoint: url,
                message: format!("状态码 {}", status),
            });
        }

        let html = response.text().await?;
        parse_kimi_html(&html, paper_id)
    }
}

/// 从 kimi 接口返回的 HTML 片段中提取问答与要点
pub fn parse_kimi_html(html: &str, paper_id: &PaperId) -> Result<KimiSummary, FetchError> {
    let pair_re = compile(
        r#"(?s)<p[^>]*class="[^"]*faq-q[^"]*"[^>]*>(.*?)</p>\s*<div[^>]*class="[^"]*faq-a[^"]*"[^>]*>(.*?)</div>"#,
    )?;
    let text = HtmlText::new()?;

    let pairs: Vec<(String, String)> = pair_re
        .captures_iter(html)
        .filter_map(|c| Some((text.convert(c.get(1)?.as_str()), text.convert(c.get(2)?.as_str()))))
        .collect();

    let mut summary = KimiSummary::from_qa_pairs(paper_id.as_str(), &pairs);
    if summary.text.trim().is_empty() {
        return Err(FetchError::Empty(format!("papers.cool 没有返回 {} 的 Kimi 解读", paper_id)));
    }

    let li_re = compile(r"(?s)<li[^>]*>(.*?)</li>")?;
    summary.key_points = li_re
        .captures_iter(html)
        .filter_map(|c| c.get(1))
        .map(|m| text.convert(m.as_str()).replace('\n', " "))
        .filter(|point| {
            let len = point.chars().count();
            len > 10 && len < 200
        })
        .collect();

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kimi_html() {
        let html = r#"
<div class="kimi">
  <p class="faq-q"><strong>Q1</strong>: 这篇论文试图解决什么问题？</p>
  <div class="faq-a"><p>长上下文建模的效率问题。</p>
    <ul><li>提出一种稀疏注意力机制，降低计算量</li><li>短</li></ul>
  </div>
  <p class="faq-q"><strong>Q2</strong>: 有哪些相关研究？</p>
  <div class="faq-a"></div>
</div>"#;
        let id = PaperId::parse("2401.01234").unwrap();
        let summary = parse_kimi_html(html, &id).unwrap();

        assert!(summary.text.starts_with("Q1: 这篇论文试图解决什么问题？\n长上下文建模的效率问题。"));
        assert!(!summary.text.contains("Q2"));
        assert_eq!(summary.key_points, vec!["提出一种稀疏注意力机制，降低计算量"]);
    }

    #[test]
    fn test_parse_kimi_html_without_answers_is_empty() {
        let id = PaperId::parse("2401.01234").unwrap();
        let err = parse_kimi_html("<html><body>Loading...</body></html>", &id).unwrap_err();
        assert!(matches!(err, FetchError::Empty(_)));
    }
}
