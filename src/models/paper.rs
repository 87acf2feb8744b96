//! 论文相关的数据结构

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::InvalidPaperId;

/// 论文标识（例如 arXiv 编号）
///
/// 构造时会去掉首尾空白和 `arXiv:` 前缀，之后不可变，
/// 在缓存和所有查询中作为主键使用。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PaperId(String);

impl PaperId {
    pub fn parse(raw: &str) -> Result<Self, InvalidPaperId> {
        let trimmed = raw.trim();
        let without_prefix = trimmed
            .strip_prefix("arXiv:")
            .or_else(|| trimmed.strip_prefix("arxiv:"))
            .unwrap_or(trimmed)
            .trim();

        if without_prefix.is_empty() {
            return Err(InvalidPaperId {
                raw: raw.to_string(),
            });
        }
        if without_prefix.chars().any(char::is_whitespace) {
            return Err(InvalidPaperId {
                raw: raw.to_string(),
            });
        }

        Ok(Self(without_prefix.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 用作文件名的形式（旧式编号 `hep-th/9901001` 中的 `/` 会被替换）
    pub fn file_stem(&self) -> String {
        self.0.replace(['/', '\\'], "_")
    }
}

impl fmt::Display for PaperId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PaperId {
    type Error = InvalidPaperId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PaperId> for String {
    fn from(id: PaperId) -> Self {
        id.0
    }
}

/// 论文元数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperMetadata {
    pub paper_id: String,
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(rename = "abstract", default)]
    pub abstract_text: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub published: String,
    #[serde(default)]
    pub pdf_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl PaperMetadata {
    /// 作者列表，逗号分隔
    pub fn authors_line(&self) -> String {
        self.authors.join(", ")
    }

    /// 前三个学科分类
    pub fn tags(&self) -> String {
        self.categories
            .iter()
            .take(3)
            .cloned()
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// papers.cool 上由 Kimi 生成的论文解读
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KimiSummary {
    pub paper_id: String,
    /// 问答形式的纯文本内容
    pub text: String,
    #[serde(default)]
    pub key_points: Vec<String>,
}

impl KimiSummary {
    /// 由问答对组成解读文本：每组为“问题\n回答”，组与组之间空一行
    pub fn from_qa_pairs(paper_id: &str, pairs: &[(String, String)]) -> Self {
        let text = pairs
            .iter()
            .filter(|(_, answer)| !answer.trim().is_empty())
            .map(|(question, answer)| format!("{}\n{}", question.trim(), answer.trim()))
            .collect::<Vec<_>>()
            .join("\n\n");

        Self {
            paper_id: paper_id.to_string(),
            text,
            key_points: Vec::new(),
        }
    }
}
