//! 数据获取结果与缓存阶段

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::generation::GenerationMode;
use super::paper::{KimiSummary, PaperMetadata};

/// 需要从外部来源获取的数据项
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataKind {
    Metadata,
    KimiSummary,
}

impl DataKind {
    /// 对应的缓存阶段
    pub fn stage(self) -> Stage {
        match self {
            DataKind::Metadata => Stage::Metadata,
            DataKind::KimiSummary => Stage::KimiSummary,
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataKind::Metadata => f.write_str("metadata"),
            DataKind::KimiSummary => f.write_str("kimi-summary"),
        }
    }
}

/// 数据来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    BrowserScraper,
    FallbackApi,
    /// 直接来自缓存，没有发生任何网络/浏览器访问
    CacheDerived,
    PdfExtractor,
    LanguageModel,
    /// 没有尝试任何来源（例如 --no-download 下缓存未命中）
    None,
}

impl SourceKind {
    /// 可能出现在缓存条目里的来源
    pub const PERSISTED: [SourceKind; 4] = [
        SourceKind::BrowserScraper,
        SourceKind::FallbackApi,
        SourceKind::PdfExtractor,
        SourceKind::LanguageModel,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::BrowserScraper => "browser-scraper",
            SourceKind::FallbackApi => "fallback-api",
            SourceKind::CacheDerived => "cache-derived",
            SourceKind::PdfExtractor => "pdf-extractor",
            SourceKind::LanguageModel => "language-model",
            SourceKind::None => "none",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 可独立缓存的流水线阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Metadata,
    KimiSummary,
    PdfExtract,
    Phase1Output,
    /// 最终摘要按生成模式分别缓存
    FinalSummary(GenerationMode),
}

impl Stage {
    /// 缓存文件名中使用的名称
    pub fn slug(self) -> String {
        match self {
            Stage::Metadata => "metadata".to_string(),
            Stage::KimiSummary => "kimi-summary".to_string(),
            Stage::PdfExtract => "pdf-extract".to_string(),
            Stage::Phase1Output => "phase1-output".to_string(),
            Stage::FinalSummary(mode) => format!("final-summary.{}", mode),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.slug())
    }
}

/// 各阶段产出的内容
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "kebab-case")]
pub enum Payload {
    Metadata(PaperMetadata),
    KimiSummary(KimiSummary),
    Text(String),
}

impl Payload {
    pub fn as_metadata(&self) -> Option<&PaperMetadata> {
        match self {
            Payload::Metadata(metadata) => Some(metadata),
            _ => None,
        }
    }

    pub fn as_kimi_summary(&self) -> Option<&KimiSummary> {
        match self {
            Payload::KimiSummary(summary) => Some(summary),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(text) => Some(text),
            _ => None,
        }
    }

    /// 检查内容是否符合请求的数据项，并且不是空壳
    pub fn check_for(&self, kind: DataKind) -> Result<(), FailureReason> {
        match (kind, self) {
            (DataKind::Metadata, Payload::Metadata(m)) if !m.title.trim().is_empty() => Ok(()),
            (DataKind::Metadata, Payload::Metadata(_)) => {
                Err(FailureReason::Unavailable("元数据标题为空".to_string()))
            }
            (DataKind::KimiSummary, Payload::KimiSummary(s)) if !s.text.trim().is_empty() => {
                Ok(())
            }
            (DataKind::KimiSummary, Payload::KimiSummary(_)) => {
                Err(FailureReason::Unavailable("Kimi 解读内容为空".to_string()))
            }
            (kind, _) => Err(FailureReason::Unavailable(format!(
                "返回的数据类型与请求的 {} 不符",
                kind
            ))),
        }
    }
}

/// 获取失败的原因
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FailureReason {
    #[error("cache-miss")]
    CacheMiss,
    #[error("timeout")]
    Timeout,
    /// 灵活模式未开启却即将调用外部 API
    #[error("policy-violation: 灵活模式未允许调用回退 API")]
    PolicyViolation,
    #[error("{0}")]
    Unavailable(String),
    #[error("主来源: {primary}; 回退来源: {fallback}")]
    FallbackExhausted {
        primary: Box<FailureReason>,
        fallback: Box<FailureReason>,
    },
}

/// 单个数据项的获取结果，创建后不再修改
#[derive(Debug, Clone, PartialEq)]
pub enum AcquisitionResult {
    Success {
        source: SourceKind,
        payload: Payload,
        fetched_at: DateTime<Utc>,
    },
    Failure {
        source: SourceKind,
        reason: FailureReason,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(title: &str) -> Payload {
        Payload::Metadata(PaperMetadata {
            paper_id: "2401.01234".to_string(),
            title: title.to_string(),
            authors: vec![],
            abstract_text: String::new(),
            categories: vec![],
            published: String::new(),
            pdf_url: String::new(),
            doi: None,
            comment: None,
        })
    }

    #[test]
    fn test_stage_slug_embeds_mode() {
        assert_eq!(Stage::FinalSummary(GenerationMode::TwoPhase).slug(), "final-summary.two-phase");
        assert_eq!(Stage::KimiSummary.slug(), "kimi-summary");
    }

    #[test]
    fn test_check_for_rejects_wrong_shape_and_empty() {
        assert!(metadata("A title").check_for(DataKind::Metadata).is_ok());
        assert!(metadata("  ").check_for(DataKind::Metadata).is_err());
        assert!(metadata("A title").check_for(DataKind::KimiSummary).is_err());
        assert!(Payload::Text("x".into()).check_for(DataKind::Metadata).is_err());
    }

    #[test]
    fn test_payload_json_shape() {
        let json = serde_json::to_value(Payload::Text("hello".into())).unwrap();
        assert_eq!(json["kind"], "text");
        assert_eq!(json["data"], "hello");
    }

    #[test]
    fn test_exhausted_reason_mentions_both_sides() {
        let reason = FailureReason::FallbackExhausted {
            primary: Box::new(FailureReason::Timeout),
            fallback: Box::new(FailureReason::Unavailable("HTTP 502".into())),
        };
        let text = reason.to_string();
        assert!(text.contains("timeout"));
        assert!(text.contains("HTTP 502"));
    }
}
