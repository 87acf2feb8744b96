//! 提示词组装
//!
//! 缺失的输入用显式占位符代替，降级的提示词一眼就能看出来。

use crate::config::SummarySettings;
use crate::models::{GenerationMode, PaperMetadata, Phase};
use crate::services::GenerationRequest;

pub const NOT_PROVIDED: &str = "未提供";
pub const NONE: &str = "无";

const SYSTEM_PROMPT: &str = "你是一名严谨的学术论文解读助手，使用简体中文输出 Markdown。\
只根据给定材料写作，材料缺失的部分如实说明，不要编造实验数据。";

/// 流水线积累的生成输入
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineInputs {
    pub metadata: Option<PaperMetadata>,
    pub kimi_summary: Option<String>,
    pub pdf_text: Option<String>,
    /// 合并后的评论，为空表示没有评论
    pub comments: String,
}

impl PipelineInputs {
    fn kimi_or_placeholder(&self) -> &str {
        non_empty(self.kimi_summary.as_deref()).unwrap_or(NOT_PROVIDED)
    }

    fn pdf_or_placeholder(&self) -> &str {
        non_empty(self.pdf_text.as_deref()).unwrap_or(NOT_PROVIDED)
    }

    fn comments_or_placeholder(&self) -> &str {
        non_empty(Some(self.comments.as_str())).unwrap_or(NONE)
    }
}

fn non_empty(text: Option<&str>) -> Option<&str> {
    text.filter(|t| !t.trim().is_empty())
}

fn metadata_block(metadata: Option<&PaperMetadata>) -> String {
    match metadata {
        Some(m) => format!(
            "- 标题: {}\n- 作者: {}\n- 分类: {}\n- 发布日期: {}\n- 链接: {}\n\n### 摘要\n{}",
            m.title,
            or_placeholder(&m.authors_line()),
            or_placeholder(&m.tags()),
            or_placeholder(&m.published),
            or_placeholder(&m.pdf_url),
            or_placeholder(&m.abstract_text),
        ),
        None => NOT_PROVIDED.to_string(),
    }
}

fn or_placeholder(text: &str) -> &str {
    if text.trim().is_empty() {
        NOT_PROVIDED
    } else {
        text
    }
}

/// 单阶段请求（full / lightweight）
pub fn single_request(
    mode: GenerationMode,
    inputs: &PipelineInputs,
    settings: &SummarySettings,
) -> GenerationRequest {
    let (user, max_tokens) = match mode {
        GenerationMode::Lightweight => (
            format!(
                "请根据下面的 Kimi 解读，写一份简短的中文论文速览（不超过 500 字），\
包含：研究问题、核心方法、主要结论。\n\n\
## Kimi 解读\n{kimi}\n\n\
## 读者评论\n{comments}\n\n\
如果读者评论不是“{none}”，请在结尾单独列出“读者评论”一节并保留原意。",
                kimi = inputs.kimi_or_placeholder(),
                comments = inputs.comments_or_placeholder(),
                none = NONE,
            ),
            settings.lightweight_max_tokens,
        ),
        GenerationMode::Full | GenerationMode::TwoPhase => (
            format!(
                "请为下面这篇论文写一份完整的中文解读，结构为：\
一句话总结、研究背景与问题、方法、实验与结果、局限与展望、个人评论。\n\n\
## 论文信息\n{metadata}\n\n\
## Kimi 解读\n{kimi}\n\n\
## 论文正文（节选）\n{pdf}\n\n\
## 读者评论\n{comments}\n\n\
“个人评论”一节必须基于读者评论撰写；读者评论为“{none}”时写“{none}”。",
                metadata = metadata_block(inputs.metadata.as_ref()),
                kimi = inputs.kimi_or_placeholder(),
                pdf = inputs.pdf_or_placeholder(),
                comments = inputs.comments_or_placeholder(),
                none = NONE,
            ),
            settings.full_max_tokens,
        ),
    };

    GenerationRequest {
        phase: Phase::Single,
        system: Some(SYSTEM_PROMPT.to_string()),
        user,
        temperature: settings.temperature,
        max_tokens,
    }
}

/// 两阶段模式第一阶段：由元数据和 Kimi 解读写出草稿，不读正文也不涉及评论
pub fn phase1_request(inputs: &PipelineInputs, settings: &SummarySettings) -> GenerationRequest {
    let user = format!(
        "请根据下面的论文信息和 Kimi 解读，写一份技术要点草稿（要点列表即可）：\
研究问题、核心方法、实验设置、主要结论。\n\n\
## 论文信息\n{metadata}\n\n\
## Kimi 解读\n{kimi}",
        metadata = metadata_block(inputs.metadata.as_ref()),
        kimi = inputs.kimi_or_placeholder(),
    );

    GenerationRequest {
        phase: Phase::Phase1,
        system: Some(SYSTEM_PROMPT.to_string()),
        user,
        temperature: settings.temperature,
        max_tokens: settings.phase1_max_tokens,
    }
}

/// 两阶段模式第二阶段：用论文正文补充第一阶段草稿，写出最终解读，评论在这里注入
pub fn phase2_request(
    inputs: &PipelineInputs,
    draft: &str,
    settings: &SummarySettings,
) -> GenerationRequest {
    let user = format!(
        "请用论文正文补充和校正下面的技术要点草稿，为这篇论文写一份完整的中文解读，结构为：\
一句话总结、研究背景与问题、方法、实验与结果、局限与展望、个人评论。\
方法细节、关键公式和实验数据以正文为准。\n\n\
## 论文信息\n{metadata}\n\n\
## 技术要点草稿\n{draft}\n\n\
## 论文正文（节选）\n{pdf}\n\n\
## 读者评论\n{comments}\n\n\
“个人评论”一节必须基于读者评论撰写；读者评论为“{none}”时写“{none}”。",
        metadata = metadata_block(inputs.metadata.as_ref()),
        draft = draft,
        pdf = inputs.pdf_or_placeholder(),
        comments = inputs.comments_or_placeholder(),
        none = NONE,
    );

    GenerationRequest {
        phase: Phase::Phase2,
        system: Some(SYSTEM_PROMPT.to_string()),
        user,
        temperature: settings.temperature,
        max_tokens: settings.phase2_max_tokens,
    }
}
