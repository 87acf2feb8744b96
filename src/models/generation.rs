//! 生成模式与流水线状态

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::acquisition::DataKind;

/// 生成模式，在流水线开始时选定，整个运行期间不变
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GenerationMode {
    /// 单次生成，使用全部可用输入
    #[default]
    Full,
    /// 单次生成，只使用 Kimi 解读
    Lightweight,
    /// 先生成结构草稿，再结合 PDF 文本增强
    #[serde(alias = "two_phase")]
    TwoPhase,
}

impl GenerationMode {
    /// 该模式必须成功获取的数据项
    pub fn required_kinds(self) -> &'static [DataKind] {
        match self {
            GenerationMode::Full | GenerationMode::TwoPhase => {
                &[DataKind::Metadata, DataKind::KimiSummary]
            }
            GenerationMode::Lightweight => &[DataKind::KimiSummary],
        }
    }

    /// 该模式是否会把 PDF 文本作为输入
    pub fn uses_pdf(self) -> bool {
        !matches!(self, GenerationMode::Lightweight)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GenerationMode::Full => "full",
            GenerationMode::Lightweight => "lightweight",
            GenerationMode::TwoPhase => "two-phase",
        }
    }
}

impl fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GenerationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "full" => Ok(GenerationMode::Full),
            "lightweight" => Ok(GenerationMode::Lightweight),
            "two-phase" | "two_phase" | "twophase" => Ok(GenerationMode::TwoPhase),
            other => Err(format!("未知的生成模式: {}", other)),
        }
    }
}

/// 一次语言模型调用所处的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// full / lightweight 模式下唯一的一次调用
    Single,
    Phase1,
    Phase2,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Single => f.write_str("single"),
            Phase::Phase1 => f.write_str("phase1"),
            Phase::Phase2 => f.write_str("phase2"),
        }
    }
}

/// 单篇论文流水线的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStatus {
    Pending,
    Fetching,
    Generating,
    Done,
    Failed,
}

impl PipelineStatus {
    /// 合法的状态转换：pending → fetching → generating → done，
    /// 任何未结束的状态都可以进入 failed
    pub fn can_advance_to(self, next: PipelineStatus) -> bool {
        use PipelineStatus::*;
        matches!(
            (self, next),
            (Pending, Fetching)
                | (Fetching, Generating)
                | (Generating, Done)
                | (Pending | Fetching | Generating, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineStatus::Done | PipelineStatus::Failed)
    }
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStatus::Pending => "pending",
            PipelineStatus::Fetching => "fetching",
            PipelineStatus::Generating => "generating",
            PipelineStatus::Done => "done",
            PipelineStatus::Failed => "failed",
        };
        f.write_str(name)
    }
}
