//! 流程层
//!
//! - `resolver`：单个数据项的获取决策（缓存 → 浏览器 → 回退 API）
//! - `pipeline`：单篇论文的生成状态机
//! - `comments` / `prompt`：纯函数，组装生成输入

pub mod comments;
pub mod pipeline;
pub mod prompt;
pub mod resolver;

pub use pipeline::{GenerationPipeline, PipelineRun};
pub use prompt::PipelineInputs;
pub use resolver::{next_step, PrimaryOutcome, ResolveStep, SourceResolver};
