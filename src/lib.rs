//! # Paper Summary
//!
//! 获取学术论文（arXiv）的元数据与 papers.cool 上的 Kimi 解读，
//! 调用大模型生成中文论文解读，并缓存每一步的结果。
//!
//! ## 架构设计
//!
//! 本系统采用四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `browser/` - 无头浏览器抓取（主来源），会话按论文打开、用完即关
//! - `api/` - arXiv / papers.cool 回退 API，只在灵活模式允许时使用
//! - `cache/` - 按 (论文, 阶段, 来源) 持久化的缓存
//!
//! ### ② 业务能力层（Services）
//! - `TextGenerator` - LLM 文本生成能力
//! - `PdfExtractor` - PDF 文本读取能力
//! - `CommentSource` - 评论文件读取能力
//!
//! ### ③ 流程层（Workflow）
//! - `SourceResolver` - 缓存 → 浏览器 → 回退 API 的获取决策
//! - `GenerationPipeline` - full / lightweight / two-phase 生成状态机
//! - `comments::merge` - 评论合并
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/paper_processor` - 单篇论文处理，决定成败
//! - `orchestrator/batch_processor` - 顺序批量处理与统计

pub mod api;
pub mod browser;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use cache::CacheStore;
pub use config::{Config, FlexModePolicy, RunOptions};
pub use error::PaperError;
pub use models::{GenerationMode, PaperId};
pub use orchestrator::{App, Collaborators, PaperOutcome, PaperProcessor};
