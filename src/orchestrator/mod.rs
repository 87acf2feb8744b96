//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层决定一篇论文的成败，并负责批量处理和统计。
//!
//! ### `paper_processor` - 单篇论文处理器
//! - 检查最终产物缓存
//! - 通过 SourceResolver 获取必需数据，结束后释放浏览器
//! - 读取 PDF 文本和评论
//! - 驱动 GenerationPipeline，把各层错误映射为 `PaperError`
//!
//! ### `batch_processor` - 批量处理器
//! - 组装真实的外部适配器
//! - 按顺序逐篇处理，失败不影响后续论文
//! - 写运行日志，输出全局统计信息
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<PaperId>)
//!     ↓
//! paper_processor (处理单篇论文)
//!     ↓
//! workflow (SourceResolver / GenerationPipeline)
//!     ↓
//! services / browser / api / cache
//! ```

pub mod batch_processor;
pub mod paper_processor;

pub use batch_processor::{load_paper_ids, save_summary, App, ProcessingStats};
pub use paper_processor::{Collaborators, PaperOutcome, PaperProcessor};
