use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{Config, RunOptions};
use crate::models::GenerationMode;

/// paper-summary - 学术论文解读生成工具
#[derive(Parser, Debug)]
#[command(name = "paper-summary")]
#[command(about = "获取 arXiv 论文元数据与 Kimi 解读，调用大模型生成中文论文解读")]
#[command(version)]
pub struct Cli {
    /// 配置文件路径（默认读取当前目录下的 paper-summary.toml）
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// 是否启用详细日志
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 为单篇论文生成解读
    Generate {
        /// 论文 ID，例如 2401.01234
        paper_id: String,

        #[command(flatten)]
        run: RunArgs,

        /// 临时评论，可重复，按给出顺序追加在评论文件之后
        #[arg(short = 'c', long = "comment")]
        comments: Vec<String>,

        /// LLM API KEY，覆盖配置文件和环境变量
        #[arg(long)]
        api_key: Option<String>,
    },
    /// 批量处理论文列表文件（每行一个 ID）
    Batch {
        /// 论文列表文件
        file: PathBuf,

        /// 输出目录（默认使用配置中的 summaries_dir）
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        run: RunArgs,
    },
    /// 显示当前生效的配置
    ConfigShow,
}

/// 单次运行的开关
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// 忽略缓存，重新获取并生成
    #[arg(long)]
    pub force: bool,

    /// 只使用缓存，不访问网络和浏览器
    #[arg(long, conflicts_with = "force")]
    pub no_download: bool,

    /// 不使用 PDF 文本
    #[arg(long)]
    pub no_pdf: bool,

    /// 生成模式: full / lightweight / two-phase
    #[arg(long)]
    pub mode: Option<GenerationMode>,
}

impl RunArgs {
    pub fn options(&self) -> RunOptions {
        RunOptions {
            force: self.force,
            no_download: self.no_download,
            use_pdf: !self.no_pdf,
        }
    }

    /// 把命令行上的模式写入配置
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(mode) = self.mode {
            config.summary.mode = mode;
        }
    }
}
