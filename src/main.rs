use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use paper_summary::cli::{Cli, Commands};
use paper_summary::config::Config;
use paper_summary::error::PaperError;
use paper_summary::models::PaperId;
use paper_summary::orchestrator::{load_paper_ids, save_summary, App};
use paper_summary::utils::logging;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // 初始化日志
    logging::init(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("❌ {:#}", e);
            if let Some(paper_error) = e.downcast_ref::<PaperError>() {
                eprintln!("💡 {}", paper_error.hint());
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    // 加载配置
    let mut config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Generate {
            paper_id,
            run,
            comments,
            api_key,
        } => {
            let paper_id = PaperId::parse(&paper_id)?;
            run.apply_to(&mut config);
            if let Some(key) = api_key {
                config.llm.api_key = key;
            }
            let summaries_dir = config.paths.summaries_dir.clone();

            let app = App::initialize(config, run.options())?;
            let outcome = app.generate_one(&paper_id, &comments).await?;
            let path = save_summary(&summaries_dir, &paper_id, &outcome.text)?;

            println!("{}", outcome.text);
            info!("💾 已保存: {}", path.display());
            Ok(ExitCode::SUCCESS)
        }
        Commands::Batch { file, output, run } => {
            run.apply_to(&mut config);
            let output_dir = output.unwrap_or_else(|| config.paths.summaries_dir.clone());
            let paper_ids = load_paper_ids(&file)?;

            let app = App::initialize(config, run.options())?;
            let stats = app
                .run_batch(&paper_ids, &output_dir)
                .await
                .context("批量处理失败")?;

            Ok(if stats.failed == 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::ConfigShow => {
            print_config(&config);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn print_config(config: &Config) {
    println!("{}", "=".repeat(60));
    println!("当前配置");
    println!("{}", "=".repeat(60));
    println!("LLM API 密钥: {}", config.masked_api_key());
    println!("LLM API 地址: {}", config.llm.api_base_url);
    println!("LLM 模型: {}", config.llm.model_name);
    println!(
        "生成模式: {} (实际: {})",
        config.summary.mode,
        config.summary.effective_mode()
    );
    println!(
        "灵活模式: {} (arXiv API: {}, papers.cool API: {})",
        config.flex_mode.enabled, config.flex_mode.arxiv_api, config.flex_mode.papers_cool_api
    );
    println!(
        "浏览器: {} (无头: {})",
        config.browser.enabled, config.browser.headless
    );
    if !config.browser.proxy.is_empty() {
        println!("代理: {}", config.browser.proxy);
    }
    println!("缓存目录: {}", config.paths.cache_dir.display());
    println!("PDF 文本目录: {}", config.paths.pdf_dir.display());
    println!("评论目录: {}", config.paths.comments_dir.display());
    println!("输出目录: {}", config.paths.summaries_dir.display());
    println!("获取超时: {} 秒", config.acquisition.timeout_secs);
    println!("{}", "=".repeat(60));
}
