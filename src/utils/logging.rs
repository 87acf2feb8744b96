//! 日志工具模块
//!
//! 提供日志初始化、运行日志文件和批量处理的日志输出辅助函数

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化 tracing
///
/// `RUST_LOG` 优先；否则默认 info，`verbose` 时为 debug。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("paper_summary={},warn", default_level)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 初始化运行日志文件
pub fn init_run_log(log_file_path: &Path) -> Result<()> {
    if let Some(parent) = log_file_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("无法创建日志目录: {}", parent.display()))?;
        }
    }
    let log_header = format!(
        "{}\n论文处理日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)
        .with_context(|| format!("无法写入日志文件: {}", log_file_path.display()))?;
    Ok(())
}

/// 追加一行到运行日志
pub fn append_run_log(log_file_path: &Path, line: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)
        .with_context(|| format!("无法打开日志文件: {}", log_file_path.display()))?;
    writeln!(
        file,
        "[{}] {}",
        chrono::Local::now().format("%H:%M:%S"),
        line
    )?;
    Ok(())
}

/// 记录程序启动信息
pub fn log_startup(mode: &str, flex_mode: bool) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 顺序批量处理模式");
    info!("📝 生成模式: {}", mode);
    info!("🔀 灵活模式: {}", if flex_mode { "开启" } else { "关闭" });
    info!("{}", "=".repeat(60));
}

/// 记录论文列表加载信息
pub fn log_papers_loaded(total: usize) {
    info!("✓ 找到 {} 篇待处理的论文", total);
    info!("💡 逐篇顺序处理，单篇失败不影响后续论文\n");
}

/// 记录单篇论文开始
pub fn log_paper_start(index: usize, total: usize, paper_id: &str) {
    info!("\n{}", "─".repeat(60));
    info!("📄 [{}/{}] {}", index, total, paper_id);
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
pub fn print_final_stats(
    success: usize,
    cached: usize,
    failed: usize,
    total: usize,
    log_file_path: &Path,
) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{} (其中缓存 {})", success, total, cached);
    info!("❌ 失败: {}", failed);
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path.display());
}

/// 截断长文本用于日志显示
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("你好世界", 2), "你好...");
        assert_eq!(truncate_text("abc", 5), "abc");
    }

    #[test]
    fn test_run_log_header_and_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("run.txt");

        init_run_log(&path).unwrap();
        append_run_log(&path, "✅ 2401.01234").unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("论文处理日志"));
        assert!(content.ends_with("✅ 2401.01234\n"));
    }
}
