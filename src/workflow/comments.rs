//! 评论合并

/// 合并评论：评论文件在前，命令行评论按给出顺序在后，块之间空一行
///
/// 去掉首尾空白后为空的块会被跳过；什么都没有时返回空字符串。
pub fn merge(file_comment: Option<&str>, cli_comments: &[String]) -> String {
    file_comment
        .into_iter()
        .chain(cli_comments.iter().map(String::as_str))
        .map(|block| block.trim_start_matches(['\n', '\r']).trim_end())
        .filter(|block| !block.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}
