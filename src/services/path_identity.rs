use std::path::{Component, Path, PathBuf};

use crate::error::AgentError;

/// 路径比较规则
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStyle {
    /// 忽略大小写，统一使用反斜杠（Windows）
    CaseInsensitive,
    /// 区分大小写，统一使用正斜杠
    CaseSensitive,
}

impl PathStyle {
    pub const fn native() -> Self {
        if cfg!(windows) {
            PathStyle::CaseInsensitive
        } else {
            PathStyle::CaseSensitive
        }
    }

    fn fold(self, text: &str) -> String {
        match self {
            PathStyle::CaseInsensitive => text.to_lowercase().replace('/', "\\"),
            PathStyle::CaseSensitive => text.replace('\\', "/"),
        }
    }
}

/// 解析为绝对路径（不改变大小写）
///
/// 非 Windows 平台上文件存在时会解析符号链接，保证与进程表里的
/// 可执行文件路径一致；否则只做词法清理（`.`、`..`、多余分隔符）。
pub fn resolve(path: &str) -> Result<PathBuf, AgentError> {
    if path.trim().is_empty() {
        return Err(AgentError::invalid_path(path, "path is empty"));
    }

    let absolute = std::path::absolute(path)
        .map_err(|e| AgentError::invalid_path(path, format!("failed to get absolute path: {e}")))?;

    if cfg!(windows) {
        return Ok(lexical_clean(&absolute));
    }

    Ok(std::fs::canonicalize(&absolute).unwrap_or_else(|_| lexical_clean(&absolute)))
}

/// 没有扩展名的可执行文件在该平台上默认补全的扩展名
#[cfg(windows)]
pub const DEFAULT_EXECUTABLE_EXTENSION: Option<&str> = Some("exe");
#[cfg(not(windows))]
pub const DEFAULT_EXECUTABLE_EXTENSION: Option<&str> = None;

/// 解析为实际被启动的文件路径：Windows 上 `GatewaySrv` 指向 `GatewaySrv.exe`
pub fn resolve_executable(path: &str) -> Result<PathBuf, AgentError> {
    Ok(with_default_extension(resolve(path)?, DEFAULT_EXECUTABLE_EXTENSION))
}

fn with_default_extension(path: PathBuf, extension: Option<&str>) -> PathBuf {
    match extension {
        Some(ext) if path.extension().is_none() => path.with_extension(ext),
        _ => path,
    }
}

/// 生成用于相等比较的规范化路径字符串
pub fn normalize(path: &str) -> Result<String, AgentError> {
    normalize_with(path, PathStyle::native())
}

pub fn normalize_with(path: &str, style: PathStyle) -> Result<String, AgentError> {
    let resolved = resolve(path)?;
    Ok(style.fold(&resolved.to_string_lossy()))
}

/// 规范化命令行：去掉引号和首尾空白，再按平台规则统一大小写/分隔符
pub fn normalize_command_line(command_line: &str) -> String {
    normalize_command_line_with(command_line, PathStyle::native())
}

pub fn normalize_command_line_with(command_line: &str, style: PathStyle) -> String {
    let unquoted: String = command_line.chars().filter(|c| *c != '"').collect();
    style.fold(unquoted.trim())
}

fn lexical_clean(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // 根目录之上没有父目录
                let at_root = matches!(
                    cleaned.components().next_back(),
                    None | Some(Component::RootDir | Component::Prefix(_))
                );
                if !at_root {
                    cleaned.pop();
                }
            }
            other => cleaned.push(other.as_os_str()),
        }
    }
    cleaned
}
