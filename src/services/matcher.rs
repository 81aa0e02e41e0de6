use std::path::Path;
use std::sync::Arc;

use crate::error::AgentError;
use crate::models::ProcessInfo;
use crate::services::inventory::ProcessInventory;
use crate::services::path_identity::{normalize, normalize_command_line, resolve_executable};

/// 需要通过解释器启动的脚本扩展名
#[cfg(windows)]
pub const SCRIPT_EXTENSIONS: &[&str] = &["bat", "cmd"];
#[cfg(not(windows))]
pub const SCRIPT_EXTENSIONS: &[&str] = &["sh"];

/// 运行脚本时进程表中可见的解释器进程名
#[cfg(windows)]
pub const INTERPRETER_NAMES: &[&str] = &["cmd.exe"];
#[cfg(not(windows))]
pub const INTERPRETER_NAMES: &[&str] = &["sh", "bash", "dash"];

pub fn is_script(path: &str) -> bool {
    Path::new(path)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| SCRIPT_EXTENSIONS.contains(&ext.as_str()))
}

/// 判断进程是否对应某个配置路径的策略
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchStrategy {
    /// 普通可执行文件：规范化后的可执行路径相等
    DirectExecutableMatch { path: String },
    /// 脚本：进程表中只能看到解释器，按命令行子串匹配（启发式）
    InterpreterCommandLineMatch { script: String },
}

impl MatchStrategy {
    pub fn for_path(path: &str) -> Result<Self, AgentError> {
        let target = resolve_executable(path)?;
        let normalized = normalize(&target.to_string_lossy())?;

        if is_script(path) {
            Ok(MatchStrategy::InterpreterCommandLineMatch {
                script: normalize_command_line(&normalized),
            })
        } else {
            Ok(MatchStrategy::DirectExecutableMatch { path: normalized })
        }
    }

    pub fn matches(&self, process: &ProcessInfo) -> bool {
        match self {
            MatchStrategy::DirectExecutableMatch { path } => {
                if process.path.is_empty() {
                    return false;
                }
                normalize(&process.path).is_ok_and(|candidate| &candidate == path)
            }
            MatchStrategy::InterpreterCommandLineMatch { script } => {
                if process.command_line.is_empty() || !is_interpreter(&process.name) {
                    return false;
                }
                normalize_command_line(&process.command_line).contains(script.as_str())
            }
        }
    }
}

fn is_interpreter(name: &str) -> bool {
    INTERPRETER_NAMES
        .iter()
        .any(|interpreter| interpreter.eq_ignore_ascii_case(name))
}

/// 在进程快照中查找与配置路径对应的进程
#[derive(Clone)]
pub struct ProcessMatcher {
    inventory: Arc<dyn ProcessInventory>,
}

impl ProcessMatcher {
    pub fn new(inventory: Arc<dyn ProcessInventory>) -> Self {
        Self { inventory }
    }

    pub fn inventory(&self) -> &Arc<dyn ProcessInventory> {
        &self.inventory
    }

    /// 获取所有匹配的进程
    ///
    /// 完整扫描进程表并逐个规范化路径，属于阻塞操作；异步代码使用 [`Self::find_matches`]。
    pub fn find_matches_blocking(&self, path: &str) -> Result<Vec<ProcessInfo>, AgentError> {
        let strategy = MatchStrategy::for_path(path)?;
        let processes = self.inventory.list_processes()?;

        let matches: Vec<ProcessInfo> = processes
            .into_iter()
            .filter(|p| strategy.matches(p))
            .collect();

        log::debug!("{:?} matched {} process(es) for {}", strategy, matches.len(), path);
        Ok(matches)
    }

    pub async fn find_matches(&self, path: &str) -> Result<Vec<ProcessInfo>, AgentError> {
        let matcher = self.clone();
        let path = path.to_string();

        tokio::task::spawn_blocking(move || matcher.find_matches_blocking(&path))
            .await
            .map_err(|e| {
                AgentError::InventoryUnavailable(format!("process scan task failed: {e}"))
            })?
    }

    /// 检查进程是否正在运行
    pub async fn is_running(&self, path: &str) -> Result<bool, AgentError> {
        Ok(!self.find_matches(path).await?.is_empty())
    }
}
