use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;

use crate::error::AgentError;
use crate::services::matcher::{is_script, ProcessMatcher};
use crate::services::path_identity;

/// 启动进程：已在运行则拒绝，工作目录设为可执行文件所在目录
#[derive(Clone)]
pub struct ProcessLauncher {
    matcher: ProcessMatcher,
}

impl ProcessLauncher {
    pub fn new(matcher: ProcessMatcher) -> Self {
        Self { matcher }
    }

    /// 启动后立即返回子进程 PID，不等待其初始化完成
    pub async fn start(&self, path: &str, args: &[String]) -> Result<u32, AgentError> {
        let resolved = path_identity::resolve_executable(path)?;
        let display = resolved.display().to_string();

        if !resolved.exists() {
            return Err(AgentError::FileNotFound(display));
        }

        match self.matcher.is_running(&display).await {
            Ok(true) => return Err(AgentError::AlreadyRunning(display)),
            Ok(false) => {}
            Err(e) => log::warn!("Failed to check if process is running: {}", e),
        }

        let mut command = build_command(&resolved, args);
        if let Some(dir) = resolved.parent() {
            command.current_dir(dir);
        }

        let child = command.spawn().map_err(|source| {
            log::error!("Failed to start process {}: {}", display, source);
            AgentError::LaunchFailed {
                path: display.clone(),
                source,
            }
        })?;

        let pid = child.id().unwrap_or_default();
        log::info!("Process started: {} (PID {})", display, pid);
        Ok(pid)
    }
}

/// 检查文件能否被 [`ProcessLauncher`] 启动，返回不能启动的原因
#[cfg(windows)]
pub fn check_launchable(target: &Path, _metadata: &std::fs::Metadata) -> Result<(), &'static str> {
    let launchable = target
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| matches!(ext.as_str(), "exe" | "bat" | "cmd"));

    if launchable {
        Ok(())
    } else {
        Err("path must be an executable (.exe) or batch file (.bat, .cmd)")
    }
}

/// 检查文件能否被 [`ProcessLauncher`] 启动，返回不能启动的原因
#[cfg(unix)]
pub fn check_launchable(target: &Path, metadata: &std::fs::Metadata) -> Result<(), &'static str> {
    use std::os::unix::fs::PermissionsExt;

    // 脚本通过解释器启动，不需要可执行位
    if is_script(&target.to_string_lossy()) || metadata.permissions().mode() & 0o111 != 0 {
        Ok(())
    } else {
        Err("path must be a shell script (.sh) or an executable file")
    }
}

fn build_command(resolved: &Path, args: &[String]) -> Command {
    let mut command = if is_script(&resolved.to_string_lossy()) {
        interpreter_command(resolved)
    } else {
        Command::new(resolved)
    };

    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(false);

    // 子进程独立于 agent 的进程组，agent 重启不会连带结束服务器
    #[cfg(unix)]
    command.process_group(0);

    #[cfg(windows)]
    {
        const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
        command.creation_flags(CREATE_NEW_PROCESS_GROUP);
    }

    command
}

#[cfg(windows)]
fn interpreter_command(script: &Path) -> Command {
    let mut command = Command::new("cmd.exe");
    command.arg("/c").arg(script);
    command
}

#[cfg(not(windows))]
fn interpreter_command(script: &Path) -> Command {
    let mut command = Command::new("sh");
    command.arg(script);
    command
}
