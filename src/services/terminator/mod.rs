use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, Instant};

use crate::error::AgentError;
use crate::services::matcher::ProcessMatcher;

#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

#[cfg(unix)]
pub use unix::SignalTerminator;
#[cfg(windows)]
pub use windows::TaskkillTerminator;

/// 退出确认的轮询间隔
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// 平台相关的进程终止能力
///
/// 目标进程已不存在时应返回 `Ok(())`。
pub trait Terminator: Send + Sync {
    /// 请求进程自行退出（SIGTERM 或等价方式）
    fn request_stop(&self, pid: u32) -> io::Result<()>;

    /// 强制结束进程（SIGKILL 或等价方式）
    fn force_kill(&self, pid: u32) -> io::Result<()>;
}

/// 当前平台的终止实现
pub fn platform_terminator() -> Box<dyn Terminator> {
    #[cfg(unix)]
    {
        Box::new(SignalTerminator)
    }
    #[cfg(windows)]
    {
        Box::new(TaskkillTerminator)
    }
}

/// 两阶段终止的等待时间
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscalationPolicy {
    /// 发送终止请求后的等待时间
    pub grace_period: Duration,
    /// 强制结束后的等待时间
    pub kill_wait: Duration,
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self {
            grace_period: Duration::from_secs(5),
            kill_wait: Duration::from_secs(2),
        }
    }
}

/// 停止所有与配置路径匹配的进程
pub struct ProcessTerminator {
    matcher: ProcessMatcher,
    terminator: Arc<dyn Terminator>,
    policy: EscalationPolicy,
}

#[derive(Debug, Clone, Copy)]
enum Action {
    RequestStop,
    ForceKill,
}

impl ProcessTerminator {
    pub fn new(
        matcher: ProcessMatcher,
        terminator: Box<dyn Terminator>,
        policy: EscalationPolicy,
    ) -> Self {
        Self {
            matcher,
            terminator: Arc::from(terminator),
            policy,
        }
    }

    /// 对每个匹配进程独立执行终止流程；任一失败都不会中断其余进程，
    /// 返回最后一个错误
    pub async fn stop(&self, path: &str) -> Result<(), AgentError> {
        let targets = self.matcher.find_matches(path).await?;
        if targets.is_empty() {
            return Err(AgentError::NotFound(path.to_string()));
        }

        let mut last_err = None;
        for target in &targets {
            match self.escalate(path, target.pid).await {
                Ok(()) => log::info!("Process terminated: {} (PID {})", path, target.pid),
                Err(e) => {
                    log::error!("Failed to terminate process {}: {}", target.pid, e);
                    last_err = Some(e);
                }
            }
        }

        match last_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn escalate(&self, path: &str, pid: u32) -> Result<(), AgentError> {
        match self.send(Action::RequestStop, pid).await {
            Ok(()) => {
                if self.wait_for_exit(pid, self.policy.grace_period).await {
                    return Ok(());
                }
                log::warn!(
                    "Process {} did not exit within {:?}, forcing termination",
                    pid,
                    self.policy.grace_period
                );
            }
            Err(e) => log::warn!(
                "Stop request to process {} failed ({}), forcing termination",
                pid,
                e
            ),
        }

        self.send(Action::ForceKill, pid)
            .await
            .map_err(|e| AgentError::TerminationFailed {
                path: path.to_string(),
                pid,
                reason: format!("forced kill failed: {e}"),
            })?;

        if self.wait_for_exit(pid, self.policy.kill_wait).await {
            Ok(())
        } else {
            Err(AgentError::TerminationFailed {
                path: path.to_string(),
                pid,
                reason: format!("still running {:?} after forced kill", self.policy.kill_wait),
            })
        }
    }

    /// 信号发送可能调用外部命令（taskkill），放到阻塞线程池执行
    async fn send(&self, action: Action, pid: u32) -> io::Result<()> {
        let terminator = Arc::clone(&self.terminator);

        tokio::task::spawn_blocking(move || match action {
            Action::RequestStop => terminator.request_stop(pid),
            Action::ForceKill => terminator.force_kill(pid),
        })
        .await
        .map_err(io::Error::other)?
    }

    async fn wait_for_exit(&self, pid: u32, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if !self.matcher.inventory().is_alive(pid) {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            sleep(EXIT_POLL_INTERVAL.min(timeout)).await;
        }
    }
}
