use std::io;

use nix::errno::Errno;
use nix::sys::signal::{kill, killpg, Signal};
use nix::unistd::{getpgid, Pid};

use super::Terminator;

/// POSIX 信号实现：SIGTERM 请求退出，SIGKILL 强制结束
///
/// 目标是进程组组长时（launcher 启动的子进程都是），信号发给整个进程组，
/// 脚本派生的子进程会一起结束。
#[derive(Debug, Default, Clone, Copy)]
pub struct SignalTerminator;

impl SignalTerminator {
    fn send(pid: u32, signal: Signal) -> io::Result<()> {
        let raw = i32::try_from(pid)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;

        let target = Pid::from_raw(raw);
        let result = match getpgid(Some(target)) {
            Ok(group) if group == target => killpg(group, signal),
            _ => kill(target, signal),
        };

        match result {
            Ok(()) => Ok(()),
            // 进程已经不存在
            Err(Errno::ESRCH) => Ok(()),
            Err(errno) => Err(io::Error::from(errno)),
        }
    }
}

impl Terminator for SignalTerminator {
    fn request_stop(&self, pid: u32) -> io::Result<()> {
        Self::send(pid, Signal::SIGTERM)
    }

    fn force_kill(&self, pid: u32) -> io::Result<()> {
        Self::send(pid, Signal::SIGKILL)
    }
}
