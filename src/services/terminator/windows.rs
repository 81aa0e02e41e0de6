use std::io;
use std::process::{Command, Stdio};

use super::Terminator;

/// Windows 实现：taskkill 请求关闭，taskkill /F 强制结束
#[derive(Debug, Default, Clone, Copy)]
pub struct TaskkillTerminator;

impl TaskkillTerminator {
    fn taskkill(pid: u32, force: bool) -> io::Result<()> {
        let pid_string = pid.to_string();
        let mut command = Command::new("taskkill");
        command.args(["/PID", &pid_string, "/T"]);
        if force {
            command.arg("/F");
        }

        let status = command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()?;

        // 128: 找不到进程
        if status.success() || status.code() == Some(128) {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::Other,
                format!("taskkill exited with {status} for PID {pid}"),
            ))
        }
    }
}

impl Terminator for TaskkillTerminator {
    fn request_stop(&self, pid: u32) -> io::Result<()> {
        Self::taskkill(pid, false)
    }

    fn force_kill(&self, pid: u32) -> io::Result<()> {
        Self::taskkill(pid, true)
    }
}
