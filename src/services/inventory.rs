use chrono::{DateTime, Utc};
use sysinfo::{
    Pid, ProcessRefreshKind, ProcessStatus as OsProcessStatus, ProcessesToUpdate, System,
    UpdateKind,
};

use crate::error::AgentError;
use crate::models::ProcessInfo;

/// 操作系统进程表的查询接口
///
/// 每次调用都重新枚举，结果不做缓存。
pub trait ProcessInventory: Send + Sync {
    /// 当前所有可见进程的快照
    fn list_processes(&self) -> Result<Vec<ProcessInfo>, AgentError>;

    /// 进程是否仍然存在（僵尸进程视为已退出）
    fn is_alive(&self, pid: u32) -> bool;
}

/// 基于 sysinfo 的进程表实现
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemInventory;

impl SystemInventory {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessInventory for SystemInventory {
    fn list_processes(&self) -> Result<Vec<ProcessInfo>, AgentError> {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return Err(AgentError::InventoryUnavailable(
                "process enumeration is not supported on this platform".to_string(),
            ));
        }

        let mut sys = System::new();
        sys.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing()
                .with_exe(UpdateKind::Always)
                .with_cmd(UpdateKind::Always),
        );

        let mut result = Vec::with_capacity(sys.processes().len());

        for (pid, process) in sys.processes() {
            let name = process.name().to_string_lossy().into_owned();
            // 名称都拿不到的进程（通常已退出）直接跳过
            if name.is_empty() {
                continue;
            }

            let path = process
                .exe()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default();

            let command_line = process
                .cmd()
                .iter()
                .map(|s| s.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ");

            let start_time = DateTime::<Utc>::from_timestamp(process.start_time() as i64, 0)
                .unwrap_or_default();

            result.push(ProcessInfo {
                pid: pid.as_u32(),
                name,
                path,
                command_line,
                start_time,
            });
        }

        log::debug!("Process inventory: {} processes", result.len());
        Ok(result)
    }

    fn is_alive(&self, pid: u32) -> bool {
        let sys_pid = Pid::from_u32(pid);
        let mut sys = System::new();
        sys.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[sys_pid]),
            true,
            ProcessRefreshKind::nothing(),
        );

        sys.process(sys_pid)
            .is_some_and(|p| !matches!(p.status(), OsProcessStatus::Zombie | OsProcessStatus::Dead))
    }
}
