use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::services::{EscalationPolicy, OrchestratorSettings};

/// Server Agent - 按顺序启动/停止游戏服务器进程
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// 监听端口
    #[arg(short, long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// 监听地址
    #[arg(short = 'a', long, env = "ADDRESS", default_value = "0.0.0.0")]
    pub address: String,

    /// 进程配置文件（JSON），不存在时自动创建
    #[arg(short, long, env = "STORE_PATH", default_value = "server-processes.json")]
    pub store: PathBuf,

    /// 等待进程就绪的超时时间（秒）
    #[arg(long, env = "READINESS_TIMEOUT_SECS", default_value_t = 60)]
    pub readiness_timeout_secs: u64,

    /// 就绪检查间隔（秒）
    #[arg(long, env = "READINESS_INTERVAL_SECS", default_value_t = 2)]
    pub readiness_interval_secs: u64,

    /// 发送终止请求后等待退出的时间（秒）
    #[arg(long, env = "GRACE_PERIOD_SECS", default_value_t = 5)]
    pub grace_period_secs: u64,

    /// 强制结束后等待退出的时间（秒）
    #[arg(long, env = "KILL_WAIT_SECS", default_value_t = 2)]
    pub kill_wait_secs: u64,
}

impl CommandArgs {
    pub fn settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            readiness_timeout: Duration::from_secs(self.readiness_timeout_secs),
            readiness_interval: Duration::from_secs(self.readiness_interval_secs.max(1)),
            escalation: EscalationPolicy {
                grace_period: Duration::from_secs(self.grace_period_secs),
                kill_wait: Duration::from_secs(self.kill_wait_secs),
            },
        }
    }
}
