use std::time::Duration;

use tokio::time::{interval_at, sleep_until, Instant, MissedTickBehavior};

use crate::error::AgentError;
use crate::services::matcher::ProcessMatcher;
use crate::services::port_probe::{self, LOCALHOST};

/// 单次端口探测的连接超时
const PORT_CHECK_TIMEOUT: Duration = Duration::from_secs(2);

/// 按固定间隔轮询，直到进程就绪或超时
#[derive(Clone)]
pub struct ReadinessWaiter {
    matcher: ProcessMatcher,
}

impl ReadinessWaiter {
    pub fn new(matcher: ProcessMatcher) -> Self {
        Self { matcher }
    }

    /// 配置了端口时以端口可连接为就绪，否则以进程出现在进程表中为就绪
    pub async fn wait_ready(
        &self,
        path: &str,
        port: Option<u16>,
        timeout: Duration,
        interval: Duration,
    ) -> Result<(), AgentError> {
        let deadline = Instant::now() + timeout;
        let mut ticker = interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let expired = sleep_until(deadline);
        tokio::pin!(expired);

        loop {
            tokio::select! {
                _ = &mut expired => {
                    let target = match port {
                        Some(port) => format!("port {port} of {path}"),
                        None => format!("process {path}"),
                    };
                    return Err(AgentError::ReadinessTimeout {
                        target,
                        timeout_secs: timeout.as_secs(),
                    });
                }
                _ = ticker.tick() => {
                    if self.check_once(path, port).await {
                        return Ok(());
                    }
                }
            }
        }
    }

    async fn check_once(&self, path: &str, port: Option<u16>) -> bool {
        match port {
            Some(port) => match port_probe::probe(LOCALHOST, port, PORT_CHECK_TIMEOUT).await {
                Ok(open) => open,
                Err(e) => {
                    log::warn!("Error checking port {}: {}", port, e);
                    false
                }
            },
            None => match self.matcher.is_running(path).await {
                Ok(running) => running,
                Err(e) => {
                    log::warn!("Error checking process {}: {}", path, e);
                    false
                }
            },
        }
    }
}
