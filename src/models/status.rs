use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::models::ProcessDefinition;

/// 进程的即时状态，每次请求重新计算
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessStatus {
    pub running: bool,
    /// 仅在配置了端口时存在
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port_open: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_uptime_seconds: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_uptime_seconds: Option<i64>,
}

impl ProcessStatus {
    /// 根据进程配置和实时观测结果计算状态
    ///
    /// 两个运行时长字段最多只会有一个：运行中返回当前运行时长，
    /// 否则返回上一次运行的时长
    pub fn compute(
        definition: &ProcessDefinition,
        running: bool,
        port_open: Option<bool>,
        now: DateTime<Utc>,
    ) -> Self {
        let port_open = definition.port.and(port_open);

        let (current_uptime_seconds, last_uptime_seconds) =
            match (running, definition.start_time, definition.end_time) {
                (true, Some(start), _) => (Some((now - start).num_seconds().max(0)), None),
                (false, Some(start), Some(end)) => (None, Some((end - start).num_seconds().max(0))),
                _ => (None, None),
            };

        Self {
            running,
            port_open,
            start_time: definition.start_time.map(format_timestamp),
            end_time: definition.end_time.map(format_timestamp),
            current_uptime_seconds,
            last_uptime_seconds,
        }
    }
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}
