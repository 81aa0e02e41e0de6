use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 一个受管进程的持久化配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessDefinition {
    pub id: i64,
    /// 显示名称
    pub name: String,
    /// 可执行文件或脚本路径
    pub path: String,
    /// 声明后以 TCP 端口作为就绪信号
    #[serde(default)]
    pub port: Option<u16>,
    /// 启动顺序（升序启动，降序停止）
    #[serde(default)]
    pub sequence_order: i32,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
}

impl ProcessDefinition {
    /// 排序键：先按顺序号，再按 id
    pub fn sequence_key(&self) -> (i32, i64) {
        (self.sequence_order, self.id)
    }
}

/// 新建或修改进程配置时由调用方提供的字段
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProcessSpec {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub port: Option<u16>,
}

/// 调整单个进程的启动顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SequenceUpdate {
    pub id: i64,
    pub sequence_order: i32,
}

/// 按启动顺序排序
pub fn sort_by_sequence(definitions: &mut [ProcessDefinition]) {
    definitions.sort_by_key(ProcessDefinition::sequence_key);
}

/// 单次进程快照中的一条记录，不做缓存
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
    /// 可执行文件路径，无法解析时为空
    pub path: String,
    /// 完整命令行，无法读取时为空
    pub command_line: String,
    pub start_time: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition(id: i64, order: i32) -> ProcessDefinition {
        ProcessDefinition {
            id,
            name: format!("proc-{id}"),
            path: format!("/srv/game/proc-{id}"),
            port: None,
            sequence_order: order,
            start_time: None,
            end_time: None,
        }
    }

    #[test]
    fn test_sort_breaks_ties_by_id() {
        let mut defs = vec![definition(5, 2), definition(3, 1), definition(1, 2), definition(9, 0)];
        sort_by_sequence(&mut defs);

        let ids: Vec<i64> = defs.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![9, 3, 1, 5]);
    }

    #[test]
    fn test_definition_defaults_when_fields_missing() {
        let json = r#"{"id":1,"name":"GatewaySrv","path":"C:/A3/gateway.exe"}"#;
        let def: ProcessDefinition = serde_json::from_str(json).unwrap();

        assert_eq!(def.port, None);
        assert_eq!(def.sequence_order, 0);
        assert!(def.start_time.is_none());
        assert!(def.end_time.is_none());
    }
}
