use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{sort_by_sequence, ProcessDefinition, ProcessSpec, SequenceUpdate};

#[cfg(test)]
pub mod memory;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("malformed store file {path}: {source}")]
    Format {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("server process {0} not found")]
    Missing(i64),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// 进程配置的持久化接口
pub trait ProcessStore: Send + Sync {
    /// 按启动顺序返回所有进程配置
    fn definitions(&self) -> Result<Vec<ProcessDefinition>, StoreError>;

    fn definition(&self, id: i64) -> Result<Option<ProcessDefinition>, StoreError>;

    fn update_start_time(&self, id: i64, timestamp: DateTime<Utc>) -> Result<(), StoreError>;

    fn update_end_time(&self, id: i64, timestamp: DateTime<Utc>) -> Result<(), StoreError>;

    /// 新建配置：分配新 id，顺序号排在现有配置之后
    fn create(&self, spec: &ProcessSpec) -> Result<ProcessDefinition, StoreError>;

    /// 替换名称、路径和端口，保留顺序号和时间戳
    fn update(&self, id: i64, spec: &ProcessSpec) -> Result<ProcessDefinition, StoreError>;

    fn delete(&self, id: i64) -> Result<(), StoreError>;

    /// 批量修改顺序号；任一 id 不存在时整体不生效
    fn reorder(&self, updates: &[SequenceUpdate]) -> Result<(), StoreError>;
}

pub(crate) fn insert_definition(
    processes: &mut Vec<ProcessDefinition>,
    spec: &ProcessSpec,
) -> ProcessDefinition {
    let id = processes.iter().map(|d| d.id).max().unwrap_or(0) + 1;
    let sequence_order = processes.iter().map(|d| d.sequence_order).max().unwrap_or(0) + 1;

    let definition = ProcessDefinition {
        id,
        name: spec.name.clone(),
        path: spec.path.clone(),
        port: spec.port,
        sequence_order,
        start_time: None,
        end_time: None,
    };
    processes.push(definition.clone());
    definition
}

pub(crate) fn apply_spec(
    processes: &mut [ProcessDefinition],
    id: i64,
    spec: &ProcessSpec,
) -> Result<ProcessDefinition, StoreError> {
    let definition = processes
        .iter_mut()
        .find(|d| d.id == id)
        .ok_or(StoreError::Missing(id))?;

    definition.name = spec.name.clone();
    definition.path = spec.path.clone();
    definition.port = spec.port;
    Ok(definition.clone())
}

pub(crate) fn remove_definition(
    processes: &mut Vec<ProcessDefinition>,
    id: i64,
) -> Result<(), StoreError> {
    let before = processes.len();
    processes.retain(|d| d.id != id);
    if processes.len() == before {
        return Err(StoreError::Missing(id));
    }
    Ok(())
}

pub(crate) fn apply_reorder(
    processes: &mut [ProcessDefinition],
    updates: &[SequenceUpdate],
) -> Result<(), StoreError> {
    if let Some(missing) = updates.iter().find(|u| !processes.iter().any(|d| d.id == u.id)) {
        return Err(StoreError::Missing(missing.id));
    }

    for update in updates {
        for definition in processes.iter_mut().filter(|d| d.id == update.id) {
            definition.sequence_order = update.sequence_order;
        }
    }
    Ok(())
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    processes: Vec<ProcessDefinition>,
}

/// JSON 文件存储
///
/// 每次读取都重新加载文件，运维人员可以在两次调用之间直接编辑它。
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// 打开存储文件，不存在时创建一个空文件
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let store = Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        };

        if !store.path.exists() {
            store.save(&StoreFile::default())?;
            log::info!("Created empty process store at {}", store.path.display());
        }

        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<StoreFile, StoreError> {
        let content = fs::read_to_string(&self.path).map_err(|source| self.io_error(source))?;
        if content.trim().is_empty() {
            return Ok(StoreFile::default());
        }

        serde_json::from_str(&content).map_err(|source| StoreError::Format {
            path: self.path.display().to_string(),
            source,
        })
    }

    fn save(&self, file: &StoreFile) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(file).map_err(|source| StoreError::Format {
            path: self.path.display().to_string(),
            source,
        })?;

        // 先写临时文件再替换，避免写到一半的文件
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content).map_err(|source| self.io_error(source))?;
        fs::rename(&tmp, &self.path).map_err(|source| self.io_error(source))
    }

    /// 读取、修改、整体写回；修改失败时不写文件
    fn modify<T, F>(&self, apply: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Vec<ProcessDefinition>) -> Result<T, StoreError>,
    {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))?;

        let mut file = self.load()?;
        let value = apply(&mut file.processes)?;
        self.save(&file)?;
        Ok(value)
    }

    fn update_one<F>(&self, id: i64, apply: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut ProcessDefinition),
    {
        self.modify(|processes| {
            let definition = processes
                .iter_mut()
                .find(|d| d.id == id)
                .ok_or(StoreError::Missing(id))?;
            apply(definition);
            Ok(())
        })
    }

    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

impl ProcessStore for JsonFileStore {
    fn definitions(&self) -> Result<Vec<ProcessDefinition>, StoreError> {
        let mut processes = self.load()?.processes;
        sort_by_sequence(&mut processes);
        Ok(processes)
    }

    fn definition(&self, id: i64) -> Result<Option<ProcessDefinition>, StoreError> {
        Ok(self.load()?.processes.into_iter().find(|d| d.id == id))
    }

    fn update_start_time(&self, id: i64, timestamp: DateTime<Utc>) -> Result<(), StoreError> {
        self.update_one(id, |d| d.start_time = Some(timestamp))
    }

    fn update_end_time(&self, id: i64, timestamp: DateTime<Utc>) -> Result<(), StoreError> {
        self.update_one(id, |d| d.end_time = Some(timestamp))
    }

    fn create(&self, spec: &ProcessSpec) -> Result<ProcessDefinition, StoreError> {
        self.modify(|processes| Ok(insert_definition(processes, spec)))
    }

    fn update(&self, id: i64, spec: &ProcessSpec) -> Result<ProcessDefinition, StoreError> {
        self.modify(|processes| apply_spec(processes, id, spec))
    }

    fn delete(&self, id: i64) -> Result<(), StoreError> {
        self.modify(|processes| remove_definition(processes, id))
    }

    fn reorder(&self, updates: &[SequenceUpdate]) -> Result<(), StoreError> {
        self.modify(|processes| apply_reorder(processes, updates))
    }
}
