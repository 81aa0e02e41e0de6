use std::sync::Mutex;

use chrono::{DateTime, Utc};

use super::{
    apply_reorder, apply_spec, insert_definition, remove_definition, ProcessStore, StoreError,
};
use crate::models::{sort_by_sequence, ProcessDefinition, ProcessSpec, SequenceUpdate};

/// 测试用内存存储，可模拟写入失败
#[derive(Default)]
pub struct MemoryStore {
    processes: Mutex<Vec<ProcessDefinition>>,
    pub fail_writes: bool,
}

impl MemoryStore {
    pub fn new(processes: Vec<ProcessDefinition>) -> Self {
        Self {
            processes: Mutex::new(processes),
            fail_writes: false,
        }
    }

    pub fn failing_writes(processes: Vec<ProcessDefinition>) -> Self {
        Self {
            processes: Mutex::new(processes),
            fail_writes: true,
        }
    }

    fn modify<T, F>(&self, apply: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Vec<ProcessDefinition>) -> Result<T, StoreError>,
    {
        if self.fail_writes {
            return Err(StoreError::Unavailable("writes disabled".to_string()));
        }
        apply(&mut self.processes.lock().unwrap())
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
}

impl ProcessStore for MemoryStore {
    fn definitions(&self) -> Result<Vec<ProcessDefinition>, StoreError> {
        let mut processes = self.processes.lock().unwrap().clone();
        sort_by_sequence(&mut processes);
        Ok(processes)
    }

    fn definition(&self, id: i64) -> Result<Option<ProcessDefinition>, StoreError> {
        Ok(self.processes.lock().unwrap().iter().find(|d| d.id == id).cloned())
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
