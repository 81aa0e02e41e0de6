use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::error::AgentError;
use crate::metrics::METRICS;
use crate::models::{
    sort_by_sequence, Lifecycle, LifecycleEvent, LifecycleState, ProcessDefinition, ProcessSpec,
    ProcessStatus, SequenceUpdate,
};
use crate::services::inventory::ProcessInventory;
use crate::services::launcher::{check_launchable, ProcessLauncher};
use crate::services::matcher::ProcessMatcher;
use crate::services::path_identity;
use crate::services::port_probe::{self, STATUS_PROBE_TIMEOUT};
use crate::services::readiness::ReadinessWaiter;
use crate::services::terminator::{EscalationPolicy, ProcessTerminator, Terminator};
use crate::store::ProcessStore;

/// 编排相关的时间设置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorSettings {
    pub readiness_timeout: Duration,
    pub readiness_interval: Duration,
    pub escalation: EscalationPolicy,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            readiness_timeout: Duration::from_secs(60),
            readiness_interval: Duration::from_secs(2),
            escalation: EscalationPolicy::default(),
        }
    }
}

/// 按路径串行化启动和删除，防止同一程序被并发重复启动
///
/// 停止不取锁：正在等待就绪的进程也可以立即停止。
#[derive(Default)]
struct PathLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl PathLocks {
    async fn acquire(&self, path: &str) -> OwnedMutexGuard<()> {
        let key = path_identity::normalize(path).unwrap_or_else(|_| path.to_string());
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            locks.entry(key).or_default().clone()
        };
        lock.lock_owned().await
    }
}

/// 管理一组有序进程：按顺序启动、逆序停止
pub struct Orchestrator {
    store: Arc<dyn ProcessStore>,
    matcher: ProcessMatcher,
    launcher: ProcessLauncher,
    terminator: ProcessTerminator,
    readiness: ReadinessWaiter,
    settings: OrchestratorSettings,
    locks: PathLocks,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn ProcessStore>,
        inventory: Arc<dyn ProcessInventory>,
        terminator: Box<dyn Terminator>,
        settings: OrchestratorSettings,
    ) -> Self {
        let matcher = ProcessMatcher::new(inventory);

        Self {
            store,
            launcher: ProcessLauncher::new(matcher.clone()),
            terminator: ProcessTerminator::new(matcher.clone(), terminator, settings.escalation),
            readiness: ReadinessWaiter::new(matcher.clone()),
            matcher,
            settings,
            locks: PathLocks::default(),
        }
    }

    pub fn definitions(&self) -> Result<Vec<ProcessDefinition>, AgentError> {
        let mut definitions = self.store.definitions()?;
        sort_by_sequence(&mut definitions);
        Ok(definitions)
    }

    /// 按顺序启动全部进程，每个就绪后再启动下一个；任一失败立即中止，
    /// 已启动的进程保持运行
    pub async fn start_all(&self) -> Result<(), AgentError> {
        let definitions = self.definitions()?;
        if definitions.is_empty() {
            return Err(AgentError::NoProcessesConfigured);
        }

        for (i, definition) in definitions.iter().enumerate() {
            log::info!("Starting process in sequence: {} (order {})", definition.name, i + 1);

            if let Err(e) = self.start_definition(definition).await {
                log::error!("Failed to start process in sequence: {}: {}", definition.name, e);
                return Err(AgentError::SequenceAborted {
                    id: definition.id,
                    name: definition.name.clone(),
                    source: Box::new(e),
                });
            }
        }

        log::info!("All {} processes started", definitions.len());
        Ok(())
    }

    /// 逆序停止全部进程；任一失败立即中止
    pub async fn stop_all(&self) -> Result<(), AgentError> {
        let definitions = self.definitions()?;
        if definitions.is_empty() {
            return Err(AgentError::NoProcessesConfigured);
        }

        for (i, definition) in definitions.iter().rev().enumerate() {
            log::info!("Stopping process in sequence: {} (order {})", definition.name, i + 1);

            if let Err(e) = self.stop_definition(definition).await {
                log::error!("Failed to stop process in sequence: {}: {}", definition.name, e);
                return Err(AgentError::SequenceAborted {
                    id: definition.id,
                    name: definition.name.clone(),
                    source: Box::new(e),
                });
            }
        }

        log::info!("All {} processes stopped", definitions.len());
        Ok(())
    }

    pub async fn start_one(&self, id: i64) -> Result<(), AgentError> {
        let definition = self.definition(id)?;
        self.start_definition(&definition).await
    }

    pub async fn stop_one(&self, id: i64) -> Result<(), AgentError> {
        let definition = self.definition(id)?;
        self.stop_definition(&definition).await
    }

    pub async fn status(&self, id: i64) -> Result<ProcessStatus, AgentError> {
        let definition = self.definition(id)?;
        self.status_of(&definition).await
    }

    /// 计算某个配置的即时状态
    pub async fn status_of(
        &self,
        definition: &ProcessDefinition,
    ) -> Result<ProcessStatus, AgentError> {
        let running = self.matcher.is_running(&definition.path).await?;

        let port_open = match definition.port {
            Some(port) => Some(port_probe::is_port_open(port, STATUS_PROBE_TIMEOUT).await),
            None => None,
        };

        Ok(ProcessStatus::compute(definition, running, port_open, Utc::now()))
    }

    pub fn definition(&self, id: i64) -> Result<ProcessDefinition, AgentError> {
        self.store.definition(id)?.ok_or(AgentError::DefinitionNotFound(id))
    }

    /// 新建进程配置，排在启动顺序的最后
    pub fn create_definition(&self, spec: &ProcessSpec) -> Result<ProcessDefinition, AgentError> {
        let spec = self.validate_spec(spec, None)?;
        let created = self.store.create(&spec).map_err(AgentError::from_store)?;

        log::info!(
            "Process definition created: {} (id {}, {})",
            created.name,
            created.id,
            created.path
        );
        Ok(created)
    }

    pub fn update_definition(
        &self,
        id: i64,
        spec: &ProcessSpec,
    ) -> Result<ProcessDefinition, AgentError> {
        self.definition(id)?;
        let spec = self.validate_spec(spec, Some(id))?;
        let updated = self.store.update(id, &spec).map_err(AgentError::from_store)?;

        log::info!("Process definition updated: {} (id {})", updated.name, updated.id);
        Ok(updated)
    }

    /// 删除进程配置；进程仍在运行时拒绝
    pub async fn delete_definition(&self, id: i64) -> Result<(), AgentError> {
        let definition = self.definition(id)?;
        let _guard = self.locks.acquire(&definition.path).await;

        if self.matcher.is_running(&definition.path).await? {
            return Err(AgentError::ProcessRunning(definition.path));
        }

        self.store.delete(id).map_err(AgentError::from_store)?;
        log::info!("Process definition deleted: {} (id {})", definition.name, id);
        Ok(())
    }

    pub fn reorder_definitions(&self, updates: &[SequenceUpdate]) -> Result<(), AgentError> {
        if updates.is_empty() {
            return Err(AgentError::InvalidDefinition("no sequence updates given".to_string()));
        }

        self.store.reorder(updates).map_err(AgentError::from_store)?;
        log::info!("Process sequence reordered ({} updates)", updates.len());
        Ok(())
    }

    /// 整理并校验提交的配置：路径必须指向可启动的已存在文件，且不能与其他配置重复
    fn validate_spec(
        &self,
        spec: &ProcessSpec,
        exclude: Option<i64>,
    ) -> Result<ProcessSpec, AgentError> {
        let name = spec.name.trim();
        let path = spec.path.trim();
        if name.is_empty() {
            return Err(AgentError::InvalidDefinition("name is required".to_string()));
        }
        if path.is_empty() {
            return Err(AgentError::InvalidDefinition("path is required".to_string()));
        }
        if spec.port == Some(0) {
            return Err(AgentError::InvalidDefinition(
                "port must be between 1 and 65535".to_string(),
            ));
        }

        let resolved = path_identity::resolve(path)?;
        let target = path_identity::resolve_executable(path)?;
        let metadata = std::fs::metadata(&target).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => AgentError::invalid_path(path, "path does not exist"),
            _ => AgentError::invalid_path(path, format!("cannot access path: {e}")),
        })?;
        if metadata.is_dir() {
            return Err(AgentError::invalid_path(path, "path is a directory, not a file"));
        }
        check_launchable(&target, &metadata)
            .map_err(|reason| AgentError::invalid_path(path, reason))?;

        // 与匹配进程时使用同一套路径比较规则
        let identity = path_identity::normalize(&target.to_string_lossy())?;
        let duplicate = self.store.definitions()?.into_iter().find(|existing| {
            Some(existing.id) != exclude
                && path_identity::resolve_executable(&existing.path)
                    .and_then(|p| path_identity::normalize(&p.to_string_lossy()))
                    .is_ok_and(|other| other == identity)
        });
        if let Some(existing) = duplicate {
            return Err(AgentError::DuplicatePath {
                path: resolved.display().to_string(),
                existing_id: existing.id,
            });
        }

        Ok(ProcessSpec {
            name: name.to_string(),
            path: resolved.display().to_string(),
            port: spec.port,
        })
    }

    async fn start_definition(&self, definition: &ProcessDefinition) -> Result<(), AgentError> {
        let _guard = self.locks.acquire(&definition.path).await;
        let mut lifecycle = Lifecycle::new(&definition.name, LifecycleState::Stopped);

        lifecycle.advance(LifecycleEvent::Launch);
        let result = match self.launcher.start(&definition.path, &[]).await {
            Ok(_pid) => {
                self.readiness
                    .wait_ready(
                        &definition.path,
                        definition.port,
                        self.settings.readiness_timeout,
                        self.settings.readiness_interval,
                    )
                    .await
            }
            Err(e) => Err(e),
        };

        METRICS.record_operation(&definition.name, "start", result.is_ok());
        if let Err(e) = result {
            lifecycle.advance(LifecycleEvent::Fault);
            return Err(e);
        }
        lifecycle.advance(LifecycleEvent::BecameReady);

        if let Err(e) = self.store.update_start_time(definition.id, Utc::now()) {
            log::warn!("Failed to update process start time for {}: {}", definition.id, e);
        }

        match definition.port {
            Some(port) => log::info!(
                "Process started and port is ready: {} (port {})",
                definition.name,
                port
            ),
            None => log::info!("Process started and is ready: {}", definition.name),
        }
        Ok(())
    }

    async fn stop_definition(&self, definition: &ProcessDefinition) -> Result<(), AgentError> {
        let mut lifecycle = Lifecycle::new(&definition.name, LifecycleState::Ready);

        lifecycle.advance(LifecycleEvent::Stop);
        let result = self.terminator.stop(&definition.path).await;

        METRICS.record_operation(&definition.name, "stop", result.is_ok());
        if let Err(e) = result {
            lifecycle.advance(LifecycleEvent::Fault);
            return Err(e);
        }
        lifecycle.advance(LifecycleEvent::Exited);

        if let Err(e) = self.store.update_end_time(definition.id, Utc::now()) {
            log::warn!("Failed to update process end time for {}: {}", definition.id, e);
        }

        log::info!("Process stopped: {} (id {})", definition.name, definition.id);
        Ok(())
    }
}
