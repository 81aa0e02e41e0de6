use thiserror::Error;

use crate::store::StoreError;

/// 进程管理层对外暴露的错误类型
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("process inventory unavailable: {0}")]
    InventoryUnavailable(String),

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("process is already running: {0}")]
    AlreadyRunning(String),

    #[error("failed to start process {path}: {source}")]
    LaunchFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("process not found: {0}")]
    NotFound(String),

    #[error("failed to terminate process {pid} ({path}): {reason}")]
    TerminationFailed { path: String, pid: u32, reason: String },

    #[error("{target} did not become ready within {timeout_secs}s")]
    ReadinessTimeout { target: String, timeout_secs: u64 },

    #[error("no processes configured")]
    NoProcessesConfigured,

    #[error("server process {0} not found")]
    DefinitionNotFound(i64),

    #[error("invalid process definition: {0}")]
    InvalidDefinition(String),

    #[error("a process with path {path} already exists (id {existing_id})")]
    DuplicatePath { path: String, existing_id: i64 },

    #[error("cannot modify a running process, stop it first: {0}")]
    ProcessRunning(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("sequence aborted at process '{name}' (id {id}): {source}")]
    SequenceAborted {
        id: i64,
        name: String,
        #[source]
        source: Box<AgentError>,
    },
}

/// [`AgentError`] 的稳定错误码分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidPath,
    InventoryUnavailable,
    FileNotFound,
    AlreadyRunning,
    LaunchFailed,
    NotFound,
    TerminationFailed,
    ReadinessTimeout,
    NoProcessesConfigured,
    DefinitionNotFound,
    InvalidDefinition,
    DuplicatePath,
    ProcessRunning,
    Store,
}

impl ErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::InvalidPath => "INVALID_PATH",
            ErrorKind::InventoryUnavailable => "INVENTORY_UNAVAILABLE",
            ErrorKind::FileNotFound => "FILE_NOT_FOUND",
            ErrorKind::AlreadyRunning => "ALREADY_RUNNING",
            ErrorKind::LaunchFailed => "LAUNCH_FAILED",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::TerminationFailed => "TERMINATION_FAILED",
            ErrorKind::ReadinessTimeout => "READINESS_TIMEOUT",
            ErrorKind::NoProcessesConfigured => "NO_PROCESSES_CONFIGURED",
            ErrorKind::DefinitionNotFound => "DEFINITION_NOT_FOUND",
            ErrorKind::InvalidDefinition => "INVALID_DEFINITION",
            ErrorKind::DuplicatePath => "DUPLICATE_PATH",
            ErrorKind::ProcessRunning => "PROCESS_RUNNING",
            ErrorKind::Store => "STORE_ERROR",
        }
    }
}

impl AgentError {
    pub fn invalid_path(path: impl Into<String>, reason: impl ToString) -> Self {
        AgentError::InvalidPath {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// 存储层的 id 不存在统一报告为 [`AgentError::DefinitionNotFound`]
    pub fn from_store(err: StoreError) -> Self {
        match err {
            StoreError::Missing(id) => AgentError::DefinitionNotFound(id),
            other => AgentError::Store(other),
        }
    }

    /// 错误分类；序列错误返回失败步骤本身的分类
    pub fn kind(&self) -> ErrorKind {
        match self {
            AgentError::InvalidPath { .. } => ErrorKind::InvalidPath,
            AgentError::InventoryUnavailable(_) => ErrorKind::InventoryUnavailable,
            AgentError::FileNotFound(_) => ErrorKind::FileNotFound,
            AgentError::AlreadyRunning(_) => ErrorKind::AlreadyRunning,
            AgentError::LaunchFailed { .. } => ErrorKind::LaunchFailed,
            AgentError::NotFound(_) => ErrorKind::NotFound,
            AgentError::TerminationFailed { .. } => ErrorKind::TerminationFailed,
            AgentError::ReadinessTimeout { .. } => ErrorKind::ReadinessTimeout,
            AgentError::NoProcessesConfigured => ErrorKind::NoProcessesConfigured,
            AgentError::DefinitionNotFound(_) => ErrorKind::DefinitionNotFound,
            AgentError::InvalidDefinition(_) => ErrorKind::InvalidDefinition,
            AgentError::DuplicatePath { .. } => ErrorKind::DuplicatePath,
            AgentError::ProcessRunning(_) => ErrorKind::ProcessRunning,
            AgentError::Store(_) => ErrorKind::Store,
            AgentError::SequenceAborted { source, .. } => source.kind(),
        }
    }
}
