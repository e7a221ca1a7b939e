//! Process execution contracts for collaborator commands.
//!
//! Sources describe what to run as a [`ProcessSpawnRequest`]; an executor runs
//! it and hands back the raw output. Nothing here interprets that output.

pub mod tokio_process;

pub use tokio_process::TokioProcessExecutor;

use std::collections::BTreeMap;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::{Duration, SystemTime};

use crate::models::{CoreError, CoreErrorKind, SourceAction, SourceId};

pub type ExecutionResult<T> = Result<T, CoreError>;

pub type ProcessWaitFuture = Pin<Box<dyn Future<Output = ExecutionResult<ProcessOutput>> + Send>>;

/// Program, argument vector and extra environment. Never passed through a shell.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
        }
    }

    pub fn arg(self, arg: impl Into<String>) -> Self {
        self.args([arg])
    }

    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn validate(&self, source: SourceId, action: SourceAction) -> ExecutionResult<()> {
        match self.problem() {
            Some(problem) => Err(CoreError::new(
                source,
                action,
                CoreErrorKind::InvalidInput,
                problem,
            )),
            None => Ok(()),
        }
    }

    fn problem(&self) -> Option<&'static str> {
        let has_nul = |value: &str| value.contains('\0');

        if self.program.as_os_str().is_empty() {
            return Some("program is empty");
        }
        if self.args.iter().any(|arg| arg.is_empty() || has_nul(arg)) {
            return Some("arguments must be non-empty and free of NUL bytes");
        }
        if self
            .env
            .iter()
            .any(|(key, value)| key.is_empty() || has_nul(key) || has_nul(value))
        {
            return Some("environment entries need a key and must be free of NUL bytes");
        }
        None
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProcessSpawnRequest {
    pub source: SourceId,
    pub action: SourceAction,
    pub command: CommandSpec,
    pub timeout: Option<Duration>,
}

impl ProcessSpawnRequest {
    pub fn new(source: SourceId, action: SourceAction, command: CommandSpec) -> Self {
        Self {
            source,
            action,
            command,
            timeout: None,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn validate(&self) -> ExecutionResult<()> {
        self.command.validate(self.source, self.action)?;
        if self.timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err(CoreError::new(
                self.source,
                self.action,
                CoreErrorKind::InvalidInput,
                "timeout must be non-zero",
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProcessExitStatus {
    ExitCode(i32),
    /// Killed by a signal, so no exit code exists.
    Terminated,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProcessOutput {
    pub status: ProcessExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub started_at: SystemTime,
    pub finished_at: SystemTime,
}

pub trait RunningProcess: Send + Sync {
    fn pid(&self) -> Option<u32>;

    fn wait(self: Box<Self>) -> ProcessWaitFuture;
}

pub trait ProcessExecutor: Send + Sync {
    fn spawn(&self, request: ProcessSpawnRequest) -> ExecutionResult<Box<dyn RunningProcess>>;
}

/// Validates `request` before handing it to `executor`.
pub fn spawn_validated(
    executor: &dyn ProcessExecutor,
    request: ProcessSpawnRequest,
) -> ExecutionResult<Box<dyn RunningProcess>> {
    request.validate()?;
    executor.spawn(request)
}
