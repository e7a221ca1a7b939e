use std::process::Stdio;
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

use crate::execution::{
    ExecutionResult, ProcessExecutor, ProcessExitStatus, ProcessOutput, ProcessSpawnRequest,
    ProcessWaitFuture, RunningProcess,
};
use crate::models::{CoreError, CoreErrorKind, SourceAction, SourceId};

/// How long pipes may stay open after the child exits.
const PIPE_DRAIN_WINDOW: Duration = Duration::from_millis(250);
/// How long to wait for a killed process group to be reaped.
const KILL_REAP_WINDOW: Duration = Duration::from_secs(1);

/// Runs collaborator commands as Tokio child processes, each in its own process group.
pub struct TokioProcessExecutor;

impl ProcessExecutor for TokioProcessExecutor {
    fn spawn(&self, request: ProcessSpawnRequest) -> ExecutionResult<Box<dyn RunningProcess>> {
        let ProcessSpawnRequest {
            source,
            action,
            command,
            timeout,
            ..
        } = request;

        let mut child_command = Command::new(&command.program);
        child_command
            .args(&command.args)
            .envs(&command.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        child_command.process_group(0);

        let child = child_command.spawn().map_err(|error| {
            let kind = match error.kind() {
                std::io::ErrorKind::NotFound => CoreErrorKind::Unavailable,
                _ => CoreErrorKind::ProcessFailure,
            };
            CoreError::new(
                source,
                action,
                kind,
                format!("could not start {}: {error}", command.program.display()),
            )
        })?;

        Ok(Box::new(TokioRunningProcess {
            pid: child.id(),
            child: Mutex::new(Some(child)),
            started_at: SystemTime::now(),
            timeout,
            source,
            action,
        }))
    }
}

struct TokioRunningProcess {
    child: Mutex<Option<Child>>,
    pid: Option<u32>,
    started_at: SystemTime,
    timeout: Option<Duration>,
    source: SourceId,
    action: SourceAction,
}

impl RunningProcess for TokioRunningProcess {
    fn pid(&self) -> Option<u32> {
        self.pid
    }

    fn wait(self: Box<Self>) -> ProcessWaitFuture {
        let Self {
            child,
            pid,
            started_at,
            timeout,
            source,
            action,
        } = *self;
        let child = child.into_inner().ok().flatten();

        Box::pin(async move {
            let mut child = child.ok_or_else(|| {
                CoreError::new(
                    source,
                    action,
                    CoreErrorKind::Internal,
                    "process was already waited on",
                )
            })?;

            let stdout = drain(child.stdout.take());
            let stderr = drain(child.stderr.take());

            let waited = match timeout {
                Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                    Ok(waited) => waited,
                    Err(_) => {
                        kill_process_group(pid);
                        let _ = tokio::time::timeout(KILL_REAP_WINDOW, child.wait()).await;
                        stdout.abort();
                        stderr.abort();
                        return Err(CoreError::new(
                            source,
                            action,
                            CoreErrorKind::Timeout,
                            format!("no exit after {}ms; process group killed", limit.as_millis()),
                        ));
                    }
                },
                None => child.wait().await,
            };
            let exit = waited.map_err(|error| {
                CoreError::new(
                    source,
                    action,
                    CoreErrorKind::ProcessFailure,
                    format!("waiting for process failed: {error}"),
                )
            })?;

            // Grandchildren can hold the pipes open past the child's exit.
            let stdout = match collect(stdout, "stdout").await {
                Ok(stdout) => stdout,
                Err((kind, message)) => {
                    stderr.abort();
                    kill_process_group(pid);
                    return Err(CoreError::new(source, action, kind, message));
                }
            };
            let stderr = collect(stderr, "stderr").await.map_err(|(kind, message)| {
                kill_process_group(pid);
                CoreError::new(source, action, kind, message)
            })?;

            Ok(ProcessOutput {
                status: exit
                    .code()
                    .map_or(ProcessExitStatus::Terminated, ProcessExitStatus::ExitCode),
                stdout,
                stderr,
                started_at,
                finished_at: SystemTime::now(),
            })
        })
    }
}

fn drain<R>(pipe: Option<R>) -> JoinHandle<std::io::Result<Vec<u8>>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buffer = Vec::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_end(&mut buffer).await?;
        }
        Ok(buffer)
    })
}

/// Output of one pipe reader. A reader that fails or outlives the drain window
/// is an error; a truncated stream must never pass for complete output.
async fn collect(
    mut reader: JoinHandle<std::io::Result<Vec<u8>>>,
    stream: &str,
) -> Result<Vec<u8>, (CoreErrorKind, String)> {
    match tokio::time::timeout(PIPE_DRAIN_WINDOW, &mut reader).await {
        Ok(Ok(Ok(buffer))) => Ok(buffer),
        Ok(Ok(Err(error))) => Err((
            CoreErrorKind::ProcessFailure,
            format!("reading {stream} failed: {error}"),
        )),
        Ok(Err(error)) => Err((
            CoreErrorKind::ProcessFailure,
            format!("{stream} reader stopped: {error}"),
        )),
        Err(_) => {
            reader.abort();
            Err((
                CoreErrorKind::Timeout,
                format!(
                    "{stream} still open {}ms after exit; output may be incomplete",
                    PIPE_DRAIN_WINDOW.as_millis()
                ),
            ))
        }
    }
}

#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    let Some(pid) = pid.and_then(|pid| libc::pid_t::try_from(pid).ok()) else {
        return;
    };
    // SAFETY: signalling a process group we created; a stale id only yields ESRCH.
    unsafe {
        libc::kill(-pid, libc::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}
