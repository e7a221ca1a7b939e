use tokio::runtime::Handle;

use crate::execution::{
    ProcessExecutor, ProcessExitStatus, ProcessOutput, ProcessSpawnRequest, spawn_validated,
};
use crate::models::{CoreError, CoreErrorKind, CoreResult};

/// Runs a request to completion and returns stdout; non-zero exits are errors.
///
/// Must be called from outside the runtime that `handle` belongs to. A
/// current-thread runtime cannot drive child IO through a handle, so real
/// processes need a multi-thread runtime.
pub(crate) fn run_and_collect_stdout(
    executor: &dyn ProcessExecutor,
    handle: &Handle,
    request: ProcessSpawnRequest,
) -> CoreResult<String> {
    let source = request.source;
    let action = request.action;

    let process = spawn_validated(executor, request)?;
    let output: ProcessOutput = handle.block_on(process.wait())?;

    match output.status {
        ProcessExitStatus::ExitCode(0) => String::from_utf8(output.stdout).map_err(|error| {
            CoreError::new(
                source,
                action,
                CoreErrorKind::ParseFailure,
                format!("process stdout is not valid UTF-8: {error}"),
            )
        }),
        ProcessExitStatus::ExitCode(code) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(CoreError::new(
                source,
                action,
                CoreErrorKind::ProcessFailure,
                format!("process exited with code {code}: {}", stderr.trim()),
            ))
        }
        ProcessExitStatus::Terminated => Err(CoreError::new(
            source,
            action,
            CoreErrorKind::ProcessFailure,
            "process was terminated by signal",
        )),
    }
}
