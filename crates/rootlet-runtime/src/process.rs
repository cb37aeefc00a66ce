//! Execution of the target command inside the isolated root.

use std::process::{Command, Stdio};

use rootlet_common::error::{Result, RootletError};
use rootlet_common::types::ExecutionResult;
use rootlet_core::namespace::pid;

use crate::rootfs::Isolated;

/// Launches `command` with `args` in a new PID namespace and waits for it.
///
/// Standard streams are inherited, so the child's output reaches the
/// caller's terminal unmodified. A non-zero exit or a fatal signal is a
/// successful result; only failing to start the command is an error.
///
/// # Errors
///
/// Returns `RootletError::Isolation` if the PID namespace cannot be created
/// and `RootletError::Launch` if the command cannot be started or waited on.
pub fn run(_root: &Isolated, command: &str, args: &[String]) -> Result<ExecutionResult> {
    pid::create_pid_namespace()?;

    tracing::info!(command, ?args, "launching command");
    let launch_err = |source| RootletError::Launch {
        command: command.to_string(),
        source,
    };

    let mut child = Command::new(command)
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(launch_err)?;
    let status = child.wait().map_err(launch_err)?;

    let result = exit_result(status);
    tracing::info!(
        command,
        exit_code = result.exit_code,
        signaled = result.signaled,
        "command finished"
    );
    Ok(result)
}

/// Converts a wait status into the result reported to the caller.
#[cfg(unix)]
fn exit_result(status: std::process::ExitStatus) -> ExecutionResult {
    use std::os::unix::process::ExitStatusExt;

    match (status.code(), status.signal()) {
        (Some(code), _) => ExecutionResult::exited(code),
        (None, Some(signal)) => ExecutionResult::killed(signal),
        (None, None) => ExecutionResult::exited(-1),
    }
}

#[cfg(not(unix))]
fn exit_result(status: std::process::ExitStatus) -> ExecutionResult {
    ExecutionResult::exited(status.code().unwrap_or(-1))
}
