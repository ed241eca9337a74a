use std::io;
use std::process::{Child, Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::{DeployError, DeployResult};

const WAIT_STEP: Duration = Duration::from_millis(50);

/// Run a command and capture its output. Fails if the command
/// returns a non-zero exit code.
pub fn run(program: &str, args: &[&str]) -> DeployResult<String> {
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| spawn_error(program, e))?;

    finish(program, args, &output)
}

/// Run a command with stdin/stdout/stderr inherited (interactive).
pub fn run_interactive(program: &str, args: &[&str]) -> DeployResult<()> {
    let status = Command::new(program)
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .map_err(|e| spawn_error(program, e))?;

    if status.success() {
        Ok(())
    } else {
        Err(DeployError::CommandFailed {
            command: format_command(program, args),
            status,
        })
    }
}

/// Run a command and capture its output, killing it once
/// `timeout` has elapsed.
///
/// Intended for short-lived commands: output is only drained
/// after the child exits, so a command that fills the pipe
/// buffer will hit the timeout.
pub fn run_with_timeout(program: &str, args: &[&str], timeout: Duration) -> DeployResult<String> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| spawn_error(program, e))?;

    let deadline = Instant::now() + timeout;
    while child.try_wait()?.is_none() {
        if Instant::now() >= deadline {
            kill(&mut child);
            return Err(DeployError::CommandTimeout {
                command: format_command(program, args),
                after: timeout,
            });
        }
        thread::sleep(WAIT_STEP);
    }

    let output = child.wait_with_output()?;
    finish(program, args, &output)
}

/// Check if a command exists on PATH.
#[must_use]
pub fn command_exists(program: &str) -> bool {
    Command::new("which")
        .arg(program)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|s| s.success())
}

fn finish(program: &str, args: &[&str], output: &Output) -> DeployResult<String> {
    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let command = format_command(program, args);
        debug!(%command, %stderr, "command exited with failure");
        Err(DeployError::CommandFailed {
            command,
            status: output.status,
        })
    }
}

fn kill(child: &mut Child) {
    // The child may have exited between try_wait and kill.
    if let Err(e) = child.kill() {
        debug!(error = %e, "failed to kill timed out command");
    }
    if let Err(e) = child.wait() {
        debug!(error = %e, "failed to reap timed out command");
    }
}

fn spawn_error(program: &str, e: io::Error) -> DeployError {
    if e.kind() == io::ErrorKind::NotFound {
        DeployError::CommandNotFound(program.to_string())
    } else {
        DeployError::Io(e)
    }
}

fn format_command(program: &str, args: &[&str]) -> String {
    let mut parts = vec![program.to_string()];
    parts.extend(args.iter().map(|a| (*a).to_string()));
    parts.join(" ")
}
