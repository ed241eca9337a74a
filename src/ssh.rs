use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use tracing::{debug, info};

use crate::cmd;
use crate::error::DeployResult;

const PROBE_CONNECT_TIMEOUT_SECS: u32 = 5;
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Operations the pipeline performs on the droplet.
pub trait RemoteHost {
    /// Host name or address of the remote machine.
    fn host(&self) -> &str;

    /// Run a trivial command to check that a session can be
    /// established.
    fn probe(&self) -> DeployResult<()>;

    /// Copy a local file to `remote_path`.
    fn upload(&self, local_path: &Path, remote_path: &str) -> DeployResult<()>;

    /// Run `command` remotely with output streamed to the terminal.
    fn exec(&self, command: &str) -> DeployResult<()>;
}

/// SSH session wrapper for executing commands and transferring
/// files to a remote host.
///
/// Host keys are not checked: the droplet is brand new and its key
/// is unknown until first contact.
pub struct SshSession {
    host: String,
    user: String,
    key: Option<PathBuf>,
}

impl SshSession {
    #[must_use]
    pub fn new(host: &str, user: &str) -> Self {
        Self {
            host: host.to_string(),
            user: user.to_string(),
            key: None,
        }
    }

    #[must_use]
    pub fn with_key(mut self, key_path: &Path) -> Self {
        self.key = Some(key_path.to_path_buf());
        self
    }

    /// Full `ssh` argument list for running `command`.
    #[must_use]
    pub fn ssh_args(&self, command: &str) -> Vec<String> {
        let mut args = self.base_args();
        args.push(self.destination());
        args.push(command.to_string());
        args
    }

    /// Full `scp` argument list for copying `local_path` to
    /// `remote_path`.
    #[must_use]
    pub fn scp_args(&self, local_path: &Path, remote_path: &str) -> Vec<String> {
        let mut args = self.base_args();
        args.push(local_path.to_string_lossy().to_string());
        args.push(format!("{}:{remote_path}", self.destination()));
        args
    }

    fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    fn base_args(&self) -> Vec<String> {
        let mut args = vec![
            "-o".to_string(),
            "StrictHostKeyChecking=no".to_string(),
            "-o".to_string(),
            "UserKnownHostsFile=/dev/null".to_string(),
            "-o".to_string(),
            "LogLevel=ERROR".to_string(),
        ];
        if let Some(key) = &self.key {
            args.push("-i".to_string());
            args.push(key.to_string_lossy().to_string());
        }
        args
    }
}

impl RemoteHost for SshSession {
    fn host(&self) -> &str {
        &self.host
    }

    fn probe(&self) -> DeployResult<()> {
        let mut args = vec![
            "-o".to_string(),
            format!("ConnectTimeout={PROBE_CONNECT_TIMEOUT_SECS}"),
            "-o".to_string(),
            "BatchMode=yes".to_string(),
        ];
        args.extend(self.ssh_args("echo 'SSH ready'"));
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        cmd::run_with_timeout("ssh", &refs, PROBE_TIMEOUT)?;
        Ok(())
    }

    fn upload(&self, local_path: &Path, remote_path: &str) -> DeployResult<()> {
        let args = self.scp_args(local_path, remote_path);
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        cmd::run_interactive("scp", &refs)
    }

    fn exec(&self, command: &str) -> DeployResult<()> {
        let args = self.ssh_args(command);
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        cmd::run_interactive("ssh", &refs)
    }
}

/// Probe `remote` up to `max_attempts` times, sleeping `interval`
/// between attempts. Returns `true` as soon as one probe succeeds.
///
/// A failed probe only means "not ready yet"; the cause is logged
/// at debug level.
pub fn wait_for_ssh(remote: &dyn RemoteHost, max_attempts: u32, interval: Duration) -> bool {
    info!("Waiting for SSH to become available on {}...", remote.host());

    for attempt in 1..=max_attempts {
        match remote.probe() {
            Ok(()) => {
                info!("SSH is ready!");
                return true;
            }
            Err(e) => {
                debug!(attempt, max_attempts, error = %e, "SSH probe failed");
            }
        }

        if attempt < max_attempts {
            thread::sleep(interval);
        }
    }

    false
}
