use std::process::ExitStatus;
use std::time::Duration;

pub type DeployResult<T> = Result<T, DeployError>;

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("command failed: {command}")]
    CommandFailed { command: String, status: ExitStatus },

    #[error("command not found: {0}")]
    CommandNotFound(String),

    #[error("command timed out after {}s: {command}", .after.as_secs())]
    CommandTimeout { command: String, after: Duration },

    #[error("prerequisite missing: {0}")]
    PrerequisiteMissing(String),

    #[error("environment variable missing: {0}")]
    EnvMissing(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("DigitalOcean API {endpoint} returned {status}: {body}")]
    Api {
        endpoint: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("DigitalOcean API request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed {endpoint} response: {reason}")]
    MalformedResponse {
        endpoint: &'static str,
        reason: String,
    },

    #[error("droplet {0} is active but has no IPv4 address")]
    NoIpv4Address(u64),

    #[error("droplet {id} did not become active within {}s", .waited.as_secs())]
    InstanceTimeout { id: u64, waited: Duration },

    #[error("SSH did not become available on {host} after {attempts} attempts")]
    SshUnreachable { host: String, attempts: u32 },

    #[error("DNS error: {0}")]
    DnsError(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
