use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{DeployError, DeployResult};

pub const TOKEN_VAR: &str = "DO_API_TOKEN";

/// Name and comment used for the deploy key, locally and on
/// `DigitalOcean`.
pub const KEY_LABEL: &str = "losricostacos-deploy";

/// Where the application lives on the droplet and what gets
/// checked out there.
#[derive(Debug, Clone)]
pub struct AppSource {
    pub repo_url: String,
    pub branch: String,
    /// Directory the repository is cloned into.
    pub app_dir: String,
    /// Subdirectory of the checkout holding the deployable
    /// project.
    pub subdir: String,
}

impl AppSource {
    /// Absolute path of the deployable project on the droplet.
    #[must_use]
    pub fn project_dir(&self) -> String {
        format!("{}/{}", self.app_dir.trim_end_matches('/'), self.subdir)
    }
}

impl Default for AppSource {
    fn default() -> Self {
        Self {
            repo_url: "https://github.com/9KaelirAmaya9/Woodable1.git".to_string(),
            branch: "production-deploy".to_string(),
            app_dir: "/opt/losricostacos".to_string(),
            subdir: "base2".to_string(),
        }
    }
}

/// Everything the pipeline needs, resolved once at startup and
/// passed by reference into each stage.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_token: String,
    pub droplet_name: String,
    pub region: String,
    pub size: String,
    pub image: String,
    pub domain: String,
    pub tags: Vec<String>,
    /// Private key path; the public key sits next to it with a
    /// `.pub` suffix.
    pub ssh_key_path: PathBuf,
    pub ssh_key_name: String,
    pub ssh_user: String,
    pub app: AppSource,
    /// Remote path the deploy script is copied to.
    pub remote_script: String,
    /// Local directory the deploy script is staged in before
    /// upload.
    pub work_dir: PathBuf,
    pub poll_interval: Duration,
    pub active_timeout: Duration,
    pub ssh_max_attempts: u32,
    pub ssh_interval: Duration,
}

impl Config {
    /// Build a config with defaults for everything but the token.
    #[must_use]
    pub fn new(api_token: &str, home: &Path) -> Self {
        Self {
            api_token: api_token.to_string(),
            droplet_name: "losricostacos-prod".to_string(),
            region: "nyc3".to_string(),
            size: "s-2vcpu-4gb".to_string(),
            image: "docker-20-04".to_string(),
            domain: "losricostacos.com".to_string(),
            tags: vec!["losricostacos".to_string(), "production".to_string()],
            ssh_key_path: home.join(".ssh").join("losricostacos_deploy"),
            ssh_key_name: KEY_LABEL.to_string(),
            ssh_user: "root".to_string(),
            app: AppSource::default(),
            remote_script: "/root/deploy.sh".to_string(),
            work_dir: PathBuf::from("."),
            poll_interval: Duration::from_secs(5),
            active_timeout: Duration::from_secs(600),
            ssh_max_attempts: 30,
            ssh_interval: Duration::from_secs(10),
        }
    }

    /// Read configuration from the process environment.
    pub fn from_env() -> DeployResult<Self> {
        let home = dirs::home_dir().ok_or_else(|| DeployError::EnvMissing("HOME".into()))?;
        Self::from_lookup(&home, |key| std::env::var(key).ok())
    }

    /// Resolve configuration through `lookup`, falling back to
    /// defaults for everything except the API token.
    pub fn from_lookup<F>(home: &Path, lookup: F) -> DeployResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let token = get(TOKEN_VAR)
            .ok_or_else(|| DeployError::EnvMissing(format!("{TOKEN_VAR} not set in .env")))?;

        let mut config = Self::new(&token, home);

        if let Some(v) = get("DO_DROPLET_NAME") {
            config.droplet_name = v;
        }
        if let Some(v) = get("DO_API_REGION") {
            config.region = v;
        }
        if let Some(v) = get("DO_API_SIZE") {
            config.size = v;
        }
        if let Some(v) = get("DO_API_IMAGE") {
            config.image = v;
        }
        if let Some(v) = get("WEBSITE_DOMAIN") {
            config.domain = v;
        }
        if let Some(v) = get("DEPLOY_SSH_KEY") {
            config.ssh_key_path = expand_home(&v, home);
        }
        if let Some(v) = get("DEPLOY_REPO_URL") {
            config.app.repo_url = v;
        }
        if let Some(v) = get("DEPLOY_BRANCH") {
            config.app.branch = v;
        }
        if let Some(v) = get("DO_ACTIVE_TIMEOUT_SECS") {
            let secs = parse_number("DO_ACTIVE_TIMEOUT_SECS", &v)?;
            config.active_timeout = Duration::from_secs(secs);
        }
        if let Some(v) = get("SSH_MAX_ATTEMPTS") {
            let attempts = parse_number("SSH_MAX_ATTEMPTS", &v)?;
            config.ssh_max_attempts = u32::try_from(attempts).map_err(|_| {
                DeployError::InvalidConfig(format!("SSH_MAX_ATTEMPTS out of range: {v}"))
            })?;
        }

        Ok(config)
    }

    /// Path of the public half of the deploy key.
    #[must_use]
    pub fn public_key_path(&self) -> PathBuf {
        crate::keys::public_key_path(&self.ssh_key_path)
    }
}

fn parse_number(key: &str, value: &str) -> DeployResult<u64> {
    value
        .parse()
        .map_err(|_| DeployError::InvalidConfig(format!("{key} must be a number, got '{value}'")))
}

fn expand_home(path: &str, home: &Path) -> PathBuf {
    path.strip_prefix("~/")
        .map_or_else(|| PathBuf::from(path), |rest| home.join(rest))
}
