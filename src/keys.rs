use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::cmd;
use crate::error::{DeployError, DeployResult};
use crate::provider::{CloudApi, NewSshKey};

/// The public key `ssh-keygen` writes next to `private_key`.
#[must_use]
pub fn public_key_path(private_key: &Path) -> PathBuf {
    let mut path = private_key.as_os_str().to_owned();
    path.push(".pub");
    PathBuf::from(path)
}

/// Generate an Ed25519 key pair at `path` unless a private key is
/// already there.
pub fn ensure_key_pair(path: &Path, comment: &str) -> DeployResult<()> {
    if path.exists() {
        info!("SSH key already exists: {}", path.display());
        return Ok(());
    }

    info!("Generating SSH key: {}", path.display());
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let path_str = path.to_string_lossy();
    cmd::run(
        "ssh-keygen",
        &["-t", "ed25519", "-f", &path_str, "-N", "", "-C", comment, "-q"],
    )?;

    info!("SSH key generated");
    Ok(())
}

/// Make sure the public key is registered with the provider and
/// return its id. An identical key already on the account is
/// reused.
pub fn ensure_key_registered(
    api: &dyn CloudApi,
    public_key_path: &Path,
    name: &str,
) -> DeployResult<u64> {
    let public_key = fs::read_to_string(public_key_path)
        .map_err(|_| DeployError::FileNotFound(public_key_path.display().to_string()))?
        .trim()
        .to_string();

    if let Some(existing) = api
        .list_ssh_keys()?
        .into_iter()
        .find(|key| key.public_key == public_key)
    {
        info!("SSH key already uploaded: {}", existing.name);
        return Ok(existing.id);
    }

    info!("Uploading SSH key to DigitalOcean...");
    let created = api.create_ssh_key(&NewSshKey {
        name: name.to_string(),
        public_key,
    })?;
    info!(key_id = created.id, "SSH key uploaded");
    Ok(created.id)
}
