use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::config::Config;
use crate::error::{DeployError, DeployResult};
use crate::provider::{CloudApi, Droplet, DropletRequest};
use crate::scripts;

/// Build the droplet creation request for `config`.
#[must_use]
pub fn droplet_request(config: &Config, key_id: u64) -> DropletRequest {
    DropletRequest {
        name: config.droplet_name.clone(),
        region: config.region.clone(),
        size: config.size.clone(),
        image: config.image.clone(),
        ssh_keys: vec![key_id],
        user_data: scripts::cloud_init(&config.app.app_dir),
        tags: config.tags.clone(),
        ipv6: true,
    }
}

/// Create the droplet, wait for it to become active, and return
/// `(droplet_id, ipv4)`.
pub fn create_instance(
    config: &Config,
    api: &dyn CloudApi,
    key_id: u64,
) -> DeployResult<(u64, String)> {
    info!("Creating droplet '{}' in {}...", config.droplet_name, config.region);
    let created = api.create_droplet(&droplet_request(config, key_id))?;
    info!(droplet_id = created.id, "Droplet created");

    info!("Waiting for droplet to become active...");
    let droplet = wait_until_active(
        api,
        created.id,
        config.poll_interval,
        config.active_timeout,
    )?;

    let ip = droplet
        .ipv4()
        .ok_or(DeployError::NoIpv4Address(droplet.id))?
        .to_string();
    info!(%ip, "Droplet is active");

    Ok((droplet.id, ip))
}

/// Poll the droplet every `interval` until its status is `active`.
///
/// Gives up with [`DeployError::InstanceTimeout`] once `timeout`
/// has passed since the first poll.
pub fn wait_until_active(
    api: &dyn CloudApi,
    id: u64,
    interval: Duration,
    timeout: Duration,
) -> DeployResult<Droplet> {
    let started = Instant::now();

    loop {
        let droplet = api.get_droplet(id)?;
        if droplet.is_active() {
            return Ok(droplet);
        }
        debug!(droplet_id = id, status = %droplet.status, "droplet not active yet");

        let waited = started.elapsed();
        if waited >= timeout {
            return Err(DeployError::InstanceTimeout { id, waited });
        }
        thread::sleep(interval);
    }
}
