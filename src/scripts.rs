//! Shell payloads sent to the droplet.
//!
//! Both scripts are plain text rendered from parameters; nothing on
//! this side parses them.

use crate::config::AppSource;

/// Ports opened in the droplet firewall.
pub const FIREWALL_PORTS: [u16; 3] = [22, 80, 443];

/// File written by the boot script once it has finished.
pub const READY_MARKER: &str = "/root/READY";

const COMPOSE_VERSION: &str = "v2.23.0";

/// Boot-time script passed as droplet `user_data`.
///
/// Updates packages, installs Docker and Docker Compose when
/// missing, creates the application directory, opens the firewall
/// and drops [`READY_MARKER`].
#[must_use]
pub fn cloud_init(app_dir: &str) -> String {
    let firewall: String = FIREWALL_PORTS
        .iter()
        .map(|port| format!("ufw allow {port}/tcp\n"))
        .collect();

    format!(
        r#"#!/bin/bash
set -e

# Update system
apt-get update
apt-get upgrade -y

# Install Docker if not present
if ! command -v docker &> /dev/null; then
    curl -fsSL https://get.docker.com -o get-docker.sh
    sh get-docker.sh
    rm get-docker.sh
fi

# Install Docker Compose if not present
if ! docker compose version &> /dev/null && ! command -v docker-compose &> /dev/null; then
    curl -L "https://github.com/docker/compose/releases/download/{COMPOSE_VERSION}/docker-compose-$(uname -s)-$(uname -m)" -o /usr/local/bin/docker-compose
    chmod +x /usr/local/bin/docker-compose
fi

# Create app directory
mkdir -p {app_dir}

# Set up firewall
{firewall}ufw --force enable

echo "Droplet ready for deployment" > {READY_MARKER}
echo "Cloud-init complete at $(date)" >> /var/log/cloud-init-output.log
"#
    )
}

/// Script copied to the droplet and run over SSH to fetch the
/// application code.
#[must_use]
pub fn deploy_script(app: &AppSource) -> String {
    format!(
        r#"#!/bin/bash
set -e

# Clone repository
cd {app_dir}
git clone {repo_url} .
cd {subdir}
git checkout {branch}

# The .env file is configured by hand before the first deploy.
echo "Repository cloned. Configure .env and run ./scripts/deploy-production.sh"
"#,
        app_dir = app.app_dir,
        repo_url = app.repo_url,
        subdir = app.subdir,
        branch = app.branch,
    )
}
