use tracing::info;

use crate::cmd;
use crate::config::Config;
use crate::deploy;
use crate::dns;
use crate::error::{DeployError, DeployResult};
use crate::keys;
use crate::provider::CloudApi;
use crate::provision;
use crate::scripts;
use crate::ssh::{self, RemoteHost, SshSession};

type Connect<'a> = Box<dyn Fn(&str) -> Box<dyn RemoteHost> + 'a>;

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct Deployment {
    pub droplet_id: u64,
    pub ip: String,
    /// `false` when the DNS records have to be fixed by hand.
    pub dns_updated: bool,
}

/// Deployment pipeline: key pair, droplet, DNS, SSH wait, remote
/// bootstrap, always in that order.
pub struct Pipeline<'a> {
    config: &'a Config,
    api: Box<dyn CloudApi + 'a>,
    connect: Connect<'a>,
}

impl<'a> Pipeline<'a> {
    /// Pipeline reaching the droplet over SSH with the configured
    /// deploy key.
    #[must_use]
    pub fn new(config: &'a Config, api: impl CloudApi + 'a) -> Self {
        let connect: Connect<'a> = Box::new(move |ip: &str| {
            Box::new(SshSession::new(ip, &config.ssh_user).with_key(&config.ssh_key_path))
                as Box<dyn RemoteHost>
        });

        Self {
            config,
            api: Box::new(api),
            connect,
        }
    }

    /// Replace how the pipeline reaches the droplet once it has an
    /// address.
    #[must_use]
    pub fn remote<F>(mut self, connect: F) -> Self
    where
        F: Fn(&str) -> Box<dyn RemoteHost> + 'a,
    {
        self.connect = Box::new(connect);
        self
    }

    /// Run every stage. Any error other than a DNS failure stops
    /// the run; nothing created so far is rolled back.
    pub fn run(&self) -> DeployResult<Deployment> {
        let config = self.config;
        let api = self.api.as_ref();

        info!("Step 1: Setting up SSH key...");
        keys::ensure_key_pair(&config.ssh_key_path, &config.ssh_key_name)?;
        let key_id =
            keys::ensure_key_registered(api, &config.public_key_path(), &config.ssh_key_name)?;

        info!("Step 2: Creating droplet...");
        let (droplet_id, ip) = provision::create_instance(config, api, key_id)?;

        info!("Step 3: Updating DNS...");
        let dns_updated = dns::update_dns(api, &config.domain, &ip);

        info!("Step 4: Waiting for SSH...");
        let remote = (self.connect)(&ip);
        if !ssh::wait_for_ssh(remote.as_ref(), config.ssh_max_attempts, config.ssh_interval) {
            return Err(DeployError::SshUnreachable {
                host: ip,
                attempts: config.ssh_max_attempts,
            });
        }

        info!("Step 5: Deploying application...");
        deploy::deploy_application(config, remote.as_ref())?;

        Ok(Deployment {
            droplet_id,
            ip,
            dns_updated,
        })
    }
}

/// Check that the OpenSSH client tools are installed.
pub fn check_prerequisites() -> DeployResult<()> {
    for program in ["ssh", "scp", "ssh-keygen"] {
        if !cmd::command_exists(program) {
            return Err(DeployError::PrerequisiteMissing(format!(
                "{program} is not installed. \
                 Install the OpenSSH client"
            )));
        }
    }
    Ok(())
}

/// Human-readable summary printed after a successful run.
#[must_use]
pub fn summary(config: &Config, deployment: &Deployment) -> String {
    let project_dir = config.app.project_dir();
    let mut out = format!(
        "\n\
         ========================================\n\
         Deployment complete!\n\
         ========================================\n\
         \n\
         Droplet information:\n  \
         ID:         {id}\n  \
         IP:         {ip}\n  \
         Domain:     {domain}\n  \
         SSH:        ssh -i {key} {user}@{ip}\n\
         \n\
         Next steps:\n  \
         1. SSH into the droplet\n  \
         2. Configure {project_dir}/.env\n  \
         3. Run: cd {project_dir} && ./scripts/deploy-production.sh\n  \
         4. Wait for DNS propagation (~5-60 minutes)\n  \
         5. Visit https://{domain}\n\
         \n\
         Important:\n  \
         - Configure .env with production values\n  \
         - Change admin passwords after first login\n  \
         - Set up database backups\n",
        id = deployment.droplet_id,
        ip = deployment.ip,
        domain = config.domain,
        key = config.ssh_key_path.display(),
        user = config.ssh_user,
    );

    if !deployment.dns_updated {
        out.push_str(&format!(
            "  - DNS was not updated: point @ and www of {} at {} by hand\n",
            config.domain, deployment.ip
        ));
    }

    out
}

/// What a run would do, without touching the network or disk.
#[must_use]
pub fn dry_run(config: &Config) -> String {
    let mut out = String::new();
    out.push_str("=== Dry run: no changes will be made ===\n\n");

    out.push_str("--- cloud-init user_data ---\n");
    out.push_str(&scripts::cloud_init(&config.app.app_dir));
    out.push('\n');

    out.push_str(&format!("--- {} ---\n", config.remote_script));
    out.push_str(&scripts::deploy_script(&config.app));
    out.push('\n');

    out.push_str("--- Actions that would be performed ---\n");
    out.push_str(&format!(
        "1. Ensure SSH key {} exists and is registered as '{}'\n",
        config.ssh_key_path.display(),
        config.ssh_key_name
    ));
    out.push_str(&format!(
        "2. Create droplet '{}' ({}, {}, {}) and wait up to {}s for it to become active\n",
        config.droplet_name,
        config.region,
        config.size,
        config.image,
        config.active_timeout.as_secs()
    ));
    out.push_str(&format!(
        "3. Point A records @ and www of {} at the droplet\n",
        config.domain
    ));
    out.push_str(&format!(
        "4. Wait for SSH ({} attempts, {}s apart)\n",
        config.ssh_max_attempts,
        config.ssh_interval.as_secs()
    ));
    out.push_str(&format!(
        "5. Copy the deploy script to {} and run it\n",
        config.remote_script
    ));
    out
}
