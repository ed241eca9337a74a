use std::io::Write;

use tracing::info;

use crate::config::Config;
use crate::error::DeployResult;
use crate::scripts;
use crate::ssh::RemoteHost;

/// Upload the deploy script to the droplet and run it.
///
/// The local copy is removed once the upload is done, before the
/// script runs remotely. A failed upload removes it too.
pub fn deploy_application(config: &Config, remote: &dyn RemoteHost) -> DeployResult<()> {
    info!("Deploying application...");

    let script = scripts::deploy_script(&config.app);

    let mut staged = tempfile::Builder::new()
        .prefix("temp_deploy")
        .suffix(".sh")
        .tempfile_in(&config.work_dir)?;
    staged.write_all(script.as_bytes())?;
    staged.flush()?;

    remote.upload(staged.path(), &config.remote_script)?;
    staged.close()?;

    remote.exec(&format!("bash {}", config.remote_script))?;

    info!("Application deployed!");
    Ok(())
}
