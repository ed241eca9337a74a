//! Provision a `DigitalOcean` droplet and bootstrap an application
//! on it in one command.
//!
//! `dropship` creates a droplet with a cloud-init script that
//! installs Docker and opens the firewall, points the apex and
//! `www` A records of a domain at it, waits until SSH answers, then
//! copies a small script over and runs it to clone the application
//! repository. Configuring and starting the application is left to
//! the repository's own deploy script.
//!
//! # Architecture
//!
//! A run is a fixed sequence of stages driven by [`Pipeline`]:
//!
//! 1. **Key** - generate `~/.ssh/losricostacos_deploy` if missing and
//!    register it with `DigitalOcean` ([`keys`])
//! 2. **Droplet** - create the droplet and poll until it is active
//!    ([`provision`])
//! 3. **DNS** - update or create the `@` and `www` A records; a
//!    failure here is only a warning ([`dns`])
//! 4. **SSH** - probe the droplet until a session can be opened
//!    ([`ssh::wait_for_ssh`])
//! 5. **Deploy** - upload and run the checkout script ([`deploy`])
//!
//! The provider API and the remote host sit behind the
//! [`CloudApi`](provider::CloudApi) and
//! [`RemoteHost`](ssh::RemoteHost) traits.
//!
//! # Example
//!
//! ```rust,no_run
//! use dropship::{Config, DigitalOcean, Pipeline};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let api = DigitalOcean::new(&config.api_token)?;
//!
//!     let deployment = Pipeline::new(&config, api).run()?;
//!     eprintln!("{}", dropship::pipeline::summary(&config, &deployment));
//!     Ok(())
//! }
//! ```
//!
//! The `dropship` binary does the same after loading `.env`:
//!
//! ```sh
//! # Print the generated scripts and planned actions
//! dropship --dry-run
//!
//! # Provision and deploy
//! dropship
//! ```

// Allow noisy pedantic lints that don't add value for a
// deployment tool crate.
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod cmd;
pub mod config;
pub mod deploy;
pub mod dns;
pub mod error;
pub mod keys;
pub mod pipeline;
pub mod provider;
pub mod provision;
pub mod scripts;
pub mod ssh;

pub use config::{AppSource, Config};
pub use error::{DeployError, DeployResult};
pub use pipeline::{Deployment, Pipeline};
pub use provider::CloudApi;
pub use provider::digitalocean::DigitalOcean;
pub use ssh::{RemoteHost, SshSession};
