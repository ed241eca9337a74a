use tracing::{info, warn};

use crate::error::{DeployError, DeployResult};
use crate::provider::{CloudApi, RecordRequest};

/// Record names pointed at the droplet: the apex and `www`.
pub const MANAGED_NAMES: [&str; 2] = ["@", "www"];

/// What happened to one managed record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordChange {
    Updated { name: String, id: u64 },
    Created { name: String, id: u64 },
}

/// Point the managed A records of `domain` at `ip`.
///
/// Failures are logged as warnings and reported as `false`; the
/// deployment carries on and DNS can be fixed by hand.
pub fn update_dns(api: &dyn CloudApi, domain: &str, ip: &str) -> bool {
    info!("Updating DNS for {domain}...");

    match reconcile_a_records(api, domain, ip) {
        Ok(_) => {
            info!("DNS updated successfully for {domain}");
            true
        }
        Err(e) => {
            warn!("DNS update failed: {e}");
            warn!("You may need to update DNS manually");
            false
        }
    }
}

/// Update the first A record for each managed name, and create the
/// ones that don't exist.
pub fn reconcile_a_records(
    api: &dyn CloudApi,
    domain: &str,
    ip: &str,
) -> DeployResult<Vec<RecordChange>> {
    if domain.is_empty() {
        return Err(DeployError::DnsError("no domain configured".into()));
    }

    let records = api.list_domain_records(domain)?;
    let mut changes = Vec::with_capacity(MANAGED_NAMES.len());

    for name in MANAGED_NAMES {
        let body = RecordRequest::a(name, ip);
        let existing = records
            .iter()
            .find(|r| r.kind == "A" && r.name == name);

        if let Some(record) = existing {
            let updated = api.update_domain_record(domain, record.id, &body)?;
            info!("Updated {} A record", display_name(name));
            changes.push(RecordChange::Updated {
                name: name.to_string(),
                id: updated.id,
            });
        } else {
            let created = api.create_domain_record(domain, &body)?;
            info!("Created {} A record", display_name(name));
            changes.push(RecordChange::Created {
                name: name.to_string(),
                id: created.id,
            });
        }
    }

    Ok(changes)
}

fn display_name(name: &str) -> &str {
    if name == "@" { "root" } else { name }
}
