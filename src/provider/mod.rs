pub mod digitalocean;

use serde::{Deserialize, Serialize};

use crate::error::DeployResult;

/// An SSH public key registered with the provider.
#[derive(Debug, Clone, Deserialize)]
pub struct SshKey {
    pub id: u64,
    pub name: String,
    pub public_key: String,
    #[serde(default)]
    pub fingerprint: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewSshKey {
    pub name: String,
    pub public_key: String,
}

/// Droplet creation request.
#[derive(Debug, Clone, Serialize)]
pub struct DropletRequest {
    pub name: String,
    pub region: String,
    pub size: String,
    pub image: String,
    pub ssh_keys: Vec<u64>,
    /// Boot-time script run by cloud-init on first boot.
    pub user_data: String,
    pub tags: Vec<String>,
    pub ipv6: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Droplet {
    pub id: u64,
    pub name: String,
    pub status: String,
    #[serde(default)]
    pub networks: Networks,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Networks {
    #[serde(default)]
    pub v4: Vec<NetworkV4>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkV4 {
    pub ip_address: String,
    /// `public` or `private`.
    #[serde(rename = "type", default)]
    pub kind: String,
}

impl Droplet {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == "active"
    }

    /// First public IPv4 address, or the first IPv4 address of any
    /// kind when none is marked public.
    #[must_use]
    pub fn ipv4(&self) -> Option<&str> {
        self.networks
            .v4
            .iter()
            .find(|net| net.kind == "public")
            .or_else(|| self.networks.v4.first())
            .map(|net| net.ip_address.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DomainRecord {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub data: String,
}

/// Body of a record create or update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub data: String,
}

impl RecordRequest {
    #[must_use]
    pub fn a(name: &str, ip: &str) -> Self {
        Self {
            kind: "A".to_string(),
            name: name.to_string(),
            data: ip.to_string(),
        }
    }
}

/// The slice of the cloud provider API the pipeline depends on.
pub trait CloudApi {
    fn list_ssh_keys(&self) -> DeployResult<Vec<SshKey>>;

    fn create_ssh_key(&self, key: &NewSshKey) -> DeployResult<SshKey>;

    fn create_droplet(&self, request: &DropletRequest) -> DeployResult<Droplet>;

    fn get_droplet(&self, id: u64) -> DeployResult<Droplet>;

    fn list_domain_records(&self, domain: &str) -> DeployResult<Vec<DomainRecord>>;

    fn create_domain_record(
        &self,
        domain: &str,
        record: &RecordRequest,
    ) -> DeployResult<DomainRecord>;

    fn update_domain_record(
        &self,
        domain: &str,
        id: u64,
        record: &RecordRequest,
    ) -> DeployResult<DomainRecord>;
}

impl<T: CloudApi + ?Sized> CloudApi for &T {
    fn list_ssh_keys(&self) -> DeployResult<Vec<SshKey>> {
        (**self).list_ssh_keys()
    }

    fn create_ssh_key(&self, key: &NewSshKey) -> DeployResult<SshKey> {
        (**self).create_ssh_key(key)
    }

    fn create_droplet(&self, request: &DropletRequest) -> DeployResult<Droplet> {
        (**self).create_droplet(request)
    }

    fn get_droplet(&self, id: u64) -> DeployResult<Droplet> {
        (**self).get_droplet(id)
    }

    fn list_domain_records(&self, domain: &str) -> DeployResult<Vec<DomainRecord>> {
        (**self).list_domain_records(domain)
    }

    fn create_domain_record(
        &self,
        domain: &str,
        record: &RecordRequest,
    ) -> DeployResult<DomainRecord> {
        (**self).create_domain_record(domain, record)
    }

    fn update_domain_record(
        &self,
        domain: &str,
        id: u64,
        record: &RecordRequest,
    ) -> DeployResult<DomainRecord> {
        (**self).update_domain_record(domain, id, record)
    }
}
