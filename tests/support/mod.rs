//! In-memory stand-ins for the provider API and the droplet.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use dropship::provider::{
    CloudApi, DomainRecord, Droplet, DropletRequest, NetworkV4, Networks, NewSshKey,
    RecordRequest, SshKey,
};
use dropship::{Config, DeployError, DeployResult, RemoteHost};

pub const DROPLET_ID: u64 = 4242;
pub const PUBLIC_KEY: &str = "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIFakeKeyMaterial losricostacos-deploy";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListKeys,
    CreateKey(String),
    CreateDroplet(String),
    GetDroplet(u64),
    ListRecords(String),
    CreateRecord(String, RecordRequest),
    UpdateRecord(String, u64, RecordRequest),
}

fn server_error(endpoint: &'static str) -> DeployError {
    DeployError::Api {
        endpoint,
        status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
        body: "{\"id\":\"server_error\"}".to_string(),
    }
}

/// Scripted `CloudApi` that records every call.
pub struct FakeApi {
    pub keys: Vec<SshKey>,
    /// Status returned by successive `get_droplet` calls; the last
    /// one repeats.
    pub statuses: RefCell<VecDeque<&'static str>>,
    pub networks: Vec<NetworkV4>,
    pub records: Vec<DomainRecord>,
    pub fail_create_droplet: bool,
    pub fail_list_records: bool,
    pub fail_updates: bool,
    pub calls: RefCell<Vec<Call>>,
    pub droplet_requests: RefCell<Vec<DropletRequest>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self {
            keys: Vec::new(),
            statuses: RefCell::new(VecDeque::from(["new", "active"])),
            networks: vec![v4("198.51.100.7", "public")],
            records: Vec::new(),
            fail_create_droplet: false,
            fail_list_records: false,
            fail_updates: false,
            calls: RefCell::new(Vec::new()),
            droplet_requests: RefCell::new(Vec::new()),
        }
    }

    pub fn statuses(self, statuses: &[&'static str]) -> Self {
        *self.statuses.borrow_mut() = statuses.iter().copied().collect();
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.borrow().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }
}

pub fn v4(ip: &str, kind: &str) -> NetworkV4 {
    NetworkV4 {
        ip_address: ip.to_string(),
        kind: kind.to_string(),
    }
}

pub fn ssh_key(id: u64, name: &str, public_key: &str) -> SshKey {
    SshKey {
        id,
        name: name.to_string(),
        public_key: public_key.to_string(),
        fingerprint: String::new(),
    }
}

pub fn a_record(id: u64, kind: &str, name: &str, data: &str) -> DomainRecord {
    DomainRecord {
        id,
        kind: kind.to_string(),
        name: name.to_string(),
        data: data.to_string(),
    }
}

impl CloudApi for FakeApi {
    fn list_ssh_keys(&self) -> DeployResult<Vec<SshKey>> {
        self.record(Call::ListKeys);
        Ok(self.keys.clone())
    }

    fn create_ssh_key(&self, key: &NewSshKey) -> DeployResult<SshKey> {
        self.record(Call::CreateKey(key.name.clone()));
        Ok(ssh_key(99, &key.name, &key.public_key))
    }

    fn create_droplet(&self, request: &DropletRequest) -> DeployResult<Droplet> {
        self.record(Call::CreateDroplet(request.name.clone()));
        self.droplet_requests.borrow_mut().push(request.clone());
        if self.fail_create_droplet {
            return Err(server_error("create droplet"));
        }
        Ok(Droplet {
            id: DROPLET_ID,
            name: request.name.clone(),
            status: "new".to_string(),
            networks: Networks::default(),
        })
    }

    fn get_droplet(&self, id: u64) -> DeployResult<Droplet> {
        self.record(Call::GetDroplet(id));
        let mut statuses = self.statuses.borrow_mut();
        let status = if statuses.len() > 1 {
            statuses.pop_front()
        } else {
            statuses.front().copied()
        }
        .unwrap_or("active");

        let networks = if status == "active" {
            Networks {
                v4: self.networks.clone(),
            }
        } else {
            Networks::default()
        };

        Ok(Droplet {
            id,
            name: "losricostacos-prod".to_string(),
            status: status.to_string(),
            networks,
        })
    }

    fn list_domain_records(&self, domain: &str) -> DeployResult<Vec<DomainRecord>> {
        self.record(Call::ListRecords(domain.to_string()));
        if self.fail_list_records {
            return Err(server_error("list domain records"));
        }
        Ok(self.records.clone())
    }

    fn create_domain_record(
        &self,
        domain: &str,
        record: &RecordRequest,
    ) -> DeployResult<DomainRecord> {
        self.record(Call::CreateRecord(domain.to_string(), record.clone()));
        Ok(a_record(500, &record.kind, &record.name, &record.data))
    }

    fn update_domain_record(
        &self,
        domain: &str,
        id: u64,
        record: &RecordRequest,
    ) -> DeployResult<DomainRecord> {
        self.record(Call::UpdateRecord(domain.to_string(), id, record.clone()));
        if self.fail_updates {
            return Err(server_error("update domain record"));
        }
        Ok(a_record(id, &record.kind, &record.name, &record.data))
    }
}

/// What a `FakeRemote` saw.
#[derive(Default)]
pub struct RemoteLog {
    /// Probe outcomes handed out in order; failure once exhausted.
    pub probe_results: RefCell<VecDeque<bool>>,
    pub probes: Cell<u32>,
    /// `(local path, remote path, content at upload time)`.
    pub uploads: RefCell<Vec<(PathBuf, String, String)>>,
    /// `(command, whether any uploaded local file still existed)`.
    pub commands: RefCell<Vec<(String, bool)>>,
    pub fail_upload: Cell<bool>,
    pub fail_exec: Cell<bool>,
}

/// Scripted `RemoteHost`; clones share one log.
#[derive(Clone)]
pub struct FakeRemote {
    pub host: String,
    pub log: Rc<RemoteLog>,
}

impl FakeRemote {
    pub fn new(probe_results: &[bool]) -> Self {
        let log = RemoteLog::default();
        *log.probe_results.borrow_mut() = probe_results.iter().copied().collect();
        Self {
            host: "198.51.100.7".to_string(),
            log: Rc::new(log),
        }
    }

    pub fn at(&self, host: &str) -> Self {
        Self {
            host: host.to_string(),
            log: Rc::clone(&self.log),
        }
    }
}

impl RemoteHost for FakeRemote {
    fn host(&self) -> &str {
        &self.host
    }

    fn probe(&self) -> DeployResult<()> {
        self.log.probes.set(self.log.probes.get() + 1);
        if self.log.probe_results.borrow_mut().pop_front().unwrap_or(false) {
            Ok(())
        } else {
            Err(DeployError::CommandTimeout {
                command: "ssh root@198.51.100.7 echo ok".to_string(),
                after: Duration::from_secs(10),
            })
        }
    }

    fn upload(&self, local_path: &Path, remote_path: &str) -> DeployResult<()> {
        let content = fs::read_to_string(local_path)?;
        self.log.uploads.borrow_mut().push((
            local_path.to_path_buf(),
            remote_path.to_string(),
            content,
        ));
        if self.log.fail_upload.get() {
            return Err(DeployError::Io(io::Error::other("scp: connection reset")));
        }
        Ok(())
    }

    fn exec(&self, command: &str) -> DeployResult<()> {
        let staged_exists = self
            .log
            .uploads
            .borrow()
            .iter()
            .any(|(local, _, _)| local.exists());
        self.log
            .commands
            .borrow_mut()
            .push((command.to_string(), staged_exists));
        if self.log.fail_exec.get() {
            return Err(DeployError::Io(io::Error::other("remote script failed")));
        }
        Ok(())
    }
}

/// Config rooted in `dir` with an existing key pair and
/// millisecond timings.
pub fn test_config(dir: &Path) -> Config {
    let mut config = Config::new("test-token", dir);
    config.ssh_key_path = dir.join("deploy_key");
    config.work_dir = dir.to_path_buf();
    config.poll_interval = Duration::from_millis(1);
    config.active_timeout = Duration::from_secs(5);
    config.ssh_max_attempts = 3;
    config.ssh_interval = Duration::from_millis(1);

    fs::write(&config.ssh_key_path, "PRIVATE KEY").unwrap();
    fs::write(config.public_key_path(), format!("{PUBLIC_KEY}\n")).unwrap();
    config
}
