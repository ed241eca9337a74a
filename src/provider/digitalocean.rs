use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{DeployError, DeployResult};
use crate::provider::{
    CloudApi, DomainRecord, Droplet, DropletRequest, NewSshKey, RecordRequest, SshKey,
};

const DO_API: &str = "https://api.digitalocean.com/v2";

/// Largest page size the API accepts; one page covers any
/// realistic account.
const PER_PAGE: u32 = 200;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// `DigitalOcean` API v2 client authenticated with a personal
/// access token.
pub struct DigitalOcean {
    token: String,
    base_url: String,
    http: Client,
}

#[derive(Deserialize)]
struct SshKeyList {
    ssh_keys: Vec<SshKey>,
}

#[derive(Deserialize)]
struct SshKeyEnvelope {
    ssh_key: SshKey,
}

#[derive(Deserialize)]
struct DropletEnvelope {
    droplet: Droplet,
}

#[derive(Deserialize)]
struct RecordList {
    domain_records: Vec<DomainRecord>,
}

#[derive(Deserialize)]
struct RecordEnvelope {
    domain_record: DomainRecord,
}

impl DigitalOcean {
    pub fn new(token: &str) -> DeployResult<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("dropship/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            token: token.to_string(),
            base_url: DO_API.to_string(),
            http,
        })
    }

    /// Point the client at another API root, e.g. a local mock.
    #[must_use]
    pub fn base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn send<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        request: RequestBuilder,
    ) -> DeployResult<T> {
        let resp = request.bearer_auth(&self.token).send()?;
        let status = resp.status();
        let body = resp.text()?;
        debug!(endpoint, %status, "DigitalOcean API response");

        if !status.is_success() {
            return Err(DeployError::Api {
                endpoint,
                status,
                body,
            });
        }

        decode(endpoint, &body)
    }
}

/// Parse a response body, turning missing or mistyped fields into
/// [`DeployError::MalformedResponse`].
pub fn decode<T: DeserializeOwned>(endpoint: &'static str, body: &str) -> DeployResult<T> {
    serde_json::from_str(body).map_err(|e| DeployError::MalformedResponse {
        endpoint,
        reason: e.to_string(),
    })
}

impl CloudApi for DigitalOcean {
    fn list_ssh_keys(&self) -> DeployResult<Vec<SshKey>> {
        let request = self
            .http
            .get(self.url("/account/keys"))
            .query(&[("per_page", PER_PAGE)]);
        let list: SshKeyList = self.send("list ssh keys", request)?;
        Ok(list.ssh_keys)
    }

    fn create_ssh_key(&self, key: &NewSshKey) -> DeployResult<SshKey> {
        let request = self.http.post(self.url("/account/keys")).json(key);
        let created: SshKeyEnvelope = self.send("create ssh key", request)?;
        Ok(created.ssh_key)
    }

    fn create_droplet(&self, request: &DropletRequest) -> DeployResult<Droplet> {
        let request = self.http.post(self.url("/droplets")).json(request);
        let created: DropletEnvelope = self.send("create droplet", request)?;
        Ok(created.droplet)
    }

    fn get_droplet(&self, id: u64) -> DeployResult<Droplet> {
        let request = self.http.get(self.url(&format!("/droplets/{id}")));
        let fetched: DropletEnvelope = self.send("get droplet", request)?;
        Ok(fetched.droplet)
    }

    fn list_domain_records(&self, domain: &str) -> DeployResult<Vec<DomainRecord>> {
        let request = self
            .http
            .get(self.url(&format!("/domains/{domain}/records")))
            .query(&[("per_page", PER_PAGE)]);
        let list: RecordList = self.send("list domain records", request)?;
        Ok(list.domain_records)
    }

    fn create_domain_record(
        &self,
        domain: &str,
        record: &RecordRequest,
    ) -> DeployResult<DomainRecord> {
        let request = self
            .http
            .post(self.url(&format!("/domains/{domain}/records")))
            .json(record);
        let created: RecordEnvelope = self.send("create domain record", request)?;
        Ok(created.domain_record)
    }

    fn update_domain_record(
        &self,
        domain: &str,
        id: u64,
        record: &RecordRequest,
    ) -> DeployResult<DomainRecord> {
        let request = self
            .http
            .put(self.url(&format!("/domains/{domain}/records/{id}")))
            .json(record);
        let updated: RecordEnvelope = self.send("update domain record", request)?;
        Ok(updated.domain_record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_droplet_envelope() {
        let body = r#"{"droplet":{"id":3164444,"name":"web","status":"active",
            "networks":{"v4":[{"ip_address":"10.128.0.2","type":"private"},
            {"ip_address":"198.51.100.7","type":"public"}],"v6":[]}}}"#;

        let envelope: DropletEnvelope = decode("get droplet", body).unwrap();

        assert_eq!(envelope.droplet.id, 3_164_444);
        assert!(envelope.droplet.is_active());
        assert_eq!(envelope.droplet.ipv4(), Some("198.51.100.7"));
    }

    #[test]
    fn decode_missing_id_is_malformed() {
        let body = r#"{"droplet":{"name":"web","status":"new"}}"#;

        let err = decode::<DropletEnvelope>("get droplet", body)
            .err()
            .expect("missing id should not decode");

        assert!(matches!(
            err,
            DeployError::MalformedResponse {
                endpoint: "get droplet",
                ..
            }
        ));
    }

    #[test]
    fn decode_record_list() {
        let body = r#"{"domain_records":[
            {"id":1,"type":"NS","name":"@","data":"ns1.digitalocean.com"},
            {"id":2,"type":"A","name":"www","data":"203.0.113.1"}],
            "links":{},"meta":{"total":2}}"#;

        let list: RecordList = decode("list domain records", body).unwrap();

        assert_eq!(list.domain_records.len(), 2);
        assert_eq!(list.domain_records[1].kind, "A");
        assert_eq!(list.domain_records[1].name, "www");
    }

    #[test]
    fn base_url_strips_trailing_slash() {
        let api = DigitalOcean::new("token")
            .unwrap()
            .base_url("http://127.0.0.1:9/v2/");

        assert_eq!(api.url("/droplets"), "http://127.0.0.1:9/v2/droplets");
    }
}
