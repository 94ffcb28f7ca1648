pub mod transfer_session;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{AdapterError, Result};

pub use transfer_session::{ChecksumSet, MetadataSet, TransferSession};

/// Name of the pipeline job that marks an AIP as stored.
const STORE_AIP_JOB: &str = "Store the AIP";

const STORED_POLL_INTERVAL: Duration = Duration::from_secs(2);
const STORED_MAX_WAIT: Duration = Duration::from_secs(30 * 60);

/// HTTP client of one preservation pipeline, bound to the tenant's transfer
/// source directory.
pub struct Client {
    http: reqwest::Client,
    base_url: reqwest::Url,
    user: String,
    key: String,
    transfer_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct PackageCreateRequest {
    pub name: String,
    pub path: String,
    pub processing_config: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PackageCreateResponse {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransferStatus {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub sip_uuid: String,
    #[serde(default)]
    pub microservice: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Job {
    #[serde(default)]
    pub uuid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub microservice: String,
}

impl Client {
    pub fn new(base_url: &str, user: &str, key: &str, transfer_dir: &Path) -> Result<Client> {
        let mut base = base_url.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = reqwest::Url::parse(&base)
            .map_err(|err| AdapterError::Config(format!("invalid pipeline URL ({base:?}): {err}")))?;
        Ok(Client {
            http: reqwest::Client::new(),
            base_url,
            user: user.to_string(),
            key: key.to_string(),
            transfer_dir: transfer_dir.to_path_buf(),
        })
    }

    pub fn base_url(&self) -> &reqwest::Url {
        &self.base_url
    }

    pub fn transfer_dir(&self) -> &Path {
        &self.transfer_dir
    }

    fn endpoint(&self, path: &str) -> Result<reqwest::Url> {
        self.base_url
            .join(path)
            .map_err(|err| AdapterError::Config(format!("invalid pipeline path {path:?}: {err}")))
    }

    fn authorization(&self) -> String {
        format!("ApiKey {}:{}", self.user, self.key)
    }

    /// Begins a transfer session named after the dataset. The session owns a
    /// fresh temporary directory under the tenant's transfer directory.
    pub fn transfer_session(&self, name: &str) -> Result<TransferSession<'_>> {
        TransferSession::new(self, name)
    }

    /// Submits a package creation request, returning the transfer id.
    pub async fn package_create(&self, req: &PackageCreateRequest) -> Result<PackageCreateResponse> {
        let url = self.endpoint("v2beta/package")?;
        let resp = self
            .http
            .post(url)
            .header(reqwest::header::AUTHORIZATION, self.authorization())
            .json(req)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(AdapterError::Pipeline(format!(
                "package create returned {}",
                resp.status()
            )));
        }
        Ok(resp.json().await?)
    }

    /// Fetches the status of a transfer.
    pub async fn transfer_status(&self, transfer_id: &str) -> Result<TransferStatus> {
        let url = self.endpoint(&format!("transfer/status/{transfer_id}"))?;
        let resp = self
            .http
            .get(url)
            .header(reqwest::header::AUTHORIZATION, self.authorization())
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(AdapterError::Pipeline(format!(
                "transfer status returned {}",
                resp.status()
            )));
        }
        Ok(resp.json().await?)
    }

    /// Lists the jobs of an ingest unit.
    pub async fn jobs(&self, unit_id: &str) -> Result<Vec<Job>> {
        let url = self.endpoint(&format!("v2beta/jobs/{unit_id}"))?;
        let resp = self
            .http
            .get(url)
            .header(reqwest::header::AUTHORIZATION, self.authorization())
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(AdapterError::Pipeline(format!("jobs returned {}", resp.status())));
        }
        Ok(resp.json().await?)
    }
}

/// Polls the pipeline until the transfer completes and its AIP is stored,
/// returning the AIP identifier. Transport errors surface immediately; the
/// wait is bounded by thirty minutes and the cancellation token.
pub async fn wait_until_stored(
    token: &CancellationToken,
    client: &Client,
    transfer_id: &str,
) -> Result<String> {
    let deadline = tokio::time::Instant::now() + STORED_MAX_WAIT;

    let sip_uuid = loop {
        let status = client.transfer_status(transfer_id).await?;
        if status.status == "COMPLETE" && !status.sip_uuid.is_empty() {
            break status.sip_uuid;
        }
        debug!(%transfer_id, status = %status.status, "Transfer not complete yet");
        wait_interval(token, deadline).await?;
    };

    loop {
        let jobs = client.jobs(&sip_uuid).await?;
        let stored = jobs
            .iter()
            .any(|job| job.name == STORE_AIP_JOB && job.status == "COMPLETE");
        if stored {
            return Ok(sip_uuid);
        }
        debug!(%sip_uuid, "AIP not stored yet");
        wait_interval(token, deadline).await?;
    }
}

async fn wait_interval(token: &CancellationToken, deadline: tokio::time::Instant) -> Result<()> {
    if tokio::time::Instant::now() >= deadline {
        return Err(AdapterError::Pipeline(
            "timed out waiting for the AIP to be stored".into(),
        ));
    }
    tokio::select! {
        _ = token.cancelled() => Err(AdapterError::Pipeline(
            "cancelled while waiting for the AIP to be stored".into(),
        )),
        _ = tokio::time::sleep(STORED_POLL_INTERVAL) => Ok(()),
    }
}
