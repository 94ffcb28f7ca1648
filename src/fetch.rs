use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{AdapterError, Result};
use crate::message::StorageType;
use crate::ports::ObjectStore;
use crate::retry::{retry, Backoff, RetryError};

/// Upper bound for a single file download.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Downloads a file from its storage platform into the target writer,
/// routing by storage type. HTTP downloads retry under exponential backoff;
/// the object store brings its own retry scheme. Returns bytes written.
pub async fn download(
    token: &CancellationToken,
    object_store: &dyn ObjectStore,
    http: &reqwest::Client,
    target: &mut (dyn AsyncWrite + Send + Unpin),
    storage_type: StorageType,
    storage_location: &str,
) -> Result<u64> {
    debug!(storage_location, ?storage_type, "Saving file into the transfer directory");
    let child = token.child_token();
    let outcome = tokio::time::timeout(
        DOWNLOAD_TIMEOUT,
        download_inner(&child, object_store, http, target, storage_type, storage_location),
    )
    .await;
    match outcome {
        Ok(result) => {
            if let Ok(n) = &result {
                debug!(storage_location, bytes = *n, "Download finished");
            }
            result
        }
        Err(_) => {
            child.cancel();
            Err(AdapterError::Unavailable(
                "download",
                format!("timed out after {DOWNLOAD_TIMEOUT:?}: {storage_location}"),
            ))
        }
    }
}

async fn download_inner(
    token: &CancellationToken,
    object_store: &dyn ObjectStore,
    http: &reqwest::Client,
    target: &mut (dyn AsyncWrite + Send + Unpin),
    storage_type: StorageType,
    storage_location: &str,
) -> Result<u64> {
    match storage_type {
        StorageType::HTTP => download_http(token, http, target, storage_location).await,
        StorageType::S3 => object_store.download(token, target, storage_location).await,
    }
}

async fn download_http(
    token: &CancellationToken,
    http: &reqwest::Client,
    target: &mut (dyn AsyncWrite + Send + Unpin),
    storage_location: &str,
) -> Result<u64> {
    // Only the request is retried. Once a 200 arrives the body is streamed
    // straight into the target.
    let mut resp = retry(&Backoff::default(), token, || async {
        let resp = http
            .get(storage_location)
            .send()
            .await
            .map_err(|err| RetryError::Transient(err.into()))?;
        if resp.status() != reqwest::StatusCode::OK {
            return Err(RetryError::Transient(AdapterError::Unavailable(
                "storage location",
                format!("unexpected status code: {}", resp.status()),
            )));
        }
        Ok(resp)
    })
    .await?;

    let mut written: u64 = 0;
    while let Some(chunk) = resp.chunk().await? {
        target.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    target.flush().await?;
    Ok(written)
}
