use async_trait::async_trait;
use aws_config::SdkConfig;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use crate::error::{AdapterError, Result};
use crate::ports::ObjectStore;

/// Object storage backed by S3. The SDK brings its own request retry
/// scheme, so downloads are not retried here.
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
}

impl S3ObjectStore {
    pub fn new(config: &SdkConfig, endpoint: Option<&str>, force_path_style: bool) -> S3ObjectStore {
        let mut builder = aws_sdk_s3::config::Builder::from(config);
        if let Some(endpoint) = endpoint {
            builder = builder.endpoint_url(endpoint);
        }
        builder = builder.force_path_style(force_path_style);
        S3ObjectStore { client: aws_sdk_s3::Client::from_conf(builder.build()) }
    }
}

fn bucket_and_key(uri: &str) -> Result<(String, String)> {
    let parsed = reqwest::Url::parse(uri)
        .map_err(|err| AdapterError::InvalidMessage(format!("invalid object URI {uri:?}: {err}")))?;
    let bucket = parsed
        .host_str()
        .ok_or_else(|| AdapterError::InvalidMessage(format!("object URI has no bucket: {uri}")))?
        .to_string();
    let key = parsed.path().trim_start_matches('/').to_string();
    Ok((bucket, key))
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn download(
        &self,
        token: &CancellationToken,
        target: &mut (dyn AsyncWrite + Send + Unpin),
        uri: &str,
    ) -> Result<u64> {
        let (bucket, key) = bucket_and_key(uri)?;
        let mut output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| AdapterError::Unavailable("object store", err.to_string()))?;

        let mut written: u64 = 0;
        loop {
            let chunk = tokio::select! {
                _ = token.cancelled() => {
                    return Err(AdapterError::Unavailable(
                        "object store",
                        format!("download cancelled: {uri}"),
                    ))
                }
                chunk = output.body.try_next() => chunk
                    .map_err(|err| AdapterError::Unavailable("object store", err.to_string()))?,
            };
            match chunk {
                Some(bytes) => {
                    target.write_all(&bytes).await?;
                    written += bytes.len() as u64;
                }
                None => break,
            }
        }
        target.flush().await?;
        Ok(written)
    }
}
