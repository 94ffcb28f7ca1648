use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{AdapterError, Result};
use crate::message::Envelope;
use crate::retry::{retry, Backoff, RetryError};

/// A detail of a validation failure as reported by the schema service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub path: String,
}

/// Validation and conversion of incoming message streams.
///
/// Implementors look up the version of the message first and perform
/// conversion on a version mismatch, or validation otherwise. A successful
/// call returns the canonical stream, possibly rewritten.
#[async_trait]
pub trait Validator: Send + Sync {
    async fn validate(&self, token: &CancellationToken, stream: &[u8]) -> Result<Vec<u8>>;
}

/// Validator that accepts everything untouched.
pub struct NoOpValidator;

#[async_trait]
impl Validator for NoOpValidator {
    async fn validate(&self, _token: &CancellationToken, stream: &[u8]) -> Result<Vec<u8>> {
        Ok(stream.to_vec())
    }
}

/// Validator backed by the remote message schema service.
pub struct SchemaValidator {
    base_url: reqwest::Url,
    client: reqwest::Client,
    user_agent: String,
    /// Version of the specification the adapter supports right now.
    version: String,
    backoff: Backoff,
}

#[derive(Serialize)]
struct ValidateRequest<'a> {
    schema_id: &'a str,
    json_element: &'a RawValue,
}

#[derive(Deserialize)]
struct ValidateResponse {
    #[serde(rename = "errorList", default)]
    errors: Vec<ValidationIssue>,
    #[allow(dead_code)]
    #[serde(rename = "messageType", default)]
    message_type: String,
    #[allow(dead_code)]
    #[serde(rename = "schemaId", default)]
    schema_id: String,
    #[serde(default)]
    valid: bool,
    #[allow(dead_code)]
    #[serde(rename = "versionTag", default)]
    version_tag: String,
}

#[derive(Serialize)]
struct TransformRequest<'a> {
    to_version: &'a str,
    json_element: &'a RawValue,
}

#[derive(Deserialize)]
struct TransformResponse {
    #[serde(rename = "json_content")]
    content: Box<RawValue>,
    #[allow(dead_code)]
    #[serde(rename = "from_version_tag", default)]
    from_version: String,
    #[allow(dead_code)]
    #[serde(rename = "to_version_tag", default)]
    to_version: String,
}

impl SchemaValidator {
    pub fn new(base_url: &str, user_agent: &str, version: &str) -> Result<SchemaValidator> {
        let base_url = reqwest::Url::parse(base_url).map_err(|err| {
            AdapterError::Config(format!("error processing validator URL ({base_url:?}): {err}"))
        })?;
        // The service is slow, response times around 500ms are common.
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(SchemaValidator {
            base_url,
            client,
            user_agent: user_agent.to_string(),
            version: version.to_string(),
            backoff: Backoff::default(),
        })
    }

    /// Posts to the service with exponential backoff. Client errors in the
    /// 401..=499 range are permanent, 5xx and transport failures are retried.
    /// 200 and 400 are handed back to the caller for interpretation.
    async fn request<P: Serialize>(
        &self,
        token: &CancellationToken,
        path: &str,
        payload: &P,
    ) -> Result<reqwest::Response> {
        let url = self.base_url.join(path).map_err(|err| {
            AdapterError::Config(format!("error parsing the URL string: {err}"))
        })?;
        retry(&self.backoff, token, || async {
            let resp = self
                .client
                .post(url.clone())
                .header(reqwest::header::USER_AGENT, &self.user_agent)
                .json(payload)
                .send()
                .await
                .map_err(|err| RetryError::Transient(err.into()))?;
            let status = resp.status();
            if status.as_u16() >= 401 && status.as_u16() < 500 {
                return Err(RetryError::Permanent(AdapterError::InvalidMessage(format!(
                    "{} (client error)",
                    status
                ))));
            }
            if status.is_server_error() {
                return Err(RetryError::Transient(AdapterError::Unavailable(
                    "schema service",
                    format!("{status} (server error)"),
                )));
            }
            Ok(resp)
        })
        .await
    }

    async fn validate_request(
        &self,
        token: &CancellationToken,
        stream: &[u8],
        schema_id: &str,
    ) -> Result<()> {
        let element: &RawValue = serde_json::from_slice(stream)?;
        let path = format!("schema_validation/{}/", self.version);
        let resp = self
            .request(token, &path, &ValidateRequest { schema_id, json_element: element })
            .await?;
        let status = resp.status();
        let payload: ValidateResponse = resp.json().await?;
        match status {
            StatusCode::OK => {
                debug!(valid = payload.valid, "Schema service accepted the message");
                Ok(())
            }
            StatusCode::BAD_REQUEST => Err(AdapterError::Validation(payload.errors)),
            other => Err(AdapterError::Unavailable(
                "schema service",
                format!("unexpected response status {other}"),
            )),
        }
    }

    async fn transform_request(
        &self,
        token: &CancellationToken,
        stream: &[u8],
    ) -> Result<Vec<u8>> {
        let element: &RawValue = serde_json::from_slice(stream)?;
        let resp = self
            .request(
                token,
                "schema_conversion/",
                &TransformRequest { to_version: &self.version, json_element: element },
            )
            .await?;
        let status = resp.status();
        if status == StatusCode::BAD_REQUEST {
            let payload: serde_json::Value = resp.json().await?;
            let message = payload
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or_default()
                .to_string();
            return Err(AdapterError::InvalidMessage(format!(
                "error transforming message: {message}"
            )));
        }
        if status != StatusCode::OK {
            return Err(AdapterError::Unavailable(
                "schema service",
                format!("unexpected response status: {status}"),
            ));
        }
        let payload: TransformResponse = resp.json().await?;
        Ok(payload.content.get().as_bytes().to_vec())
    }
}

#[async_trait]
impl Validator for SchemaValidator {
    async fn validate(&self, token: &CancellationToken, stream: &[u8]) -> Result<Vec<u8>> {
        let envelope = Envelope::open(stream)?;

        // A version mismatch is resolved through the conversion API instead.
        if envelope.attributes.version != self.version {
            return self.transform_request(token, stream).await;
        }

        let schema_id = envelope.schema_definition();
        if schema_id.is_empty() {
            return Err(AdapterError::InvalidMessage(format!(
                "error validating message: unexpected type {:?}",
                envelope.attributes.message_type
            )));
        }
        self.validate_request(token, stream, schema_id).await?;
        Ok(stream.to_vec())
    }
}
