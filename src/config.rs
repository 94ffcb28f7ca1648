use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{AdapterError, Result};

/// Commented reference configuration, also the source of defaults.
pub const DEFAULT_CONFIG: &str = r#"# Research dataset preservation channel adapter

[logging]

# Logging verbosity level: "trace", "debug", "info", "warn" or "error".
level = "info"

[adapter]

# Name of the table holding the object to transfer associations.
processing_table = "channel_adapter_processing_state"

# Name of the table backing the local data repository.
repository_table = "channel_adapter_local_data_repository"

# Name of the table holding the tenant registry.
registry_table = "channel_adapter_registry"

# Message validation supports two modes:
#
#   validation_mode = "remote"
#   Streams are validated or converted by the schema service.
#
#   validation_mode = "disabled"
#   Message validation is not performed.
validation_mode = "remote"

# Inbound queue URL the adapter subscribes to.
queue_recv_main_addr = ""

# Outbound topic addresses. Empty invalid/error addresses disable the
# corresponding redirection.
queue_send_main_addr = ""
queue_send_error_addr = ""
queue_send_invalid_addr = ""

[schema_service]

base_url = ""
user_agent = "channel-adapter"

[aws]

s3_endpoint = ""
s3_force_path_style = false
dynamodb_endpoint = ""
sqs_endpoint = ""
sns_endpoint = ""
"#;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub adapter: AdapterConfig,
    #[serde(default)]
    pub schema_service: SchemaServiceConfig,
    #[serde(default)]
    pub aws: AwsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig { level: default_log_level() }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AdapterConfig {
    #[serde(default)]
    pub processing_table: String,
    #[serde(default)]
    pub repository_table: String,
    #[serde(default)]
    pub registry_table: String,
    #[serde(default)]
    pub validation_mode: String,
    #[serde(default)]
    pub queue_recv_main_addr: String,
    #[serde(default)]
    pub queue_send_main_addr: String,
    #[serde(default)]
    pub queue_send_error_addr: String,
    #[serde(default)]
    pub queue_send_invalid_addr: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SchemaServiceConfig {
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AwsConfig {
    #[serde(default)]
    pub s3_endpoint: String,
    #[serde(default)]
    pub s3_force_path_style: bool,
    #[serde(default)]
    pub dynamodb_endpoint: String,
    #[serde(default)]
    pub sqs_endpoint: String,
    #[serde(default)]
    pub sns_endpoint: String,
}

impl Config {
    /// Loads the configuration from the given file, or the embedded
    /// reference configuration when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let mut config: Config = toml::from_str(DEFAULT_CONFIG)?;
        if let Some(path) = path {
            let content = fs::read_to_string(path).map_err(|err| {
                AdapterError::Config(format!(
                    "failed to read config file {}: {err}",
                    path.display()
                ))
            })?;
            config = toml::from_str(&content)?;
        }
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        match self.adapter.validation_mode.as_str() {
            "" | "remote" | "disabled" => {}
            other => {
                return Err(AdapterError::Config(format!(
                    "unsupported validation_mode: {other:?}"
                )))
            }
        }
        if self.adapter.validation_mode == "remote"
            && !self.schema_service.base_url.is_empty()
            && reqwest::Url::parse(&self.schema_service.base_url).is_err()
        {
            return Err(AdapterError::Config(format!(
                "schema_service.base_url is not a valid URL: {}",
                self.schema_service.base_url
            )));
        }
        Ok(())
    }
}

fn optional(value: &str) -> Option<&str> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

impl AwsConfig {
    pub fn s3_endpoint(&self) -> Option<&str> {
        optional(&self.s3_endpoint)
    }

    pub fn dynamodb_endpoint(&self) -> Option<&str> {
        optional(&self.dynamodb_endpoint)
    }

    pub fn sqs_endpoint(&self) -> Option<&str> {
        optional(&self.sqs_endpoint)
    }

    pub fn sns_endpoint(&self) -> Option<&str> {
        optional(&self.sns_endpoint)
    }
}
