use thiserror::Error;

use crate::message::MessageType;
use crate::validator::ValidationIssue;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid message: {0}")]
    InvalidMessage(String),

    #[error("validation issues: {0:?}")]
    Validation(Vec<ValidationIssue>),

    #[error("handler failed: {0}")]
    Handler(String),

    #[error("unknown tenantJiscID: {0}")]
    UnknownTenant(u64),

    #[error("message handler not registered for type {0}")]
    UnassignedHandler(MessageType),

    #[error("{0} unavailable: {1}")]
    Unavailable(&'static str, String),

    #[error("pipeline API error: {0}")]
    Pipeline(String),

    #[error("not implemented: {0}")]
    NotImplemented(&'static str),
}

impl AdapterError {
    /// Stable identifier published in the `errorCode` header of messages
    /// redirected to the error channel.
    pub fn code(&self) -> &'static str {
        match self {
            AdapterError::InvalidMessage(_) | AdapterError::Validation(_) => "GENERR001",
            AdapterError::UnknownTenant(_) => "UnknownTenant",
            AdapterError::UnassignedHandler(_) => "UnassignedHandler",
            _ => "GENERR006",
        }
    }
}

pub type Result<T> = std::result::Result<T, AdapterError>;
