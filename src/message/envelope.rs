use serde::Deserialize;
use serde_json::value::RawValue;

use crate::error::{AdapterError, Result};

pub const SCHEMA_ID_METADATA_CREATE_REQUEST: &str = "https://www.jisc.ac.uk/rdss/schema/message/metadata/create_request.json/#/definitions/MetadataCreateRequest";
pub const SCHEMA_ID_METADATA_UPDATE_REQUEST: &str = "https://www.jisc.ac.uk/rdss/schema/message/metadata/update_request.json/#/definitions/MetadataUpdateRequest";
pub const SCHEMA_ID_METADATA_DELETE_REQUEST: &str = "https://www.jisc.ac.uk/rdss/schema/message/metadata/delete_request.json/#/definitions/MetadataDeleteRequest";
pub const SCHEMA_ID_METADATA_READ_REQUEST: &str = "https://www.jisc.ac.uk/rdss/schema/message/metadata/read_request.json/#/definitions/MetadataReadRequest";
pub const SCHEMA_ID_METADATA_READ_RESPONSE: &str = "https://www.jisc.ac.uk/rdss/schema/message/metadata/read_response.json/#/definitions/MetadataReadResponse";
pub const SCHEMA_ID_PRESERVATION_EVENT_REQUEST: &str = "https://www.jisc.ac.uk/rdss/schema/message/preservation/preservation_event_request.json/#/definitions/PreservationEventRequest";

/// Superficial read of a message stream. It extracts just enough header
/// attributes to drive validation and conversion while deferring full
/// decoding to later stages.
#[derive(Debug)]
pub struct Envelope {
    pub header: Box<RawValue>,
    pub body: Box<RawValue>,
    pub attributes: Attributes,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Attributes {
    #[serde(default)]
    pub version: String,
    #[serde(rename = "messageType", default)]
    pub message_type: String,
    #[serde(rename = "correlationId", default)]
    pub correlation_id: String,
}

#[derive(Deserialize)]
struct RawEnvelope {
    #[serde(rename = "messageHeader")]
    header: Box<RawValue>,
    #[serde(rename = "messageBody")]
    body: Box<RawValue>,
}

impl Envelope {
    /// Opens the envelope of a message stream.
    pub fn open(stream: &[u8]) -> Result<Envelope> {
        let raw: RawEnvelope = serde_json::from_slice(stream).map_err(|err| {
            AdapterError::InvalidMessage(format!("error decoding header/body streams: {err}"))
        })?;
        let attributes: Attributes = serde_json::from_str(raw.header.get()).map_err(|err| {
            AdapterError::InvalidMessage(format!("error decoding envelope attributes: {err}"))
        })?;
        if attributes.version.is_empty() {
            return Err(AdapterError::InvalidMessage(
                "version header is empty or missing".into(),
            ));
        }
        if attributes.message_type.is_empty() {
            return Err(AdapterError::InvalidMessage(
                "message type header is empty or missing".into(),
            ));
        }
        Ok(Envelope { header: raw.header, body: raw.body, attributes })
    }

    /// Returns the schema definition id for the message, or an empty string
    /// for unknown types, which callers treat as an invalid message.
    pub fn schema_definition(&self) -> &'static str {
        match self.attributes.message_type.as_str() {
            "MetadataCreate" => SCHEMA_ID_METADATA_CREATE_REQUEST,
            "MetadataUpdate" => SCHEMA_ID_METADATA_UPDATE_REQUEST,
            "MetadataDelete" => SCHEMA_ID_METADATA_DELETE_REQUEST,
            "MetadataRead" => {
                if self.attributes.correlation_id.is_empty() {
                    SCHEMA_ID_METADATA_READ_REQUEST
                } else {
                    SCHEMA_ID_METADATA_READ_RESPONSE
                }
            }
            "PreservationEvent" => SCHEMA_ID_PRESERVATION_EVENT_REQUEST,
            _ => "",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(header: &str) -> Vec<u8> {
        format!(r#"{{"messageHeader": {header}, "messageBody": {{}}}}"#).into_bytes()
    }

    #[test]
    fn open_extracts_attributes() {
        let env = Envelope::open(&stream(
            r#"{"version": "4.0.0", "messageType": "MetadataCreate"}"#,
        ))
        .unwrap();
        assert_eq!(env.attributes.version, "4.0.0");
        assert_eq!(env.attributes.message_type, "MetadataCreate");
        assert_eq!(env.schema_definition(), SCHEMA_ID_METADATA_CREATE_REQUEST);
    }

    #[test]
    fn open_rejects_missing_version() {
        let err = Envelope::open(&stream(r#"{"messageType": "MetadataCreate"}"#)).unwrap_err();
        assert!(err.to_string().contains("version header"));
    }

    #[test]
    fn open_rejects_missing_type() {
        let err = Envelope::open(&stream(r#"{"version": "4.0.0"}"#)).unwrap_err();
        assert!(err.to_string().contains("message type header"));
    }

    #[test]
    fn open_rejects_non_json() {
        assert!(Envelope::open(b"not-json").is_err());
    }

    #[test]
    fn read_schema_depends_on_correlation_id() {
        let request = Envelope::open(&stream(
            r#"{"version": "4.0.0", "messageType": "MetadataRead"}"#,
        ))
        .unwrap();
        assert_eq!(request.schema_definition(), SCHEMA_ID_METADATA_READ_REQUEST);

        let response = Envelope::open(&stream(
            r#"{"version": "4.0.0", "messageType": "MetadataRead", "correlationId": "bddccd20-f548-11e7-be52-730af1229478"}"#,
        ))
        .unwrap();
        assert_eq!(response.schema_definition(), SCHEMA_ID_METADATA_READ_RESPONSE);
    }

    #[test]
    fn unknown_type_resolves_to_empty_schema() {
        let env = Envelope::open(&stream(
            r#"{"version": "4.0.0", "messageType": "VocabularyPatch"}"#,
        ))
        .unwrap();
        assert_eq!(env.schema_definition(), "");
    }
}
