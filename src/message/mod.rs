pub mod body;
pub mod enums;
pub mod envelope;
pub mod research_object;
pub mod timestamp;

use chrono::{Months, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::error::AdapterError;

pub use body::{
    InformationPackage, MessageBody, MetadataCreateRequest, MetadataDeleteRequest,
    MetadataReadRequest, MetadataReadResponse, MetadataUpdateRequest, PreservationEvent,
    PreservationEventRequest,
};
pub use enums::*;
pub use envelope::Envelope;
pub use research_object::{
    Checksum, Date, File, FileStoragePlatform, Identifier, IdentifierRelationship, Organisation,
    OrganisationRole, Person, PersonRole, ResearchObject, ResearchObjectBase, Rights,
};
pub use timestamp::Timestamp;

/// Version of the messaging specification this adapter supports.
pub const VERSION: &str = "4.0.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MessageTimings {
    #[serde(rename = "publishedTimestamp", default)]
    pub published_timestamp: Timestamp,
    #[serde(rename = "expirationTimestamp", default, skip_serializing_if = "Timestamp::is_zero")]
    pub expiration_timestamp: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MessageSequence {
    #[serde(default)]
    pub sequence: Option<Uuid>,
    #[serde(default)]
    pub position: i32,
    #[serde(default)]
    pub total: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MessageHistory {
    #[serde(rename = "machineId", default)]
    pub machine_id: String,
    #[serde(rename = "machineAddress", default)]
    pub machine_address: String,
    #[serde(default)]
    pub timestamp: Timestamp,
}

/// Metadata describing the message itself: type, routing, timings,
/// sequencing and error reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageHeader {
    #[serde(rename = "messageId", default)]
    pub id: Option<Uuid>,
    #[serde(rename = "correlationId", default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<Uuid>,
    #[serde(rename = "messageClass")]
    pub message_class: MessageClass,
    #[serde(rename = "messageType")]
    pub message_type: MessageType,
    #[serde(rename = "returnAddress", default, skip_serializing_if = "String::is_empty")]
    pub return_address: String,
    #[serde(rename = "messageTimings", default)]
    pub message_timings: MessageTimings,
    #[serde(rename = "messageSequence", default)]
    pub message_sequence: MessageSequence,
    #[serde(rename = "messageHistory", default, skip_serializing_if = "Vec::is_empty")]
    pub message_history: Vec<MessageHistory>,
    #[serde(default)]
    pub version: String,
    #[serde(rename = "errorCode", default, skip_serializing_if = "String::is_empty")]
    pub error_code: String,
    #[serde(rename = "errorDescription", default, skip_serializing_if = "String::is_empty")]
    pub error_description: String,
    #[serde(default)]
    pub generator: String,
    #[serde(rename = "tenantJiscID", default)]
    pub tenant_jisc_id: u64,
}

/// A message as carried by the bus: a header plus a body whose shape depends
/// on the header.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    #[serde(rename = "messageHeader")]
    pub message_header: MessageHeader,
    #[serde(rename = "messageBody")]
    pub message_body: MessageBody,
}

impl Message {
    /// Returns a new message with a fresh id and an empty body preallocated
    /// for the given type.
    pub fn new(message_type: MessageType, message_class: MessageClass) -> Message {
        let now = Utc::now();
        let expiration = now.checked_add_months(Months::new(1)).unwrap_or(now);
        Message {
            message_header: MessageHeader {
                id: Some(Uuid::new_v4()),
                correlation_id: None,
                message_class,
                message_type,
                return_address: String::new(),
                message_timings: MessageTimings {
                    published_timestamp: now.into(),
                    expiration_timestamp: expiration.into(),
                },
                message_sequence: MessageSequence {
                    sequence: Some(Uuid::new_v4()),
                    position: 1,
                    total: 1,
                },
                message_history: Vec::new(),
                version: VERSION.to_string(),
                error_code: String::new(),
                error_description: String::new(),
                generator: generator(),
                tenant_jisc_id: 0,
            },
            message_body: MessageBody::empty(message_type, false),
        }
    }

    /// String form of the message id, empty when unset.
    pub fn id(&self) -> String {
        self.message_header.id.map(|id| id.to_string()).unwrap_or_default()
    }

    /// Records the error kind and description in the header so the message
    /// can be republished on the error channel.
    pub fn tag_error(&mut self, err: &AdapterError) {
        self.message_header.error_code = err.code().to_string();
        self.message_header.error_description = err.to_string();
    }

    pub fn metadata_create_request(&self) -> Result<&MetadataCreateRequest, AdapterError> {
        match &self.message_body {
            MessageBody::MetadataCreate(body) => Ok(body),
            _ => Err(body_mismatch("MetadataCreateRequest")),
        }
    }

    pub fn metadata_update_request(&self) -> Result<&MetadataUpdateRequest, AdapterError> {
        match &self.message_body {
            MessageBody::MetadataUpdate(body) => Ok(body),
            _ => Err(body_mismatch("MetadataUpdateRequest")),
        }
    }

    pub fn metadata_read_request(&self) -> Result<&MetadataReadRequest, AdapterError> {
        match &self.message_body {
            MessageBody::MetadataRead(body) => Ok(body),
            _ => Err(body_mismatch("MetadataReadRequest")),
        }
    }

    pub fn preservation_event_request(&self) -> Result<&PreservationEventRequest, AdapterError> {
        match &self.message_body {
            MessageBody::PreservationEvent(body) => Ok(body),
            _ => Err(body_mismatch("PreservationEventRequest")),
        }
    }
}

fn body_mismatch(expected: &str) -> AdapterError {
    AdapterError::InvalidMessage(format!("message body is not a {expected}"))
}

fn generator() -> String {
    format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

// Decoding happens in two steps so the body variant can be selected from the
// already-decoded header.
impl<'de> Deserialize<'de> for Message {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Proxy {
            #[serde(rename = "messageHeader")]
            header: serde_json::Value,
            #[serde(rename = "messageBody")]
            body: serde_json::Value,
        }

        let proxy = Proxy::deserialize(deserializer)?;
        let header: MessageHeader =
            serde_json::from_value(proxy.header).map_err(D::Error::custom)?;
        let body = MessageBody::decode(
            header.message_type,
            header.correlation_id.is_some(),
            proxy.body,
        )
        .map_err(D::Error::custom)?;
        Ok(Message { message_header: header, message_body: body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_preallocates_the_body_for_the_type() {
        let msg = Message::new(MessageType::MetadataCreate, MessageClass::Command);
        assert!(matches!(msg.message_body, MessageBody::MetadataCreate(_)));
        assert!(msg.message_header.id.is_some());
        assert_eq!(msg.message_header.version, VERSION);
        assert_eq!(msg.message_header.message_sequence.position, 1);
        assert_eq!(msg.message_header.message_sequence.total, 1);
    }

    #[test]
    fn tag_error_records_kind_and_description() {
        let mut msg = Message::new(MessageType::MetadataCreate, MessageClass::Command);
        msg.tag_error(&AdapterError::InvalidMessage("foobar".into()));
        assert_eq!(msg.message_header.error_code, "GENERR001");
        assert!(msg.message_header.error_description.contains("foobar"));

        let mut msg = Message::new(MessageType::MetadataCreate, MessageClass::Command);
        msg.tag_error(&AdapterError::UnknownTenant(7));
        assert_eq!(msg.message_header.error_code, "UnknownTenant");
    }

    #[test]
    fn decode_selects_body_by_type() {
        let blob = serde_json::json!({
            "messageHeader": {
                "messageId": "e3a18f48-9ccf-456b-96c5-784ae8eee63d",
                "messageClass": "Command",
                "messageType": "MetadataCreate",
                "version": "4.0.0",
                "tenantJiscID": 1
            },
            "messageBody": {
                "objectUUID": "5680e8e0-28a5-4b20-948e-fd0d08781e0b",
                "objectTitle": "A dataset",
                "objectResourceType": "dataset"
            }
        });
        let msg: Message = serde_json::from_value(blob).unwrap();
        let body = msg.metadata_create_request().unwrap();
        let object = body.0.infer_research_object();
        assert_eq!(object.object_title, "A dataset");
        assert_eq!(msg.message_header.tenant_jisc_id, 1);
    }

    #[test]
    fn decode_read_body_depends_on_correlation_id() {
        let request = serde_json::json!({
            "messageHeader": {"messageClass": "Command", "messageType": "MetadataRead", "version": "4.0.0"},
            "messageBody": {"objectUUID": "5680e8e0-28a5-4b20-948e-fd0d08781e0b"}
        });
        let msg: Message = serde_json::from_value(request).unwrap();
        assert!(matches!(msg.message_body, MessageBody::MetadataRead(_)));

        let response = serde_json::json!({
            "messageHeader": {
                "messageClass": "Command",
                "messageType": "MetadataRead",
                "correlationId": "bddccd20-f548-11e7-be52-730af1229478",
                "version": "4.0.0"
            },
            "messageBody": {"objectTitle": "Found", "objectResourceType": "dataset"}
        });
        let msg: Message = serde_json::from_value(response).unwrap();
        assert!(matches!(msg.message_body, MessageBody::MetadataReadResponse(_)));
    }

    #[test]
    fn round_trip_preserves_header_and_body() {
        let blob = serde_json::json!({
            "messageHeader": {
                "messageId": "e3a18f48-9ccf-456b-96c5-784ae8eee63d",
                "messageClass": "Command",
                "messageType": "MetadataCreate",
                "messageTimings": {"publishedTimestamp": "2004-08-01T10:00:00-00:00"},
                "messageSequence": {
                    "sequence": "b66be1c2-e610-461e-bc49-14a42c0b5d24",
                    "position": 1,
                    "total": 1
                },
                "version": "4.0.0",
                "generator": "test",
                "tenantJiscID": 2
            },
            "messageBody": {
                "objectUUID": "5680e8e0-28a5-4b20-948e-fd0d08781e0b",
                "objectTitle": "A dataset",
                "objectResourceType": "dataset",
                "objectFile": [{
                    "fileName": "data.bin",
                    "fileStorageLocation": "s3://bucket/key",
                    "fileStoragePlatform": {"storagePlatformType": "S3"}
                }]
            }
        });
        let msg: Message = serde_json::from_value(blob).unwrap();
        let encoded = serde_json::to_value(&msg).unwrap();
        let decoded: Message = serde_json::from_value(encoded).unwrap();
        assert_eq!(msg, decoded);
    }

    #[test]
    fn unsupported_type_fails_to_decode() {
        let blob = serde_json::json!({
            "messageHeader": {"messageClass": "Command", "messageType": "VocabularyRead", "version": "4.0.0"},
            "messageBody": {}
        });
        assert!(serde_json::from_value::<Message>(blob).is_err());
    }
}
