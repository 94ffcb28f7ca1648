use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

use super::enums::{ContainerType, MessageType, PackageType, PreservationEventType};
use super::research_object::ResearchObjectBase;

/// Body of a MetadataCreate message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct MetadataCreateRequest(pub ResearchObjectBase);

/// Body of a MetadataRead request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MetadataReadRequest {
    #[serde(rename = "objectUUID", default)]
    pub object_uuid: Option<Uuid>,
}

/// Body of a MetadataRead response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct MetadataReadResponse(pub ResearchObjectBase);

/// Body of a MetadataUpdate message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct MetadataUpdateRequest(pub ResearchObjectBase);

/// Body of a MetadataDelete message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MetadataDeleteRequest {
    #[serde(rename = "objectUUID", default)]
    pub object_uuid: Option<Uuid>,
}

/// Body of a PreservationEvent message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct PreservationEventRequest(pub InformationPackage);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct InformationPackage {
    #[serde(rename = "objectUUID", default)]
    pub object_uuid: Option<Uuid>,
    #[serde(rename = "packageUUID", default)]
    pub package_uuid: Option<Uuid>,
    #[serde(rename = "packageType", default)]
    pub package_type: Option<PackageType>,
    #[serde(rename = "packageContainerType", default)]
    pub package_container_type: Option<ContainerType>,
    #[serde(rename = "packageDescription", default, skip_serializing_if = "String::is_empty")]
    pub package_description: String,
    #[serde(rename = "packagePreservationEvent", default)]
    pub package_preservation_event: PreservationEvent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PreservationEvent {
    #[serde(rename = "preservationEventValue", default)]
    pub preservation_event_value: String,
    #[serde(rename = "preservationEventType", default)]
    pub preservation_event_type: Option<PreservationEventType>,
    #[serde(rename = "preservationEventDetail", default, skip_serializing_if = "String::is_empty")]
    pub preservation_event_detail: String,
}

/// Tagged message body. The variant is selected by the header's message type
/// and, for MetadataRead, by the presence of a correlation id.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageBody {
    MetadataCreate(Box<MetadataCreateRequest>),
    MetadataRead(MetadataReadRequest),
    MetadataReadResponse(Box<MetadataReadResponse>),
    MetadataUpdate(Box<MetadataUpdateRequest>),
    MetadataDelete(MetadataDeleteRequest),
    PreservationEvent(Box<PreservationEventRequest>),
}

impl MessageBody {
    /// Builds an empty body matching the given type and correlation id, the
    /// same table used when decoding a message stream.
    pub fn empty(message_type: MessageType, has_correlation_id: bool) -> MessageBody {
        match message_type {
            MessageType::MetadataCreate => MessageBody::MetadataCreate(Box::default()),
            MessageType::MetadataRead if has_correlation_id => {
                MessageBody::MetadataReadResponse(Box::default())
            }
            MessageType::MetadataRead => MessageBody::MetadataRead(MetadataReadRequest::default()),
            MessageType::MetadataUpdate => MessageBody::MetadataUpdate(Box::default()),
            MessageType::MetadataDelete => {
                MessageBody::MetadataDelete(MetadataDeleteRequest::default())
            }
            MessageType::PreservationEvent => MessageBody::PreservationEvent(Box::default()),
        }
    }

    /// Decodes the raw body document into the variant selected by the
    /// header.
    pub fn decode(
        message_type: MessageType,
        has_correlation_id: bool,
        body: serde_json::Value,
    ) -> serde_json::Result<MessageBody> {
        Ok(match message_type {
            MessageType::MetadataCreate => {
                MessageBody::MetadataCreate(Box::new(serde_json::from_value(body)?))
            }
            MessageType::MetadataRead if has_correlation_id => {
                MessageBody::MetadataReadResponse(Box::new(serde_json::from_value(body)?))
            }
            MessageType::MetadataRead => MessageBody::MetadataRead(serde_json::from_value(body)?),
            MessageType::MetadataUpdate => {
                MessageBody::MetadataUpdate(Box::new(serde_json::from_value(body)?))
            }
            MessageType::MetadataDelete => {
                MessageBody::MetadataDelete(serde_json::from_value(body)?)
            }
            MessageType::PreservationEvent => {
                MessageBody::PreservationEvent(Box::new(serde_json::from_value(body)?))
            }
        })
    }
}

impl Serialize for MessageBody {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MessageBody::MetadataCreate(b) => b.serialize(serializer),
            MessageBody::MetadataRead(b) => b.serialize(serializer),
            MessageBody::MetadataReadResponse(b) => b.serialize(serializer),
            MessageBody::MetadataUpdate(b) => b.serialize(serializer),
            MessageBody::MetadataDelete(b) => b.serialize(serializer),
            MessageBody::PreservationEvent(b) => b.serialize(serializer),
        }
    }
}
