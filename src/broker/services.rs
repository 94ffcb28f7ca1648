use crate::error::Result;
use crate::message::{
    Message, MessageBody, MessageClass, MessageType, MetadataCreateRequest, MetadataDeleteRequest,
    MetadataReadRequest, MetadataReadResponse, MetadataUpdateRequest, PreservationEventRequest,
};

use super::Broker;

/// Outbound message publishers, one per message family.
impl Broker {
    /// Publishes a MetadataCreate message.
    pub async fn metadata_create(&self, req: MetadataCreateRequest) -> Result<()> {
        let mut msg = Message::new(MessageType::MetadataCreate, MessageClass::Command);
        msg.message_body = MessageBody::MetadataCreate(Box::new(req));
        self.request(&msg).await
    }

    /// Publishes a MetadataRead message and waits for the correlated
    /// response. Not available until request/response lands.
    pub async fn metadata_read(&self, req: MetadataReadRequest) -> Result<MetadataReadResponse> {
        let mut msg = Message::new(MessageType::MetadataRead, MessageClass::Command);
        msg.message_body = MessageBody::MetadataRead(req);
        let resp = self.request_response(&msg).await?;
        let body = resp.message_body.clone();
        match body {
            MessageBody::MetadataReadResponse(body) => Ok(*body),
            _ => Err(crate::error::AdapterError::InvalidMessage(
                "unexpected response body".into(),
            )),
        }
    }

    /// Publishes a MetadataUpdate message.
    pub async fn metadata_update(&self, req: MetadataUpdateRequest) -> Result<()> {
        let mut msg = Message::new(MessageType::MetadataUpdate, MessageClass::Command);
        msg.message_body = MessageBody::MetadataUpdate(Box::new(req));
        self.request(&msg).await
    }

    /// Publishes a MetadataDelete message.
    pub async fn metadata_delete(&self, req: MetadataDeleteRequest) -> Result<()> {
        let mut msg = Message::new(MessageType::MetadataDelete, MessageClass::Command);
        msg.message_body = MessageBody::MetadataDelete(req);
        self.request(&msg).await
    }

    /// Publishes a PreservationEvent message.
    pub async fn preservation_event(&self, req: PreservationEventRequest) -> Result<()> {
        let mut msg = Message::new(MessageType::PreservationEvent, MessageClass::Event);
        msg.message_body = MessageBody::PreservationEvent(Box::new(req));
        self.request(&msg).await
    }
}
