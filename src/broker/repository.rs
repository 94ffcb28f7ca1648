use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::message::Message;

/// Minified form of a message stored in the local data repository, keyed by
/// the message id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRecord {
    #[serde(rename = "ID")]
    pub message_id: String,
    #[serde(rename = "messageClass")]
    pub message_class: String,
    #[serde(rename = "messageType")]
    pub message_type: String,
    #[serde(rename = "sequence")]
    pub sequence: String,
    #[serde(rename = "position")]
    pub position: i32,
    #[serde(rename = "status")]
    pub status: RecordStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RecordStatus {
    #[default]
    #[serde(rename = "RECEIVED")]
    Received,
    #[serde(rename = "SENT")]
    Sent,
    #[serde(rename = "TO_SEND")]
    ToSend,
}

impl RepositoryRecord {
    pub fn from_message(msg: &Message) -> RepositoryRecord {
        RepositoryRecord {
            message_id: msg.id(),
            message_class: msg.message_header.message_class.to_string(),
            message_type: msg.message_header.message_type.to_string(),
            sequence: msg
                .message_header
                .message_sequence
                .sequence
                .map(|id| id.to_string())
                .unwrap_or_default(),
            position: msg.message_header.message_sequence.position,
            status: RecordStatus::Received,
        }
    }
}

/// Local data repository used to reject repeat deliveries.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn get(&self, message_id: &str) -> Result<Option<RepositoryRecord>>;
    async fn put(&self, record: RepositoryRecord) -> Result<()>;

    /// Check-then-insert keyed by the message id. Returns true when the
    /// record already existed, meaning the message was seen before.
    async fn seen_before_or_store(&self, msg: &Message) -> Result<bool> {
        if self.get(&msg.id()).await?.is_some() {
            return Ok(true);
        }
        self.put(RepositoryRecord::from_message(msg)).await?;
        Ok(false)
    }
}

/// In-memory repository for development and testing.
#[derive(Default)]
pub struct InMemoryRepository {
    records: Mutex<HashMap<String, RepositoryRecord>>,
}

impl InMemoryRepository {
    pub fn new() -> InMemoryRepository {
        InMemoryRepository::default()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get(&self, message_id: &str) -> Result<Option<RepositoryRecord>> {
        let records = self.records.lock().unwrap();
        Ok(records.get(message_id).cloned())
    }

    async fn put(&self, record: RepositoryRecord) -> Result<()> {
        let mut records = self.records.lock().unwrap();
        records.insert(record.message_id.clone(), record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{MessageClass, MessageType};

    #[tokio::test]
    async fn seen_before_or_store_inserts_then_rejects() {
        let repo = InMemoryRepository::new();
        let msg = Message::new(MessageType::MetadataCreate, MessageClass::Command);

        assert!(!repo.seen_before_or_store(&msg).await.unwrap());
        assert!(repo.seen_before_or_store(&msg).await.unwrap());

        let record = repo.get(&msg.id()).await.unwrap().unwrap();
        assert_eq!(record.status, RecordStatus::Received);
        assert_eq!(record.message_type, "MetadataCreate");
    }

    #[test]
    fn record_status_uses_upper_snake_wire_names() {
        assert_eq!(serde_json::to_string(&RecordStatus::ToSend).unwrap(), "\"TO_SEND\"");
    }
}
