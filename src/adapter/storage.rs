use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::Result;

/// Associates research objects with the transfers that ingested them.
#[async_trait]
pub trait AssociationStore: Send + Sync {
    async fn associate(&self, object_uuid: &str, transfer_id: &str) -> Result<()>;

    /// Returns the transfer id previously associated with the object, or
    /// None when the object is unknown.
    async fn get(&self, object_uuid: &str) -> Result<Option<String>>;
}

/// In-memory association store for development and testing.
#[derive(Default)]
pub struct InMemoryAssociationStore {
    items: Mutex<HashMap<String, String>>,
}

impl InMemoryAssociationStore {
    pub fn new() -> InMemoryAssociationStore {
        InMemoryAssociationStore::default()
    }
}

#[async_trait]
impl AssociationStore for InMemoryAssociationStore {
    async fn associate(&self, object_uuid: &str, transfer_id: &str) -> Result<()> {
        let mut items = self.items.lock().unwrap();
        items.insert(object_uuid.to_string(), transfer_id.to_string());
        Ok(())
    }

    async fn get(&self, object_uuid: &str) -> Result<Option<String>> {
        let items = self.items.lock().unwrap();
        Ok(items.get(object_uuid).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn associate_then_get() {
        let store = InMemoryAssociationStore::new();
        store.associate("object-1", "transfer-1").await.unwrap();
        assert_eq!(store.get("object-1").await.unwrap(), Some("transfer-1".to_string()));
        assert_eq!(store.get("object-2").await.unwrap(), None);
    }
}
