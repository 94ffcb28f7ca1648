use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{AdapterError, Result};
use crate::ports::{MessageQueue, MessageTopic, ObjectStore, ReceivedMessage};

/// In-memory queue for development and testing. Messages pushed with
/// [`InMemoryQueue::push`] are handed out once; deletions are recorded so
/// tests can assert the visibility discipline.
#[derive(Default)]
pub struct InMemoryQueue {
    messages: Mutex<VecDeque<ReceivedMessage>>,
    deleted: Mutex<Vec<String>>,
}

impl InMemoryQueue {
    pub fn new() -> InMemoryQueue {
        InMemoryQueue::default()
    }

    /// Enqueues a raw message body, returning its receipt handle.
    pub fn push(&self, body: impl Into<Vec<u8>>) -> String {
        let receipt_handle = Uuid::new_v4().to_string();
        let mut messages = self.messages.lock().unwrap();
        messages.push_back(ReceivedMessage {
            body: body.into(),
            receipt_handle: receipt_handle.clone(),
        });
        receipt_handle
    }

    /// Receipt handles deleted so far.
    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn pending(&self) -> usize {
        self.messages.lock().unwrap().len()
    }
}

#[async_trait]
impl MessageQueue for InMemoryQueue {
    async fn receive(
        &self,
        max_messages: i32,
        wait_time: Duration,
    ) -> Result<Vec<ReceivedMessage>> {
        let batch: Vec<ReceivedMessage> = {
            let mut messages = self.messages.lock().unwrap();
            let take = (max_messages.max(0) as usize).min(messages.len());
            messages.drain(..take).collect()
        };
        if batch.is_empty() {
            // Emulates the long poll.
            tokio::time::sleep(wait_time).await;
        }
        Ok(batch)
    }

    async fn delete(&self, receipt_handle: &str) -> Result<()> {
        let mut deleted = self.deleted.lock().unwrap();
        deleted.push(receipt_handle.to_string());
        Ok(())
    }
}

/// In-memory topic recording everything published to it.
#[derive(Default)]
pub struct InMemoryTopic {
    published: Mutex<Vec<(String, String)>>,
}

impl InMemoryTopic {
    pub fn new() -> InMemoryTopic {
        InMemoryTopic::default()
    }

    /// Payloads published to the given topic address, in order.
    pub fn published_to(&self, topic_address: &str) -> Vec<String> {
        let published = self.published.lock().unwrap();
        published
            .iter()
            .filter(|(address, _)| address == topic_address)
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    pub fn published(&self) -> Vec<(String, String)> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageTopic for InMemoryTopic {
    async fn publish(&self, topic_address: &str, payload: &str) -> Result<()> {
        let mut published = self.published.lock().unwrap();
        published.push((topic_address.to_string(), payload.to_string()));
        Ok(())
    }
}

/// In-memory object store keyed by `s3://bucket/key` URI.
#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryObjectStore {
    pub fn new() -> InMemoryObjectStore {
        InMemoryObjectStore::default()
    }

    pub fn put(&self, uri: &str, bytes: impl Into<Vec<u8>>) {
        let mut objects = self.objects.lock().unwrap();
        objects.insert(uri.to_string(), bytes.into());
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn download(
        &self,
        _token: &CancellationToken,
        target: &mut (dyn AsyncWrite + Send + Unpin),
        uri: &str,
    ) -> Result<u64> {
        let bytes = {
            let objects = self.objects.lock().unwrap();
            objects.get(uri).cloned()
        };
        let bytes = bytes.ok_or_else(|| {
            AdapterError::Unavailable("object store", format!("no such object: {uri}"))
        })?;
        target.write_all(&bytes).await?;
        target.flush().await?;
        Ok(bytes.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn queue_hands_out_messages_once() {
        let queue = InMemoryQueue::new();
        queue.push(b"one".to_vec());
        let batch = queue.receive(1, Duration::from_millis(1)).await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].body, b"one");
        assert!(queue.receive(1, Duration::from_millis(1)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn topic_records_publications_per_address() {
        let topic = InMemoryTopic::new();
        topic.publish("arn:main", "a").await.unwrap();
        topic.publish("arn:invalid", "b").await.unwrap();
        assert_eq!(topic.published_to("arn:main"), vec!["a".to_string()]);
        assert_eq!(topic.published_to("arn:invalid"), vec!["b".to_string()]);
    }

    #[tokio::test]
    async fn object_store_streams_bytes() {
        let store = InMemoryObjectStore::new();
        store.put("s3://bucket/key", b"payload".to_vec());
        let mut out = Vec::new();
        let token = CancellationToken::new();
        let n = store.download(&token, &mut out, "s3://bucket/key").await.unwrap();
        assert_eq!(n, 7);
        assert_eq!(out, b"payload");
    }
}
