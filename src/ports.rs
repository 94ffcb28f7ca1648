use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWrite;
use tokio_util::sync::CancellationToken;

use crate::error::Result;

/// A raw message pulled from the inbound queue, paired with the receipt
/// handle needed to delete it.
#[derive(Debug, Clone)]
pub struct ReceivedMessage {
    pub body: Vec<u8>,
    pub receipt_handle: String,
}

/// Durable queue with long-poll receive, at-least-once delivery and explicit
/// per-message deletion.
#[async_trait]
pub trait MessageQueue: Send + Sync {
    async fn receive(&self, max_messages: i32, wait_time: Duration) -> Result<Vec<ReceivedMessage>>;
    async fn delete(&self, receipt_handle: &str) -> Result<()>;
}

/// Publish-only topic client. The address is passed per call so a single
/// client can serve the main, invalid and error channels.
#[async_trait]
pub trait MessageTopic: Send + Sync {
    async fn publish(&self, topic_address: &str, payload: &str) -> Result<()>;
}

/// Object storage supporting `s3://bucket/key` URIs.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Streams the contents of a remote object into the writer and returns
    /// the number of bytes written.
    async fn download(
        &self,
        token: &CancellationToken,
        target: &mut (dyn AsyncWrite + Send + Unpin),
        uri: &str,
    ) -> Result<u64>;
}
