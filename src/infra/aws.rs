use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_dynamodb::types::AttributeValue;

use crate::adapter::AssociationStore;
use crate::broker::{RecordStatus, Repository, RepositoryRecord};
use crate::error::{AdapterError, Result};
use crate::ports::{MessageQueue, MessageTopic, ReceivedMessage};
use crate::registry::{RegistryRecord, RegistryStore};

/// Loads the shared AWS configuration from the environment.
pub async fn sdk_config() -> SdkConfig {
    aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await
}

/// Inbound queue backed by SQS.
pub struct SqsQueue {
    client: aws_sdk_sqs::Client,
    queue_url: String,
}

impl SqsQueue {
    pub fn new(config: &SdkConfig, endpoint: Option<&str>, queue_url: &str) -> SqsQueue {
        let mut builder = aws_sdk_sqs::config::Builder::from(config);
        if let Some(endpoint) = endpoint {
            builder = builder.endpoint_url(endpoint);
        }
        SqsQueue {
            client: aws_sdk_sqs::Client::from_conf(builder.build()),
            queue_url: queue_url.to_string(),
        }
    }
}

#[async_trait]
impl MessageQueue for SqsQueue {
    async fn receive(
        &self,
        max_messages: i32,
        wait_time: Duration,
    ) -> Result<Vec<ReceivedMessage>> {
        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(max_messages)
            .wait_time_seconds(wait_time.as_secs() as i32)
            .send()
            .await
            .map_err(|err| AdapterError::Unavailable("inbound queue", err.to_string()))?;
        let messages = output
            .messages
            .unwrap_or_default()
            .into_iter()
            .filter_map(|message| {
                let body = message.body?;
                let receipt_handle = message.receipt_handle?;
                Some(ReceivedMessage { body: body.into_bytes(), receipt_handle })
            })
            .collect();
        Ok(messages)
    }

    async fn delete(&self, receipt_handle: &str) -> Result<()> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|err| AdapterError::Unavailable("inbound queue", err.to_string()))?;
        Ok(())
    }
}

/// Outbound topics backed by SNS. A single client serves every address.
pub struct SnsTopic {
    client: aws_sdk_sns::Client,
}

impl SnsTopic {
    pub fn new(config: &SdkConfig, endpoint: Option<&str>) -> SnsTopic {
        let mut builder = aws_sdk_sns::config::Builder::from(config);
        if let Some(endpoint) = endpoint {
            builder = builder.endpoint_url(endpoint);
        }
        SnsTopic { client: aws_sdk_sns::Client::from_conf(builder.build()) }
    }
}

#[async_trait]
impl MessageTopic for SnsTopic {
    async fn publish(&self, topic_address: &str, payload: &str) -> Result<()> {
        self.client
            .publish()
            .topic_arn(topic_address)
            .message(payload)
            .send()
            .await
            .map_err(|err| AdapterError::Unavailable("outbound topic", err.to_string()))?;
        Ok(())
    }
}

fn dynamodb_client(config: &SdkConfig, endpoint: Option<&str>) -> aws_sdk_dynamodb::Client {
    let mut builder = aws_sdk_dynamodb::config::Builder::from(config);
    if let Some(endpoint) = endpoint {
        builder = builder.endpoint_url(endpoint);
    }
    aws_sdk_dynamodb::Client::from_conf(builder.build())
}

fn string_attr(item: &HashMap<String, AttributeValue>, name: &str) -> String {
    item.get(name).and_then(|value| value.as_s().ok()).cloned().unwrap_or_default()
}

fn number_attr(item: &HashMap<String, AttributeValue>, name: &str) -> i32 {
    item.get(name)
        .and_then(|value| value.as_n().ok())
        .and_then(|value| value.parse().ok())
        .unwrap_or_default()
}

/// Local data repository backed by DynamoDB.
pub struct DynamoRepository {
    client: aws_sdk_dynamodb::Client,
    table: String,
}

impl DynamoRepository {
    pub fn new(config: &SdkConfig, endpoint: Option<&str>, table: &str) -> DynamoRepository {
        DynamoRepository { client: dynamodb_client(config, endpoint), table: table.to_string() }
    }
}

#[async_trait]
impl Repository for DynamoRepository {
    async fn get(&self, message_id: &str) -> Result<Option<RepositoryRecord>> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table)
            .key("ID", AttributeValue::S(message_id.to_string()))
            .send()
            .await
            .map_err(|err| AdapterError::Unavailable("local data repository", err.to_string()))?;
        let Some(item) = output.item else { return Ok(None) };
        let status = match string_attr(&item, "status").as_str() {
            "SENT" => RecordStatus::Sent,
            "TO_SEND" => RecordStatus::ToSend,
            _ => RecordStatus::Received,
        };
        Ok(Some(RepositoryRecord {
            message_id: string_attr(&item, "ID"),
            message_class: string_attr(&item, "messageClass"),
            message_type: string_attr(&item, "messageType"),
            sequence: string_attr(&item, "sequence"),
            position: number_attr(&item, "position"),
            status,
        }))
    }

    async fn put(&self, record: RepositoryRecord) -> Result<()> {
        let status = match record.status {
            RecordStatus::Received => "RECEIVED",
            RecordStatus::Sent => "SENT",
            RecordStatus::ToSend => "TO_SEND",
        };
        self.client
            .put_item()
            .table_name(&self.table)
            .item("ID", AttributeValue::S(record.message_id))
            .item("messageClass", AttributeValue::S(record.message_class))
            .item("messageType", AttributeValue::S(record.message_type))
            .item("sequence", AttributeValue::S(record.sequence))
            .item("position", AttributeValue::N(record.position.to_string()))
            .item("status", AttributeValue::S(status.to_string()))
            .send()
            .await
            .map_err(|err| AdapterError::Unavailable("local data repository", err.to_string()))?;
        Ok(())
    }
}

/// Tenant registry table backed by DynamoDB.
pub struct DynamoRegistryStore {
    client: aws_sdk_dynamodb::Client,
    table: String,
}

impl DynamoRegistryStore {
    pub fn new(config: &SdkConfig, endpoint: Option<&str>, table: &str) -> DynamoRegistryStore {
        DynamoRegistryStore { client: dynamodb_client(config, endpoint), table: table.to_string() }
    }
}

#[async_trait]
impl RegistryStore for DynamoRegistryStore {
    async fn scan(&self) -> Result<Vec<RegistryRecord>> {
        let output = self
            .client
            .scan()
            .table_name(&self.table)
            .consistent_read(true)
            .send()
            .await
            .map_err(|err| AdapterError::Unavailable("registry table", err.to_string()))?;
        let records = output
            .items
            .unwrap_or_default()
            .iter()
            .map(|item| RegistryRecord {
                tenant_jisc_id: string_attr(item, "tenantJiscID"),
                url: string_attr(item, "url"),
                user: string_attr(item, "user"),
                key: string_attr(item, "key"),
                transfer_dir: string_attr(item, "transferDir"),
            })
            .collect();
        Ok(records)
    }
}

/// Object to transfer association table backed by DynamoDB.
pub struct DynamoAssociationStore {
    client: aws_sdk_dynamodb::Client,
    table: String,
}

impl DynamoAssociationStore {
    pub fn new(config: &SdkConfig, endpoint: Option<&str>, table: &str) -> DynamoAssociationStore {
        DynamoAssociationStore { client: dynamodb_client(config, endpoint), table: table.to_string() }
    }
}

#[async_trait]
impl AssociationStore for DynamoAssociationStore {
    async fn associate(&self, object_uuid: &str, transfer_id: &str) -> Result<()> {
        self.client
            .put_item()
            .table_name(&self.table)
            .item("objectUUID", AttributeValue::S(object_uuid.to_string()))
            .item("transferID", AttributeValue::S(transfer_id.to_string()))
            .send()
            .await
            .map_err(|err| AdapterError::Unavailable("processing table", err.to_string()))?;
        Ok(())
    }

    async fn get(&self, object_uuid: &str) -> Result<Option<String>> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table)
            .key("objectUUID", AttributeValue::S(object_uuid.to_string()))
            .send()
            .await
            .map_err(|err| AdapterError::Unavailable("processing table", err.to_string()))?;
        Ok(output.item.map(|item| string_attr(&item, "transferID")).filter(|id| !id.is_empty()))
    }
}
