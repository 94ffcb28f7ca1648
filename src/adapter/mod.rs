mod handlers;
pub mod storage;

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::broker::{Broker, MessageHandler};
use crate::error::Result;
use crate::message::{Message, MessageType};
use crate::ports::ObjectStore;
use crate::registry::Registry;

pub use storage::{AssociationStore, InMemoryAssociationStore};

/// Processing configuration requested from the pipeline for every transfer.
const PROCESSING_CONFIG: &str = "automated";

/// Core of the channel adapter.
///
/// It subscribes to the broker, forwards dataset operations to the tenant's
/// preservation pipeline and publishes the results. The tenant registry
/// selects the pipeline, the object store resolves `s3://` file locations
/// and the association store remembers which transfer ingested which object.
pub struct Adapter {
    broker: Arc<Broker>,
    registry: Arc<Registry>,
    object_store: Arc<dyn ObjectStore>,
    storage: Arc<dyn AssociationStore>,
    http: reqwest::Client,
}

impl Adapter {
    pub fn new(
        broker: Arc<Broker>,
        registry: Arc<Registry>,
        object_store: Arc<dyn ObjectStore>,
        storage: Arc<dyn AssociationStore>,
    ) -> Arc<Adapter> {
        let adapter = Arc::new(Adapter {
            broker,
            registry,
            object_store,
            storage,
            http: reqwest::Client::new(),
        });
        adapter.broker.subscribe(
            MessageType::MetadataCreate,
            Arc::new(MetadataCreateHandler(Arc::clone(&adapter))),
        );
        adapter.broker.subscribe(
            MessageType::MetadataUpdate,
            Arc::new(MetadataUpdateHandler(Arc::clone(&adapter))),
        );
        adapter
    }

    /// Starts the underlying broker.
    pub async fn run(&self) {
        Arc::clone(&self.broker).run().await;
    }

    /// Stops the broker and the registry's background task.
    pub async fn stop(&self) {
        self.broker.stop().await;
        self.registry.stop().await;
    }

    pub fn broker(&self) -> &Broker {
        &self.broker
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    fn storage(&self) -> &dyn AssociationStore {
        self.storage.as_ref()
    }

    fn object_store(&self) -> &Arc<dyn ObjectStore> {
        &self.object_store
    }

    fn http(&self) -> &reqwest::Client {
        &self.http
    }

    fn cancellation_token(&self) -> &CancellationToken {
        self.broker.cancellation_token()
    }
}

struct MetadataCreateHandler(Arc<Adapter>);

#[async_trait]
impl MessageHandler for MetadataCreateHandler {
    async fn handle(&self, msg: &Message) -> Result<()> {
        self.0.handle_metadata_create(msg).await
    }
}

struct MetadataUpdateHandler(Arc<Adapter>);

#[async_trait]
impl MessageHandler for MetadataUpdateHandler {
    async fn handle(&self, msg: &Message) -> Result<()> {
        self.0.handle_metadata_update(msg).await
    }
}
