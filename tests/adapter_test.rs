use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tempfile::TempDir;

use channel_adapter::adapter::{Adapter, AssociationStore, InMemoryAssociationStore};
use channel_adapter::broker::{Broker, InMemoryRepository, TopicAddresses};
use channel_adapter::infra::memory::{InMemoryObjectStore, InMemoryQueue, InMemoryTopic};
use channel_adapter::registry::{InMemoryRegistryStore, Registry, RegistryRecord};
use channel_adapter::validator::NoOpValidator;

const TRANSFER_ID: &str = "096a284d-5067-4de0-a0a4-a684018cd6df";
const SIP_UUID: &str = "41699e73-ec9e-4240-b153-71f4155e7da4";
const FILE_BODY: &[u8] = b"file payload bytes";

/// Mock preservation pipeline speaking just enough of the ingest API.
async fn start_pipeline(package_hits: Arc<AtomicUsize>) -> String {
    let app = Router::new()
        .route(
            "/api/v2beta/package",
            post(move || {
                let hits = Arc::clone(&package_hits);
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    Json(json!({"id": TRANSFER_ID}))
                }
            }),
        )
        .route(
            "/api/transfer/status/:id",
            get(|| async { Json(json!({"status": "COMPLETE", "sip_uuid": SIP_UUID})) }),
        )
        .route(
            "/api/v2beta/jobs/:id",
            get(|| async { Json(json!([{"name": "Store the AIP", "status": "COMPLETE"}])) }),
        )
        .route("/files/f.bin", get(|| async { FILE_BODY.to_vec() }));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

struct Harness {
    queue: Arc<InMemoryQueue>,
    topic: Arc<InMemoryTopic>,
    adapter: Arc<Adapter>,
    registry_store: Arc<InMemoryRegistryStore>,
    object_store: Arc<InMemoryObjectStore>,
    storage: Arc<InMemoryAssociationStore>,
    package_hits: Arc<AtomicUsize>,
    base_url: String,
    transfer_dir: TempDir,
}

impl Harness {
    async fn start(register_tenant_one: bool) -> Harness {
        let package_hits = Arc::new(AtomicUsize::new(0));
        let base_url = start_pipeline(Arc::clone(&package_hits)).await;
        let transfer_dir = tempfile::tempdir().unwrap();

        let registry_store = Arc::new(InMemoryRegistryStore::new());
        if register_tenant_one {
            registry_store.set_records(vec![tenant_record(1, &base_url, transfer_dir.path())]);
        }
        let registry =
            Registry::new(Arc::clone(&registry_store) as _).await.expect("registry load");

        let queue = Arc::new(InMemoryQueue::new());
        let topic = Arc::new(InMemoryTopic::new());
        let broker = Arc::new(Broker::new(
            Arc::new(NoOpValidator),
            Arc::clone(&queue) as _,
            Arc::clone(&topic) as _,
            TopicAddresses {
                main: "arn:main".to_string(),
                invalid: "arn:invalid".to_string(),
                error: "arn:error".to_string(),
            },
            Arc::new(InMemoryRepository::new()),
        ));
        let object_store = Arc::new(InMemoryObjectStore::new());
        let storage = Arc::new(InMemoryAssociationStore::new());
        let adapter = Adapter::new(
            broker,
            registry,
            Arc::clone(&object_store) as _,
            Arc::clone(&storage) as _,
        );
        adapter.run().await;

        Harness {
            queue,
            topic,
            adapter,
            registry_store,
            object_store,
            storage,
            package_hits,
            base_url,
            transfer_dir,
        }
    }

    async fn wait_deleted(&self, count: usize) {
        for _ in 0..400 {
            if self.queue.deleted().len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        panic!("expected {count} deletions, saw {}", self.queue.deleted().len());
    }

    /// Finds a staged file under any transfer directory.
    fn staged_file(&self, rel: &str) -> Option<PathBuf> {
        let entries = std::fs::read_dir(self.transfer_dir.path()).ok()?;
        for entry in entries.flatten() {
            let candidate = entry.path().join(rel);
            if candidate.exists() {
                return Some(candidate);
            }
        }
        None
    }
}

fn tenant_record(tenant: u64, base_url: &str, transfer_dir: &Path) -> RegistryRecord {
    RegistryRecord {
        tenant_jisc_id: tenant.to_string(),
        url: format!("{base_url}/api"),
        user: "test".to_string(),
        key: "test".to_string(),
        transfer_dir: transfer_dir.to_string_lossy().into_owned(),
    }
}

fn create_message(id: &str, tenant: u64, files: serde_json::Value) -> String {
    json!({
        "messageHeader": {
            "messageId": id,
            "messageClass": "Command",
            "messageType": "MetadataCreate",
            "version": "4.0.0",
            "tenantJiscID": tenant
        },
        "messageBody": {
            "objectUUID": "5680e8e0-28a5-4b20-948e-fd0d08781e0b",
            "objectTitle": "Research dataset",
            "objectResourceType": "dataset",
            "objectIdentifier": [
                {"identifierValue": "10.5072/FK2/QAWS82", "identifierType": "DOI"}
            ],
            "objectFile": files
        }
    })
    .to_string()
}

fn http_file(base_url: &str) -> serde_json::Value {
    json!([{
        "fileUUID": "e150c4ab-0370-4e5a-8722-7fb3369b7017",
        "fileIdentifier": "file-0001",
        "fileName": "f.bin",
        "fileSize": FILE_BODY.len(),
        "fileChecksum": [
            {"checksumType": "md5", "checksumValue": "0f343b0931126a20f133d67c2b018a3b"},
            {"checksumType": "sha256", "checksumValue": "2c26b46b68ffc68ff99b453c1d304134"}
        ],
        "fileStorageLocation": format!("{base_url}/files/f.bin"),
        "fileStoragePlatform": {"storagePlatformType": "HTTP"}
    }])
}

#[tokio::test]
async fn unknown_tenant_is_reported_on_the_error_channel() {
    let harness = Harness::start(true).await;
    let body = create_message("b3a1ef12-13bb-45a2-bd14-d12d4b2e4b70", 99, json!([]));
    harness.queue.push(body.into_bytes());
    harness.wait_deleted(1).await;

    let published = harness.topic.published_to("arn:error");
    assert_eq!(published.len(), 1);
    let msg: serde_json::Value = serde_json::from_str(&published[0]).unwrap();
    assert_eq!(msg["messageHeader"]["errorCode"], "UnknownTenant");
    assert!(harness.topic.published_to("arn:main").is_empty());
    assert!(harness.staged_file("objects/f.bin").is_none());
    harness.adapter.stop().await;
}

#[tokio::test]
async fn http_file_is_staged_and_a_preservation_event_is_published() {
    let harness = Harness::start(true).await;
    let body = create_message(
        "6cc40dcd-0c77-49b2-b2a0-1a90de6ebf5f",
        1,
        http_file(&harness.base_url),
    );
    harness.queue.push(body.into_bytes());
    harness.wait_deleted(1).await;

    // The file was fetched over HTTP into the transfer workspace.
    let staged = harness.staged_file("objects/f.bin").expect("staged file");
    assert_eq!(std::fs::read(staged).unwrap(), FILE_BODY);

    // Metadata and checksum manifests were written on start.
    let metadata = harness.staged_file("metadata/metadata.csv").expect("metadata.csv");
    let metadata = std::fs::read_to_string(metadata).unwrap();
    assert!(metadata.starts_with("filename,"));
    assert!(metadata.contains("objects/f.bin"));
    let checksums = harness.staged_file("metadata/checksum.md5").expect("checksum.md5");
    let checksums = std::fs::read_to_string(checksums).unwrap();
    assert_eq!(checksums, "0f343b0931126a20f133d67c2b018a3b f.bin\n");

    // The transfer was started once.
    assert_eq!(harness.package_hits.load(Ordering::SeqCst), 1);

    // The association was persisted.
    let transfer_id =
        harness.storage.get("5680e8e0-28a5-4b20-948e-fd0d08781e0b").await.unwrap();
    assert_eq!(transfer_id.as_deref(), Some(TRANSFER_ID));

    // A PreservationEvent with the AIP UUID reached the main channel.
    let published = harness.topic.published_to("arn:main");
    assert_eq!(published.len(), 1);
    let msg: serde_json::Value = serde_json::from_str(&published[0]).unwrap();
    assert_eq!(msg["messageHeader"]["messageType"], "PreservationEvent");
    assert_eq!(msg["messageHeader"]["messageClass"], "Event");
    assert_eq!(msg["messageBody"]["packageUUID"], SIP_UUID);
    assert_eq!(msg["messageBody"]["packageType"], "AIP");
    assert_eq!(msg["messageBody"]["packageContainerType"], "zip");
    assert_eq!(
        msg["messageBody"]["packagePreservationEvent"]["preservationEventType"],
        "informationPackageCreation"
    );
    harness.adapter.stop().await;
}

#[tokio::test]
async fn s3_file_is_staged_through_the_object_store() {
    let harness = Harness::start(true).await;
    harness.object_store.put("s3://bucket/f.bin", FILE_BODY.to_vec());
    let files = json!([{
        "fileIdentifier": "file-0002",
        "fileName": "f.bin",
        "fileSize": FILE_BODY.len(),
        "fileChecksum": [],
        "fileStorageLocation": "s3://bucket/f.bin",
        "fileStoragePlatform": {"storagePlatformType": "S3"}
    }]);
    let body = create_message("0b7ba4b5-3b6f-4f4a-ae28-5b4b62094fbc", 1, files);
    harness.queue.push(body.into_bytes());
    harness.wait_deleted(1).await;

    let staged = harness.staged_file("objects/f.bin").expect("staged file");
    assert_eq!(std::fs::read(staged).unwrap(), FILE_BODY);
    assert_eq!(harness.topic.published_to("arn:main").len(), 1);
    harness.adapter.stop().await;
}

#[tokio::test]
async fn duplicate_delivery_processes_the_transfer_once() {
    let harness = Harness::start(true).await;
    let body = create_message(
        "3e0a31b5-45b8-40b2-9a8a-6a2af2b3c6a8",
        1,
        http_file(&harness.base_url),
    );
    harness.queue.push(body.clone().into_bytes());
    harness.wait_deleted(1).await;
    harness.queue.push(body.into_bytes());
    harness.wait_deleted(2).await;

    assert_eq!(harness.package_hits.load(Ordering::SeqCst), 1);
    assert_eq!(harness.topic.published_to("arn:main").len(), 1);
    assert!(harness.topic.published_to("arn:error").is_empty());
    harness.adapter.stop().await;
}

#[tokio::test]
async fn fileless_create_succeeds_without_starting_a_transfer() {
    let harness = Harness::start(true).await;
    let body = create_message("8f2d9e6b-2f3b-44b5-9a34-3b8f74a3b1de", 1, json!([]));
    harness.queue.push(body.into_bytes());
    harness.wait_deleted(1).await;

    assert_eq!(harness.package_hits.load(Ordering::SeqCst), 0);
    assert!(harness.topic.published_to("arn:main").is_empty());
    assert!(harness.topic.published_to("arn:error").is_empty());
    harness.adapter.stop().await;
}

#[tokio::test]
async fn registry_hot_reload_enables_a_tenant_mid_run() {
    let harness = Harness::start(false).await;

    // Unknown at first.
    let body = create_message("97b35d9f-76bb-4a6c-a429-2d40a3f56f98", 1, json!([]));
    harness.queue.push(body.into_bytes());
    harness.wait_deleted(1).await;
    assert_eq!(harness.topic.published_to("arn:error").len(), 1);

    // Register tenant 1 mid-run and trigger a reload.
    harness.registry_store.set_records(vec![tenant_record(
        1,
        &harness.base_url,
        harness.transfer_dir.path(),
    )]);
    harness.adapter.registry().reload();
    for _ in 0..200 {
        if harness.adapter.registry().get(1).is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    assert!(harness.adapter.registry().get(1).is_some());

    let body = create_message(
        "5cf0c0c5-9930-4152-8b39-7ae4bfba1f0e",
        1,
        http_file(&harness.base_url),
    );
    harness.queue.push(body.into_bytes());
    harness.wait_deleted(2).await;

    assert_eq!(harness.topic.published_to("arn:error").len(), 1);
    assert_eq!(harness.topic.published_to("arn:main").len(), 1);
    harness.adapter.stop().await;
}

#[tokio::test]
async fn update_with_known_prior_version_starts_a_new_transfer() {
    let harness = Harness::start(true).await;
    harness.storage.associate("c56c6f09-b998-4b9c-a8dc-2b0ab6e28ab9", "prior-transfer").await.unwrap();

    let body = json!({
        "messageHeader": {
            "messageId": "30b2b0d0-9b4f-47b4-bd7a-2b2d4f06b8d0",
            "messageClass": "Command",
            "messageType": "MetadataUpdate",
            "version": "4.0.0",
            "tenantJiscID": 1
        },
        "messageBody": {
            "objectUUID": "b7f3f5a2-bd43-40b6-bd1f-4f0b02d6c5c3",
            "objectTitle": "Research dataset v2",
            "objectResourceType": "dataset",
            "objectRelatedIdentifier": [{
                "identifier": {
                    "identifierValue": "c56c6f09-b998-4b9c-a8dc-2b0ab6e28ab9",
                    "identifierType": "DOI"
                },
                "relationType": "isNewVersionOf"
            }],
            "objectFile": http_file(&harness.base_url)
        }
    })
    .to_string();
    harness.queue.push(body.into_bytes());
    harness.wait_deleted(1).await;

    assert_eq!(harness.package_hits.load(Ordering::SeqCst), 1);
    assert!(harness.topic.published_to("arn:error").is_empty());
    harness.adapter.stop().await;
}

#[tokio::test]
async fn update_without_new_version_relationship_is_ignored() {
    let harness = Harness::start(true).await;
    let body = json!({
        "messageHeader": {
            "messageId": "dca2cb2e-f4a6-47a8-bb3e-93b6637cf3aa",
            "messageClass": "Command",
            "messageType": "MetadataUpdate",
            "version": "4.0.0",
            "tenantJiscID": 1
        },
        "messageBody": {
            "objectUUID": "b7f3f5a2-bd43-40b6-bd1f-4f0b02d6c5c3",
            "objectTitle": "Research dataset v2",
            "objectResourceType": "dataset",
            "objectFile": http_file(&harness.base_url)
        }
    })
    .to_string();
    harness.queue.push(body.into_bytes());
    harness.wait_deleted(1).await;

    assert_eq!(harness.package_hits.load(Ordering::SeqCst), 0);
    assert!(harness.topic.published_to("arn:error").is_empty());
    harness.adapter.stop().await;
}
