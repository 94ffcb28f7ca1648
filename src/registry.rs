use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::{AdapterError, Result};
use crate::pipeline::Client;

/// How often the registry re-scans its backing table.
const RELOAD_FREQUENCY: Duration = Duration::from_secs(10);

/// A row of the tenant registry table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryRecord {
    #[serde(rename = "tenantJiscID")]
    pub tenant_jisc_id: String,
    pub url: String,
    pub user: String,
    pub key: String,
    #[serde(rename = "transferDir")]
    pub transfer_dir: String,
}

/// Scannable table holding one row per tenant. The registry only reads.
#[async_trait]
pub trait RegistryStore: Send + Sync {
    /// Consistent full scan of the registry table.
    async fn scan(&self) -> Result<Vec<RegistryRecord>>;
}

/// Maps tenants to their preservation pipeline clients.
///
/// The map is rebuilt from the backing table on a timer and on demand via
/// [`Registry::reload`]. Lookups take a shared lock; a reload swaps the
/// whole map under the exclusive lock.
pub struct Registry {
    store: Arc<dyn RegistryStore>,
    clients: RwLock<HashMap<u64, Arc<Client>>>,
    reload_tx: mpsc::Sender<()>,
    token: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Registry {
    /// Builds the registry with an initial scan. Startup fails if the scan
    /// fails.
    pub async fn new(store: Arc<dyn RegistryStore>) -> Result<Arc<Registry>> {
        let (reload_tx, reload_rx) = mpsc::channel(1);
        let registry = Arc::new(Registry {
            store,
            clients: RwLock::new(HashMap::new()),
            reload_tx,
            token: CancellationToken::new(),
            task: Mutex::new(None),
        });
        registry.load().await.map_err(|err| {
            AdapterError::Config(format!("registry failed to load from source: {err}"))
        })?;

        let background = Arc::clone(&registry);
        let handle = tokio::spawn(async move { background.reload_loop(reload_rx).await });
        *registry.task.lock().unwrap() = Some(handle);
        Ok(registry)
    }

    async fn load(&self) -> Result<()> {
        let records = self.store.scan().await?;
        if records.is_empty() {
            warn!("Registry has been loaded but it is empty");
        }
        let mut next = HashMap::new();
        for record in records {
            let tenant_id: u64 = record.tenant_jisc_id.parse().map_err(|err| {
                AdapterError::Config(format!(
                    "failed to parse tenantJiscID {:?}: {err}",
                    record.tenant_jisc_id
                ))
            })?;
            let client = Client::new(
                &record.url,
                &record.user,
                &record.key,
                Path::new(&record.transfer_dir),
            )?;
            next.insert(tenant_id, Arc::new(client));
        }
        let mut clients = self.clients.write().unwrap();
        *clients = next;
        Ok(())
    }

    async fn reload_loop(self: Arc<Registry>, mut reload_rx: mpsc::Receiver<()>) {
        let mut ticker = tokio::time::interval(RELOAD_FREQUENCY);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await; // The first tick fires immediately.
        loop {
            tokio::select! {
                _ = self.token.cancelled() => return,
                _ = ticker.tick() => {}
                _ = reload_rx.recv() => {}
            }
            if let Err(err) = self.load().await {
                warn!("Registry reload failed: {err}");
            }
        }
    }

    /// Returns the pipeline client for a tenant, or None for unknown
    /// tenants.
    pub fn get(&self, tenant_id: u64) -> Option<Arc<Client>> {
        let clients = self.clients.read().unwrap();
        clients.get(&tenant_id).cloned()
    }

    /// Non-blocking request to reload the registry. Requests are coalesced
    /// when a reload is already queued.
    pub fn reload(&self) {
        match self.reload_tx.try_send(()) {
            Ok(()) => warn!("Reloading registry"),
            Err(_) => warn!("The registry is currently reloading the entries"),
        }
    }

    /// Dumps the current entries to the log.
    pub fn log_entries(&self) {
        let clients = self.clients.read().unwrap();
        for (tenant_id, client) in clients.iter() {
            warn!(tenant_jisc_id = *tenant_id, url = %client.base_url(), "Registry entry found");
        }
    }

    /// Cancels the background task and waits for it to exit.
    pub async fn stop(&self) {
        self.token.cancel();
        let task = self.task.lock().unwrap().take();
        if let Some(task) = task {
            let _ = task.await;
        }
    }
}

/// In-memory registry table for development and testing.
#[derive(Default)]
pub struct InMemoryRegistryStore {
    records: Mutex<Vec<RegistryRecord>>,
}

impl InMemoryRegistryStore {
    pub fn new() -> InMemoryRegistryStore {
        InMemoryRegistryStore::default()
    }

    /// Replaces the table contents, visible on the next scan.
    pub fn set_records(&self, records: Vec<RegistryRecord>) {
        let mut guard = self.records.lock().unwrap();
        *guard = records;
    }
}

#[async_trait]
impl RegistryStore for InMemoryRegistryStore {
    async fn scan(&self) -> Result<Vec<RegistryRecord>> {
        Ok(self.records.lock().unwrap().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(tenant: &str, url: &str) -> RegistryRecord {
        RegistryRecord {
            tenant_jisc_id: tenant.to_string(),
            url: url.to_string(),
            user: "user".to_string(),
            key: "key".to_string(),
            transfer_dir: std::env::temp_dir().to_string_lossy().into_owned(),
        }
    }

    #[tokio::test]
    async fn lookups_reflect_the_initial_scan() {
        let store = Arc::new(InMemoryRegistryStore::new());
        store.set_records(vec![record("1", "http://pipeline-one/api")]);
        let registry = Registry::new(store).await.unwrap();

        assert!(registry.get(1).is_some());
        assert!(registry.get(99).is_none());
        registry.stop().await;
    }

    #[tokio::test]
    async fn startup_fails_on_unparseable_tenant_ids() {
        let store = Arc::new(InMemoryRegistryStore::new());
        store.set_records(vec![record("not-a-number", "http://pipeline-one/api")]);
        assert!(Registry::new(store).await.is_err());
    }

    #[tokio::test]
    async fn manual_reload_picks_up_new_rows() {
        let store = Arc::new(InMemoryRegistryStore::new());
        let registry = Registry::new(Arc::clone(&store) as Arc<dyn RegistryStore>).await.unwrap();
        assert!(registry.get(1).is_none());

        store.set_records(vec![record("1", "http://pipeline-one/api")]);
        registry.reload();
        for _ in 0..50 {
            if registry.get(1).is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(registry.get(1).is_some());
        registry.stop().await;
    }
}
