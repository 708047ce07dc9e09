//! Store manager that dispatches to the configured provider.

use std::sync::Arc;

use tracing::info;

use fmiis_core::config::StorageConfig;
use fmiis_core::error::AppError;
use fmiis_core::result::AppResult;
use fmiis_core::traits::store::DurableStore;

/// Store manager that wraps the configured durable store provider.
///
/// The provider is selected at construction time based on configuration.
#[derive(Debug, Clone)]
pub struct StoreManager {
    /// The inner store provider.
    inner: Arc<dyn DurableStore>,
}

impl StoreManager {
    /// Create a new store manager from configuration.
    pub fn new(config: &StorageConfig) -> AppResult<Self> {
        let inner: Arc<dyn DurableStore> = match config.provider.as_str() {
            #[cfg(feature = "file")]
            "file" => {
                info!(directory = %config.directory, "Initializing file store provider");
                Arc::new(crate::file::FileStore::new(&config.directory)?)
            }
            #[cfg(feature = "memory")]
            "memory" => {
                info!("Initializing in-memory store provider");
                Arc::new(crate::memory::MemoryStore::new())
            }
            other => {
                return Err(AppError::configuration(format!(
                    "Unknown store provider: '{other}'. Supported: file, memory"
                )));
            }
        };

        Ok(Self { inner })
    }

    /// Create a store manager from an existing provider (for testing).
    pub fn from_provider(provider: Arc<dyn DurableStore>) -> Self {
        Self { inner: provider }
    }

    /// Shared handle to the inner provider.
    pub fn provider(&self) -> Arc<dyn DurableStore> {
        self.inner.clone()
    }
}

impl DurableStore for StoreManager {
    fn get(&self, key: &str) -> AppResult<Option<String>> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> AppResult<()> {
        self.inner.remove(key)
    }

    fn provider_type(&self) -> &str {
        self.inner.provider_type()
    }
}
