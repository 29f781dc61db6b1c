use std::sync::Arc;

use crate::config::Config;
use crate::store::{MemoryStore, PgStore, Store, StoreResult};

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Config,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: Config) -> Arc<Self> {
        Arc::new(Self { store, config })
    }

    /// Opens the store the config points at.
    pub async fn from_config(config: Config) -> StoreResult<Arc<Self>> {
        let store: Arc<dyn Store> = match &config.database_url {
            Some(url) => {
                log::info!("Connecting to PostgreSQL...");
                Arc::new(PgStore::connect(url, config.max_connections).await?)
            }
            None => Arc::new(MemoryStore::new()),
        };
        Ok(Self::new(store, config))
    }
}
