use std::path::PathBuf;
use std::sync::Arc;

use crate::auth::TokenKeys;
use crate::config::Config;
use crate::err::Error;
use crate::store::{MemoryStore, PgStore, Store};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Arc<Config>,
    pub keys: Arc<TokenKeys>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: Config) -> Self {
        let keys = TokenKeys::new(config.jwt_secret.as_bytes());
        Self {
            store,
            config: Arc::new(config),
            keys: Arc::new(keys),
        }
    }

    /// Connects to PostgreSQL when configured, otherwise falls back to the
    /// in-memory store.
    pub async fn connect(config: Config) -> Result<Self, Error> {
        let store: Arc<dyn Store> = match &config.database_url {
            Some(url) => Arc::new(PgStore::connect(url, config.db_max_connections).await?),
            None => Arc::new(MemoryStore::new()),
        };
        Ok(Self::new(store, config))
    }

    pub fn uploads_dir(&self) -> PathBuf {
        PathBuf::from(&self.config.uploads_dir)
    }
}
