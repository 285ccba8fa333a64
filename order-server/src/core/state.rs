use std::sync::Arc;

use crate::auth::{CapabilityPolicy, JwtService};
use crate::core::config::StoreBackend;
use crate::core::{Config, Result, ServerError};
use crate::db::{MemoryStore, PostgrestStore, RecordStore};
use crate::orders::OrderService;

/// 服务器状态 - 所有请求共享
///
/// Cheap to clone: every field is behind an `Arc`.
#[derive(Clone, Debug)]
pub struct ServerState {
    pub config: Config,
    pub store: Arc<dyn RecordStore>,
    pub orders: Arc<OrderService>,
    pub jwt_service: Arc<JwtService>,
}

impl ServerState {
    /// Wire services over an existing store
    pub fn new(config: Config, store: Arc<dyn RecordStore>) -> Result<Self> {
        let policy = Arc::new(CapabilityPolicy::with_overrides(
            config.transition_grants.as_deref(),
        )?);
        let orders = Arc::new(OrderService::new(
            store.clone(),
            policy,
            config.tax_rate,
        ));
        let jwt_service = Arc::new(JwtService::with_config(config.jwt.clone()));

        Ok(Self {
            config,
            store,
            orders,
            jwt_service,
        })
    }

    /// Build the configured store backend and wire services over it
    pub async fn initialize(config: &Config) -> Result<Self> {
        let store: Arc<dyn RecordStore> = match config.store.backend {
            StoreBackend::Memory => {
                let store = MemoryStore::new();
                if let Some(path) = &config.store.seed_file {
                    let loaded = store.load_seed_file(path)?;
                    tracing::info!(path = %path.display(), records = loaded, "Seed data loaded");
                }
                Arc::new(store)
            }
            StoreBackend::Postgrest => {
                let (Some(url), Some(api_key)) = (&config.store.url, &config.store.api_key) else {
                    return Err(ServerError::Config(
                        "STORE_URL and STORE_API_KEY are required".to_string(),
                    ));
                };
                Arc::new(PostgrestStore::new(url, api_key, config.store.timeout)?)
            }
        };

        tracing::info!(
            backend = config.store.backend.as_str(),
            tax_rate = %config.tax_rate,
            "Record store ready"
        );
        Self::new(config.clone(), store)
    }

    pub fn jwt_service(&self) -> &JwtService {
        &self.jwt_service
    }

    pub fn orders(&self) -> &OrderService {
        &self.orders
    }
}
