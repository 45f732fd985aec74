//! Application state.

use std::sync::Arc;

use tracing::info;

use jobboard_firestore::{
    ApplicationRepository, DocumentStore, FirestoreClient, JobRepository, MemoryStore,
};

use crate::auth::TokenService;
use crate::config::{ApiConfig, StoreBackend};
use crate::services::{ApplicationService, JobService};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub store: Arc<dyn DocumentStore>,
    pub tokens: Arc<TokenService>,
    pub jobs: JobService,
    pub applications: ApplicationService,
}

impl AppState {
    /// Create new application state, connecting the configured store.
    pub fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let store: Arc<dyn DocumentStore> = match config.store_backend {
            StoreBackend::Firestore => {
                let client = FirestoreClient::from_env()?;
                info!(
                    project = %client.config().project_id,
                    database = %client.config().database_id,
                    emulator = client.config().emulator_host.is_some(),
                    "Using Firestore document store"
                );
                Arc::new(client)
            }
            StoreBackend::Memory => {
                info!("Using in-memory document store; nothing will be persisted");
                Arc::new(MemoryStore::new())
            }
        };

        let tokens = TokenService::from_config(&config)?;
        Ok(Self::with_store(config, store, tokens))
    }

    /// Assemble state around an existing store.
    pub fn with_store(config: ApiConfig, store: Arc<dyn DocumentStore>, tokens: TokenService) -> Self {
        let job_repo = JobRepository::new(Arc::clone(&store));
        let application_repo = ApplicationRepository::new(Arc::clone(&store));
        let jobs = JobService::new(job_repo, application_repo.clone());
        let applications = ApplicationService::new(jobs.clone(), application_repo);

        Self {
            config,
            store,
            tokens: Arc::new(tokens),
            jobs,
            applications,
        }
    }
}
