use std::sync::Arc;

use anyhow::Result;
use sqlx::PgPool;

use bragger_clients::{PostgresClient, StorageClient};
use bragger_common::ModuleClient;

use crate::middleware::{ip_rate_limiter, IpRateLimiter};

#[derive(Clone)]
pub struct GlobalState {
    pub db: PostgresClient,
    pub storage: StorageClient,
    pub rate_limiter: Arc<IpRateLimiter>,
}

impl GlobalState {
    pub async fn new() -> Result<Self> {
        let db = PostgresClient::setup_connection().await;
        let storage = StorageClient::setup_connection().await;

        Ok(Self {
            db,
            storage,
            rate_limiter: ip_rate_limiter(),
        })
    }

    pub fn pool(&self) -> &PgPool {
        self.db.get_client()
    }
}
