use sqlx::PgPool;

use crate::auth::TokenService;
use crate::config::AppConfig;
use crate::storage::BlobStore;

/// Shared application state handed to every handler via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub tokens: TokenService,
    pub storage: BlobStore,
}

impl AppState {
    pub fn new(pool: PgPool, config: &AppConfig) -> Self {
        Self {
            pool,
            tokens: TokenService::new(
                &config.security.jwt_secret,
                config.security.jwt_expiry_hours,
            ),
            storage: BlobStore::new(config.storage.upload_dir.clone()),
        }
    }
}
