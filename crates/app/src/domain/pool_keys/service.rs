//! Pool keys service.

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use mockall::automock;
use sqlx::PgPool;

use crate::domain::pool_keys::{
    errors::PoolKeysServiceError,
    records::{NewPoolKey, PoolKeyRecord, PoolKeyUuid},
    repository::{PgPoolKeysRepository, PoolKeysRepository},
};

/// Alias applied when none is given.
pub const DEFAULT_POOL_KEY_ALIAS: &str = "Default";

/// Quota applied when a non-positive one is given.
pub const DEFAULT_POOL_KEY_QUOTA: i32 = 1000;

#[automock]
#[async_trait]
/// Upstream credential pool.
pub trait PoolKeysService: Send + Sync {
    async fn create(
        &self,
        raw_secret: &str,
        alias: &str,
        total_quota: i32,
    ) -> Result<PoolKeyRecord, PoolKeysServiceError>;

    /// Pick an active key to forward with, if any exist.
    async fn select_key(&self) -> Result<Option<PoolKeyRecord>, PoolKeysServiceError>;
}

#[derive(Clone)]
pub struct PoolKeyRegistry {
    repository: Arc<dyn PoolKeysRepository>,
}

impl fmt::Debug for PoolKeyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolKeyRegistry").finish_non_exhaustive()
    }
}

impl PoolKeyRegistry {
    #[must_use]
    pub fn new(repository: Arc<dyn PoolKeysRepository>) -> Self {
        Self { repository }
    }

    #[must_use]
    pub fn postgres(pool: PgPool) -> Self {
        Self::new(Arc::new(PgPoolKeysRepository::new(pool)))
    }
}

#[async_trait]
impl PoolKeysService for PoolKeyRegistry {
    async fn create(
        &self,
        raw_secret: &str,
        alias: &str,
        total_quota: i32,
    ) -> Result<PoolKeyRecord, PoolKeysServiceError> {
        let key = raw_secret.trim();

        if key.is_empty() {
            return Err(PoolKeysServiceError::MissingKey);
        }

        let alias = match alias.trim() {
            "" => DEFAULT_POOL_KEY_ALIAS,
            trimmed => trimmed,
        };

        let total_quota = if total_quota > 0 {
            total_quota
        } else {
            DEFAULT_POOL_KEY_QUOTA
        };

        self.repository
            .create_pool_key(NewPoolKey {
                uuid: PoolKeyUuid::new(),
                key: key.to_string(),
                alias: alias.to_string(),
                total_quota,
            })
            .await
            .map_err(Into::into)
    }

    async fn select_key(&self) -> Result<Option<PoolKeyRecord>, PoolKeysServiceError> {
        self.repository.select_pool_key().await.map_err(Into::into)
    }
}
