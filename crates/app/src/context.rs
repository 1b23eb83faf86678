//! App Context

use std::{fmt, sync::Arc, time::Duration};

use sqlx::migrate::MigrateError;
use thiserror::Error;
use tracing::info;

use crate::{
    crypto::{CipherError, TokenCipher},
    database,
    domain::{
        admin_secret::{AdminSecretError, AdminSecretManager, AdminSecretService},
        bulk::{BulkJobManager, BulkJobService},
        pool_keys::{PoolKeyRegistry, PoolKeysService},
        tokens::{TokenRegistry, TokensService},
        usage::{UsageMeter, UsageService},
    },
    gateway::Gateway,
    rate_limiter::RateLimiter,
    upstream::{Forwarder, ReqwestUpstream, Upstream, UpstreamError},
};

#[derive(Debug, Error)]
pub enum AppInitError {
    #[error("failed to connect to database")]
    Database(#[source] sqlx::Error),

    #[error("failed to apply migrations")]
    Migrate(#[source] MigrateError),

    #[error("invalid USER_KEY_ENCRYPTION_KEY")]
    Cipher(#[source] CipherError),

    #[error("failed to load the admin secret")]
    AdminSecret(#[source] AdminSecretError),

    #[error("failed to configure the upstream client")]
    Upstream(#[source] UpstreamError),
}

/// Everything needed to assemble an [`AppContext`].
#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub encryption_key: String,
    pub default_rate_limit: i32,
    pub rate_limit_window: Duration,

    /// Preferred admin secret; a stored one takes precedence.
    pub master_key: Option<String>,

    pub upstream_base_url: String,
    pub upstream_timeout: Duration,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("default_rate_limit", &self.default_rate_limit)
            .field("rate_limit_window", &self.rate_limit_window)
            .field("upstream_base_url", &self.upstream_base_url)
            .field("upstream_timeout", &self.upstream_timeout)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct AppContext {
    pub tokens: Arc<dyn TokensService>,
    pub usage: Arc<dyn UsageService>,
    pub admin_secret: Arc<dyn AdminSecretService>,
    pub pool_keys: Arc<dyn PoolKeysService>,
    pub bulk: Arc<dyn BulkJobService>,
    pub gateway: Gateway,
    pub forwarder: Forwarder,
}

impl fmt::Debug for AppContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppContext")
            .field("gateway", &self.gateway)
            .finish_non_exhaustive()
    }
}

impl AppContext {
    /// Wire services together and derive the gateway and forwarder from them.
    #[must_use]
    pub fn assemble(
        tokens: Arc<dyn TokensService>,
        usage: Arc<dyn UsageService>,
        admin_secret: Arc<dyn AdminSecretService>,
        pool_keys: Arc<dyn PoolKeysService>,
        upstream: Arc<dyn Upstream>,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            bulk: Arc::new(BulkJobManager::new(pool_keys.clone())),
            gateway: Gateway::new(tokens.clone(), usage.clone(), limiter),
            forwarder: Forwarder::new(pool_keys.clone(), upstream),
            tokens,
            usage,
            admin_secret,
            pool_keys,
        }
    }

    /// Connect, migrate and load the admin secret.
    ///
    /// # Errors
    ///
    /// Returns an error when the encryption key is unusable, the database is
    /// unreachable, a migration fails or the admin secret cannot be loaded.
    pub async fn from_config(config: &AppConfig) -> Result<Self, AppInitError> {
        let cipher = Arc::new(TokenCipher::new(&config.encryption_key).map_err(AppInitError::Cipher)?);

        let upstream = ReqwestUpstream::new(&config.upstream_base_url, config.upstream_timeout)
            .map_err(AppInitError::Upstream)?;

        let pool = database::connect(&config.database_url)
            .await
            .map_err(AppInitError::Database)?;

        database::migrate(&pool)
            .await
            .map_err(AppInitError::Migrate)?;

        let admin_secret = AdminSecretManager::postgres(pool.clone());

        admin_secret
            .load_or_create(config.master_key.clone())
            .await
            .map_err(AppInitError::AdminSecret)?;

        info!(
            default_rate_limit = config.default_rate_limit,
            window_secs = config.rate_limit_window.as_secs(),
            "application context ready"
        );

        Ok(Self::assemble(
            Arc::new(TokenRegistry::postgres(
                pool.clone(),
                cipher,
                config.default_rate_limit,
            )),
            Arc::new(UsageMeter::postgres(pool.clone())),
            Arc::new(admin_secret),
            Arc::new(PoolKeyRegistry::postgres(pool)),
            Arc::new(upstream),
            Arc::new(RateLimiter::new(config.rate_limit_window)),
        ))
    }

    /// A fully functional context over the in-memory repositories.
    ///
    /// # Errors
    ///
    /// Returns an error when the encryption key is unusable or the admin
    /// secret cannot be initialised.
    #[cfg(any(test, feature = "test-support"))]
    pub async fn in_memory(
        config: &AppConfig,
        upstream: Arc<dyn Upstream>,
    ) -> Result<Self, AppInitError> {
        use crate::memory::{
            InMemoryPoolKeysRepository, InMemorySettingsRepository, InMemoryTokensRepository,
            InMemoryUsageRepository,
        };

        let cipher = Arc::new(TokenCipher::new(&config.encryption_key).map_err(AppInitError::Cipher)?);

        let admin_secret = AdminSecretManager::new(Arc::new(InMemorySettingsRepository::default()));

        admin_secret
            .load_or_create(config.master_key.clone())
            .await
            .map_err(AppInitError::AdminSecret)?;

        Ok(Self::assemble(
            Arc::new(TokenRegistry::new(
                Arc::new(InMemoryTokensRepository::default()),
                cipher,
                config.default_rate_limit,
            )),
            Arc::new(UsageMeter::new(Arc::new(InMemoryUsageRepository::default()))),
            Arc::new(admin_secret),
            Arc::new(PoolKeyRegistry::new(Arc::new(
                InMemoryPoolKeysRepository::default(),
            ))),
            upstream,
            Arc::new(RateLimiter::new(config.rate_limit_window)),
        ))
    }
}
