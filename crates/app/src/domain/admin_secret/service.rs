//! Admin secret manager.

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use mockall::automock;
use parking_lot::RwLock;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::{
    crypto::{PlainSecret, generate_admin_secret, secrets_match},
    domain::admin_secret::{
        errors::AdminSecretError,
        repository::{PgSettingsRepository, SettingsRepository},
    },
};

/// Settings key the admin secret is stored under.
pub const ADMIN_SECRET_SETTING: &str = "master_key";

#[automock]
#[async_trait]
/// The single process-wide administrative credential.
pub trait AdminSecretService: Send + Sync {
    /// Load the stored secret, creating it when absent.
    ///
    /// A stored value always wins over `preferred`.
    async fn load_or_create(
        &self,
        preferred: Option<String>,
    ) -> Result<PlainSecret, AdminSecretError>;

    /// The cached secret; blank until loaded.
    fn current(&self) -> PlainSecret;

    /// Constant-time check of `candidate`. Blank on either side never matches.
    fn authenticate(&self, candidate: &str) -> bool;

    /// Replace the secret with a freshly generated one.
    async fn reset(&self) -> Result<PlainSecret, AdminSecretError>;
}

pub struct AdminSecretManager {
    repository: Arc<dyn SettingsRepository>,
    cached: RwLock<PlainSecret>,
}

impl fmt::Debug for AdminSecretManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminSecretManager")
            .field("loaded", &!self.cached.read().is_blank())
            .finish_non_exhaustive()
    }
}

impl AdminSecretManager {
    #[must_use]
    pub fn new(repository: Arc<dyn SettingsRepository>) -> Self {
        Self {
            repository,
            cached: RwLock::new(PlainSecret::new(String::new())),
        }
    }

    #[must_use]
    pub fn postgres(pool: PgPool) -> Self {
        Self::new(Arc::new(PgSettingsRepository::new(pool)))
    }

    /// First-boot write. Never replaces a secret another instance stored
    /// first; whatever ends up stored is what gets cached.
    async fn create(&self, candidate: PlainSecret) -> Result<PlainSecret, AdminSecretError> {
        let inserted = self
            .repository
            .insert_setting_if_absent(ADMIN_SECRET_SETTING, candidate.expose())
            .await?;

        let stored = self
            .repository
            .get_setting(ADMIN_SECRET_SETTING)
            .await?
            .map(PlainSecret::new)
            .filter(|secret| !secret.is_blank());

        // A blank row blocks the insert but is treated as absent.
        let Some(stored) = stored else {
            return self.store(candidate).await;
        };

        if !inserted {
            info!("admin secret was created by another instance; adopting it");
        }

        *self.cached.write() = stored.clone();

        Ok(stored)
    }

    async fn store(&self, secret: PlainSecret) -> Result<PlainSecret, AdminSecretError> {
        self.repository
            .put_setting(ADMIN_SECRET_SETTING, secret.expose())
            .await?;

        *self.cached.write() = secret.clone();

        Ok(secret)
    }
}

#[async_trait]
impl AdminSecretService for AdminSecretManager {
    async fn load_or_create(
        &self,
        preferred: Option<String>,
    ) -> Result<PlainSecret, AdminSecretError> {
        let preferred = preferred
            .map(PlainSecret::new)
            .filter(|secret| !secret.is_blank());

        let stored = self
            .repository
            .get_setting(ADMIN_SECRET_SETTING)
            .await?
            .map(PlainSecret::new)
            .filter(|secret| !secret.is_blank());

        if let Some(stored) = stored {
            if preferred
                .as_ref()
                .is_some_and(|preferred| !secrets_match(preferred.expose().trim(), stored.expose()))
            {
                warn!("configured admin secret differs from the stored one; keeping the stored secret");
            }

            *self.cached.write() = stored.clone();

            return Ok(stored);
        }

        let secret = match preferred {
            Some(preferred) => PlainSecret::new(preferred.expose().trim()),
            None => generate_admin_secret(),
        };

        let secret = self.create(secret).await?;

        info!("admin secret initialised");

        Ok(secret)
    }

    fn current(&self) -> PlainSecret {
        self.cached.read().clone()
    }

    fn authenticate(&self, candidate: &str) -> bool {
        let cached = self.cached.read();

        if candidate.is_empty() || cached.is_blank() {
            return false;
        }

        secrets_match(candidate, cached.expose())
    }

    async fn reset(&self) -> Result<PlainSecret, AdminSecretError> {
        let secret = self.store(generate_admin_secret()).await?;

        info!("admin secret reset");

        Ok(secret)
    }
}

#[cfg(test)]
mod tests {
    use mockall::Sequence;
    use testresult::TestResult;

    use crate::{
        database::StoreError, domain::admin_secret::repository::MockSettingsRepository,
        memory::InMemorySettingsRepository,
    };

    use super::*;

    fn manager() -> (Arc<InMemorySettingsRepository>, AdminSecretManager) {
        let repository = Arc::new(InMemorySettingsRepository::default());

        (repository.clone(), AdminSecretManager::new(repository))
    }

    #[tokio::test]
    async fn first_boot_uses_preferred_value() -> TestResult {
        let (repository, manager) = manager();

        let secret = manager
            .load_or_create(Some("  configured-secret ".to_string()))
            .await?;

        assert_eq!(secret.expose(), "configured-secret");
        assert_eq!(
            repository.get_setting(ADMIN_SECRET_SETTING).await?.as_deref(),
            Some("configured-secret")
        );
        assert!(manager.authenticate("configured-secret"));

        Ok(())
    }

    #[tokio::test]
    async fn first_boot_without_preference_generates() -> TestResult {
        let (_repository, manager) = manager();

        let secret = manager.load_or_create(Some("   ".to_string())).await?;

        assert_eq!(secret.expose().len(), 43);
        assert_eq!(manager.current(), secret);

        Ok(())
    }

    #[tokio::test]
    async fn stored_value_wins_over_configuration() -> TestResult {
        let (repository, manager) = manager();

        repository
            .put_setting(ADMIN_SECRET_SETTING, "stored-secret")
            .await?;

        let secret = manager
            .load_or_create(Some("configured-secret".to_string()))
            .await?;

        assert_eq!(secret.expose(), "stored-secret");
        assert!(manager.authenticate("stored-secret"));
        assert!(!manager.authenticate("configured-secret"));

        Ok(())
    }

    #[tokio::test]
    async fn reset_replaces_stored_and_cached_value() -> TestResult {
        let (repository, manager) = manager();

        let original = manager.load_or_create(None).await?;
        let replaced = manager.reset().await?;

        assert_ne!(original, replaced);
        assert!(!manager.authenticate(original.expose()));
        assert!(manager.authenticate(replaced.expose()));
        assert_eq!(
            repository.get_setting(ADMIN_SECRET_SETTING).await?.as_deref(),
            Some(replaced.expose())
        );

        Ok(())
    }

    #[test]
    fn authenticate_before_load_rejects_everything() {
        let (_repository, manager) = manager();

        assert!(manager.current().is_blank());
        assert!(!manager.authenticate(""));
        assert!(!manager.authenticate("anything"));
    }

    #[tokio::test]
    async fn authenticate_rejects_empty_candidate() -> TestResult {
        let (_repository, manager) = manager();

        manager.load_or_create(None).await?;

        assert!(!manager.authenticate(""));

        Ok(())
    }

    #[tokio::test]
    async fn first_boot_adopts_secret_stored_by_a_concurrent_instance() -> TestResult {
        let mut repository = MockSettingsRepository::new();
        let mut sequence = Sequence::new();

        repository
            .expect_get_setting()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_| Ok(None));
        repository
            .expect_insert_setting_if_absent()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_, _| Ok(false));
        repository
            .expect_get_setting()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_| Ok(Some("winner-secret".to_string())));
        repository.expect_put_setting().never();

        let manager = AdminSecretManager::new(Arc::new(repository));

        let secret = manager
            .load_or_create(Some("loser-secret".to_string()))
            .await?;

        assert_eq!(secret.expose(), "winner-secret");
        assert!(manager.authenticate("winner-secret"));
        assert!(!manager.authenticate("loser-secret"));

        Ok(())
    }

    #[tokio::test]
    async fn blank_stored_value_is_replaced_on_first_boot() -> TestResult {
        let (repository, manager) = manager();

        repository.put_setting(ADMIN_SECRET_SETTING, "").await?;

        let secret = manager
            .load_or_create(Some("configured-secret".to_string()))
            .await?;

        assert_eq!(secret.expose(), "configured-secret");
        assert_eq!(
            repository.get_setting(ADMIN_SECRET_SETTING).await?.as_deref(),
            Some("configured-secret")
        );

        Ok(())
    }

    #[tokio::test]
    async fn failed_store_write_leaves_cache_untouched() -> TestResult {
        let mut repository = MockSettingsRepository::new();

        repository
            .expect_get_setting()
            .returning(|_| Ok(Some("stored-secret".to_string())));
        repository
            .expect_put_setting()
            .returning(|_, _| Err(StoreError::Sql(sqlx::Error::PoolTimedOut)));

        let manager = AdminSecretManager::new(Arc::new(repository));

        manager.load_or_create(None).await?;

        assert!(manager.reset().await.is_err());
        assert!(manager.authenticate("stored-secret"));

        Ok(())
    }
}
