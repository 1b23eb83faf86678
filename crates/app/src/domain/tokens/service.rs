//! Token registry.

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use jiff::Timestamp;
use mockall::automock;
use sqlx::PgPool;
use tracing::{error, info, warn};

use crate::{
    crypto::{
        PlainSecret, TokenCipher, digest, display_prefix, generate_token_secret, secrets_match,
    },
    database::StoreError,
    domain::tokens::{
        data::{
            IssuedToken, NewToken, NewTokenRecord, RotatedSecret, TokenUpdate, normalize_name,
        },
        errors::TokensServiceError,
        records::{TokenRecord, TokenUuid},
        repository::{PgTokensRepository, TokensRepository},
    },
};

/// Attempts at minting a secret whose digest is not already stored.
pub const MAX_GENERATION_ATTEMPTS: usize = 3;

#[automock]
#[async_trait]
/// Distributed token lifecycle operations.
pub trait TokensService: Send + Sync {
    /// All tokens, most recently created first.
    async fn list_tokens(&self) -> Result<Vec<TokenRecord>, TokensServiceError>;

    async fn find_token(&self, token: TokenUuid)
    -> Result<Option<TokenRecord>, TokensServiceError>;

    async fn create_token(&self, token: NewToken) -> Result<IssuedToken, TokensServiceError>;

    async fn update_token(
        &self,
        token: TokenUuid,
        update: TokenUpdate,
    ) -> Result<TokenRecord, TokensServiceError>;

    async fn delete_token(&self, token: TokenUuid) -> Result<(), TokensServiceError>;

    /// Replace the secret, clear last-used and reactivate the token.
    async fn rotate_token(&self, token: TokenUuid) -> Result<IssuedToken, TokensServiceError>;

    /// Resolve a presented plaintext secret to its token.
    ///
    /// Unknown and mismatched secrets are indistinguishable: both are
    /// [`TokensServiceError::NotFound`].
    async fn authenticate(
        &self,
        candidate: &str,
        now: Timestamp,
    ) -> Result<TokenRecord, TokensServiceError>;

    async fn touch_last_used(
        &self,
        token: TokenUuid,
        when: Timestamp,
    ) -> Result<(), TokensServiceError>;
}

struct MintedSecret {
    plain: PlainSecret,
    token_hash: String,
    token_ciphertext: String,
    key_prefix: String,
}

#[derive(Clone)]
pub struct TokenRegistry {
    repository: Arc<dyn TokensRepository>,
    cipher: Arc<TokenCipher>,
    default_rate_limit: i32,
}

impl fmt::Debug for TokenRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRegistry")
            .field("cipher", &self.cipher)
            .field("default_rate_limit", &self.default_rate_limit)
            .finish_non_exhaustive()
    }
}

impl TokenRegistry {
    /// A negative `default_rate_limit` is clamped to `0` (unlimited).
    #[must_use]
    pub fn new(
        repository: Arc<dyn TokensRepository>,
        cipher: Arc<TokenCipher>,
        default_rate_limit: i32,
    ) -> Self {
        Self {
            repository,
            cipher,
            default_rate_limit: default_rate_limit.max(0),
        }
    }

    #[must_use]
    pub fn postgres(pool: PgPool, cipher: Arc<TokenCipher>, default_rate_limit: i32) -> Self {
        Self::new(
            Arc::new(PgTokensRepository::new(pool)),
            cipher,
            default_rate_limit,
        )
    }

    #[must_use]
    pub const fn default_rate_limit(&self) -> i32 {
        self.default_rate_limit
    }

    fn mint(&self) -> Result<MintedSecret, TokensServiceError> {
        let plain = generate_token_secret();

        Ok(MintedSecret {
            token_hash: digest(plain.expose()),
            token_ciphertext: self.cipher.encrypt(plain.expose())?,
            key_prefix: display_prefix(plain.expose()),
            plain,
        })
    }
}

fn validate_rate_limit(limit: i32) -> Result<i32, TokensServiceError> {
    if limit < 0 {
        return Err(TokensServiceError::InvalidRateLimit);
    }

    Ok(limit)
}

#[async_trait]
impl TokensService for TokenRegistry {
    async fn list_tokens(&self) -> Result<Vec<TokenRecord>, TokensServiceError> {
        self.repository.list_tokens().await.map_err(Into::into)
    }

    async fn find_token(
        &self,
        token: TokenUuid,
    ) -> Result<Option<TokenRecord>, TokensServiceError> {
        self.repository.find_token(token).await.map_err(Into::into)
    }

    async fn create_token(&self, token: NewToken) -> Result<IssuedToken, TokensServiceError> {
        let rate_limit_per_minute =
            validate_rate_limit(token.rate_limit_per_minute.unwrap_or(self.default_rate_limit))?;

        let name = normalize_name(&token.name);
        let note = token.note.trim().to_string();

        for attempt in 1..=MAX_GENERATION_ATTEMPTS {
            let minted = self.mint()?;

            let created = self
                .repository
                .create_token(NewTokenRecord {
                    uuid: TokenUuid::new(),
                    name: name.clone(),
                    note: note.clone(),
                    token_hash: minted.token_hash,
                    token_ciphertext: minted.token_ciphertext,
                    key_prefix: minted.key_prefix,
                    expires_at: token.expires_at,
                    rate_limit_per_minute,
                })
                .await;

            match created {
                Ok(record) => {
                    info!(token = %record.uuid, name = %record.name, "distributed token created");

                    return Ok(IssuedToken {
                        token: record,
                        plain: minted.plain,
                    });
                }
                Err(StoreError::AlreadyExists) => {
                    warn!(attempt, "token digest collision on create, regenerating");
                }
                Err(other) => return Err(other.into()),
            }
        }

        error!(
            attempts = MAX_GENERATION_ATTEMPTS,
            "exhausted attempts to generate a unique token secret"
        );

        Err(TokensServiceError::GenerationExhausted)
    }

    async fn update_token(
        &self,
        token: TokenUuid,
        update: TokenUpdate,
    ) -> Result<TokenRecord, TokensServiceError> {
        let rate_limit = update
            .rate_limit_per_minute
            .map(validate_rate_limit)
            .transpose()?;

        let update = TokenUpdate {
            name: update.name.as_deref().map(normalize_name),
            note: update.note.map(|note| note.trim().to_string()),
            expires_at: update.expires_at.filter(|_| !update.clear_expires_at),
            rate_limit_per_minute: rate_limit,
            ..update
        };

        self.repository
            .update_token_fields(token, update)
            .await
            .map_err(Into::into)
    }

    async fn delete_token(&self, token: TokenUuid) -> Result<(), TokensServiceError> {
        self.repository.delete_token(token).await?;

        info!(%token, "distributed token deleted");

        Ok(())
    }

    async fn rotate_token(&self, token: TokenUuid) -> Result<IssuedToken, TokensServiceError> {
        for attempt in 1..=MAX_GENERATION_ATTEMPTS {
            let minted = self.mint()?;

            let rotated = self
                .repository
                .rotate_token(
                    token,
                    RotatedSecret {
                        token_hash: minted.token_hash,
                        token_ciphertext: minted.token_ciphertext,
                        key_prefix: minted.key_prefix,
                    },
                )
                .await;

            match rotated {
                Ok(record) => {
                    info!(token = %record.uuid, "distributed token rotated");

                    return Ok(IssuedToken {
                        token: record,
                        plain: minted.plain,
                    });
                }
                Err(StoreError::AlreadyExists) => {
                    warn!(attempt, %token, "token digest collision on rotate, regenerating");
                }
                Err(other) => return Err(other.into()),
            }
        }

        error!(
            attempts = MAX_GENERATION_ATTEMPTS,
            %token,
            "exhausted attempts to generate a unique token secret"
        );

        Err(TokensServiceError::GenerationExhausted)
    }

    async fn authenticate(
        &self,
        candidate: &str,
        now: Timestamp,
    ) -> Result<TokenRecord, TokensServiceError> {
        let candidate = candidate.trim();

        if candidate.is_empty() {
            return Err(TokensServiceError::NotFound);
        }

        let token = self
            .repository
            .find_token_by_hash(&digest(candidate))
            .await?
            .ok_or(TokensServiceError::NotFound)?;

        // The digest only locates the row; the ciphertext proves possession.
        let stored = match self.cipher.decrypt(&token.token_ciphertext) {
            Ok(stored) => stored,
            Err(error) => {
                warn!(token = %token.uuid, %error, "stored token secret failed to decrypt");

                return Err(TokensServiceError::NotFound);
            }
        };

        if !secrets_match(&stored, candidate) {
            return Err(TokensServiceError::NotFound);
        }

        if !token.is_active {
            return Err(TokensServiceError::Disabled);
        }

        if token.expires_at.is_some_and(|expires_at| expires_at <= now) {
            return Err(TokensServiceError::Expired);
        }

        Ok(token)
    }

    async fn touch_last_used(
        &self,
        token: TokenUuid,
        when: Timestamp,
    ) -> Result<(), TokensServiceError> {
        self.repository
            .touch_last_used(token, when)
            .await
            .map_err(Into::into)
    }
}
