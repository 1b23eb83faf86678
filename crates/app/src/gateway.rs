//! Request admission for the proxied surface.

use std::{fmt, sync::Arc};

use jiff::Timestamp;
use thiserror::Error;
use tracing::{error, warn};

use crate::{
    domain::{
        tokens::{
            TokensService, TokensServiceError,
            records::{TokenRecord, TokenUuid},
        },
        usage::UsageService,
    },
    rate_limiter::RateLimiter,
};

#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error("key is not recognised")]
    InvalidKey,

    #[error("key is disabled")]
    Disabled,

    #[error("key has expired")]
    Expired,

    /// Authenticated but over its per-window limit.
    #[error("key is rate limited")]
    RateLimited(Box<TokenRecord>),

    #[error("key lookup failed")]
    Internal(#[source] TokensServiceError),
}

impl From<TokensServiceError> for AdmissionError {
    fn from(error: TokensServiceError) -> Self {
        match error {
            TokensServiceError::NotFound => Self::InvalidKey,
            TokensServiceError::Disabled => Self::Disabled,
            TokensServiceError::Expired => Self::Expired,
            other => Self::Internal(other),
        }
    }
}

#[derive(Clone)]
pub struct Gateway {
    tokens: Arc<dyn TokensService>,
    usage: Arc<dyn UsageService>,
    limiter: Arc<RateLimiter>,
}

impl fmt::Debug for Gateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gateway")
            .field("limiter", &self.limiter)
            .finish_non_exhaustive()
    }
}

impl Gateway {
    #[must_use]
    pub fn new(
        tokens: Arc<dyn TokensService>,
        usage: Arc<dyn UsageService>,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            tokens,
            usage,
            limiter,
        }
    }

    /// Authenticate `bearer`, then charge it against its rate limit.
    ///
    /// # Errors
    ///
    /// Returns the authentication failure, or [`AdmissionError::RateLimited`]
    /// carrying the token so the rejection can still be metered.
    pub async fn admit(&self, bearer: &str, now: Timestamp) -> Result<TokenRecord, AdmissionError> {
        let token = self.tokens.authenticate(bearer, now).await?;

        if !self
            .limiter
            .allow(token.uuid, token.rate_limit_per_minute, now)
        {
            return Err(AdmissionError::RateLimited(Box::new(token)));
        }

        Ok(token)
    }

    /// Meter a finished request and stamp the token's last use.
    ///
    /// Usage is recorded before returning; the last-used stamp is written in
    /// the background. Failures of either are logged, never surfaced.
    pub async fn complete(&self, token: TokenUuid, status: u16, when: Timestamp) {
        if let Err(error) = self.usage.record(token, status, when).await {
            error!(%token, status, %error, "failed to record token usage");
        }

        let tokens = self.tokens.clone();

        tokio::spawn(async move {
            if let Err(error) = tokens.touch_last_used(token, when).await {
                warn!(%token, %error, "failed to update token last-used time");
            }
        });
    }
}
