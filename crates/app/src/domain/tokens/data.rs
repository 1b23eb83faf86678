//! Token Data

use jiff::Timestamp;

use crate::{
    crypto::PlainSecret,
    domain::tokens::records::{TokenRecord, TokenUuid},
};

/// Name assigned when a token is created or renamed with a blank name.
pub const DEFAULT_TOKEN_NAME: &str = "User Key";

/// New Token Data
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewToken {
    pub name: String,
    pub note: String,
    pub expires_at: Option<Timestamp>,

    /// Falls back to the registry default when omitted.
    pub rate_limit_per_minute: Option<i32>,
}

/// Partial Token Update
///
/// Only `Some` fields are applied. `clear_expires_at` wins over `expires_at`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenUpdate {
    pub name: Option<String>,
    pub note: Option<String>,
    pub is_active: Option<bool>,
    pub expires_at: Option<Timestamp>,
    pub clear_expires_at: bool,
    pub rate_limit_per_minute: Option<i32>,
}

impl TokenUpdate {
    /// True when applying this update would change nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.note.is_none()
            && self.is_active.is_none()
            && self.expires_at.is_none()
            && !self.clear_expires_at
            && self.rate_limit_per_minute.is_none()
    }
}

/// Row to insert for a freshly minted token.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTokenRecord {
    pub uuid: TokenUuid,
    pub name: String,
    pub note: String,
    pub token_hash: String,
    pub token_ciphertext: String,
    pub key_prefix: String,
    pub expires_at: Option<Timestamp>,
    pub rate_limit_per_minute: i32,
}

/// Secret columns written by a rotation.
#[derive(Debug, Clone, PartialEq)]
pub struct RotatedSecret {
    pub token_hash: String,
    pub token_ciphertext: String,
    pub key_prefix: String,
}

/// A token together with its plaintext secret.
///
/// Only produced by create and rotate; the plaintext is never stored.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: TokenRecord,
    pub plain: PlainSecret,
}

/// Normalise a display name, substituting the default for blanks.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        DEFAULT_TOKEN_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}
