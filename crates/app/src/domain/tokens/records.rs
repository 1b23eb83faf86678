//! Token Records

use jiff::Timestamp;

use crate::uuids::TypedUuid;

/// Distributed Token UUID
pub type TokenUuid = TypedUuid<TokenRecord>;

/// Distributed Token Record
#[derive(Debug, Clone, PartialEq)]
pub struct TokenRecord {
    pub uuid: TokenUuid,

    /// Display name.
    pub name: String,

    /// Free-text operator note.
    pub note: String,

    /// SHA-256 hex of the plaintext secret; unique lookup index.
    pub token_hash: String,

    /// AEAD envelope of the plaintext secret.
    pub token_ciphertext: String,

    /// Non-secret leading characters of the plaintext, for display.
    pub key_prefix: String,

    pub is_active: bool,

    pub expires_at: Option<Timestamp>,

    /// Requests allowed per window; `0` means unlimited.
    pub rate_limit_per_minute: i32,

    pub last_used_at: Option<Timestamp>,

    pub created_at: Timestamp,

    pub updated_at: Timestamp,
}
