//! Secret generation, digests, and comparison.

use std::fmt;

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{RngCore, rngs::OsRng};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

/// Prefix carried by every distributed token.
pub const TOKEN_PREFIX: &str = "uk_live_";

/// Random bytes behind a distributed token.
pub const TOKEN_SECRET_BYTES: usize = 24;

/// Random bytes behind the admin secret.
pub const ADMIN_SECRET_BYTES: usize = 32;

/// Characters of a token kept for display.
pub const DISPLAY_PREFIX_CHARS: usize = 14;

/// A plaintext secret that is wiped from memory when dropped.
#[derive(Clone, PartialEq, Eq)]
pub struct PlainSecret(String);

impl PlainSecret {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for PlainSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PlainSecret(**redacted**)")
    }
}

impl Drop for PlainSecret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// Generate a fresh `uk_live_` token secret.
#[must_use]
pub fn generate_token_secret() -> PlainSecret {
    let mut bytes = [0_u8; TOKEN_SECRET_BYTES];

    OsRng.fill_bytes(&mut bytes);

    let secret = PlainSecret(format!("{TOKEN_PREFIX}{}", URL_SAFE_NO_PAD.encode(bytes)));

    bytes.zeroize();

    secret
}

/// Generate a fresh admin secret.
#[must_use]
pub fn generate_admin_secret() -> PlainSecret {
    let mut bytes = [0_u8; ADMIN_SECRET_BYTES];

    OsRng.fill_bytes(&mut bytes);

    let secret = PlainSecret(URL_SAFE_NO_PAD.encode(bytes));

    bytes.zeroize();

    secret
}

/// Lowercase hex SHA-256 of `secret`, used as the lookup index.
#[must_use]
pub fn digest(secret: &str) -> String {
    format!("{:x}", Sha256::digest(secret.as_bytes()))
}

/// Leading characters shown in listings in place of the secret.
#[must_use]
pub fn display_prefix(secret: &str) -> String {
    secret.chars().take(DISPLAY_PREFIX_CHARS).collect()
}

/// Compare two secrets without short-circuiting on the first differing byte.
#[must_use]
pub fn secrets_match(left: &str, right: &str) -> bool {
    left.as_bytes().ct_eq(right.as_bytes()).into()
}
