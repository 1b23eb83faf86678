//! Reversible at-rest encryption for distributed token secrets.
//!
//! Envelope format: `base64url_nopad(nonce || aes_gcm_ciphertext_with_tag)`.
//! The 96-bit nonce is drawn fresh from the OS RNG for every encryption.

use std::fmt;

use aes_gcm::{
    Aes128Gcm, Aes256Gcm, AesGcm, Nonce,
    aead::{Aead, KeyInit, consts::U12},
    aes::Aes192,
};
use base64::{
    Engine as _,
    engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE_NO_PAD},
};
use rand::{RngCore, rngs::OsRng};
use thiserror::Error;
use zeroize::Zeroizing;

type Aes192Gcm = AesGcm<Aes192, U12>;

/// Nonce length shared by every supported key size.
pub const NONCE_BYTES: usize = 12;

const KEY_LENGTHS: [usize; 3] = [16, 24, 32];

#[derive(Debug, Error)]
pub enum CipherError {
    #[error("encryption key is missing")]
    MissingKey,

    #[error("invalid encryption key length: got {0}, need 16/24/32 bytes (or base64 thereof)")]
    InvalidKeyLength(usize),

    #[error("refusing to encrypt an empty plaintext")]
    EmptyPlaintext,

    #[error("ciphertext is empty")]
    EmptyCiphertext,

    #[error("ciphertext is not valid base64")]
    Encoding(#[source] base64::DecodeError),

    #[error("ciphertext is too short")]
    Truncated,

    #[error("ciphertext failed integrity verification")]
    Integrity,

    #[error("decrypted plaintext is not valid utf-8")]
    Utf8,
}

enum Engine {
    Aes128(Box<Aes128Gcm>),
    Aes192(Box<Aes192Gcm>),
    Aes256(Box<Aes256Gcm>),
}

impl Engine {
    fn from_key(key: &[u8]) -> Result<Self, CipherError> {
        let invalid = |_: aes_gcm::aes::cipher::InvalidLength| CipherError::InvalidKeyLength(key.len());

        match key.len() {
            16 => Aes128Gcm::new_from_slice(key).map(|aead| Self::Aes128(Box::new(aead))),
            24 => Aes192Gcm::new_from_slice(key).map(|aead| Self::Aes192(Box::new(aead))),
            32 => Aes256Gcm::new_from_slice(key).map(|aead| Self::Aes256(Box::new(aead))),
            other => return Err(CipherError::InvalidKeyLength(other)),
        }
        .map_err(invalid)
    }

    fn seal(&self, nonce: &Nonce<U12>, plaintext: &[u8]) -> Result<Vec<u8>, aes_gcm::Error> {
        match self {
            Self::Aes128(aead) => aead.encrypt(nonce, plaintext),
            Self::Aes192(aead) => aead.encrypt(nonce, plaintext),
            Self::Aes256(aead) => aead.encrypt(nonce, plaintext),
        }
    }

    fn open(&self, nonce: &Nonce<U12>, payload: &[u8]) -> Result<Vec<u8>, aes_gcm::Error> {
        match self {
            Self::Aes128(aead) => aead.decrypt(nonce, payload),
            Self::Aes192(aead) => aead.decrypt(nonce, payload),
            Self::Aes256(aead) => aead.decrypt(nonce, payload),
        }
    }

    const fn key_bits(&self) -> u16 {
        match self {
            Self::Aes128(_) => 128,
            Self::Aes192(_) => 192,
            Self::Aes256(_) => 256,
        }
    }
}

/// AES-GCM cipher keyed once at startup.
pub struct TokenCipher {
    engine: Engine,
}

impl fmt::Debug for TokenCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCipher")
            .field("key_bits", &self.engine.key_bits())
            .finish_non_exhaustive()
    }
}

impl TokenCipher {
    /// Build a cipher from the configured key.
    ///
    /// The key is used as raw bytes when its length is already 16, 24 or 32;
    /// otherwise standard padded, standard unpadded and URL-safe unpadded
    /// base64 are tried in that order and the first successful decode wins.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::MissingKey`] for a blank key and
    /// [`CipherError::InvalidKeyLength`] when no interpretation yields a
    /// supported AES key size.
    pub fn new(secret: &str) -> Result<Self, CipherError> {
        let secret = secret.trim();

        if secret.is_empty() {
            return Err(CipherError::MissingKey);
        }

        let key = decode_key(secret);

        Ok(Self {
            engine: Engine::from_key(&key)?,
        })
    }

    /// Encrypt `plaintext` into an opaque URL-safe token.
    ///
    /// # Errors
    ///
    /// Fails on empty input or if the AEAD rejects the payload.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        if plaintext.is_empty() {
            return Err(CipherError::EmptyPlaintext);
        }

        let mut nonce_bytes = [0_u8; NONCE_BYTES];

        OsRng.fill_bytes(&mut nonce_bytes);

        let sealed = self
            .engine
            .seal(Nonce::<U12>::from_slice(&nonce_bytes), plaintext.as_bytes())
            .map_err(|_aead| CipherError::Integrity)?;

        let mut joined = Vec::with_capacity(NONCE_BYTES + sealed.len());

        joined.extend_from_slice(&nonce_bytes);
        joined.extend_from_slice(&sealed);

        Ok(URL_SAFE_NO_PAD.encode(joined))
    }

    /// Reverse [`TokenCipher::encrypt`].
    ///
    /// # Errors
    ///
    /// Fails when the envelope is not base64, is no longer than the nonce, or
    /// does not authenticate under this key.
    pub fn decrypt(&self, ciphertext: &str) -> Result<Zeroizing<String>, CipherError> {
        let encoded = ciphertext.trim();

        if encoded.is_empty() {
            return Err(CipherError::EmptyCiphertext);
        }

        let raw = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(CipherError::Encoding)?;

        if raw.len() <= NONCE_BYTES {
            return Err(CipherError::Truncated);
        }

        let (nonce, payload) = raw
            .split_at_checked(NONCE_BYTES)
            .ok_or(CipherError::Truncated)?;

        let plain = self
            .engine
            .open(Nonce::<U12>::from_slice(nonce), payload)
            .map_err(|_aead| CipherError::Integrity)?;

        String::from_utf8(plain)
            .map(Zeroizing::new)
            .map_err(|_utf8| CipherError::Utf8)
    }
}

fn decode_key(secret: &str) -> Zeroizing<Vec<u8>> {
    let raw = secret.as_bytes();

    if KEY_LENGTHS.contains(&raw.len()) {
        return Zeroizing::new(raw.to_vec());
    }

    [STANDARD, STANDARD_NO_PAD, URL_SAFE_NO_PAD]
        .iter()
        .find_map(|engine| engine.decode(secret).ok())
        .map_or_else(|| Zeroizing::new(raw.to_vec()), Zeroizing::new)
}
