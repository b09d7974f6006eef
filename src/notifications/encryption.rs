use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;

const NONCE_LEN: usize = 12;

#[derive(Error, Debug)]
pub enum EncryptionError {
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),
    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

/// AES-256-GCM encryption for stored target addresses and service notes.
///
/// Stored form is `base64(nonce[12] || ciphertext)`.
pub struct EncryptionService {
    cipher: Aes256Gcm,
}

impl EncryptionService {
    /// Creates the service from a raw 32-byte key.
    pub fn new(key: &[u8]) -> Result<Self, EncryptionError> {
        Ok(Self {
            cipher: Aes256Gcm::new_from_slice(key)
                .map_err(|_e| EncryptionError::InvalidKey("expected 32 bytes".to_string()))?,
        })
    }

    /// Creates the service from a 64-character hex key.
    pub fn from_hex(key_hex: &str) -> Result<Self, EncryptionError> {
        let key_hex = key_hex.trim();
        if key_hex.len() != 64 {
            return Err(EncryptionError::InvalidKey(format!(
                "expected 64 hex characters, got {}",
                key_hex.len()
            )));
        }
        let key = hex::decode(key_hex)
            .map_err(|e| EncryptionError::InvalidKey(format!("invalid hex: {e}")))?;
        Self::new(&key)
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, EncryptionError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| EncryptionError::EncryptionFailed(e.to_string()))?;

        let mut combined = nonce.to_vec();
        combined.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(combined))
    }

    pub fn decrypt(&self, encoded: &str) -> Result<String, EncryptionError> {
        let data = STANDARD
            .decode(encoded.trim())
            .map_err(|e| EncryptionError::DecryptionFailed(format!("invalid base64: {e}")))?;
        if data.len() <= NONCE_LEN {
            return Err(EncryptionError::DecryptionFailed(
                "too short to contain a nonce and ciphertext".to_string(),
            ));
        }

        let (nonce_bytes, ciphertext) = data.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|e| EncryptionError::DecryptionFailed(e.to_string()))?;
        String::from_utf8(plaintext)
            .map_err(|e| EncryptionError::DecryptionFailed(format!("plaintext is not UTF-8: {e}")))
    }
}

/// Whether a stored value is already a plaintext address.
pub fn looks_like_plain_url(value: &str) -> bool {
    let value = value.trim_start();
    value.starts_with("http://") || value.starts_with("https://")
}

/// A stored value after decryption was attempted.
#[derive(Debug)]
pub enum StoredValue {
    Plain(String),
    Decrypted(String),
    /// Decryption failed; the raw stored value is used as-is.
    Fallback { raw: String, error: EncryptionError },
}

impl StoredValue {
    pub fn into_value(self) -> String {
        match self {
            StoredValue::Plain(v) | StoredValue::Decrypted(v) => v,
            StoredValue::Fallback { raw, .. } => raw,
        }
    }
}

/// Resolves a stored address for probing.
///
/// Empty input is `None`. Plaintext addresses pass through; anything else is
/// decrypted when a key is available and falls back to the stored value when
/// decryption fails.
pub fn resolve_stored_value(
    stored: &str,
    encryption: Option<&EncryptionService>,
) -> Option<StoredValue> {
    if stored.trim().is_empty() {
        return None;
    }
    if looks_like_plain_url(stored) {
        return Some(StoredValue::Plain(stored.to_string()));
    }
    let Some(service) = encryption else {
        return Some(StoredValue::Plain(stored.to_string()));
    };
    Some(match service.decrypt(stored) {
        Ok(value) => StoredValue::Decrypted(value),
        Err(error) => StoredValue::Fallback {
            raw: stored.to_string(),
            error,
        },
    })
}
