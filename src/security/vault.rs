//! Symmetric encryption for stored credentials.
//!
//! Protects device-vendor API credentials and stored bank details at rest.
//! AES-256-GCM with a random 96-bit nonce; output is `hex(nonce || ciphertext)`
//! so a single column holds everything needed to decrypt.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};

use crate::errors::{ConfigError, VaultError};

/// Hex length of a 256-bit key.
const KEY_HEX_LEN: usize = 64;
/// GCM nonce length in bytes.
const NONCE_LEN: usize = 12;

/// Process-wide credential vault. The key is loaded once at startup and the
/// operations are pure, so sharing a vault across tasks needs no locking.
pub struct CredentialVault {
    cipher: Aes256Gcm,
}

impl CredentialVault {
    /// Builds a vault from a hex-encoded 256-bit key. A missing or malformed
    /// key is fatal at startup.
    pub fn new(key_hex: &str) -> Result<Self, ConfigError> {
        if key_hex.is_empty() {
            return Err(ConfigError::MissingEncryptionKey);
        }
        if key_hex.len() != KEY_HEX_LEN {
            return Err(ConfigError::InvalidEncryptionKey(format!(
                "expected {KEY_HEX_LEN} hex characters, got {}",
                key_hex.len()
            )));
        }
        let key_bytes = hex::decode(key_hex)
            .map_err(|_| ConfigError::InvalidEncryptionKey("key is not valid hex".to_string()))?;
        let key = Key::<Aes256Gcm>::from_slice(&key_bytes);
        Ok(Self { cipher: Aes256Gcm::new(key) })
    }

    /// Encrypts a UTF-8 payload.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, VaultError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| VaultError::EncryptionFailed)?;
        let mut sealed = nonce.to_vec();
        sealed.extend_from_slice(&ciphertext);
        Ok(hex::encode(sealed))
    }

    /// Decrypts a value produced by [`Self::encrypt`]. Tampered data or a
    /// wrong key fails the authentication tag and is rejected.
    pub fn decrypt(&self, stored: &str) -> Result<String, VaultError> {
        let sealed = hex::decode(stored).map_err(|_| VaultError::InvalidCiphertext)?;
        if sealed.len() <= NONCE_LEN {
            return Err(VaultError::InvalidCiphertext);
        }
        let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| VaultError::DecryptionFailed)?;
        String::from_utf8(plaintext).map_err(|_| VaultError::InvalidCiphertext)
    }
}
