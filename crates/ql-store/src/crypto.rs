use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, AeadCore, KeyInit, OsRng, rand_core::RngCore},
};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::errors::CryptoError;

pub const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// AES-256 key (32 bytes)
#[derive(Clone, PartialEq, Eq, ZeroizeOnDrop)]
pub struct EncryptionKey {
    key: [u8; KEY_LEN],
}

impl EncryptionKey {
    /// Generate a new random encryption key
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut key);
        Self { key }
    }

    /// Build a key from raw bytes read back from the store
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let key: [u8; KEY_LEN] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidKeySize(bytes.len()))?;
        Ok(Self { key })
    }

    /// Get key bytes (use carefully - sensitive data)
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.key
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        encrypt(plaintext, &self.key)
    }

    pub fn decrypt(&self, ciphertext: &str) -> Result<String, CryptoError> {
        decrypt(ciphertext, &self.key)
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EncryptionKey([REDACTED])")
    }
}

fn cipher(key: &[u8]) -> Result<Aes256Gcm, CryptoError> {
    if key.len() != KEY_LEN {
        return Err(CryptoError::InvalidKeySize(key.len()));
    }
    Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::InvalidKeySize(key.len()))
}

/// Encrypt a string with AES-256-GCM.
///
/// The output is base64url(nonce || ciphertext || tag). A fresh 96-bit nonce
/// is drawn for every call, so encrypting the same value twice yields
/// different ciphertexts.
pub fn encrypt(plaintext: &str, key: &[u8]) -> Result<String, CryptoError> {
    let cipher = cipher(key)?;
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext.as_bytes())
        .map_err(|_| CryptoError::Encrypt)?;

    let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    sealed.extend_from_slice(nonce.as_slice());
    sealed.extend_from_slice(&ciphertext);

    Ok(URL_SAFE_NO_PAD.encode(sealed))
}

/// Decrypt a value produced by [`encrypt`]
pub fn decrypt(ciphertext: &str, key: &[u8]) -> Result<String, CryptoError> {
    let cipher = cipher(key)?;

    let sealed = URL_SAFE_NO_PAD
        .decode(ciphertext)
        .map_err(|e| CryptoError::Malformed(format!("Invalid base64: {}", e)))?;

    if sealed.len() < NONCE_LEN {
        return Err(CryptoError::Malformed(format!(
            "Ciphertext too short ({} bytes)",
            sealed.len()
        )));
    }

    let (nonce_bytes, body) = sealed.split_at(NONCE_LEN);
    let mut plaintext = cipher
        .decrypt(Nonce::from_slice(nonce_bytes), body)
        .map_err(|_| CryptoError::Decrypt)?;

    let decoded = String::from_utf8(plaintext.clone())
        .map_err(|_| CryptoError::Malformed("Plaintext is not valid UTF-8".to_string()));
    plaintext.zeroize();
    decoded
}
