//! Password-derived AES-256-GCM sealing for vault documents
//!
//! A 256-bit key is derived from the user's password and a random salt with
//! Argon2id. Every seal uses a fresh 96-bit nonce; the nonce, the 128-bit
//! authentication tag and the salt travel with the ciphertext in a
//! [`SealedPayload`]. Nothing here stores keys: losing the password loses
//! the data.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use argon2::Argon2;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::Rng;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

pub const KEY_LEN: usize = 32;
pub const SALT_LEN: usize = 16;
pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;

/// Envelope format version
pub const SEALED_VERSION: u8 = 1;

/// Symmetric key for AES-256-GCM
#[derive(Clone)]
pub struct EncryptionKey {
    key: [u8; KEY_LEN],
}

/// Encryption error types
#[derive(Error, Debug)]
pub enum EncryptionError {
    #[error("Invalid key: must be exactly 32 bytes (256 bits)")]
    InvalidKeyLength,

    #[error("Invalid base64 encoding: {0}")]
    Base64Error(#[from] base64::DecodeError),

    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("Encryption failed")]
    EncryptionFailed,

    #[error("Decryption failed: invalid ciphertext, tag or key")]
    DecryptionFailed,

    #[error("Invalid sealed payload: {0}")]
    InvalidPayload(String),

    #[error("Payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EncryptionKey(..)")
    }
}

impl EncryptionKey {
    /// Create a new encryption key from a 32-byte array
    pub fn new(key: [u8; KEY_LEN]) -> Self {
        Self { key }
    }

    /// Create encryption key from a base64-encoded string
    pub fn from_base64(encoded: &str) -> Result<Self, EncryptionError> {
        let bytes = BASE64.decode(encoded)?;
        if bytes.len() != KEY_LEN {
            return Err(EncryptionError::InvalidKeyLength);
        }
        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(&bytes);
        Ok(Self { key })
    }

    /// Derive a key from a password and salt with Argon2id (default parameters)
    pub fn derive(password: &str, salt: &[u8]) -> Result<Self, EncryptionError> {
        let mut key = [0u8; KEY_LEN];
        Argon2::default()
            .hash_password_into(password.as_bytes(), salt, &mut key)
            .map_err(|e| EncryptionError::KeyDerivation(e.to_string()))?;
        Ok(Self { key })
    }

    /// Get the raw key bytes
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.key
    }
}

/// Generate a random derivation salt
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill(&mut salt);
    salt
}

/// Ciphertext plus everything except the key needed to open it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedPayload {
    pub version: u8,
    /// Base64 Argon2id salt
    pub salt: String,
    /// Base64 96-bit GCM nonce
    pub nonce: String,
    /// Base64 128-bit authentication tag
    pub tag: String,
    /// Base64 ciphertext without the tag
    pub ciphertext: String,
}

impl SealedPayload {
    pub fn salt_bytes(&self) -> Result<Vec<u8>, EncryptionError> {
        Ok(BASE64.decode(&self.salt)?)
    }
}

/// Encrypt bytes under an already derived key.
///
/// `salt` is recorded in the envelope so the key can be re-derived later.
pub fn seal(
    key: &EncryptionKey,
    salt: &[u8],
    plaintext: &[u8],
) -> Result<SealedPayload, EncryptionError> {
    let cipher =
        Aes256Gcm::new_from_slice(&key.key).map_err(|_| EncryptionError::EncryptionFailed)?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::thread_rng().fill(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let mut sealed = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| EncryptionError::EncryptionFailed)?;

    // aes-gcm appends the tag to the ciphertext
    let tag = sealed.split_off(sealed.len() - TAG_LEN);

    Ok(SealedPayload {
        version: SEALED_VERSION,
        salt: BASE64.encode(salt),
        nonce: BASE64.encode(nonce_bytes),
        tag: BASE64.encode(&tag),
        ciphertext: BASE64.encode(&sealed),
    })
}

/// Decrypt a payload sealed with [seal]. Fails closed on any tag mismatch.
pub fn open(key: &EncryptionKey, payload: &SealedPayload) -> Result<Vec<u8>, EncryptionError> {
    if payload.version != SEALED_VERSION {
        return Err(EncryptionError::InvalidPayload(format!(
            "unsupported version {}",
            payload.version
        )));
    }

    let nonce_bytes = BASE64.decode(&payload.nonce)?;
    if nonce_bytes.len() != NONCE_LEN {
        return Err(EncryptionError::InvalidPayload("bad nonce length".to_string()));
    }
    let tag = BASE64.decode(&payload.tag)?;
    if tag.len() != TAG_LEN {
        return Err(EncryptionError::InvalidPayload("bad tag length".to_string()));
    }

    let mut combined = BASE64.decode(&payload.ciphertext)?;
    combined.extend_from_slice(&tag);

    let cipher =
        Aes256Gcm::new_from_slice(&key.key).map_err(|_| EncryptionError::DecryptionFailed)?;

    cipher
        .decrypt(Nonce::from_slice(&nonce_bytes), combined.as_ref())
        .map_err(|_| EncryptionError::DecryptionFailed)
}

/// Derive a fresh key from `password` and seal `plaintext` under it
pub fn seal_with_password(
    password: &str,
    plaintext: &[u8],
) -> Result<SealedPayload, EncryptionError> {
    let salt = generate_salt();
    let key = EncryptionKey::derive(password, &salt)?;
    seal(&key, &salt, plaintext)
}

/// Re-derive the key from `password` and the envelope's salt, then open it
pub fn open_with_password(
    password: &str,
    payload: &SealedPayload,
) -> Result<Vec<u8>, EncryptionError> {
    let key = EncryptionKey::derive(password, &payload.salt_bytes()?)?;
    open(&key, payload)
}

/// Seal any serializable object as its JSON encoding
pub fn seal_json<T: Serialize>(
    key: &EncryptionKey,
    salt: &[u8],
    value: &T,
) -> Result<SealedPayload, EncryptionError> {
    let bytes = serde_json::to_vec(value)?;
    seal(key, salt, &bytes)
}

/// Open a payload sealed with [seal_json]
pub fn open_json<T: DeserializeOwned>(
    key: &EncryptionKey,
    payload: &SealedPayload,
) -> Result<T, EncryptionError> {
    let bytes = open(key, payload)?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_key() -> EncryptionKey {
        EncryptionKey::new([
            0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d,
            0x0e, 0x0f, 0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17, 0x18, 0x19, 0x1a, 0x1b,
            0x1c, 0x1d, 0x1e, 0x1f,
        ])
    }

    const SALT: [u8; SALT_LEN] = [7u8; SALT_LEN];

    fn flip_bit(encoded: &str, bit: usize) -> String {
        let mut bytes = BASE64.decode(encoded).unwrap();
        bytes[bit / 8] ^= 1 << (bit % 8);
        BASE64.encode(bytes)
    }

    #[test]
    fn test_seal_open_roundtrip() {
        let key = test_key();
        let plaintext = b"last will and testament";

        let sealed = seal(&key, &SALT, plaintext).unwrap();
        assert_eq!(open(&key, &sealed).unwrap(), plaintext);
    }

    #[test]
    fn test_password_roundtrip() {
        let sealed = seal_with_password("correct horse battery staple", b"deed scan").unwrap();
        let opened = open_with_password("correct horse battery staple", &sealed).unwrap();
        assert_eq!(opened, b"deed scan");
    }

    #[test]
    fn test_wrong_password_fails_closed() {
        let sealed = seal_with_password("right password", b"secret").unwrap();
        let result = open_with_password("wrong password", &sealed);
        assert!(matches!(result, Err(EncryptionError::DecryptionFailed)));
    }

    #[test]
    fn test_derivation_is_deterministic_per_salt() {
        let a = EncryptionKey::derive("pw", &SALT).unwrap();
        let b = EncryptionKey::derive("pw", &SALT).unwrap();
        let c = EncryptionKey::derive("pw", &[9u8; SALT_LEN]).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
        assert_ne!(a.as_bytes(), c.as_bytes());
    }

    #[test]
    fn test_short_salt_rejected() {
        let result = EncryptionKey::derive("pw", b"abc");
        assert!(matches!(result, Err(EncryptionError::KeyDerivation(_))));
    }

    #[test]
    fn test_fresh_nonce_per_seal() {
        let key = test_key();
        let a = seal(&key, &SALT, b"same").unwrap();
        let b = seal(&key, &SALT, b"same").unwrap();
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn test_json_object_roundtrip() {
        let key = test_key();
        let will = json!({
            "title": "Will of Jane Doe",
            "beneficiaries": [{"name": "Sam", "share": 50}, {"name": "Alex", "share": 50}],
            "executor": null
        });

        let sealed = seal_json(&key, &SALT, &will).unwrap();
        let opened: serde_json::Value = open_json(&key, &sealed).unwrap();

        assert_eq!(
            serde_json::to_string(&opened).unwrap(),
            serde_json::to_string(&will).unwrap()
        );
    }

    #[test]
    fn test_every_ciphertext_bit_flip_fails_closed() {
        let key = test_key();
        let sealed = seal(&key, &SALT, b"heirloom").unwrap();
        let len = BASE64.decode(&sealed.ciphertext).unwrap().len();

        for bit in 0..len * 8 {
            let tampered = SealedPayload {
                ciphertext: flip_bit(&sealed.ciphertext, bit),
                ..sealed.clone()
            };
            assert!(
                matches!(open(&key, &tampered), Err(EncryptionError::DecryptionFailed)),
                "bit {} of ciphertext was not detected",
                bit
            );
        }
    }

    #[test]
    fn test_every_tag_bit_flip_fails_closed() {
        let key = test_key();
        let sealed = seal(&key, &SALT, b"heirloom").unwrap();

        for bit in 0..TAG_LEN * 8 {
            let tampered = SealedPayload {
                tag: flip_bit(&sealed.tag, bit),
                ..sealed.clone()
            };
            assert!(
                matches!(open(&key, &tampered), Err(EncryptionError::DecryptionFailed)),
                "bit {} of tag was not detected",
                bit
            );
        }
    }

    #[test]
    fn test_nonce_tamper_fails_closed() {
        let key = test_key();
        let sealed = seal(&key, &SALT, b"heirloom").unwrap();
        let tampered = SealedPayload {
            nonce: flip_bit(&sealed.nonce, 3),
            ..sealed
        };
        assert!(open(&key, &tampered).is_err());
    }

    #[test]
    fn test_truncated_tag_rejected() {
        let key = test_key();
        let mut sealed = seal(&key, &SALT, b"heirloom").unwrap();
        sealed.tag = BASE64.encode([0u8; 8]);
        assert!(matches!(
            open(&key, &sealed),
            Err(EncryptionError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_unknown_version_rejected() {
        let key = test_key();
        let mut sealed = seal(&key, &SALT, b"x").unwrap();
        sealed.version = 9;
        assert!(matches!(
            open(&key, &sealed),
            Err(EncryptionError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_empty_payload() {
        let key = test_key();
        let sealed = seal(&key, &SALT, b"").unwrap();
        assert!(open(&key, &sealed).unwrap().is_empty());
    }

    #[test]
    fn test_key_from_base64() {
        let key_bytes = [0x42u8; KEY_LEN];
        let key = EncryptionKey::from_base64(&BASE64.encode(key_bytes)).unwrap();
        assert_eq!(key.as_bytes(), &key_bytes);

        let short = BASE64.encode([0x42u8; 16]);
        assert!(matches!(
            EncryptionKey::from_base64(&short),
            Err(EncryptionError::InvalidKeyLength)
        ));
    }

    #[test]
    fn test_key_debug_hides_material() {
        let debug = format!("{:?}", test_key());
        assert_eq!(debug, "EncryptionKey(..)");
    }
}
