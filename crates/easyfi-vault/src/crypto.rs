//! Encryption at rest for the file backend.
//!
//! AES-256-GCM with a per-entry key derived from the master key through
//! HKDF-SHA256 and a random salt. The vault key of the entry is bound as
//! associated data, so a ciphertext copied into another entry's file fails
//! authentication instead of decrypting under the wrong name.

use aes_gcm::aead::{Aead, Payload};
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use hkdf::Hkdf;
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::error::{Result, VaultError};

const NONCE_SIZE: usize = 12;
const SALT_SIZE: usize = 16;

/// Length in bytes of a master key.
pub const KEY_SIZE: usize = 32;

/// HKDF info string; bump the suffix if the envelope format changes.
const HKDF_INFO: &[u8] = b"easyfi-vault-entry-v1";

/// An encrypted value plus everything needed to open it again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    /// Random HKDF salt.
    pub salt: Vec<u8>,
    /// Nonce followed by ciphertext and tag.
    pub ciphertext: Vec<u8>,
}

fn derive_key(master_key: &[u8], salt: &[u8]) -> Result<Zeroizing<[u8; KEY_SIZE]>> {
    let hk = Hkdf::<Sha256>::new(Some(salt), master_key);
    let mut okm = Zeroizing::new([0u8; KEY_SIZE]);
    hk.expand(HKDF_INFO, &mut okm[..])
        .map_err(|e| VaultError::EncryptionFailed(format!("key derivation failed: {e}")))?;
    Ok(okm)
}

/// Encrypt `plaintext` for the entry named `entry_key`.
pub fn seal(master_key: &[u8], entry_key: &str, plaintext: &[u8]) -> Result<Sealed> {
    let mut salt = vec![0u8; SALT_SIZE];
    rand::thread_rng().fill_bytes(&mut salt);

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);

    let key = derive_key(master_key, &salt)?;
    let cipher = Aes256Gcm::new_from_slice(&key[..])
        .map_err(|e| VaultError::EncryptionFailed(e.to_string()))?;

    let payload = Payload {
        msg: plaintext,
        aad: entry_key.as_bytes(),
    };
    let encrypted = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), payload)
        .map_err(|e| VaultError::EncryptionFailed(e.to_string()))?;

    let mut ciphertext = Vec::with_capacity(NONCE_SIZE + encrypted.len());
    ciphertext.extend_from_slice(&nonce_bytes);
    ciphertext.extend_from_slice(&encrypted);

    Ok(Sealed { salt, ciphertext })
}

/// Decrypt a value produced by [`seal`] for the same `entry_key`.
///
/// Any authentication failure is reported as [`VaultError::Corrupted`].
pub fn open(master_key: &[u8], entry_key: &str, sealed: &Sealed) -> Result<Zeroizing<Vec<u8>>> {
    if sealed.ciphertext.len() < NONCE_SIZE {
        return Err(VaultError::Corrupted("ciphertext too short".to_string()));
    }

    let (nonce_bytes, body) = sealed.ciphertext.split_at(NONCE_SIZE);
    let key = derive_key(master_key, &sealed.salt)?;
    let cipher = Aes256Gcm::new_from_slice(&key[..])
        .map_err(|e| VaultError::Corrupted(e.to_string()))?;

    let payload = Payload {
        msg: body,
        aad: entry_key.as_bytes(),
    };
    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), payload)
        .map(Zeroizing::new)
        .map_err(|_| VaultError::Corrupted("authentication failed".to_string()))
}

/// Stable, filesystem-safe identifier for an entry key.
pub fn entry_id(entry_key: &str) -> String {
    hex::encode(Sha256::digest(entry_key.as_bytes()))
}

/// Generate a new random master key.
pub fn generate_master_key() -> Zeroizing<Vec<u8>> {
    let mut key = Zeroizing::new(vec![0u8; KEY_SIZE]);
    rand::thread_rng().fill_bytes(key.as_mut_slice());
    key
}
