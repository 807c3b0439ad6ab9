//! Master key resolution for the file backend.
//!
//! The master key is resolved in priority order:
//! 1. `EASYFI_MASTER_KEY` environment variable (hex-encoded, 32 bytes)
//! 2. OS credential store via the `keyring` crate
//! 3. A freshly generated key, written back to the OS credential store

use easyfi_core::env::{self, vars};
use keyring::{Entry, Error as KeyringError};
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::crypto::{self, KEY_SIZE};
use crate::error::{Result, VaultError};

const SERVICE_NAME: &str = "com.easyfi.wallet";
const ACCOUNT_NAME: &str = "vault-master-key";

/// Retrieve the master key, creating one if it does not exist yet.
pub fn get_or_create_master_key() -> Result<Zeroizing<Vec<u8>>> {
    if let Some(hex_key) = env::get_var(vars::MASTER_KEY) {
        debug!("using vault master key from environment");
        return parse_hex_key(&hex_key, vars::MASTER_KEY);
    }

    let entry = keyring_entry()?;
    match entry.get_password() {
        Ok(stored) => {
            debug!("using vault master key from OS keyring");
            let stored = Zeroizing::new(stored);
            parse_hex_key(&stored, "keyring entry")
        }
        Err(KeyringError::NoEntry) => {
            info!("no vault master key found; generating one in the OS keyring");
            let key = crypto::generate_master_key();
            let encoded = Zeroizing::new(hex::encode(key.as_slice()));
            entry.set_password(&encoded).map_err(map_keyring_error)?;
            Ok(key)
        }
        Err(err) => Err(map_keyring_error(err)),
    }
}

fn keyring_entry() -> Result<Entry> {
    Entry::new(SERVICE_NAME, ACCOUNT_NAME).map_err(map_keyring_error)
}

fn map_keyring_error(err: KeyringError) -> VaultError {
    match err {
        KeyringError::NoStorageAccess(e) => {
            VaultError::Unavailable(format!("OS credential store not accessible: {e}"))
        }
        KeyringError::PlatformFailure(e) => {
            VaultError::Unavailable(format!("OS credential store failure: {e}"))
        }
        other => VaultError::Keychain(other.to_string()),
    }
}

/// Decode a hex master key and check its length.
fn parse_hex_key(hex_key: &str, source: &str) -> Result<Zeroizing<Vec<u8>>> {
    let key = Zeroizing::new(
        hex::decode(hex_key.trim())
            .map_err(|e| VaultError::Keychain(format!("invalid hex in {source}: {e}")))?,
    );
    if key.len() != KEY_SIZE {
        return Err(VaultError::Keychain(format!(
            "{source} must decode to exactly {KEY_SIZE} bytes, got {}",
            key.len()
        )));
    }
    Ok(key)
}
