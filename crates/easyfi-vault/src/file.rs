//! Durable, encrypted vault backend.
//!
//! Each entry is one JSON file at `{dir}/{sha256(key)}.json`. Hashing the key
//! keeps arbitrary key strings (slashes, dots, unicode) out of the filesystem
//! namespace. Files are created with mode `0600` and the directory `0700` on
//! Unix.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use easyfi_core::SecretString;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::crypto::{self, Sealed};
use crate::error::{Result, VaultError};
use crate::store::Vault;
use crate::types::DecryptedSecret;

/// Envelope format version written to every entry.
const FORMAT_VERSION: u32 = 1;

/// On-disk representation of an encrypted entry.
#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    version: u32,
    /// HKDF salt, hex-encoded.
    salt: String,
    /// Nonce and AES-256-GCM ciphertext, base64-encoded.
    ciphertext: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// File-system-backed vault with encryption at rest.
pub struct FileVault {
    dir: PathBuf,
    master_key: Zeroizing<Vec<u8>>,
}

impl FileVault {
    /// Create a vault rooted at `dir` using the provided master key.
    pub fn new(dir: PathBuf, master_key: Zeroizing<Vec<u8>>) -> Self {
        Self { dir, master_key }
    }

    /// Create a vault in `dir`, resolving the master key through
    /// [`crate::keychain::get_or_create_master_key`], and make sure the
    /// directory is usable before the first request arrives.
    pub async fn open(dir: PathBuf) -> Result<Self> {
        let master_key = crate::keychain::get_or_create_master_key()?;
        let vault = Self::new(dir, master_key);
        vault.ensure_dir().await?;
        Ok(vault)
    }

    /// Directory the entries live in.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn ensure_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::PermissionDenied {
                VaultError::PermissionDenied(format!("{}: {e}", self.dir.display()))
            } else {
                VaultError::Unavailable(format!("cannot create {}: {e}", self.dir.display()))
            }
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o700);
            tokio::fs::set_permissions(&self.dir, perms).await?;
        }

        Ok(())
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", crypto::entry_id(key)))
    }

    async fn read_entry(&self, path: &Path) -> Result<Option<StoredEntry>> {
        let data = match tokio::fs::read_to_string(path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let stored: StoredEntry = serde_json::from_str(&data)
            .map_err(|e| VaultError::Corrupted(format!("{}: {e}", path.display())))?;
        if stored.version != FORMAT_VERSION {
            return Err(VaultError::Corrupted(format!(
                "{}: unsupported entry version {}",
                path.display(),
                stored.version
            )));
        }
        Ok(Some(stored))
    }
}

/// Write `data` to `path` atomically with mode 0600 on Unix.
///
/// Every write stages into its own uniquely named file beside `path`, so two
/// writers of one key never share a staging file.
async fn write_entry_file(path: &Path, data: Vec<u8>) -> Result<()> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || -> std::io::Result<()> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut staged = tempfile::NamedTempFile::new_in(dir)?;
        staged.write_all(&data)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            staged.as_file().set_permissions(perms)?;
        }

        staged.as_file().sync_all()?;
        staged.persist(&path).map_err(|e| e.error)?;
        Ok(())
    })
    .await
    .map_err(|e| VaultError::Unavailable(format!("write task failed: {e}")))??;
    Ok(())
}

#[async_trait]
impl Vault for FileVault {
    async fn get(&self, key: &str) -> Result<Option<DecryptedSecret>> {
        let path = self.entry_path(key);
        let Some(stored) = self.read_entry(&path).await? else {
            return Ok(None);
        };

        let sealed = Sealed {
            salt: hex::decode(&stored.salt)
                .map_err(|e| VaultError::Corrupted(format!("salt is not hex: {e}")))?,
            ciphertext: base64::engine::general_purpose::STANDARD
                .decode(&stored.ciphertext)
                .map_err(|e| VaultError::Corrupted(format!("ciphertext is not base64: {e}")))?,
        };

        let plaintext = crypto::open(&self.master_key, key, &sealed)?;
        let value = std::str::from_utf8(&plaintext)
            .map_err(|e| VaultError::Corrupted(format!("value is not UTF-8: {e}")))?;

        Ok(Some(DecryptedSecret::new(value)))
    }

    async fn set(&self, key: &str, value: SecretString) -> Result<()> {
        self.ensure_dir().await?;

        let path = self.entry_path(key);
        let created_at = match self.read_entry(&path).await {
            Ok(Some(existing)) => existing.created_at,
            Ok(None) => Utc::now(),
            Err(e) => {
                warn!(path = %path.display(), "overwriting unreadable vault entry: {e}");
                Utc::now()
            }
        };

        let sealed = crypto::seal(&self.master_key, key, value.expose_secret().as_bytes())?;
        let stored = StoredEntry {
            version: FORMAT_VERSION,
            salt: hex::encode(&sealed.salt),
            ciphertext: base64::engine::general_purpose::STANDARD.encode(&sealed.ciphertext),
            created_at,
            updated_at: Utc::now(),
        };

        let json = serde_json::to_vec_pretty(&stored)?;
        debug!(path = %path.display(), "writing vault entry");
        write_entry_file(&path, json).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.entry_path(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = %path.display(), "deleted vault entry");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn has(&self, key: &str) -> Result<bool> {
        Ok(tokio::fs::try_exists(self.entry_path(key)).await?)
    }

    async fn len(&self) -> Result<usize> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut count = 0;
        while let Some(entry) = entries.next_entry().await? {
            if entry.path().extension().and_then(|e| e.to_str()) == Some("json") {
                count += 1;
            }
        }
        Ok(count)
    }

    fn backend(&self) -> &'static str {
        "file"
    }
}
