//! Error types for vault operations.

use thiserror::Error;

/// Errors a vault backend can report.
///
/// [`crate::MemoryVault`] never produces any of these; they describe the
/// failure modes of durable backends.
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("Vault unavailable: {0}")]
    Unavailable(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Vault entry corrupted: {0}")]
    Corrupted(String),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Keychain error: {0}")]
    Keychain(String),

    #[error("IO error: {0}")]
    Io(std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<std::io::Error> for VaultError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(err.to_string()),
            _ => Self::Io(err),
        }
    }
}

/// Convenience result alias for vault operations.
pub type Result<T> = std::result::Result<T, VaultError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_denied_io_is_classified() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        assert!(matches!(VaultError::from(io), VaultError::PermissionDenied(_)));

        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk");
        assert!(matches!(VaultError::from(io), VaultError::Io(_)));
    }
}
