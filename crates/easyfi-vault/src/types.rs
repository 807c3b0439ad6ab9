//! Value types handed out by the vault.

use easyfi_core::SecretString;
use std::fmt;

/// A plaintext secret held in memory.
///
/// Wraps [`SecretString`] so the value is zeroed on drop. Debug and Display
/// both emit `[REDACTED]`.
#[derive(Clone, PartialEq, Eq)]
pub struct DecryptedSecret {
    inner: SecretString,
}

impl DecryptedSecret {
    /// Create a new decrypted secret from raw plaintext.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            inner: SecretString::new(value),
        }
    }

    /// Expose the plaintext value. Use sparingly.
    pub fn expose(&self) -> &str {
        self.inner.expose_secret()
    }

    /// Copy the value out for the one hop back to the requesting caller.
    pub fn into_plain(self) -> String {
        self.inner.to_plain()
    }
}

impl fmt::Debug for DecryptedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for DecryptedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl From<SecretString> for DecryptedSecret {
    fn from(inner: SecretString) -> Self {
        Self { inner }
    }
}

impl From<String> for DecryptedSecret {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}
