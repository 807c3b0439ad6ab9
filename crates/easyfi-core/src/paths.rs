//! Path resolution utilities.

use crate::error::ConfigError;
use std::path::PathBuf;

/// Get the EasyFi base directory (~/.easyfi).
pub fn base_dir() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or_else(|| {
        ConfigError::Validation("Could not determine home directory".to_string())
    })?;
    Ok(home.join(".easyfi"))
}

/// Get the main config file path (~/.easyfi/easyfi.json5).
pub fn config_file() -> Result<PathBuf, ConfigError> {
    Ok(base_dir()?.join("easyfi.json5"))
}

/// Get the default durable vault directory (~/.easyfi/vault).
pub fn vault_dir() -> Result<PathBuf, ConfigError> {
    Ok(base_dir()?.join("vault"))
}

/// Expand tilde (~) in a path.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_dir() {
        let dir = base_dir().unwrap();
        assert!(dir.ends_with(".easyfi"));
    }

    #[test]
    fn test_vault_dir_is_under_base() {
        let vault = vault_dir().unwrap();
        assert!(vault.starts_with(base_dir().unwrap()));
        assert!(vault.ends_with("vault"));
    }

    #[test]
    fn test_expand_tilde() {
        let expanded = expand_tilde("~/wallet");
        assert!(!expanded.to_string_lossy().contains('~'));
        assert_eq!(expand_tilde("/abs/path"), PathBuf::from("/abs/path"));
    }
}
