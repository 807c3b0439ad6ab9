//! Configuration loading and persistence.

use super::{normalize_scheme, Config, FORBIDDEN_SCHEMES};
use crate::env;
use crate::error::ConfigError;
use crate::paths;
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::debug;

impl Config {
    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = paths::config_file()?;
        Self::load(&path)
    }

    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        debug!(path = %path.display(), "loading configuration");
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        json5::from_str(content).map_err(|e| ConfigError::Json5(e.to_string()))
    }

    /// Load from `path` (or the default location), falling back to defaults
    /// when the file does not exist, then apply environment overrides.
    ///
    /// A file that exists but fails to parse is an error; silently running a
    /// wallet host on defaults after a typo would hide the mistake.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        let loaded = match path {
            Some(p) => Self::load(p),
            None => Self::load_default(),
        };

        let mut config = match loaded {
            Ok(config) => config,
            Err(ConfigError::NotFound(_)) => Self::default(),
            Err(e) => return Err(e),
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply `EASYFI_*` environment overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Some(port) = env::get_u16(env::vars::PORT) {
            self.ipc.port = port;
        }

        if let Some(command) = env::get_var(env::vars::UI_COMMAND) {
            self.window.ui_command = Some(command);
        }

        if let Some(level) = env::get_var(env::vars::LOG).and_then(|l| l.parse().ok()) {
            self.logging.level = level;
        }
    }

    /// Save configuration to a file path.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_json5()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write atomically through a uniquely named sibling
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut temp = tempfile::NamedTempFile::new_in(dir)?;
        temp.write_all(content.as_bytes())?;
        temp.persist(path).map_err(|e| e.error)?;

        Ok(())
    }

    /// Serialize to JSON5 string.
    pub fn to_json5(&self) -> Result<String, ConfigError> {
        // json5 has no serializer; plain JSON is valid JSON5
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Validate the configuration, collecting all errors before returning.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.ipc.max_connections == 0 {
            errors.push("ipc.max_connections must be greater than 0".to_string());
        }

        if self.ipc.max_messages_per_second == 0 {
            errors.push("ipc.max_messages_per_second must be greater than 0".to_string());
        }

        for origin in &self.ipc.allowed_origins {
            if origin.trim().is_empty() {
                errors.push("ipc.allowed_origins must not contain empty entries".to_string());
            }
        }

        if self.window.width == 0 || self.window.height == 0 {
            errors.push(format!(
                "window size must be non-zero, got {}x{}",
                self.window.width, self.window.height
            ));
        }

        if !self.window.headless {
            if let Some(command) = &self.window.ui_command {
                if command.trim().is_empty() {
                    errors.push("window.ui_command must not be blank".to_string());
                }
            }
        }

        if self.shell.allowed_schemes.is_empty() {
            errors.push("shell.allowed_schemes must list at least one scheme".to_string());
        }

        for scheme in &self.shell.allowed_schemes {
            if FORBIDDEN_SCHEMES.contains(&normalize_scheme(scheme).as_str()) {
                errors.push(format!(
                    "shell.allowed_schemes must not include '{}'",
                    scheme
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors.join("; ")))
        }
    }
}
