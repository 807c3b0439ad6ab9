//! # easyfi-core
//!
//! Shared building blocks for the EasyFi wallet host:
//!
//! - **Configuration**: the `easyfi.json5` schema, loading, validation and persistence
//! - **Paths**: resolution of the host's data directory
//! - **Secrets**: [`SecretString`], a zeroize-on-drop string that never prints its contents

pub mod config;
pub mod env;
pub mod error;
pub mod paths;
pub mod secret;

pub use config::Config;
pub use error::{ConfigError, Result};
pub use secret::SecretString;
