//! Credential vault for the EasyFi wallet host.
//!
//! The vault is reachable only from the host process. The UI sees values
//! solely as copies returned by an explicit `secure-storage:get`.
//!
//! Two backends implement [`Vault`]:
//! - [`MemoryVault`]: volatile, destroyed with the host process. The default.
//! - [`FileVault`]: opt-in durable storage, AES-256-GCM at rest with the master
//!   key held in the OS keyring.

pub mod crypto;
pub mod error;
pub mod file;
pub mod keychain;
pub mod store;
pub mod types;

pub use error::{Result, VaultError};
pub use file::FileVault;
pub use store::{MemoryVault, Vault};
pub use types::DecryptedSecret;
