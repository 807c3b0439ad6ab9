//! Operation handlers, one module per capability group.
//!
//! Handlers take the capability they act on and already-validated
//! arguments; they return the JSON value that goes out as `result`.

pub mod app;
pub mod clipboard;
pub mod shell;
pub mod storage;
pub mod window;

pub use shell::ShellPolicy;
