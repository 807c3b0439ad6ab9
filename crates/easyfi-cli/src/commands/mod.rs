//! CLI command implementations.

pub mod call;
pub mod config;
pub mod methods;
pub mod run;
