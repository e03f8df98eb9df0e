//! # nitro-core
//!
//! Foundation crate for Nitro Dispatch. Contains the unified error system,
//! configuration schemas, the error strategy shared by dispatch and
//! lifecycle batches, and logging setup.
//!
//! This crate has **no** internal dependencies on other Nitro crates.

pub mod config;
pub mod error;
pub mod logging;
pub mod result;
pub mod strategy;

pub use config::{LoggingConfig, ManagerConfig, PluginSettings};
pub use error::{AppError, ErrorKind};
pub use result::AppResult;
pub use strategy::ErrorStrategy;
