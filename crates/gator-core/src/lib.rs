//! Gator Core - Errors, shared types, and run configuration

pub mod config;
pub mod error;
pub mod types;

pub use config::Configuration;
pub use error::{Error, Result};
pub use types::*;
