//! Shared configuration and error types for Quarry.

pub mod config;
pub mod error;

pub use config::QuarryConfig;
pub use error::{QuarryError, Result};
