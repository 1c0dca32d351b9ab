//! Core types and shared functionality for shelter.
//!
//! This crate provides:
//! - Versioned cache buckets with a SQLite backend
//! - Unified error types
//! - Layered configuration

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheDb, CachedEntry, EntrySummary};
pub use config::{AppConfig, ConfigError, DeployMode, FetchStrategy};
pub use error::Error;
