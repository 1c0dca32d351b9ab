//! SQLite-backed storage for versioned cache buckets.
//!
//! Each deployed version owns one bucket; a bucket maps request keys to stored
//! responses. Buckets are never rewritten across versions: a new version gets a
//! new bucket and the old ones are deleted wholesale on activation.
//!
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - Entries cascade-delete with their bucket

pub mod buckets;
pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::{CachedEntry, EntrySummary};
