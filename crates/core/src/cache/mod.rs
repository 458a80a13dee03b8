//! SQLite-backed partitioned cache for request/response pairs.
//!
//! This module provides a persistent cache using SQLite with async access
//! via tokio-rusqlite. It supports:
//!
//! - Named partitions created lazily on first insert
//! - Explicit insertion sequencing for deterministic oldest-first trimming
//! - Atomic multi-entry commit for all-or-nothing precache install
//! - Automatic schema migrations
//! - WAL mode for concurrent access

pub mod connection;
pub mod entries;
pub mod meta;
pub mod migrations;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::CacheEntry;
