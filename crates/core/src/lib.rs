//! Core types and shared functionality for hearth.
//!
//! This crate provides:
//! - Partitioned response cache with SQLite backend
//! - Unified error types
//! - Gateway configuration

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheDb, CacheEntry};
pub use config::AppConfig;
pub use error::Error;
