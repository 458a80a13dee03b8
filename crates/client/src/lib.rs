//! Client code for hearth.
//!
//! This crate provides the HTTP fetch pipeline, route classification,
//! and the cache manager that executes the delivery strategies.

pub mod fetch;
pub mod manager;
pub mod offline;
pub mod routes;

pub use fetch::{FetchClient, FetchConfig, FetchedResponse, Fetcher};
pub use manager::{CacheManager, PartitionLimits, PartitionNames, Served, ServedSource};
pub use routes::{PartitionKind, Route, RouteTable, Strategy};
