//! # fmiis-storage
//!
//! Durable key-value store implementations for the FMIIS console. Supports
//! two modes:
//!
//! - **file**: one JSON document per key under a directory, surviving
//!   process restarts
//! - **memory**: in-process map using [dashmap](https://crates.io/crates/dashmap),
//!   for tests and throwaway sessions
//!
//! The provider is selected at runtime based on configuration.

#[cfg(feature = "file")]
pub mod file;
pub mod keys;
#[cfg(feature = "memory")]
pub mod memory;
pub mod provider;

pub use provider::StoreManager;
