//! Core traits defined in `fmiis-core` and implemented by other crates.

pub mod store;

pub use store::DurableStore;
