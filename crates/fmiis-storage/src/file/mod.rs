//! File-backed durable store.

pub mod store;

pub use store::FileStore;
