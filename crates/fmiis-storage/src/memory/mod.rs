//! In-memory durable store.

pub mod store;

pub use store::MemoryStore;
