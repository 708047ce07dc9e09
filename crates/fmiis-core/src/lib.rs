//! # fmiis-core
//!
//! Core crate for the FMIIS console. Contains the durable store trait,
//! configuration schemas, push event types, and the unified error system.
//!
//! This crate has **no** internal dependencies on other FMIIS crates.

pub mod config;
pub mod error;
pub mod events;
pub mod result;
pub mod traits;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
