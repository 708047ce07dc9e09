//! Session-bound push channel.

pub mod push;

pub use push::{Backoff, PushChannel};
