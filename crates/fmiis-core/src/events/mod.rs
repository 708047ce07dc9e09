//! Events delivered by the push channel.
//!
//! The push channel decodes server frames into [`PushEvent`] values and
//! wraps them, together with its own lifecycle changes, in
//! [`ChannelEvent`] for consumers.

pub mod push;

pub use push::{ChannelEvent, PushEvent};
