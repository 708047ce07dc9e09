//! Authenticated identity, roles, and role sections.

pub mod model;
pub mod role;
pub mod section;

pub use model::Identity;
pub use role::Role;
pub use section::Section;
