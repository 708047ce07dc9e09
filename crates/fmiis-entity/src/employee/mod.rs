//! Employee directory entries.

pub mod model;

pub use model::{Employee, EmployeeList};
