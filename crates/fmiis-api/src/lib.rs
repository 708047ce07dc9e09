//! # fmiis-api
//!
//! Request/response transport for the FMIIS console.
//!
//! - `client`: the [`StaffApi`] trait every core component talks to
//! - `http`: the `reqwest` implementation against the backend
//! - `routes`: endpoint path builders
//! - `types`: request and response bodies that are not entities
//! - `mock`: scripted in-memory [`StaffApi`] (feature `mock`)

pub mod client;
pub mod http;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod routes;
pub mod types;

pub use client::StaffApi;
pub use http::HttpStaffApi;
pub use types::{NotificationSenderRef, SendNotificationRequest};
