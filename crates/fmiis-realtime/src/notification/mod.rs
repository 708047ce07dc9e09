//! Notification ledger and composer.

pub mod composer;
pub mod ledger;

pub use composer::{NotificationComposer, ReceiverTarget};
pub use ledger::{AckState, NotificationLedger};
