//! Section placement rules and console path builders.

use fmiis_entity::{Role, Section};

/// The section a role works under.
pub fn section_for(role: Role) -> Section {
    Section::for_role(role)
}

/// First non-empty segment of `path`, ignoring query and fragment.
pub fn top_level_segment(path: &str) -> Option<&str> {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    path.split('/').find(|segment| !segment.is_empty())
}

/// Whether `path` lies inside the section assigned to `role`.
pub fn is_within_section(role: Role, path: &str) -> bool {
    top_level_segment(path) == Some(section_for(role).segment())
}

/// Landing page of a role.
pub fn home_path(role: Role) -> String {
    section_for(role).prefix()
}

/// Notification feed of a role.
pub fn notifications_path(role: Role) -> String {
    format!("{}/notifications", section_for(role).prefix())
}

/// Detail page of one notification.
pub fn notification_detail_path(role: Role, notification_id: &str) -> String {
    format!("{}/{notification_id}", notifications_path(role))
}

/// Compose page; only meaningful for roles that may send.
pub fn send_notification_path(role: Role) -> String {
    format!("{}/send", notifications_path(role))
}
