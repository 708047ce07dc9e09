//! Builds outgoing notifications: receiver lists, content templates, and
//! the send request.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::info;

use fmiis_api::{NotificationSenderRef, SendNotificationRequest, StaffApi};
use fmiis_core::error::AppError;
use fmiis_core::result::AppResult;
use fmiis_entity::{Employee, Identity, Notification, NotificationType, Receiver, Role, Section};

/// Who a notification is addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiverTarget {
    /// Every employee of a section.
    Section(Section),
    /// One employee by id.
    Employee(String),
}

/// Whether `role` may send notifications.
pub fn can_send(role: Role) -> bool {
    role.can_send_notifications()
}

/// Default content offered for a notification type.
pub fn template_for(kind: NotificationType) -> &'static str {
    match kind {
        NotificationType::MorningMeeting => {
            "Good morning team! This is a reminder for our morning meeting. Join the meeting at 8:30AM Yangon Time via this link - https://us02web.zoom.us/j/82024496813?pwd=SEZXOW9XUWNsSjUwY29oVFg3RXNXUT09"
        }
        NotificationType::DeveloperMeeting => {
            "Hello developers! This is a notification for our developer meeting.Join the developer meeting at 11AM Yangon Time via this link - https://us02web.zoom.us/j/86453347948?pwd=QWhvNEdqNWdoY0RIM29PeUFva2JFUT09"
        }
        NotificationType::KosugiMeeting => {
            "Attention team! This is a notification for the Kosugi meeting."
        }
        NotificationType::EmergencyMeeting => {
            "URGENT: Emergency meeting notification. Please attend immediately."
        }
        NotificationType::InternalMeeting => "This is a notification for our internal meeting.",
        NotificationType::General => "General notification for all team members.",
    }
}

/// Resolves a target against the employee directory.
///
/// Management and HR sections leave the sender out, and a single-employee
/// target never resolves to the sender. Duplicates by email are dropped,
/// first occurrence wins. Every receiver starts unseen.
pub fn resolve_receivers(
    target: &ReceiverTarget,
    employees: &[Employee],
    sender_email: &str,
) -> Vec<Receiver> {
    let selected = employees.iter().filter(|employee| match target {
        ReceiverTarget::Section(section) => {
            section.contains(employee.role)
                && !(matches!(section, Section::GmMd | Section::Hr)
                    && employee.email.eq_ignore_ascii_case(sender_email))
        }
        ReceiverTarget::Employee(id) => {
            employee.id == *id && !employee.email.eq_ignore_ascii_case(sender_email)
        }
    });

    let mut seen = HashSet::new();
    selected
        .filter(|employee| seen.insert(employee.email.to_lowercase()))
        .map(|employee| Receiver::unseen(employee.name.clone(), employee.email.clone()))
        .collect()
}

/// Validates and builds a send request.
pub fn compose(
    sender: &Identity,
    kind: NotificationType,
    receivers: Vec<Receiver>,
    content: &str,
) -> AppResult<SendNotificationRequest> {
    if !can_send(sender.role) {
        return Err(AppError::authorization(format!(
            "Role '{}' cannot send notifications",
            sender.role
        )));
    }
    if receivers.is_empty() {
        return Err(AppError::validation("Please select receivers"));
    }
    if content.trim().is_empty() {
        return Err(AppError::validation("Please enter notification content"));
    }

    Ok(SendNotificationRequest {
        noti_type: kind,
        sender: NotificationSenderRef {
            name: sender.display_name.clone(),
            email: sender.email.clone(),
            role: sender.role,
        },
        receivers,
        content: content.to_string(),
    })
}

/// Sends notifications on behalf of the signed-in identity.
#[derive(Debug, Clone)]
pub struct NotificationComposer {
    api: Arc<dyn StaffApi>,
}

impl NotificationComposer {
    /// Creates a composer.
    pub fn new(api: Arc<dyn StaffApi>) -> Self {
        Self { api }
    }

    /// Fetches the directory and resolves `target` for `sender`.
    pub async fn receivers(
        &self,
        sender: &Identity,
        target: &ReceiverTarget,
    ) -> AppResult<Vec<Receiver>> {
        let employees = self.api.employees().await?;
        Ok(resolve_receivers(target, &employees, &sender.email))
    }

    /// Resolves the target, builds the request, and sends it.
    ///
    /// `content` falls back to the type's template when `None`.
    pub async fn send(
        &self,
        sender: &Identity,
        kind: NotificationType,
        target: &ReceiverTarget,
        content: Option<&str>,
    ) -> AppResult<Notification> {
        if !can_send(sender.role) {
            return Err(AppError::authorization(format!(
                "Role '{}' cannot send notifications",
                sender.role
            )));
        }
        let receivers = self.receivers(sender, target).await?;
        let request = compose(
            sender,
            kind,
            receivers,
            content.unwrap_or_else(|| template_for(kind)),
        )?;
        let created = self.api.send_notification(&request).await?;
        info!(
            sender = %sender.email,
            kind = %kind,
            receivers = request.receivers.len(),
            "Notification sent"
        );
        Ok(created)
    }
}
