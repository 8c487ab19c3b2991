//! Notification types and the sender seams.
//!
//! The actual providers (SMTP relay, SMS gateway) live outside this
//! workspace behind [`EmailSender`] and [`SmsSender`]. The core decides
//! *whether* and *on which channel* to send; providers decide *how*.

use std::future::Future;

use thiserror::Error;

use crate::{
  actor::Actor, report::NotificationPreference, tracking::TrackingId,
};

/// A provider-side delivery failure. Caught and logged by the dispatcher,
/// never surfaced to the operation that triggered the notification.
#[derive(Debug, Error)]
#[error("delivery failed: {0}")]
pub struct DeliveryError(pub String);

// ─── Sender seams ────────────────────────────────────────────────────────────

pub trait EmailSender: Send + Sync {
  fn send<'a>(
    &'a self,
    to: &'a str,
    subject: &'a str,
    html_body: &'a str,
  ) -> impl Future<Output = Result<(), DeliveryError>> + Send + 'a;
}

pub trait SmsSender: Send + Sync {
  fn send<'a>(
    &'a self,
    to: &'a str,
    body: &'a str,
  ) -> impl Future<Output = Result<(), DeliveryError>> + Send + 'a;
}

// ─── Recipient ───────────────────────────────────────────────────────────────

/// Contact snapshot a notification is addressed to, taken at enqueue time so
/// the dispatcher never reads the account system.
#[derive(Debug, Clone)]
pub struct Recipient {
  pub email:      Option<String>,
  pub phone:      Option<String>,
  /// The recipient's own default channel.
  pub preference: Option<NotificationPreference>,
}

impl From<&Actor> for Recipient {
  fn from(actor: &Actor) -> Self {
    Self {
      email:      actor.email.clone(),
      phone:      actor.phone.clone(),
      preference: actor.notification_preference,
    }
  }
}

/// Resolve which channel(s) one notification should use: an explicit
/// (report-level) preference wins over the recipient's own default, which
/// wins over plain email.
pub fn resolve_channel(
  explicit: Option<NotificationPreference>,
  recipient: &Recipient,
) -> NotificationPreference {
  explicit
    .or(recipient.preference)
    .unwrap_or(NotificationPreference::Email)
}

// ─── Templates ───────────────────────────────────────────────────────────────

/// The rendered content of one notification event: an email subject/body
/// pair and an SMS body, each carrying the report's tracking id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTemplate {
  pub email_subject: String,
  pub email_html:    String,
  pub sms:           String,
}

impl MessageTemplate {
  pub fn report_created(tracking_id: &TrackingId) -> Self {
    Self {
      email_subject: format!("Trash report {tracking_id} received"),
      email_html:    format!(
        "<p>Your report <b>{tracking_id}</b> has been received.</p>"
      ),
      sms: format!("Your Curb report ({tracking_id}) has been received."),
    }
  }

  pub fn report_assigned(tracking_id: &TrackingId) -> Self {
    Self {
      email_subject: format!("New task assigned: {tracking_id}"),
      email_html:    format!(
        "<p>You have been assigned report <b>{tracking_id}</b>.</p>"
      ),
      sms: format!("New Curb task assigned: {tracking_id}"),
    }
  }

  pub fn report_completed(tracking_id: &TrackingId) -> Self {
    Self {
      email_subject: format!("Trash report {tracking_id} completed"),
      email_html:    format!(
        "<p>Your report <b>{tracking_id}</b> has been completed.</p>"
      ),
      sms: format!("Your Curb report ({tracking_id}) has been completed."),
    }
  }
}

// ─── Job ─────────────────────────────────────────────────────────────────────

/// One unit of work for the dispatcher: who, what, and on which channel(s).
#[derive(Debug, Clone)]
pub struct NotificationJob {
  pub recipient: Recipient,
  pub template:  MessageTemplate,
  /// Report-level channel override; see [`resolve_channel`].
  pub preference: Option<NotificationPreference>,
}
