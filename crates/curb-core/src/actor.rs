//! Actor — an authenticated entity performing lifecycle operations.
//!
//! Accounts are owned and mutated by the (external) identity system; the
//! core treats actors as read-only reference data plus notification targets.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::report::NotificationPreference;

/// What an actor is allowed to do. A closed set, checked with exhaustive
/// matches at each operation boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
  Resident,
  Staff,
  Admin,
}

impl Capability {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Resident => "resident",
      Self::Staff => "staff",
      Self::Admin => "admin",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "resident" => Some(Self::Resident),
      "staff" => Some(Self::Staff),
      "admin" => Some(Self::Admin),
      _ => None,
    }
  }
}

/// An account, as seen by the lifecycle core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
  pub actor_id:   Uuid,
  /// Display name, used for the report's contact snapshot.
  pub name:       String,
  pub email:      Option<String>,
  /// E.164 expected; formatting is the account system's concern.
  pub phone:      Option<String>,
  pub capability: Capability,
  /// The actor's default channel; a report-level preference overrides it.
  pub notification_preference: Option<NotificationPreference>,
}
