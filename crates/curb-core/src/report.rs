//! Report — the central entity of the trash-reporting core.
//!
//! A report is mutable in place: lifecycle operations patch its status,
//! assignment, and priority through the store's atomic single-row update.
//! Everything captured at creation time (tracking id, contact snapshot,
//! creator) is immutable afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tracking::TrackingId;

/// Upper bound on the free-text description, in characters.
pub const MAX_DESCRIPTION_LEN: usize = 500;

// ─── Field enums ─────────────────────────────────────────────────────────────

/// What kind of trash problem is being reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
  Illegal,
  Overflowing,
  Blocked,
  Missed,
  General,
  Burning,
  Uncategorized,
  Other,
}

impl Category {
  pub const ALL: [Category; 8] = [
    Self::Illegal,
    Self::Overflowing,
    Self::Blocked,
    Self::Missed,
    Self::General,
    Self::Burning,
    Self::Uncategorized,
    Self::Other,
  ];

  /// The string form stored in the database and used in cache keys.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Illegal => "illegal",
      Self::Overflowing => "overflowing",
      Self::Blocked => "blocked",
      Self::Missed => "missed",
      Self::General => "general",
      Self::Burning => "burning",
      Self::Uncategorized => "uncategorized",
      Self::Other => "other",
    }
  }

  /// Parse the stored/wire form. Returns `None` for anything outside the
  /// closed set — the boundary turns that into a validation failure.
  pub fn parse(s: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|c| c.as_str() == s)
  }
}

/// Where a report sits in its lifecycle.
///
/// The nominal edges are PENDING → {ASSIGNED, CANCELLED}, ASSIGNED →
/// {IN_PROGRESS, COMPLETED, CANCELLED}, IN_PROGRESS → {COMPLETED,
/// CANCELLED}, with COMPLETED and CANCELLED terminal. No edge table is
/// enforced: `update_status` accepts any member of this enum from any
/// state, matching the reference behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
  Pending,
  Assigned,
  InProgress,
  Completed,
  Cancelled,
}

impl Status {
  /// The statuses counted as "active" in the admin stats.
  pub const ACTIVE: [Status; 3] = [Self::Pending, Self::Assigned, Self::InProgress];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Pending => "PENDING",
      Self::Assigned => "ASSIGNED",
      Self::InProgress => "IN_PROGRESS",
      Self::Completed => "COMPLETED",
      Self::Cancelled => "CANCELLED",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "PENDING" => Some(Self::Pending),
      "ASSIGNED" => Some(Self::Assigned),
      "IN_PROGRESS" => Some(Self::InProgress),
      "COMPLETED" => Some(Self::Completed),
      "CANCELLED" => Some(Self::Cancelled),
      _ => None,
    }
  }

  pub fn is_terminal(self) -> bool {
    matches!(self, Self::Completed | Self::Cancelled)
  }
}

/// Triage priority. New reports start at LOW; only `assign` raises it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
  #[default]
  Low,
  Medium,
  High,
}

impl Priority {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Low => "LOW",
      Self::Medium => "MEDIUM",
      Self::High => "HIGH",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "LOW" => Some(Self::Low),
      "MEDIUM" => Some(Self::Medium),
      "HIGH" => Some(Self::High),
      _ => None,
    }
  }
}

/// Which channel(s) notifications about this report should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationPreference {
  #[default]
  Email,
  Sms,
  Both,
}

impl NotificationPreference {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Email => "EMAIL",
      Self::Sms => "SMS",
      Self::Both => "BOTH",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "EMAIL" => Some(Self::Email),
      "SMS" => Some(Self::Sms),
      "BOTH" => Some(Self::Both),
      _ => None,
    }
  }
}

// ─── Contact snapshot ────────────────────────────────────────────────────────

/// Reporter contact details, snapshotted at creation time and never
/// re-derived from the account afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactDetails {
  pub name:  String,
  pub phone: Option<String>,
  pub email: Option<String>,
}

// ─── Report ──────────────────────────────────────────────────────────────────

/// A persisted trash report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
  pub report_id:   Uuid,
  /// Short public identifier; unique and immutable after creation.
  pub tracking_id: TrackingId,
  pub category:    Category,
  pub state:       String,
  /// Local government area.
  pub lga:         String,
  pub address:     String,
  pub description: Option<String>,
  /// Ordered opaque URIs from the external media store.
  pub images:      Vec<String>,
  pub contact_details: ContactDetails,
  pub priority:    Priority,
  pub status:      Status,
  /// Owning actor; immutable.
  pub created_by:  Uuid,
  /// Set exactly once through `assign`; always a Staff actor.
  pub assigned_to: Option<Uuid>,
  pub notification_preference: NotificationPreference,
  pub created_at:  DateTime<Utc>,
  /// Bumped by the store on every mutation.
  pub updated_at:  DateTime<Utc>,
}

// ─── NewReport ───────────────────────────────────────────────────────────────

/// Caller-supplied fields for report creation. The lifecycle validates
/// these, then combines them with a fresh tracking id and the reporter's
/// contact snapshot into a [`ReportDraft`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewReport {
  pub category:    Category,
  pub state:       String,
  pub lga:         String,
  pub address:     String,
  pub description: Option<String>,
  pub images:      Vec<String>,
  pub notification_preference: Option<NotificationPreference>,
}

impl NewReport {
  /// Check required fields and bounds. Runs before any mutation.
  pub fn validate(&self) -> crate::Result<()> {
    for (field, value) in [
      ("state", &self.state),
      ("lga", &self.lga),
      ("address", &self.address),
    ] {
      if value.trim().is_empty() {
        return Err(crate::Error::Validation(format!("{field} is required")));
      }
    }

    if let Some(description) = &self.description
      && description.chars().count() > MAX_DESCRIPTION_LEN
    {
      return Err(crate::Error::Validation(format!(
        "description exceeds {MAX_DESCRIPTION_LEN} characters"
      )));
    }

    Ok(())
  }
}

// ─── ReportDraft ─────────────────────────────────────────────────────────────

/// Input to [`crate::store::ReportStore::create`]. The store assigns
/// `report_id`, `created_at`, and `updated_at`; everything else is decided
/// by the lifecycle beforehand.
#[derive(Debug, Clone)]
pub struct ReportDraft {
  pub tracking_id: TrackingId,
  pub category:    Category,
  pub state:       String,
  pub lga:         String,
  pub address:     String,
  pub description: Option<String>,
  pub images:      Vec<String>,
  pub contact_details: ContactDetails,
  pub priority:    Priority,
  pub status:      Status,
  pub created_by:  Uuid,
  pub notification_preference: NotificationPreference,
}

// ─── ReportPatch ─────────────────────────────────────────────────────────────

/// A partial update applied atomically by the store. `None` fields are left
/// untouched; `assigned_to` can only ever be set, never cleared.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportPatch {
  pub status:      Option<Status>,
  pub priority:    Option<Priority>,
  pub assigned_to: Option<Uuid>,
}

// ─── Queries and pages ───────────────────────────────────────────────────────

/// Filter for the paginated listing.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportFilter {
  pub category: Option<Category>,
}

/// One page of the global report listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportPage {
  pub reports:       Vec<Report>,
  pub current_page:  u32,
  pub total_reports: u64,
  pub total_pages:   u32,
  pub has_next_page: bool,
  pub has_prev_page: bool,
}

impl ReportPage {
  pub fn new(reports: Vec<Report>, total_reports: u64, page: u32, limit: u32) -> Self {
    let limit = limit.max(1);
    let total_pages = total_reports.div_ceil(u64::from(limit)) as u32;
    Self {
      reports,
      current_page: page,
      total_reports,
      total_pages,
      has_next_page: page < total_pages,
      has_prev_page: page > 1,
    }
  }
}

/// Admin dashboard counters.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ReportStats {
  pub total_active:       u64,
  pub this_month_reports: u64,
  pub last_month_reports: u64,
  /// 100 when last month had no reports, otherwise the month-over-month
  /// change rounded to one decimal.
  pub percent_change:     f64,
  pub pending:            u64,
  pub in_progress:        u64,
}

// ─── Tests ───────────────────────────────────────────────────────────────────
