//! Encoding and decoding helpers between Rust domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings (which order lexicographically
//! for UTC, so SQL range comparisons work). Enums are stored in their
//! canonical string forms from `curb-core`. UUIDs are hyphenated lowercase.
//! Image lists are compact JSON arrays.

use chrono::{DateTime, Utc};
use curb_core::{
  actor::{Actor, Capability},
  report::{
    Category, ContactDetails, NotificationPreference, Priority, Report,
    Status,
  },
  tracking::TrackingId,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(format!("bad timestamp {s:?}: {e}")))
}

// ─── Closed-set enums ────────────────────────────────────────────────────────

pub fn decode_category(s: &str) -> Result<Category> {
  Category::parse(s)
    .ok_or_else(|| Error::Decode(format!("unknown category: {s:?}")))
}

pub fn decode_status(s: &str) -> Result<Status> {
  Status::parse(s)
    .ok_or_else(|| Error::Decode(format!("unknown status: {s:?}")))
}

pub fn decode_priority(s: &str) -> Result<Priority> {
  Priority::parse(s)
    .ok_or_else(|| Error::Decode(format!("unknown priority: {s:?}")))
}

pub fn decode_preference(s: &str) -> Result<NotificationPreference> {
  NotificationPreference::parse(s).ok_or_else(|| {
    Error::Decode(format!("unknown notification preference: {s:?}"))
  })
}

pub fn decode_capability(s: &str) -> Result<Capability> {
  Capability::parse(s)
    .ok_or_else(|| Error::Decode(format!("unknown capability: {s:?}")))
}

// ─── Images ──────────────────────────────────────────────────────────────────

pub fn encode_images(images: &[String]) -> Result<String> {
  Ok(serde_json::to_string(images)?)
}

pub fn decode_images(s: &str) -> Result<Vec<String>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// The `reports` column list, in [`RawReport::from_row`] order.
pub const REPORT_COLUMNS: &str = "report_id, tracking_id, category, state, \
   lga, address, description, images, contact_name, contact_phone, \
   contact_email, priority, status, created_by, assigned_to, \
   notification_preference, created_at, updated_at";

/// Raw strings read directly from a `reports` row.
pub struct RawReport {
  pub report_id:     String,
  pub tracking_id:   String,
  pub category:      String,
  pub state:         String,
  pub lga:           String,
  pub address:       String,
  pub description:   Option<String>,
  pub images:        String,
  pub contact_name:  String,
  pub contact_phone: Option<String>,
  pub contact_email: Option<String>,
  pub priority:      String,
  pub status:        String,
  pub created_by:    String,
  pub assigned_to:   Option<String>,
  pub notification_preference: String,
  pub created_at:    String,
  pub updated_at:    String,
}

impl RawReport {
  /// Read one row selected with [`REPORT_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      report_id:     row.get(0)?,
      tracking_id:   row.get(1)?,
      category:      row.get(2)?,
      state:         row.get(3)?,
      lga:           row.get(4)?,
      address:       row.get(5)?,
      description:   row.get(6)?,
      images:        row.get(7)?,
      contact_name:  row.get(8)?,
      contact_phone: row.get(9)?,
      contact_email: row.get(10)?,
      priority:      row.get(11)?,
      status:        row.get(12)?,
      created_by:    row.get(13)?,
      assigned_to:   row.get(14)?,
      notification_preference: row.get(15)?,
      created_at:    row.get(16)?,
      updated_at:    row.get(17)?,
    })
  }

  pub fn into_report(self) -> Result<Report> {
    Ok(Report {
      report_id:   decode_uuid(&self.report_id)?,
      tracking_id: TrackingId::from(self.tracking_id),
      category:    decode_category(&self.category)?,
      state:       self.state,
      lga:         self.lga,
      address:     self.address,
      description: self.description,
      images:      decode_images(&self.images)?,
      contact_details: ContactDetails {
        name:  self.contact_name,
        phone: self.contact_phone,
        email: self.contact_email,
      },
      priority:    decode_priority(&self.priority)?,
      status:      decode_status(&self.status)?,
      created_by:  decode_uuid(&self.created_by)?,
      assigned_to: self
        .assigned_to
        .as_deref()
        .map(decode_uuid)
        .transpose()?,
      notification_preference: decode_preference(
        &self.notification_preference,
      )?,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw strings read directly from an `actors` row.
pub struct RawActor {
  pub actor_id:   String,
  pub name:       String,
  pub email:      Option<String>,
  pub phone:      Option<String>,
  pub capability: String,
  pub notification_preference: Option<String>,
}

impl RawActor {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      actor_id:   row.get(0)?,
      name:       row.get(1)?,
      email:      row.get(2)?,
      phone:      row.get(3)?,
      capability: row.get(4)?,
      notification_preference: row.get(5)?,
    })
  }

  pub fn into_actor(self) -> Result<Actor> {
    Ok(Actor {
      actor_id:   decode_uuid(&self.actor_id)?,
      name:       self.name,
      email:      self.email,
      phone:      self.phone,
      capability: decode_capability(&self.capability)?,
      notification_preference: self
        .notification_preference
        .as_deref()
        .map(decode_preference)
        .transpose()?,
    })
  }
}
