//! The `ReportStore` and `ActorStore` traits.
//!
//! `ReportStore` is implemented by storage backends (e.g.
//! `curb-store-sqlite`) and is the single source of truth for reports; the
//! cache layer in front of it is purely derived. `ActorStore` is the seam to
//! the external account system — the core only ever reads through it.
//!
//! All methods return `Send` futures so the traits can be used in
//! multi-threaded async runtimes. Mutations must be atomic per report: the
//! backend applies a [`ReportPatch`] as a single-row read-modify-write and
//! bumps `updated_at` itself.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  actor::{Actor, Capability},
  report::{Report, ReportDraft, ReportFilter, ReportPatch, Status},
  tracking::TrackingId,
};

// ─── ReportStore ─────────────────────────────────────────────────────────────

/// Abstraction over the durable report store.
pub trait ReportStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Persist a new report. The store assigns `report_id` and timestamps.
  fn create(
    &self,
    draft: ReportDraft,
  ) -> impl Future<Output = Result<Report, Self::Error>> + Send + '_;

  /// Whether a report with this tracking id already exists. Used by the
  /// generation retry loop on creation.
  fn tracking_id_exists<'a>(
    &'a self,
    tracking_id: &'a TrackingId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Retrieve a report by internal id. Returns `None` if not found.
  fn find_by_id(
    &self,
    report_id: Uuid,
  ) -> impl Future<Output = Result<Option<Report>, Self::Error>> + Send + '_;

  /// Retrieve a report by public tracking id. Returns `None` if not found.
  fn find_by_tracking_id<'a>(
    &'a self,
    tracking_id: &'a TrackingId,
  ) -> impl Future<Output = Result<Option<Report>, Self::Error>> + Send + 'a;

  /// All reports created by `creator`, newest first.
  fn list_by_creator(
    &self,
    creator: Uuid,
  ) -> impl Future<Output = Result<Vec<Report>, Self::Error>> + Send + '_;

  /// All reports currently assigned to `assignee`, newest first.
  fn list_by_assignee(
    &self,
    assignee: Uuid,
  ) -> impl Future<Output = Result<Vec<Report>, Self::Error>> + Send + '_;

  /// One page of the filtered global listing, newest first, plus the total
  /// row count for the filter.
  fn list_page<'a>(
    &'a self,
    filter: &'a ReportFilter,
    limit: u32,
    offset: u32,
  ) -> impl Future<Output = Result<(Vec<Report>, u64), Self::Error>> + Send + 'a;

  /// Apply `patch` to one report atomically, bumping `updated_at`. Returns
  /// the updated report, or `None` if it no longer exists.
  fn update(
    &self,
    report_id: Uuid,
    patch: ReportPatch,
  ) -> impl Future<Output = Result<Option<Report>, Self::Error>> + Send + '_;

  /// Hard-delete a report. Returns whether a row was removed.
  fn delete(
    &self,
    report_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Count reports whose status is any of `statuses`.
  fn count_with_status<'a>(
    &'a self,
    statuses: &'a [Status],
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;

  /// Count reports created in `[from, to)`; an open upper bound counts
  /// everything from `from` onwards.
  fn count_created_between(
    &self,
    from: DateTime<Utc>,
    to: Option<DateTime<Utc>>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;
}

// ─── ActorStore ──────────────────────────────────────────────────────────────

/// Read-only view of the account system.
pub trait ActorStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Retrieve an actor by id. Returns `None` if not found.
  fn find_by_id(
    &self,
    actor_id: Uuid,
  ) -> impl Future<Output = Result<Option<Actor>, Self::Error>> + Send + '_;

  /// Retrieve an actor by email, but only if they hold `capability`.
  /// Returns `None` when the account is absent or holds a different
  /// capability — callers cannot distinguish the two, deliberately.
  fn find_by_email_with_capability<'a>(
    &'a self,
    email: &'a str,
    capability: Capability,
  ) -> impl Future<Output = Result<Option<Actor>, Self::Error>> + Send + 'a;
}
