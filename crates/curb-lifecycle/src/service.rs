//! [`ReportLifecycle`] — the state machine over reports and the
//! orchestration of store, cache, and notification queue.
//!
//! Every operation takes plain data plus the authenticated [`Actor`]
//! performing it. Validation and authorization run before any mutation;
//! once the store write lands, cache invalidation and notification are
//! best-effort and can only produce log lines, never errors.

use std::{fmt, time::Duration};

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeZone, Utc};
use curb_core::{
  Error, Result,
  actor::{Actor, Capability},
  cache::{CacheKey, DEFAULT_TTL, ReportCache},
  notify::{MessageTemplate, NotificationJob, Recipient},
  report::{
    ContactDetails, NewReport, Priority, Report, ReportDraft, ReportFilter,
    ReportPage, ReportPatch, ReportStats, Status,
  },
  store::{ActorStore, ReportStore},
  tracking::TrackingId,
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
  cache::{get_or_load, invalidate, invalidate_report},
  dispatch::NotificationQueue,
};

// ─── Addressing ──────────────────────────────────────────────────────────────

/// How callers point at a report: by internal id or by the public tracking
/// code. Mirrors the twin lookup routes of the HTTP surface.
#[derive(Debug, Clone)]
pub enum ReportRef {
  Id(Uuid),
  Tracking(TrackingId),
}

impl From<Uuid> for ReportRef {
  fn from(id: Uuid) -> Self {
    Self::Id(id)
  }
}

impl From<TrackingId> for ReportRef {
  fn from(tracking_id: TrackingId) -> Self {
    Self::Tracking(tracking_id)
  }
}

impl fmt::Display for ReportRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Id(id) => write!(f, "{id}"),
      Self::Tracking(tracking_id) => write!(f, "{tracking_id}"),
    }
  }
}

// ─── Config ──────────────────────────────────────────────────────────────────

/// Tunables, populated by whatever binary embeds the service.
#[derive(Debug, Clone, Copy)]
pub struct LifecycleConfig {
  /// TTL for cached reads.
  pub cache_ttl: Duration,
}

impl Default for LifecycleConfig {
  fn default() -> Self {
    Self { cache_ttl: DEFAULT_TTL }
  }
}

// ─── Outcomes ────────────────────────────────────────────────────────────────

/// Result of [`ReportLifecycle::assign`].
///
/// Re-assignment is deliberately not an error: a second call is a no-op
/// that reports who already holds the task, so benign re-submission costs
/// nothing.
#[derive(Debug, Clone)]
pub enum AssignOutcome {
  Assigned(Report),
  AlreadyAssigned {
    /// Email of the current assignee, when their account still resolves.
    assignee: Option<String>,
  },
}

// ─── Service ─────────────────────────────────────────────────────────────────

/// The lifecycle core, generic over its three collaborators.
pub struct ReportLifecycle<R, A, C> {
  reports: R,
  actors:  A,
  cache:   C,
  queue:   NotificationQueue,
  config:  LifecycleConfig,
}

impl<R, A, C> ReportLifecycle<R, A, C>
where
  R: ReportStore,
  A: ActorStore,
  C: ReportCache,
{
  pub fn new(reports: R, actors: A, cache: C, queue: NotificationQueue) -> Self {
    Self::with_config(reports, actors, cache, queue, LifecycleConfig::default())
  }

  pub fn with_config(
    reports: R,
    actors: A,
    cache: C,
    queue: NotificationQueue,
    config: LifecycleConfig,
  ) -> Self {
    Self { reports, actors, cache, queue, config }
  }

  // ── Writes ────────────────────────────────────────────────────────────────

  /// Submit a new report on behalf of `reporter`.
  ///
  /// Contact details are snapshotted from the reporter here and never
  /// re-derived; status starts PENDING and priority LOW.
  pub async fn create(
    &self,
    reporter: &Actor,
    input: NewReport,
  ) -> Result<Report> {
    input.validate()?;

    let tracking_id = self.fresh_tracking_id().await?;

    let draft = ReportDraft {
      tracking_id,
      category:    input.category,
      state:       input.state,
      lga:         input.lga,
      address:     input.address,
      description: input.description,
      images:      input.images,
      contact_details: ContactDetails {
        name:  reporter.name.clone(),
        phone: reporter.phone.clone(),
        email: reporter.email.clone(),
      },
      priority:    Priority::default(),
      status:      Status::Pending,
      created_by:  reporter.actor_id,
      notification_preference: input.notification_preference.unwrap_or_default(),
    };

    let report = self.reports.create(draft).await.map_err(Error::store)?;

    self.queue.enqueue(NotificationJob {
      recipient:  Recipient::from(reporter),
      template:   MessageTemplate::report_created(&report.tracking_id),
      preference: Some(report.notification_preference),
    });

    // The new report can only appear in its owner's list; paginated
    // listings age out within the TTL.
    invalidate(&self.cache, &CacheKey::UserReports(reporter.actor_id)).await;

    Ok(report)
  }

  /// Hand a report to a staff member, optionally raising its priority.
  ///
  /// Admin only. A report that already has an assignee is left untouched —
  /// the outcome names the current assignee instead (see
  /// [`AssignOutcome`]).
  pub async fn assign(
    &self,
    report_ref: &ReportRef,
    assignee_email: &str,
    priority: Option<Priority>,
    actor: &Actor,
  ) -> Result<AssignOutcome> {
    match actor.capability {
      Capability::Admin => {}
      Capability::Resident | Capability::Staff => {
        return Err(Error::Authorization(
          "assignment requires admin capability".into(),
        ));
      }
    }

    let report = self.resolve(report_ref).await?;

    if let Some(current) = report.assigned_to {
      let assignee = self
        .actors
        .find_by_id(current)
        .await
        .map_err(Error::store)?
        .and_then(|a| a.email);
      return Ok(AssignOutcome::AlreadyAssigned { assignee });
    }

    if assignee_email.trim().is_empty() {
      return Err(Error::Validation(
        "assignee email is required".into(),
      ));
    }

    let assignee = self
      .actors
      .find_by_email_with_capability(assignee_email, Capability::Staff)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::StaffNotFound(assignee_email.to_owned()))?;

    let updated = self
      .apply_patch(
        report.report_id,
        report_ref,
        ReportPatch {
          status:      Some(Status::Assigned),
          priority,
          assigned_to: Some(assignee.actor_id),
        },
      )
      .await?;

    self.queue.enqueue(NotificationJob {
      recipient:  Recipient::from(&assignee),
      template:   MessageTemplate::report_assigned(&updated.tracking_id),
      preference: Some(updated.notification_preference),
    });

    invalidate_report(&self.cache, &updated).await;

    Ok(AssignOutcome::Assigned(updated))
  }

  /// Move a report to `new_status`.
  ///
  /// Allowed for the current assignee or an admin; on an unassigned report
  /// that means only an admin passes. Any member of the status enum is
  /// accepted from any state — see the `Status` docs. A transition to
  /// COMPLETED notifies the original creator.
  pub async fn update_status(
    &self,
    report_ref: &ReportRef,
    new_status: Status,
    actor: &Actor,
  ) -> Result<Report> {
    let report = self.resolve(report_ref).await?;

    let is_assignee = report.assigned_to == Some(actor.actor_id);
    let authorized = match actor.capability {
      Capability::Admin => true,
      Capability::Staff | Capability::Resident => is_assignee,
    };
    if !authorized {
      return Err(Error::Authorization(
        "status updates require the current assignee or an admin".into(),
      ));
    }

    let updated = self
      .apply_patch(
        report.report_id,
        report_ref,
        ReportPatch { status: Some(new_status), ..Default::default() },
      )
      .await?;

    if new_status == Status::Completed {
      self.notify_creator_of_completion(&updated).await;
    }

    invalidate_report(&self.cache, &updated).await;

    Ok(updated)
  }

  /// Close out a report as done.
  ///
  /// The stricter sibling of [`Self::update_status`]: only the current
  /// assignee themselves may call it — no admin override — and it sets
  /// COMPLETED unconditionally, without notifying anyone. The two paths
  /// are kept distinct on purpose.
  pub async fn mark_complete(
    &self,
    report_ref: &ReportRef,
    actor: &Actor,
  ) -> Result<Report> {
    let report = self.resolve(report_ref).await?;

    if report.assigned_to != Some(actor.actor_id) {
      return Err(Error::Authorization(
        "only the current assignee may mark a report complete".into(),
      ));
    }

    let updated = self
      .apply_patch(
        report.report_id,
        report_ref,
        ReportPatch { status: Some(Status::Completed), ..Default::default() },
      )
      .await?;

    invalidate_report(&self.cache, &updated).await;

    Ok(updated)
  }

  /// Hard-delete a report. Admin only.
  ///
  /// A missing report fails with not-found before any cache key is
  /// touched.
  pub async fn delete(
    &self,
    report_ref: &ReportRef,
    actor: &Actor,
  ) -> Result<()> {
    match actor.capability {
      Capability::Admin => {}
      Capability::Resident | Capability::Staff => {
        return Err(Error::Authorization(
          "deletion requires admin capability".into(),
        ));
      }
    }

    let report = self.resolve(report_ref).await?;

    let removed = self
      .reports
      .delete(report.report_id)
      .await
      .map_err(Error::store)?;
    if !removed {
      // Raced with another delete between the lookup and here.
      return Err(Error::ReportNotFound(report_ref.to_string()));
    }

    invalidate_report(&self.cache, &report).await;

    Ok(())
  }

  // ── Cached reads ──────────────────────────────────────────────────────────

  pub async fn get_by_id(&self, report_id: Uuid) -> Result<Report> {
    let key = CacheKey::Report(report_id);
    get_or_load(&self.cache, &key, self.config.cache_ttl, || async move {
      self
        .reports
        .find_by_id(report_id)
        .await
        .map_err(Error::store)?
        .ok_or_else(|| Error::ReportNotFound(report_id.to_string()))
    })
    .await
  }

  pub async fn get_by_tracking_id(
    &self,
    tracking_id: &TrackingId,
  ) -> Result<Report> {
    let key = CacheKey::ReportByTracking(tracking_id.clone());
    get_or_load(&self.cache, &key, self.config.cache_ttl, || async move {
      self
        .reports
        .find_by_tracking_id(tracking_id)
        .await
        .map_err(Error::store)?
        .ok_or_else(|| Error::ReportNotFound(tracking_id.to_string()))
    })
    .await
  }

  /// The calling actor's own reports, newest first.
  pub async fn list_for_user(&self, actor: &Actor) -> Result<Vec<Report>> {
    let key = CacheKey::UserReports(actor.actor_id);
    get_or_load(&self.cache, &key, self.config.cache_ttl, || async move {
      self
        .reports
        .list_by_creator(actor.actor_id)
        .await
        .map_err(Error::store)
    })
    .await
  }

  /// One page of the global listing, newest first. Admin only.
  pub async fn list_all(
    &self,
    filter: ReportFilter,
    page: u32,
    limit: u32,
    actor: &Actor,
  ) -> Result<ReportPage> {
    match actor.capability {
      Capability::Admin => {}
      Capability::Resident | Capability::Staff => {
        return Err(Error::Authorization(
          "the global listing requires admin capability".into(),
        ));
      }
    }

    let page = page.max(1);
    let limit = limit.max(1);

    let key =
      CacheKey::ReportPage { page, limit, category: filter.category };
    get_or_load(&self.cache, &key, self.config.cache_ttl, || async move {
      let offset = (page - 1).saturating_mul(limit);
      let (reports, total) = self
        .reports
        .list_page(&filter, limit, offset)
        .await
        .map_err(Error::store)?;
      Ok(ReportPage::new(reports, total, page, limit))
    })
    .await
  }

  // ── Uncached reads ────────────────────────────────────────────────────────

  /// Reports currently assigned to the calling staff actor, newest first.
  pub async fn list_assigned(&self, actor: &Actor) -> Result<Vec<Report>> {
    self
      .reports
      .list_by_assignee(actor.actor_id)
      .await
      .map_err(Error::store)
  }

  /// Dashboard counters. Admin only, always fresh.
  pub async fn stats(&self, actor: &Actor) -> Result<ReportStats> {
    match actor.capability {
      Capability::Admin => {}
      Capability::Resident | Capability::Staff => {
        return Err(Error::Authorization(
          "stats require admin capability".into(),
        ));
      }
    }

    let now = Utc::now();
    let this_month = month_start(now.year(), now.month());
    let last_month = if now.month() == 1 {
      month_start(now.year() - 1, 12)
    } else {
      month_start(now.year(), now.month() - 1)
    };

    let this_month_reports = self
      .reports
      .count_created_between(this_month, None)
      .await
      .map_err(Error::store)?;
    let last_month_reports = self
      .reports
      .count_created_between(last_month, Some(this_month))
      .await
      .map_err(Error::store)?;
    let total_active = self
      .reports
      .count_with_status(&Status::ACTIVE)
      .await
      .map_err(Error::store)?;
    let pending = self
      .reports
      .count_with_status(&[Status::Pending])
      .await
      .map_err(Error::store)?;
    let in_progress = self
      .reports
      .count_with_status(&[Status::InProgress])
      .await
      .map_err(Error::store)?;

    let percent_change = if last_month_reports == 0 {
      100.0
    } else {
      let delta = this_month_reports as f64 - last_month_reports as f64;
      (delta / last_month_reports as f64 * 1000.0).round() / 10.0
    };

    Ok(ReportStats {
      total_active,
      this_month_reports,
      last_month_reports,
      percent_change,
      pending,
      in_progress,
    })
  }

  // ── Internals ─────────────────────────────────────────────────────────────

  /// Generate tracking ids until one is free. Collisions are vanishingly
  /// rare, so the loop is unbounded rather than failing on first overlap.
  async fn fresh_tracking_id(&self) -> Result<TrackingId> {
    loop {
      let candidate = TrackingId::generate();
      let exists = self
        .reports
        .tracking_id_exists(&candidate)
        .await
        .map_err(Error::store)?;
      if !exists {
        return Ok(candidate);
      }
      debug!(%candidate, "tracking id collision; regenerating");
    }
  }

  async fn resolve(&self, report_ref: &ReportRef) -> Result<Report> {
    let found = match report_ref {
      ReportRef::Id(id) => self.reports.find_by_id(*id).await,
      ReportRef::Tracking(tracking_id) => {
        self.reports.find_by_tracking_id(tracking_id).await
      }
    }
    .map_err(Error::store)?;

    found.ok_or_else(|| Error::ReportNotFound(report_ref.to_string()))
  }

  async fn apply_patch(
    &self,
    report_id: Uuid,
    report_ref: &ReportRef,
    patch: ReportPatch,
  ) -> Result<Report> {
    self
      .reports
      .update(report_id, patch)
      .await
      .map_err(Error::store)?
      // The row vanished between the lookup and the patch.
      .ok_or_else(|| Error::ReportNotFound(report_ref.to_string()))
  }

  /// Best-effort: the write has already landed, so a failed creator lookup
  /// only costs the notice.
  async fn notify_creator_of_completion(&self, report: &Report) {
    match self.actors.find_by_id(report.created_by).await {
      Ok(Some(creator)) => self.queue.enqueue(NotificationJob {
        recipient:  Recipient::from(&creator),
        template:   MessageTemplate::report_completed(&report.tracking_id),
        preference: Some(report.notification_preference),
      }),
      Ok(None) => {
        debug!("report creator no longer exists; skipping completion notice");
      }
      Err(error) => {
        warn!(%error, "creator lookup failed; skipping completion notice");
      }
    }
  }
}

/// Midnight UTC on the first of the given month.
fn month_start(year: i32, month: u32) -> DateTime<Utc> {
  // Day 1 of a real month always exists; the fallback is unreachable.
  let date = NaiveDate::from_ymd_opt(year, month, 1).unwrap_or_default();
  Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}
