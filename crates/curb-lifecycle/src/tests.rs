//! Integration tests for the lifecycle service, run against the real
//! SQLite store and the in-memory cache, with recording fakes at the
//! provider seams.

use std::sync::{Arc, Mutex};

use curb_cache_memory::MemoryCache;
use curb_core::{
  Error,
  actor::{Actor, Capability},
  notify::{
    DeliveryError, EmailSender, MessageTemplate, NotificationJob, Recipient,
    SmsSender,
  },
  report::{
    Category, NewReport, NotificationPreference, Priority, ReportFilter,
    Status,
  },
  store::ReportStore,
  tracking::TrackingId,
};
use curb_store_sqlite::{NewActor, SqliteStore};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::{
  AssignOutcome, Dispatcher, ReportLifecycle, ReportRef, spawn_dispatcher,
};

// ─── Fakes ───────────────────────────────────────────────────────────────────

/// Records (to, subject, html) triples; fails every send when `fail` is set.
#[derive(Clone, Default)]
struct FakeEmail {
  fail: bool,
  sent: Arc<Mutex<Vec<(String, String, String)>>>,
}

impl FakeEmail {
  fn failing() -> Self {
    Self { fail: true, ..Self::default() }
  }

  fn sent(&self) -> Vec<(String, String, String)> {
    self.sent.lock().unwrap().clone()
  }

  fn sent_to(&self, to: &str) -> Vec<(String, String, String)> {
    self.sent().into_iter().filter(|(t, _, _)| t == to).collect()
  }
}

impl EmailSender for FakeEmail {
  async fn send(
    &self,
    to: &str,
    subject: &str,
    html_body: &str,
  ) -> Result<(), DeliveryError> {
    if self.fail {
      return Err(DeliveryError("smtp relay down".into()));
    }
    self
      .sent
      .lock()
      .unwrap()
      .push((to.into(), subject.into(), html_body.into()));
    Ok(())
  }
}

/// Records (to, body) pairs; fails every send when `fail` is set.
#[derive(Clone, Default)]
struct FakeSms {
  fail: bool,
  sent: Arc<Mutex<Vec<(String, String)>>>,
}

impl FakeSms {
  fn sent(&self) -> Vec<(String, String)> {
    self.sent.lock().unwrap().clone()
  }
}

impl SmsSender for FakeSms {
  async fn send(&self, to: &str, body: &str) -> Result<(), DeliveryError> {
    if self.fail {
      return Err(DeliveryError("gateway rejected the message".into()));
    }
    self.sent.lock().unwrap().push((to.into(), body.into()));
    Ok(())
  }
}

// ─── Environment ─────────────────────────────────────────────────────────────

type TestLifecycle = ReportLifecycle<SqliteStore, SqliteStore, Arc<MemoryCache>>;

struct Env {
  lifecycle: TestLifecycle,
  worker:    JoinHandle<()>,
  store:     SqliteStore,
  emails:    FakeEmail,
  sms:       FakeSms,
  resident:  Actor,
  staff:     Actor,
  admin:     Actor,
}

async fn env() -> Env {
  let store = SqliteStore::open_in_memory().await.expect("in-memory store");
  let cache = Arc::new(MemoryCache::new());
  let emails = FakeEmail::default();
  let sms = FakeSms::default();
  let (queue, worker) = spawn_dispatcher(emails.clone(), sms.clone());

  let resident = store
    .add_actor(NewActor {
      name:       "Ada Obi".into(),
      email:      Some("ada@example.com".into()),
      phone:      Some("+2348012345678".into()),
      capability: Capability::Resident,
      notification_preference: None,
    })
    .await
    .unwrap();
  let staff = store
    .add_actor(NewActor {
      name:       "Musa Bello".into(),
      email:      Some("musa@example.com".into()),
      phone:      Some("+2348098765432".into()),
      capability: Capability::Staff,
      notification_preference: Some(NotificationPreference::Sms),
    })
    .await
    .unwrap();
  let admin = store
    .add_actor(NewActor {
      name:       "Tunde Ajayi".into(),
      email:      Some("tunde@example.com".into()),
      phone:      None,
      capability: Capability::Admin,
      notification_preference: None,
    })
    .await
    .unwrap();

  let lifecycle =
    ReportLifecycle::new(store.clone(), store.clone(), cache, queue);

  Env { lifecycle, worker, store, emails, sms, resident, staff, admin }
}

/// Close the queue and wait for the dispatcher to drain every pending job.
async fn drain(lifecycle: TestLifecycle, worker: JoinHandle<()>) {
  drop(lifecycle);
  worker.await.expect("dispatcher worker");
}

fn new_report() -> NewReport {
  NewReport {
    category:    Category::Illegal,
    state:       "Lagos".into(),
    lga:         "Ikeja".into(),
    address:     "12 Allen Ave".into(),
    description: Some("Mattresses dumped by the canal".into()),
    images:      vec!["https://media.example/canal.jpg".into()],
    notification_preference: None,
  }
}

// ─── Create ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_starts_pending_low_with_a_fresh_tracking_id() {
  let Env { lifecycle, resident, .. } = env().await;

  let report = lifecycle.create(&resident, new_report()).await.unwrap();

  assert_eq!(report.status, Status::Pending);
  assert_eq!(report.priority, Priority::Low);
  assert!(TrackingId::is_well_formed(report.tracking_id.as_str()));
  assert_eq!(report.created_by, resident.actor_id);
  assert_eq!(report.notification_preference, NotificationPreference::Email);

  // Contact details are frozen from the reporter at creation time.
  assert_eq!(report.contact_details.name, "Ada Obi");
  assert_eq!(
    report.contact_details.email.as_deref(),
    Some("ada@example.com")
  );

  let second = lifecycle.create(&resident, new_report()).await.unwrap();
  assert_ne!(second.tracking_id, report.tracking_id);
}

#[tokio::test]
async fn create_rejects_blank_required_fields_before_writing() {
  let Env { lifecycle, resident, .. } = env().await;

  let mut input = new_report();
  input.address = "  ".into();

  let err = lifecycle.create(&resident, input).await.unwrap_err();
  assert!(matches!(err, Error::Validation(_)));

  assert!(lifecycle.list_for_user(&resident).await.unwrap().is_empty());
}

#[tokio::test]
async fn create_notifies_the_reporter_by_email() {
  let Env { lifecycle, worker, emails, sms, resident, .. } = env().await;

  let report = lifecycle.create(&resident, new_report()).await.unwrap();
  let tracking = report.tracking_id.to_string();

  drain(lifecycle, worker).await;

  let to_reporter = emails.sent_to("ada@example.com");
  assert_eq!(to_reporter.len(), 1);
  assert!(to_reporter[0].1.contains(&tracking));
  assert!(to_reporter[0].2.contains(&tracking));
  assert!(sms.sent().is_empty());
}

#[tokio::test]
async fn create_with_both_preference_uses_both_channels() {
  let Env { lifecycle, worker, emails, sms, resident, .. } = env().await;

  let mut input = new_report();
  input.notification_preference = Some(NotificationPreference::Both);
  let report = lifecycle.create(&resident, input).await.unwrap();
  let tracking = report.tracking_id.to_string();

  drain(lifecycle, worker).await;

  assert_eq!(emails.sent_to("ada@example.com").len(), 1);
  let sms_sent = sms.sent();
  assert_eq!(sms_sent.len(), 1);
  assert_eq!(sms_sent[0].0, "+2348012345678");
  assert!(sms_sent[0].1.contains(&tracking));
}

#[tokio::test]
async fn create_refreshes_the_reporters_list() {
  let Env { lifecycle, resident, .. } = env().await;

  lifecycle.create(&resident, new_report()).await.unwrap();
  assert_eq!(lifecycle.list_for_user(&resident).await.unwrap().len(), 1);

  // The list is now cached; a second create must invalidate it.
  lifecycle.create(&resident, new_report()).await.unwrap();
  assert_eq!(lifecycle.list_for_user(&resident).await.unwrap().len(), 2);
}

// ─── Assign ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn assign_requires_admin_capability() {
  let Env { lifecycle, resident, staff, .. } = env().await;

  let report = lifecycle.create(&resident, new_report()).await.unwrap();
  let reference = ReportRef::from(report.report_id);

  for actor in [&resident, &staff] {
    let err = lifecycle
      .assign(&reference, "musa@example.com", None, actor)
      .await
      .unwrap_err();
    assert!(matches!(err, Error::Authorization(_)));
  }

  let untouched = lifecycle.get_by_id(report.report_id).await.unwrap();
  assert_eq!(untouched.status, Status::Pending);
  assert_eq!(untouched.assigned_to, None);
}

#[tokio::test]
async fn assign_sets_assignee_status_and_priority() {
  let Env { lifecycle, worker, emails, resident, staff, admin, .. } =
    env().await;

  let report = lifecycle.create(&resident, new_report()).await.unwrap();
  let tracking = report.tracking_id.to_string();

  let outcome = lifecycle
    .assign(
      &ReportRef::from(report.tracking_id.clone()),
      "musa@example.com",
      Some(Priority::High),
      &admin,
    )
    .await
    .unwrap();

  let AssignOutcome::Assigned(assigned) = outcome else {
    panic!("expected a fresh assignment");
  };
  assert_eq!(assigned.status, Status::Assigned);
  assert_eq!(assigned.priority, Priority::High);
  assert_eq!(assigned.assigned_to, Some(staff.actor_id));

  drain(lifecycle, worker).await;

  // The report-level EMAIL preference overrides the assignee's SMS default.
  let to_staff = emails.sent_to("musa@example.com");
  assert_eq!(to_staff.len(), 1);
  assert!(to_staff[0].1.contains(&tracking));
}

#[tokio::test]
async fn assign_twice_is_an_informational_no_op() {
  let Env { lifecycle, store, resident, staff, admin, .. } = env().await;

  let report = lifecycle.create(&resident, new_report()).await.unwrap();
  let reference = ReportRef::from(report.report_id);

  lifecycle
    .assign(&reference, "musa@example.com", None, &admin)
    .await
    .unwrap();

  // A second staff account the re-assignment will try to name.
  store
    .add_actor(NewActor {
      name:       "Ngozi Eze".into(),
      email:      Some("ngozi@example.com".into()),
      phone:      None,
      capability: Capability::Staff,
      notification_preference: None,
    })
    .await
    .unwrap();

  let outcome = lifecycle
    .assign(&reference, "ngozi@example.com", Some(Priority::High), &admin)
    .await
    .unwrap();
  let AssignOutcome::AlreadyAssigned { assignee } = outcome else {
    panic!("expected the informational outcome");
  };
  assert_eq!(assignee.as_deref(), Some("musa@example.com"));

  // Nothing changed — not the assignee, not the priority.
  let unchanged = lifecycle.get_by_id(report.report_id).await.unwrap();
  assert_eq!(unchanged.assigned_to, Some(staff.actor_id));
  assert_eq!(unchanged.priority, Priority::Low);
}

#[tokio::test]
async fn assign_validates_the_email_and_capability() {
  let Env { lifecycle, resident, admin, .. } = env().await;

  let report = lifecycle.create(&resident, new_report()).await.unwrap();
  let reference = ReportRef::from(report.report_id);

  let err = lifecycle
    .assign(&reference, "  ", None, &admin)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Validation(_)));

  // A real account without staff capability is indistinguishable from an
  // absent one.
  let err = lifecycle
    .assign(&reference, "ada@example.com", None, &admin)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::StaffNotFound(_)));

  let err = lifecycle
    .assign(&reference, "nobody@example.com", None, &admin)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::StaffNotFound(_)));
}

#[tokio::test]
async fn assign_missing_report_is_not_found() {
  let Env { lifecycle, admin, .. } = env().await;

  let err = lifecycle
    .assign(
      &ReportRef::from(Uuid::new_v4()),
      "musa@example.com",
      None,
      &admin,
    )
    .await
    .unwrap_err();
  assert!(matches!(err, Error::ReportNotFound(_)));
}

// ─── Update status ───────────────────────────────────────────────────────────

#[tokio::test]
async fn update_status_rejects_everyone_but_assignee_and_admin() {
  let Env { lifecycle, store, resident, staff, admin, .. } = env().await;

  let report = lifecycle.create(&resident, new_report()).await.unwrap();
  let reference = ReportRef::from(report.report_id);

  lifecycle
    .assign(&reference, "musa@example.com", None, &admin)
    .await
    .unwrap();

  // Another staff member who does not hold this task.
  let other_staff = store
    .add_actor(NewActor {
      name:       "Ngozi Eze".into(),
      email:      Some("ngozi@example.com".into()),
      phone:      None,
      capability: Capability::Staff,
      notification_preference: None,
    })
    .await
    .unwrap();

  for actor in [&resident, &other_staff] {
    let err = lifecycle
      .update_status(&reference, Status::InProgress, actor)
      .await
      .unwrap_err();
    assert!(matches!(err, Error::Authorization(_)));
  }

  let unchanged = lifecycle.get_by_id(report.report_id).await.unwrap();
  assert_eq!(unchanged.status, Status::Assigned);

  // Both the assignee and an admin pass.
  let updated = lifecycle
    .update_status(&reference, Status::InProgress, &staff)
    .await
    .unwrap();
  assert_eq!(updated.status, Status::InProgress);

  let updated = lifecycle
    .update_status(&reference, Status::Cancelled, &admin)
    .await
    .unwrap();
  assert_eq!(updated.status, Status::Cancelled);
}

#[tokio::test]
async fn update_status_on_an_unassigned_report_is_admin_only() {
  let Env { lifecycle, resident, staff, admin, .. } = env().await;

  let report = lifecycle.create(&resident, new_report()).await.unwrap();
  let reference = ReportRef::from(report.report_id);

  let err = lifecycle
    .update_status(&reference, Status::Cancelled, &staff)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Authorization(_)));

  let cancelled = lifecycle
    .update_status(&reference, Status::Cancelled, &admin)
    .await
    .unwrap();
  assert_eq!(cancelled.status, Status::Cancelled);
}

#[tokio::test]
async fn completion_notifies_the_creator_exactly_once() {
  let Env { lifecycle, worker, emails, sms, resident, staff, admin, .. } =
    env().await;

  let report = lifecycle.create(&resident, new_report()).await.unwrap();
  let tracking = report.tracking_id.to_string();
  let reference = ReportRef::from(report.report_id);

  lifecycle
    .assign(&reference, "musa@example.com", None, &admin)
    .await
    .unwrap();
  lifecycle
    .update_status(&reference, Status::Completed, &staff)
    .await
    .unwrap();

  drain(lifecycle, worker).await;

  let completion: Vec<_> = emails
    .sent_to("ada@example.com")
    .into_iter()
    .filter(|(_, subject, _)| subject.contains("completed"))
    .collect();
  assert_eq!(completion.len(), 1);
  assert!(completion[0].1.contains(&tracking));
  assert!(completion[0].2.contains(&tracking));

  // Report-level preference is EMAIL, so no SMS anywhere.
  assert!(sms.sent().is_empty());
}

#[tokio::test]
async fn non_completion_transitions_notify_nobody_new() {
  let Env { lifecycle, worker, emails, resident, staff, admin, .. } =
    env().await;

  let report = lifecycle.create(&resident, new_report()).await.unwrap();
  let reference = ReportRef::from(report.report_id);

  lifecycle
    .assign(&reference, "musa@example.com", None, &admin)
    .await
    .unwrap();
  lifecycle
    .update_status(&reference, Status::InProgress, &staff)
    .await
    .unwrap();

  drain(lifecycle, worker).await;

  // Only the created + assigned notices exist.
  assert_eq!(emails.sent().len(), 2);
}

// ─── Mark complete ───────────────────────────────────────────────────────────

#[tokio::test]
async fn mark_complete_accepts_only_the_literal_assignee() {
  let Env { lifecycle, worker, emails, resident, staff, admin, .. } =
    env().await;

  let report = lifecycle.create(&resident, new_report()).await.unwrap();
  let reference = ReportRef::from(report.report_id);

  // Unassigned: nobody qualifies, not even an admin.
  let err = lifecycle.mark_complete(&reference, &admin).await.unwrap_err();
  assert!(matches!(err, Error::Authorization(_)));

  lifecycle
    .assign(&reference, "musa@example.com", None, &admin)
    .await
    .unwrap();

  // Admin override is deliberately not accepted on this path.
  let err = lifecycle.mark_complete(&reference, &admin).await.unwrap_err();
  assert!(matches!(err, Error::Authorization(_)));

  let done = lifecycle.mark_complete(&reference, &staff).await.unwrap();
  assert_eq!(done.status, Status::Completed);

  drain(lifecycle, worker).await;

  // Unlike update_status, this path sends no completion notice.
  assert!(
    emails
      .sent()
      .iter()
      .all(|(_, subject, _)| !subject.contains("completed"))
  );
}

#[tokio::test]
async fn mark_complete_still_invalidates_the_cache() {
  let Env { lifecycle, resident, staff, admin, .. } = env().await;

  let report = lifecycle.create(&resident, new_report()).await.unwrap();
  let reference = ReportRef::from(report.report_id);
  lifecycle
    .assign(&reference, "musa@example.com", None, &admin)
    .await
    .unwrap();

  // Prime the single-report cache, then complete.
  assert_eq!(
    lifecycle.get_by_id(report.report_id).await.unwrap().status,
    Status::Assigned
  );
  lifecycle.mark_complete(&reference, &staff).await.unwrap();

  assert_eq!(
    lifecycle.get_by_id(report.report_id).await.unwrap().status,
    Status::Completed
  );
}

// ─── Delete ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn delete_requires_admin_and_an_existing_report() {
  let Env { lifecycle, resident, staff, admin, .. } = env().await;

  let report = lifecycle.create(&resident, new_report()).await.unwrap();
  let reference = ReportRef::from(report.report_id);

  for actor in [&resident, &staff] {
    let err = lifecycle.delete(&reference, actor).await.unwrap_err();
    assert!(matches!(err, Error::Authorization(_)));
  }

  lifecycle.delete(&reference, &admin).await.unwrap();

  let err = lifecycle.get_by_id(report.report_id).await.unwrap_err();
  assert!(matches!(err, Error::ReportNotFound(_)));
}

#[tokio::test]
async fn failed_delete_leaves_the_cache_alone() {
  let Env { lifecycle, store, resident, admin, .. } = env().await;

  let report = lifecycle.create(&resident, new_report()).await.unwrap();

  // Prime the cache, then mutate the store behind the lifecycle's back so
  // a stale entry is detectable.
  assert_eq!(
    lifecycle.get_by_id(report.report_id).await.unwrap().status,
    Status::Pending
  );
  store
    .update(
      report.report_id,
      curb_core::report::ReportPatch {
        status: Some(Status::InProgress),
        ..Default::default()
      },
    )
    .await
    .unwrap();

  let err = lifecycle
    .delete(&ReportRef::from(Uuid::new_v4()), &admin)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::ReportNotFound(_)));

  // Still the stale snapshot: the failed delete touched no cache keys.
  assert_eq!(
    lifecycle.get_by_id(report.report_id).await.unwrap().status,
    Status::Pending
  );
}

// ─── Cache consistency ───────────────────────────────────────────────────────

#[tokio::test]
async fn mutations_are_visible_through_primed_caches() {
  let Env { lifecycle, resident, admin, .. } = env().await;

  let report = lifecycle.create(&resident, new_report()).await.unwrap();

  // Prime both single-report keys.
  assert_eq!(
    lifecycle.get_by_id(report.report_id).await.unwrap().status,
    Status::Pending
  );
  assert_eq!(
    lifecycle
      .get_by_tracking_id(&report.tracking_id)
      .await
      .unwrap()
      .status,
    Status::Pending
  );

  lifecycle
    .assign(
      &ReportRef::from(report.report_id),
      "musa@example.com",
      None,
      &admin,
    )
    .await
    .unwrap();

  // No stale read within the TTL window after the write.
  assert_eq!(
    lifecycle.get_by_id(report.report_id).await.unwrap().status,
    Status::Assigned
  );
  assert_eq!(
    lifecycle
      .get_by_tracking_id(&report.tracking_id)
      .await
      .unwrap()
      .status,
    Status::Assigned
  );
}

#[tokio::test]
async fn paginated_listing_is_invalidated_conservatively() {
  let Env { lifecycle, resident, admin, .. } = env().await;

  let first = lifecycle.create(&resident, new_report()).await.unwrap();

  let page = lifecycle
    .list_all(ReportFilter::default(), 1, 10, &admin)
    .await
    .unwrap();
  assert_eq!(page.total_reports, 1);

  // Creation only touches the owner's list key, so the cached page stays
  // stale until the TTL — the documented trade-off.
  lifecycle.create(&resident, new_report()).await.unwrap();
  let cached = lifecycle
    .list_all(ReportFilter::default(), 1, 10, &admin)
    .await
    .unwrap();
  assert_eq!(cached.total_reports, 1);

  // Any report mutation drops the whole paginated group.
  lifecycle
    .assign(
      &ReportRef::from(first.report_id),
      "musa@example.com",
      None,
      &admin,
    )
    .await
    .unwrap();
  let fresh = lifecycle
    .list_all(ReportFilter::default(), 1, 10, &admin)
    .await
    .unwrap();
  assert_eq!(fresh.total_reports, 2);
}

#[tokio::test]
async fn list_all_is_admin_only_and_paginates() {
  let Env { lifecycle, resident, staff, admin, .. } = env().await;

  for actor in [&resident, &staff] {
    let err = lifecycle
      .list_all(ReportFilter::default(), 1, 10, actor)
      .await
      .unwrap_err();
    assert!(matches!(err, Error::Authorization(_)));
  }

  for _ in 0..3 {
    lifecycle.create(&resident, new_report()).await.unwrap();
  }

  let page = lifecycle
    .list_all(ReportFilter::default(), 2, 2, &admin)
    .await
    .unwrap();
  assert_eq!(page.total_reports, 3);
  assert_eq!(page.reports.len(), 1);
  assert_eq!(page.total_pages, 2);
  assert!(page.has_prev_page);
  assert!(!page.has_next_page);

  // Page and limit are normalised to at least one.
  let normalised = lifecycle
    .list_all(ReportFilter::default(), 0, 0, &admin)
    .await
    .unwrap();
  assert_eq!(normalised.current_page, 1);
  assert_eq!(normalised.reports.len(), 1);
}

// ─── Uncached reads ──────────────────────────────────────────────────────────

#[tokio::test]
async fn list_assigned_scopes_to_the_calling_staff() {
  let Env { lifecycle, resident, staff, admin, .. } = env().await;

  let report = lifecycle.create(&resident, new_report()).await.unwrap();
  lifecycle.create(&resident, new_report()).await.unwrap();

  assert!(lifecycle.list_assigned(&staff).await.unwrap().is_empty());

  lifecycle
    .assign(
      &ReportRef::from(report.report_id),
      "musa@example.com",
      None,
      &admin,
    )
    .await
    .unwrap();

  let mine = lifecycle.list_assigned(&staff).await.unwrap();
  assert_eq!(mine.len(), 1);
  assert_eq!(mine[0].report_id, report.report_id);
}

#[tokio::test]
async fn stats_counts_by_status_and_month() {
  let Env { lifecycle, resident, staff, admin, .. } = env().await;

  let err = lifecycle.stats(&staff).await.unwrap_err();
  assert!(matches!(err, Error::Authorization(_)));

  for _ in 0..3 {
    lifecycle.create(&resident, new_report()).await.unwrap();
  }
  let reports = lifecycle.list_for_user(&resident).await.unwrap();
  lifecycle
    .update_status(
      &ReportRef::from(reports[0].report_id),
      Status::Completed,
      &admin,
    )
    .await
    .unwrap();

  let stats = lifecycle.stats(&admin).await.unwrap();
  assert_eq!(stats.total_active, 2);
  assert_eq!(stats.pending, 2);
  assert_eq!(stats.in_progress, 0);
  assert_eq!(stats.this_month_reports, 3);
  assert_eq!(stats.last_month_reports, 0);
  assert_eq!(stats.percent_change, 100.0);
}

// ─── Cache failure tolerance ─────────────────────────────────────────────────

mod cache_outage {
  use std::time::Duration;

  use curb_core::cache::{CacheKey, ReportCache};
  use thiserror::Error;

  use super::*;

  #[derive(Debug, Error)]
  #[error("cache offline")]
  struct CacheDown;

  /// Every operation fails, as if the cache node is unreachable.
  struct FailingCache;

  impl ReportCache for FailingCache {
    type Error = CacheDown;

    async fn get(&self, _: &CacheKey) -> Result<Option<String>, CacheDown> {
      Err(CacheDown)
    }

    async fn set(
      &self,
      _: &CacheKey,
      _: String,
      _: Duration,
    ) -> Result<(), CacheDown> {
      Err(CacheDown)
    }

    async fn delete(&self, _: &CacheKey) -> Result<(), CacheDown> {
      Err(CacheDown)
    }

    async fn delete_prefix(&self, _: &str) -> Result<(), CacheDown> {
      Err(CacheDown)
    }
  }

  #[tokio::test]
  async fn reads_and_writes_survive_a_dead_cache() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let (queue, _worker) =
      spawn_dispatcher(FakeEmail::default(), FakeSms::default());
    let lifecycle =
      ReportLifecycle::new(store.clone(), store.clone(), FailingCache, queue);

    let resident = store
      .add_actor(NewActor {
        name:       "Ada Obi".into(),
        email:      Some("ada@example.com".into()),
        phone:      None,
        capability: Capability::Resident,
        notification_preference: None,
      })
      .await
      .unwrap();
    let staff = store
      .add_actor(NewActor {
        name:       "Musa Bello".into(),
        email:      Some("musa@example.com".into()),
        phone:      None,
        capability: Capability::Staff,
        notification_preference: None,
      })
      .await
      .unwrap();
    let admin = store
      .add_actor(NewActor {
        name:       "Tunde Ajayi".into(),
        email:      Some("tunde@example.com".into()),
        phone:      None,
        capability: Capability::Admin,
        notification_preference: None,
      })
      .await
      .unwrap();

    let report = lifecycle.create(&resident, new_report()).await.unwrap();

    // Reads fall back to the store directly.
    assert_eq!(
      lifecycle.get_by_id(report.report_id).await.unwrap().status,
      Status::Pending
    );
    assert_eq!(lifecycle.list_for_user(&resident).await.unwrap().len(), 1);

    // Writes skip invalidation but still land.
    lifecycle
      .assign(
        &ReportRef::from(report.report_id),
        "musa@example.com",
        None,
        &admin,
      )
      .await
      .unwrap();
    assert_eq!(
      lifecycle.get_by_id(report.report_id).await.unwrap().assigned_to,
      Some(staff.actor_id)
    );
  }
}

// ─── Dispatcher unit behaviour ───────────────────────────────────────────────

mod dispatch_policy {
  use super::*;

  fn job(
    email: Option<&str>,
    phone: Option<&str>,
    recipient_pref: Option<NotificationPreference>,
    explicit: Option<NotificationPreference>,
  ) -> NotificationJob {
    NotificationJob {
      recipient:  Recipient {
        email:      email.map(str::to_owned),
        phone:      phone.map(str::to_owned),
        preference: recipient_pref,
      },
      template:   MessageTemplate::report_created(&TrackingId::generate()),
      preference: explicit,
    }
  }

  #[tokio::test]
  async fn both_attempts_each_channel_independently() {
    let emails = FakeEmail::failing();
    let sms = FakeSms::default();
    let dispatcher = Dispatcher::new(emails.clone(), sms.clone());

    dispatcher
      .dispatch(&job(
        Some("ada@example.com"),
        Some("+2348012345678"),
        None,
        Some(NotificationPreference::Both),
      ))
      .await;

    // The email failure never reaches the SMS attempt.
    assert!(emails.sent().is_empty());
    assert_eq!(sms.sent().len(), 1);
  }

  #[tokio::test]
  async fn missing_contact_points_are_skipped_silently() {
    let emails = FakeEmail::default();
    let sms = FakeSms::default();
    let dispatcher = Dispatcher::new(emails.clone(), sms.clone());

    dispatcher
      .dispatch(&job(None, None, None, Some(NotificationPreference::Both)))
      .await;

    assert!(emails.sent().is_empty());
    assert!(sms.sent().is_empty());
  }

  #[tokio::test]
  async fn recipient_preference_applies_when_no_override_is_given() {
    let emails = FakeEmail::default();
    let sms = FakeSms::default();
    let dispatcher = Dispatcher::new(emails.clone(), sms.clone());

    dispatcher
      .dispatch(&job(
        Some("ada@example.com"),
        Some("+2348012345678"),
        Some(NotificationPreference::Sms),
        None,
      ))
      .await;

    assert!(emails.sent().is_empty());
    assert_eq!(sms.sent().len(), 1);
  }

  #[tokio::test]
  async fn enqueue_after_worker_shutdown_does_not_panic() {
    let (queue, worker) =
      spawn_dispatcher(FakeEmail::default(), FakeSms::default());
    worker.abort();
    let _ = worker.await;

    queue.enqueue(job(
      Some("ada@example.com"),
      None,
      None,
      None,
    ));
  }
}
