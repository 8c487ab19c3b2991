//! [`SqliteStore`] — the SQLite implementation of the store traits.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use curb_core::{
  actor::{Actor, Capability},
  report::{
    NotificationPreference, Report, ReportDraft, ReportFilter, ReportPatch,
    Status,
  },
  store::{ActorStore, ReportStore},
  tracking::TrackingId,
};

use crate::{
  Result,
  encode::{
    REPORT_COLUMNS, RawActor, RawReport, encode_dt, encode_images,
    encode_uuid,
  },
  schema::SCHEMA,
};

const ACTOR_COLUMNS: &str =
  "actor_id, name, email, phone, capability, notification_preference";

// ─── NewActor ────────────────────────────────────────────────────────────────

/// Input to [`SqliteStore::add_actor`]. Accounts normally arrive through
/// the external identity system; this path exists for bootstrap and tests.
#[derive(Debug, Clone)]
pub struct NewActor {
  pub name:       String,
  pub email:      Option<String>,
  pub phone:      Option<String>,
  pub capability: Capability,
  pub notification_preference: Option<NotificationPreference>,
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Curb store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted, and all
/// statements run serially on its dedicated thread, which is what gives
/// each mutation its atomic single-row semantics.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Persist an actor; see [`NewActor`].
  pub async fn add_actor(&self, input: NewActor) -> Result<Actor> {
    let actor = Actor {
      actor_id:   Uuid::new_v4(),
      name:       input.name,
      email:      input.email,
      phone:      input.phone,
      capability: input.capability,
      notification_preference: input.notification_preference,
    };

    let id_str     = encode_uuid(actor.actor_id);
    let name       = actor.name.clone();
    let email      = actor.email.clone();
    let phone      = actor.phone.clone();
    let capability = actor.capability.as_str();
    let preference = actor
      .notification_preference
      .map(|p| p.as_str().to_owned());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO actors (
             actor_id, name, email, phone, capability,
             notification_preference
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![id_str, name, email, phone, capability, preference],
        )?;
        Ok(())
      })
      .await?;

    Ok(actor)
  }
}

// ─── ReportStore impl ────────────────────────────────────────────────────────

impl ReportStore for SqliteStore {
  type Error = crate::Error;

  async fn create(&self, draft: ReportDraft) -> Result<Report> {
    let now = Utc::now();
    let report = Report {
      report_id:   Uuid::new_v4(),
      tracking_id: draft.tracking_id,
      category:    draft.category,
      state:       draft.state,
      lga:         draft.lga,
      address:     draft.address,
      description: draft.description,
      images:      draft.images,
      contact_details: draft.contact_details,
      priority:    draft.priority,
      status:      draft.status,
      created_by:  draft.created_by,
      assigned_to: None,
      notification_preference: draft.notification_preference,
      created_at:  now,
      updated_at:  now,
    };

    let id_str       = encode_uuid(report.report_id);
    let tracking_str = report.tracking_id.as_str().to_owned();
    let category     = report.category.as_str();
    let state        = report.state.clone();
    let lga          = report.lga.clone();
    let address      = report.address.clone();
    let description  = report.description.clone();
    let images_str   = encode_images(&report.images)?;
    let contact_name  = report.contact_details.name.clone();
    let contact_phone = report.contact_details.phone.clone();
    let contact_email = report.contact_details.email.clone();
    let priority     = report.priority.as_str();
    let status       = report.status.as_str();
    let created_by   = encode_uuid(report.created_by);
    let preference   = report.notification_preference.as_str();
    let created_at   = encode_dt(report.created_at);
    let updated_at   = encode_dt(report.updated_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO reports (
             report_id, tracking_id, category, state, lga, address,
             description, images, contact_name, contact_phone,
             contact_email, priority, status, created_by, assigned_to,
             notification_preference, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
                     ?13, ?14, NULL, ?15, ?16, ?17)",
          rusqlite::params![
            id_str,
            tracking_str,
            category,
            state,
            lga,
            address,
            description,
            images_str,
            contact_name,
            contact_phone,
            contact_email,
            priority,
            status,
            created_by,
            preference,
            created_at,
            updated_at,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(report)
  }

  async fn tracking_id_exists(&self, tracking_id: &TrackingId) -> Result<bool> {
    let tracking_str = tracking_id.as_str().to_owned();

    let exists = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT 1 FROM reports WHERE tracking_id = ?1",
              rusqlite::params![tracking_str],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false),
        )
      })
      .await?;

    Ok(exists)
  }

  async fn find_by_id(&self, report_id: Uuid) -> Result<Option<Report>> {
    let id_str = encode_uuid(report_id);

    let raw: Option<RawReport> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {REPORT_COLUMNS} FROM reports WHERE report_id = ?1"
              ),
              rusqlite::params![id_str],
              RawReport::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawReport::into_report).transpose()
  }

  async fn find_by_tracking_id(
    &self,
    tracking_id: &TrackingId,
  ) -> Result<Option<Report>> {
    let tracking_str = tracking_id.as_str().to_owned();

    let raw: Option<RawReport> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {REPORT_COLUMNS} FROM reports WHERE tracking_id = ?1"
              ),
              rusqlite::params![tracking_str],
              RawReport::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawReport::into_report).transpose()
  }

  async fn list_by_creator(&self, creator: Uuid) -> Result<Vec<Report>> {
    let creator_str = encode_uuid(creator);

    let raws: Vec<RawReport> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {REPORT_COLUMNS} FROM reports
           WHERE created_by = ?1
           ORDER BY created_at DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![creator_str], RawReport::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawReport::into_report).collect()
  }

  async fn list_by_assignee(&self, assignee: Uuid) -> Result<Vec<Report>> {
    let assignee_str = encode_uuid(assignee);

    let raws: Vec<RawReport> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {REPORT_COLUMNS} FROM reports
           WHERE assigned_to = ?1
           ORDER BY created_at DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![assignee_str], RawReport::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawReport::into_report).collect()
  }

  async fn list_page(
    &self,
    filter: &ReportFilter,
    limit: u32,
    offset: u32,
  ) -> Result<(Vec<Report>, u64)> {
    let category = filter.category.map(|c| c.as_str().to_owned());
    let limit_val = i64::from(limit);
    let offset_val = i64::from(offset);

    let (raws, total): (Vec<RawReport>, u64) = self
      .conn
      .call(move |conn| {
        let where_clause = if category.is_some() {
          "WHERE category = ?1"
        } else {
          ""
        };

        let total: u64 = if let Some(cat) = category.as_deref() {
          conn.query_row(
            "SELECT COUNT(*) FROM reports WHERE category = ?1",
            rusqlite::params![cat],
            |row| row.get(0),
          )?
        } else {
          conn.query_row("SELECT COUNT(*) FROM reports", [], |row| row.get(0))?
        };

        let mut stmt = conn.prepare(&format!(
          "SELECT {REPORT_COLUMNS} FROM reports
           {where_clause}
           ORDER BY created_at DESC
           LIMIT ?2 OFFSET ?3"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![category.as_deref(), limit_val, offset_val],
            RawReport::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((rows, total))
      })
      .await?;

    let reports = raws
      .into_iter()
      .map(RawReport::into_report)
      .collect::<Result<Vec<_>>>()?;

    Ok((reports, total))
  }

  async fn update(
    &self,
    report_id: Uuid,
    patch: ReportPatch,
  ) -> Result<Option<Report>> {
    let id_str       = encode_uuid(report_id);
    let status       = patch.status.map(Status::as_str);
    let priority     = patch.priority.map(|p| p.as_str());
    let assigned_str = patch.assigned_to.map(encode_uuid);
    let updated_at   = encode_dt(Utc::now());

    // One closure, one connection thread: the UPDATE and the re-read are a
    // single atomic read-modify-write from every other caller's view.
    let raw: Option<RawReport> = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE reports SET
             status      = COALESCE(?2, status),
             priority    = COALESCE(?3, priority),
             assigned_to = COALESCE(?4, assigned_to),
             updated_at  = ?5
           WHERE report_id = ?1",
          rusqlite::params![id_str, status, priority, assigned_str, updated_at],
        )?;

        if changed == 0 {
          return Ok(None);
        }

        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {REPORT_COLUMNS} FROM reports WHERE report_id = ?1"
              ),
              rusqlite::params![id_str],
              RawReport::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawReport::into_report).transpose()
  }

  async fn delete(&self, report_id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(report_id);

    let removed = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "DELETE FROM reports WHERE report_id = ?1",
          rusqlite::params![id_str],
        )?;
        Ok(changed > 0)
      })
      .await?;

    Ok(removed)
  }

  async fn count_with_status(&self, statuses: &[Status]) -> Result<u64> {
    if statuses.is_empty() {
      return Ok(0);
    }

    let status_strs: Vec<&'static str> =
      statuses.iter().map(|s| s.as_str()).collect();
    let placeholders = (1..=status_strs.len())
      .map(|i| format!("?{i}"))
      .collect::<Vec<_>>()
      .join(", ");

    let count = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          &format!(
            "SELECT COUNT(*) FROM reports WHERE status IN ({placeholders})"
          ),
          rusqlite::params_from_iter(status_strs),
          |row| row.get(0),
        )?)
      })
      .await?;

    Ok(count)
  }

  async fn count_created_between(
    &self,
    from: DateTime<Utc>,
    to: Option<DateTime<Utc>>,
  ) -> Result<u64> {
    let from_str = encode_dt(from);
    let to_str = to.map(encode_dt);

    let count = self
      .conn
      .call(move |conn| {
        let count = if let Some(to) = to_str.as_deref() {
          conn.query_row(
            "SELECT COUNT(*) FROM reports
             WHERE created_at >= ?1 AND created_at < ?2",
            rusqlite::params![from_str, to],
            |row| row.get(0),
          )?
        } else {
          conn.query_row(
            "SELECT COUNT(*) FROM reports WHERE created_at >= ?1",
            rusqlite::params![from_str],
            |row| row.get(0),
          )?
        };
        Ok(count)
      })
      .await?;

    Ok(count)
  }
}

// ─── ActorStore impl ─────────────────────────────────────────────────────────

impl ActorStore for SqliteStore {
  type Error = crate::Error;

  async fn find_by_id(&self, actor_id: Uuid) -> Result<Option<Actor>> {
    let id_str = encode_uuid(actor_id);

    let raw: Option<RawActor> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {ACTOR_COLUMNS} FROM actors WHERE actor_id = ?1"
              ),
              rusqlite::params![id_str],
              RawActor::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawActor::into_actor).transpose()
  }

  async fn find_by_email_with_capability(
    &self,
    email: &str,
    capability: Capability,
  ) -> Result<Option<Actor>> {
    let email = email.to_owned();
    let capability_str = capability.as_str();

    let raw: Option<RawActor> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {ACTOR_COLUMNS} FROM actors
                 WHERE email = ?1 AND capability = ?2"
              ),
              rusqlite::params![email, capability_str],
              RawActor::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawActor::into_actor).transpose()
  }
}
