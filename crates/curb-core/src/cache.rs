//! The cache seam — read-through in front of the report store.
//!
//! Entries are JSON snapshots keyed by [`CacheKey`] and expire after a
//! fixed TTL even when an invalidation is missed, which bounds staleness.
//! The cache is an optimization, never a correctness dependency: every
//! caller must be prepared for any of these operations to fail and fall
//! back to the store.

use std::{fmt, future::Future, sync::Arc, time::Duration};

use uuid::Uuid;

use crate::{report::Category, tracking::TrackingId};

/// How long cached entries live absent invalidation.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Prefix shared by all paginated-listing keys. Writes invalidate the whole
/// group through [`ReportCache::delete_prefix`] rather than recomputing
/// which pages a report lands on.
pub const PAGE_KEY_PREFIX: &str = "reports:page";

// ─── Keys ────────────────────────────────────────────────────────────────────

/// The full key space of the report cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheKey {
  /// A single report by internal id.
  Report(Uuid),
  /// A single report by public tracking id.
  ReportByTracking(TrackingId),
  /// A creator's own report list.
  UserReports(Uuid),
  /// One page of the filtered global listing.
  ReportPage {
    page:     u32,
    limit:    u32,
    category: Option<Category>,
  },
}

impl fmt::Display for CacheKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Report(id) => write!(f, "report:{id}"),
      Self::ReportByTracking(tracking_id) => {
        write!(f, "report:tracking:{tracking_id}")
      }
      Self::UserReports(id) => write!(f, "reports:user:{id}"),
      Self::ReportPage { page, limit, category } => {
        let category = category.map(Category::as_str).unwrap_or("all");
        write!(f, "{PAGE_KEY_PREFIX}={page}:limit={limit}:category={category}")
      }
    }
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Capability contract for the report cache.
///
/// Values are opaque serialized snapshots; the cache neither inspects nor
/// validates them. Implementations must treat `set` with a new value as a
/// replacement and must make `delete`/`delete_prefix` idempotent.
pub trait ReportCache: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn get<'a>(
    &'a self,
    key: &'a CacheKey,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + 'a;

  fn set<'a>(
    &'a self,
    key: &'a CacheKey,
    value: String,
    ttl: Duration,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn delete<'a>(
    &'a self,
    key: &'a CacheKey,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Drop every entry whose key starts with `prefix`. The conservative
  /// invalidation path for list keys.
  fn delete_prefix<'a>(
    &'a self,
    prefix: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}

/// A shared cache handle is still a cache.
impl<C: ReportCache> ReportCache for Arc<C> {
  type Error = C::Error;

  async fn get(&self, key: &CacheKey) -> Result<Option<String>, Self::Error> {
    (**self).get(key).await
  }

  async fn set(
    &self,
    key: &CacheKey,
    value: String,
    ttl: Duration,
  ) -> Result<(), Self::Error> {
    (**self).set(key, value, ttl).await
  }

  async fn delete(&self, key: &CacheKey) -> Result<(), Self::Error> {
    (**self).delete(key).await
  }

  async fn delete_prefix(&self, prefix: &str) -> Result<(), Self::Error> {
    (**self).delete_prefix(prefix).await
  }
}
