//! Read-through helpers and the invalidation policy.
//!
//! The cache is an optimization, never a correctness dependency: every call
//! in this module degrades to direct store access (reads) or to a skipped
//! invalidation (writes) with a logged warning. Bounded TTLs pick up
//! whatever a missed invalidation leaves behind.

use std::{future::Future, time::Duration};

use curb_core::{
  Result,
  cache::{CacheKey, PAGE_KEY_PREFIX, ReportCache},
  report::Report,
};
use serde::{Serialize, de::DeserializeOwned};
use tracing::warn;

/// Serve `key` from the cache when possible; otherwise run `load` against
/// the store and cache its result for `ttl`.
///
/// Load failures (including not-found) are returned verbatim and nothing is
/// cached for them.
pub(crate) async fn get_or_load<C, T, F, Fut>(
  cache: &C,
  key: &CacheKey,
  ttl: Duration,
  load: F,
) -> Result<T>
where
  C: ReportCache,
  T: Serialize + DeserializeOwned,
  F: FnOnce() -> Fut,
  Fut: Future<Output = Result<T>>,
{
  match cache.get(key).await {
    Ok(Some(json)) => match serde_json::from_str(&json) {
      Ok(value) => return Ok(value),
      // An undecodable entry (e.g. written by an older build) is treated
      // as a miss and overwritten below.
      Err(error) => warn!(%key, %error, "dropping undecodable cache entry"),
    },
    Ok(None) => {}
    Err(error) => {
      warn!(%key, %error, "cache read failed; falling back to store");
    }
  }

  let value = load().await?;

  match serde_json::to_string(&value) {
    Ok(json) => {
      if let Err(error) = cache.set(key, json, ttl).await {
        warn!(%key, %error, "cache write failed");
      }
    }
    Err(error) => warn!(%key, %error, "cache snapshot serialization failed"),
  }

  Ok(value)
}

/// Best-effort delete of one key.
pub(crate) async fn invalidate<C: ReportCache>(cache: &C, key: &CacheKey) {
  if let Err(error) = cache.delete(key).await {
    warn!(%key, %error, "cache invalidation failed");
  }
}

/// Drop every entry that could serve `report`: both single-report keys, the
/// owner's list, and — conservatively — the whole paginated group rather
/// than recomputing which pages the report lands on.
pub(crate) async fn invalidate_report<C: ReportCache>(
  cache: &C,
  report: &Report,
) {
  invalidate(cache, &CacheKey::Report(report.report_id)).await;
  invalidate(cache, &CacheKey::ReportByTracking(report.tracking_id.clone()))
    .await;
  invalidate(cache, &CacheKey::UserReports(report.created_by)).await;

  if let Err(error) = cache.delete_prefix(PAGE_KEY_PREFIX).await {
    warn!(%error, "cache invalidation failed for the paginated group");
  }
}
