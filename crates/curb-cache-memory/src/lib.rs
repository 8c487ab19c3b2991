//! In-process TTL cache for the Curb report core.
//!
//! A mutex-guarded map with lazy expiry. Time is read through the [`Clock`]
//! seam so tests can drive TTL behaviour deterministically; production code
//! uses [`MemoryCache::new`], which runs on the system clock.

use std::{
  collections::HashMap,
  convert::Infallible,
  sync::{Mutex, PoisonError},
  time::{Duration, Instant},
};

use curb_core::cache::{CacheKey, ReportCache};

// ─── Clock ───────────────────────────────────────────────────────────────────

/// Source of monotonic time for expiry decisions.
pub trait Clock: Send + Sync {
  fn now(&self) -> Instant;
}

/// The real clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> Instant {
    Instant::now()
  }
}

// ─── Cache ───────────────────────────────────────────────────────────────────

struct Entry {
  value:      String,
  expires_at: Instant,
}

/// An in-memory [`ReportCache`].
///
/// Entries past their deadline are dropped on access; there is no sweeper
/// task, so an idle cache may hold dead entries until the next touch.
pub struct MemoryCache<C = SystemClock> {
  clock:   C,
  entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryCache {
  pub fn new() -> Self {
    Self::with_clock(SystemClock)
  }
}

impl Default for MemoryCache {
  fn default() -> Self {
    Self::new()
  }
}

impl<C: Clock> MemoryCache<C> {
  /// Build a cache reading time from `clock`.
  pub fn with_clock(clock: C) -> Self {
    Self { clock, entries: Mutex::new(HashMap::new()) }
  }

  fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Entry>> {
    // A poisoned mutex only means another thread panicked mid-operation;
    // the map itself is still a valid cache.
    self.entries.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

impl<C: Clock> ReportCache for MemoryCache<C> {
  type Error = Infallible;

  async fn get(&self, key: &CacheKey) -> Result<Option<String>, Infallible> {
    let now = self.clock.now();
    let mut entries = self.lock();

    let key = key.to_string();
    match entries.get(&key) {
      Some(entry) if now < entry.expires_at => Ok(Some(entry.value.clone())),
      Some(_) => {
        entries.remove(&key);
        Ok(None)
      }
      None => Ok(None),
    }
  }

  async fn set(
    &self,
    key: &CacheKey,
    value: String,
    ttl: Duration,
  ) -> Result<(), Infallible> {
    let expires_at = self.clock.now() + ttl;
    self
      .lock()
      .insert(key.to_string(), Entry { value, expires_at });
    Ok(())
  }

  async fn delete(&self, key: &CacheKey) -> Result<(), Infallible> {
    self.lock().remove(&key.to_string());
    Ok(())
  }

  async fn delete_prefix(&self, prefix: &str) -> Result<(), Infallible> {
    self.lock().retain(|key, _| !key.starts_with(prefix));
    Ok(())
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
