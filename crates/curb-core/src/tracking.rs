//! Tracking ids — short public identifiers for reports.
//!
//! Distinct from the internal `report_id`: tracking ids are what residents
//! quote over the phone, so they are short, uppercase, and avoid glyphs
//! that read ambiguously (0/O, 1/I/L). Collision probability is low but
//! non-zero; the creation path checks each candidate against the store and
//! regenerates until it finds a free one.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Fixed length of every tracking id.
pub const TRACKING_ID_LEN: usize = 8;

const CHARSET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

/// A well-formed tracking code, e.g. `K7KQWD3N`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackingId(String);

impl TrackingId {
  /// Generate a fresh candidate. Uniqueness is the caller's problem.
  pub fn generate() -> Self {
    Self::generate_with(&mut rand::thread_rng())
  }

  /// Deterministic variant for tests.
  pub fn generate_with(rng: &mut impl Rng) -> Self {
    let code = (0..TRACKING_ID_LEN)
      .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
      .collect();
    Self(code)
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  /// Whether `s` matches the generator's format.
  pub fn is_well_formed(s: &str) -> bool {
    s.len() == TRACKING_ID_LEN && s.bytes().all(|b| CHARSET.contains(&b))
  }
}

impl From<String> for TrackingId {
  fn from(raw: String) -> Self {
    Self(raw)
  }
}

impl fmt::Display for TrackingId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}
