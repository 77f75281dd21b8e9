//! Instrument — the beamline a run was captured on.

use serde::{Deserialize, Serialize};

use crate::record::SameRecord;

/// An instrument, keyed naturally by its unique `name`.
///
/// Created lazily the first time a run from the instrument is seen. Only
/// `latest_run` and `specification` change after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instrument {
  pub id:            i64,
  pub name:          String,
  /// Filename of the last run processed for this instrument.
  pub latest_run:    Option<String>,
  /// Opaque structured metadata describing how the instrument is reduced.
  pub specification: Option<serde_json::Value>,
}

impl SameRecord for Instrument {
  fn same_record(&self, other: &Self) -> bool {
    self.name == other.name
      && self.latest_run == other.latest_run
      && self.specification == other.specification
  }
}
