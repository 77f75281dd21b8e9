//! Run — one captured dataset, identified by its filename.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::SameRecord;

/// A persisted run. Only the first sighting's descriptive fields are kept;
/// later sightings of the same `filename` resolve to this row unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
  pub id:            i64,
  pub filename:      String,
  pub instrument_id: i64,
  pub owner_id:      i64,
  pub title:         String,
  pub users:         String,
  pub run_start:     DateTime<Utc>,
  pub run_end:       DateTime<Utc>,
  pub good_frames:   i64,
  pub raw_frames:    i64,
}

impl SameRecord for Run {
  fn same_record(&self, other: &Self) -> bool {
    self.filename == other.filename
      && self.instrument_id == other.instrument_id
      && self.owner_id == other.owner_id
      && self.title == other.title
      && self.users == other.users
      && self.run_start == other.run_start
      && self.run_end == other.run_end
      && self.good_frames == other.good_frames
      && self.raw_frames == other.raw_frames
  }
}

/// Descriptive data for a run as reported by run detection. Used only when
/// the filename has never been seen before.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRun {
  pub filename:    String,
  pub title:       String,
  pub users:       String,
  pub run_start:   DateTime<Utc>,
  pub run_end:     DateTime<Utc>,
  pub good_frames: i64,
  pub raw_frames:  i64,
}
