//! Job — one reduction attempt over one or more runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString, IntoStaticStr};

use crate::{record::SameRecord, script::Script};

// ─── Enums ───────────────────────────────────────────────────────────────────

/// Where a reduction is in its life.
///
/// `NotStarted` moves to one of the three terminal states through the
/// completion operation; nothing moves out of a terminal state.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
  IntoStaticStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum State {
  #[default]
  NotStarted,
  Successful,
  Unsuccessful,
  Error,
}

impl State {
  pub fn is_terminal(&self) -> bool { !matches!(self, Self::NotStarted) }
}

/// How a job came to exist.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
  IntoStaticStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum JobType {
  /// Created automatically when run detection reports a run.
  Autoreduction,
  /// Built entirely by the caller.
  Simple,
  /// Re-executes an earlier job's run with a new script or owner.
  Rerun,
}

// ─── Job ─────────────────────────────────────────────────────────────────────

/// A persisted reduction attempt with its script joined in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
  pub id:             i64,
  pub start:          Option<DateTime<Utc>>,
  pub end:            Option<DateTime<Utc>>,
  pub state:          State,
  pub status_message: Option<String>,
  /// Structured key-value reduction inputs.
  pub inputs:         serde_json::Value,
  /// Paths of the files the reduction produced.
  pub outputs:        Option<Vec<String>>,
  pub stacktrace:     Option<String>,
  /// Container image the reduction runs in.
  pub runner_image:   Option<String>,
  pub job_type:       JobType,
  pub owner_id:       i64,
  pub instrument_id:  i64,
  pub script:         Option<Script>,
  /// Associated run ids, in association order.
  pub run_ids:        Vec<i64>,
}

impl SameRecord for Job {
  fn same_record(&self, other: &Self) -> bool {
    self.start == other.start
      && self.end == other.end
      && self.state == other.state
      && self.status_message == other.status_message
      && self.inputs == other.inputs
      && self.outputs == other.outputs
      && self.stacktrace == other.stacktrace
      && self.runner_image == other.runner_image
      && self.job_type == other.job_type
      && self.owner_id == other.owner_id
      && self.instrument_id == other.instrument_id
      && self.script.same_record(&other.script)
  }
}

// ─── NewJob ──────────────────────────────────────────────────────────────────

/// Input to [`crate::store::ReductionStore::record_simple_job`]. Every
/// relation is already resolved by the caller and is stored as given.
#[derive(Debug, Clone)]
pub struct NewJob {
  pub start:          Option<DateTime<Utc>>,
  pub end:            Option<DateTime<Utc>>,
  pub state:          State,
  pub status_message: Option<String>,
  pub inputs:         serde_json::Value,
  pub outputs:        Option<Vec<String>>,
  pub stacktrace:     Option<String>,
  pub runner_image:   Option<String>,
  pub job_type:       JobType,
  pub owner_id:       i64,
  pub instrument_id:  i64,
  pub script_id:      Option<i64>,
  /// Must name at least one run.
  pub run_ids:        Vec<i64>,
}

impl NewJob {
  /// A not-yet-started job with empty inputs and no script.
  pub fn new(
    job_type: JobType,
    owner_id: i64,
    instrument_id: i64,
    run_ids: Vec<i64>,
  ) -> Self {
    Self {
      start: None,
      end: None,
      state: State::NotStarted,
      status_message: None,
      inputs: serde_json::Value::Object(Default::default()),
      outputs: None,
      stacktrace: None,
      runner_image: None,
      job_type,
      owner_id,
      instrument_id,
      script_id: None,
      run_ids,
    }
  }
}
