//! Inbound payloads handed to the store by external collaborators.
//!
//! Each struct mirrors one message shape: run detection reports a
//! [`DetectedRun`], a reduction worker reports a [`CompletedRun`], and users
//! ask for a [`RerunRequest`]. [`Event`] tags them for transports that carry
//! several shapes on one channel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{job::State, run::NewRun};

fn empty_object() -> serde_json::Value {
  serde_json::Value::Object(Default::default())
}

/// A newly detected run and the reduction it should trigger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectedRun {
  pub instrument_name:   String,
  pub filename:          String,
  pub title:             String,
  pub users:             String,
  pub run_start:         DateTime<Utc>,
  pub run_end:           DateTime<Utc>,
  pub good_frames:       i64,
  pub raw_frames:        i64,
  pub experiment_number: i64,
  #[serde(default = "empty_object")]
  pub reduction_inputs:  serde_json::Value,
  pub runner_image:      String,
}

impl DetectedRun {
  /// The run-descriptive part of the payload.
  pub fn new_run(&self) -> NewRun {
    NewRun {
      filename:    self.filename.clone(),
      title:       self.title.clone(),
      users:       self.users.clone(),
      run_start:   self.run_start,
      run_end:     self.run_end,
      good_frames: self.good_frames,
      raw_frames:  self.raw_frames,
    }
  }
}

/// The outcome of a reduction as reported by the worker that ran it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedRun {
  pub job_id:         i64,
  pub state:          State,
  pub status_message: Option<String>,
  #[serde(default)]
  pub output_files:   Vec<String>,
  pub start:          Option<DateTime<Utc>>,
  pub end:            Option<DateTime<Utc>>,
  pub stacktrace:     Option<String>,
}

/// A request to reduce an earlier job's run again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerunRequest {
  pub original_job_id: i64,
  /// Full source text of the replacement script.
  pub script:          String,
  pub owner_id:        i64,
  pub runner_image:    String,
}

/// Script text to attach to an existing job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptAttachment {
  pub job_id: i64,
  pub script: String,
  pub sha:    Option<String>,
}

/// Any inbound payload, tagged by `"event"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
  DetectedRun(DetectedRun),
  CompletedRun(CompletedRun),
  RerunRequest(RerunRequest),
  ScriptAttachment(ScriptAttachment),
}
