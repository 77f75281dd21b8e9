//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Structured fields (job
//! inputs, outputs, instrument specifications) are stored as compact JSON.
//! Enums are stored as their `SCREAMING_SNAKE_CASE` names.

use chrono::{DateTime, Utc};
use fia_core::{
  instrument::Instrument,
  job::{Job, JobType, NewJob, State},
  owner::Owner,
  run::Run,
  script::Script,
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

// ─── Enums ───────────────────────────────────────────────────────────────────

pub fn decode_state(s: &str) -> Result<State> {
  s.parse()
    .map_err(|_| fia_core::Error::UnknownState(s.to_owned()).into())
}

pub fn decode_job_type(s: &str) -> Result<JobType> {
  s.parse()
    .map_err(|_| fia_core::Error::UnknownJobType(s.to_owned()).into())
}

// ─── Outputs ─────────────────────────────────────────────────────────────────

pub fn encode_outputs(outputs: &[String]) -> Result<String> {
  Ok(serde_json::to_string(outputs)?)
}

fn decode_outputs(s: Option<String>) -> Result<Option<Vec<String>>> {
  Ok(s.as_deref().map(serde_json::from_str).transpose()?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from an `instruments` row.
pub struct RawInstrument {
  pub id:            i64,
  pub name:          String,
  pub latest_run:    Option<String>,
  pub specification: Option<String>,
}

impl RawInstrument {
  pub const COLUMNS: &'static str = "id, name, latest_run, specification";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:            row.get(0)?,
      name:          row.get(1)?,
      latest_run:    row.get(2)?,
      specification: row.get(3)?,
    })
  }

  pub fn into_instrument(self) -> Result<Instrument> {
    let specification = self
      .specification
      .as_deref()
      .map(serde_json::from_str)
      .transpose()?;

    Ok(Instrument {
      id: self.id,
      name: self.name,
      latest_run: self.latest_run,
      specification,
    })
  }
}

pub const OWNER_COLUMNS: &str = "id, experiment_number, user_number";

pub fn owner_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Owner> {
  Ok(Owner {
    id:                row.get(0)?,
    experiment_number: row.get(1)?,
    user_number:       row.get(2)?,
  })
}

pub const SCRIPT_COLUMNS: &str = "id, script, sha, script_hash";

pub fn script_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Script> {
  Ok(Script {
    id:          row.get(0)?,
    source_text: row.get(1)?,
    sha:         row.get(2)?,
    script_hash: row.get(3)?,
  })
}

/// Raw values read directly from a `runs` row.
pub struct RawRun {
  pub id:            i64,
  pub filename:      String,
  pub instrument_id: i64,
  pub owner_id:      i64,
  pub title:         String,
  pub users:         String,
  pub run_start:     String,
  pub run_end:       String,
  pub good_frames:   i64,
  pub raw_frames:    i64,
}

impl RawRun {
  pub const COLUMNS: &'static str = "r.id, r.filename, r.instrument_id, \
                                     r.owner_id, r.title, r.users, \
                                     r.run_start, r.run_end, r.good_frames, \
                                     r.raw_frames";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:            row.get(0)?,
      filename:      row.get(1)?,
      instrument_id: row.get(2)?,
      owner_id:      row.get(3)?,
      title:         row.get(4)?,
      users:         row.get(5)?,
      run_start:     row.get(6)?,
      run_end:       row.get(7)?,
      good_frames:   row.get(8)?,
      raw_frames:    row.get(9)?,
    })
  }

  pub fn into_run(self) -> Result<Run> {
    Ok(Run {
      id:            self.id,
      filename:      self.filename,
      instrument_id: self.instrument_id,
      owner_id:      self.owner_id,
      title:         self.title,
      users:         self.users,
      run_start:     decode_dt(&self.run_start)?,
      run_end:       decode_dt(&self.run_end)?,
      good_frames:   self.good_frames,
      raw_frames:    self.raw_frames,
    })
  }
}

/// Raw values read from a `jobs` row left-joined with its script, plus the
/// associated run ids.
pub struct RawJob {
  pub id:             i64,
  pub start_time:     Option<String>,
  pub end_time:       Option<String>,
  pub state:          String,
  pub status_message: Option<String>,
  pub inputs:         String,
  pub outputs:        Option<String>,
  pub stacktrace:     Option<String>,
  pub runner_image:   Option<String>,
  pub job_type:       String,
  pub owner_id:       i64,
  pub instrument_id:  i64,
  pub script:         Option<Script>,
  pub run_ids:        Vec<i64>,
}

impl RawJob {
  /// Select list for `jobs j LEFT JOIN scripts s ON s.id = j.script_id`.
  pub const COLUMNS: &'static str = "j.id, j.start_time, j.end_time, j.state, \
                                     j.status_message, j.inputs, j.outputs, \
                                     j.stacktrace, j.runner_image, j.job_type, \
                                     j.owner_id, j.instrument_id, s.id, \
                                     s.script, s.sha, s.script_hash";

  /// Build from a row; `run_ids` is filled in by a second query.
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    let script_id: Option<i64> = row.get(12)?;
    let script = match script_id {
      Some(id) => Some(Script {
        id,
        source_text: row.get(13)?,
        sha: row.get(14)?,
        script_hash: row.get(15)?,
      }),
      None => None,
    };

    Ok(Self {
      id: row.get(0)?,
      start_time: row.get(1)?,
      end_time: row.get(2)?,
      state: row.get(3)?,
      status_message: row.get(4)?,
      inputs: row.get(5)?,
      outputs: row.get(6)?,
      stacktrace: row.get(7)?,
      runner_image: row.get(8)?,
      job_type: row.get(9)?,
      owner_id: row.get(10)?,
      instrument_id: row.get(11)?,
      script,
      run_ids: Vec::new(),
    })
  }

  pub fn into_job(self) -> Result<Job> {
    Ok(Job {
      id:             self.id,
      start:          decode_opt_dt(self.start_time)?,
      end:            decode_opt_dt(self.end_time)?,
      state:          decode_state(&self.state)?,
      status_message: self.status_message,
      inputs:         serde_json::from_str(&self.inputs)?,
      outputs:        decode_outputs(self.outputs)?,
      stacktrace:     self.stacktrace,
      runner_image:   self.runner_image,
      job_type:       decode_job_type(&self.job_type)?,
      owner_id:       self.owner_id,
      instrument_id:  self.instrument_id,
      script:         self.script,
      run_ids:        self.run_ids,
    })
  }
}

/// A job encoded for insertion. Relation ids are plain integers so a unit of
/// work can fill them in after resolving identities.
#[derive(Clone)]
pub struct JobRow {
  pub start_time:     Option<String>,
  pub end_time:       Option<String>,
  pub state:          &'static str,
  pub status_message: Option<String>,
  pub inputs:         String,
  pub outputs:        Option<String>,
  pub stacktrace:     Option<String>,
  pub runner_image:   Option<String>,
  pub job_type:       &'static str,
  pub owner_id:       i64,
  pub instrument_id:  i64,
  pub script_id:      Option<i64>,
  pub run_ids:        Vec<i64>,
}

impl JobRow {
  pub fn encode(job: NewJob) -> Result<Self> {
    Ok(Self {
      start_time:     job.start.map(encode_dt),
      end_time:       job.end.map(encode_dt),
      state:          job.state.into(),
      status_message: job.status_message,
      inputs:         serde_json::to_string(&job.inputs)?,
      outputs:        job.outputs.as_deref().map(encode_outputs).transpose()?,
      stacktrace:     job.stacktrace,
      runner_image:   job.runner_image,
      job_type:       job.job_type.into(),
      owner_id:       job.owner_id,
      instrument_id:  job.instrument_id,
      script_id:      job.script_id,
      run_ids:        job.run_ids,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn unknown_state_is_reported() {
    let err = decode_state("RUNNING").unwrap_err();
    assert!(matches!(
      err,
      Error::Core(fia_core::Error::UnknownState(ref s)) if s == "RUNNING"
    ));
  }
}
