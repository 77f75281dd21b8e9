//! Find-or-create by natural key, and the other row-level steps a unit of
//! work is assembled from.
//!
//! Every function takes the connection of an open transaction. Lookups come
//! first; an insert only happens when the lookup found nothing, and the
//! table's UNIQUE constraint rejects it if another writer got there first.

use fia_core::{
  owner::{Owner, OwnerKey},
  run::NewRun,
  script::{Script, hash_script},
};
use rusqlite::{Connection, OptionalExtension as _, params};

use crate::encode::{
  JobRow, OWNER_COLUMNS, RawInstrument, RawJob, RawRun, SCRIPT_COLUMNS,
  encode_dt, owner_from_row, script_from_row,
};

// ─── Owners ──────────────────────────────────────────────────────────────────

pub fn find_owner(conn: &Connection, key: OwnerKey) -> rusqlite::Result<Option<Owner>> {
  let (column, number) = match key {
    OwnerKey::User(n) => ("user_number", n),
    OwnerKey::Experiment(n) => ("experiment_number", n),
  };
  conn
    .query_row(
      &format!("SELECT {OWNER_COLUMNS} FROM job_owners WHERE {column} = ?1"),
      params![number],
      owner_from_row,
    )
    .optional()
}

pub fn get_owner(conn: &Connection, id: i64) -> rusqlite::Result<Option<Owner>> {
  conn
    .query_row(
      &format!("SELECT {OWNER_COLUMNS} FROM job_owners WHERE id = ?1"),
      params![id],
      owner_from_row,
    )
    .optional()
}

pub fn resolve_owner(conn: &Connection, key: OwnerKey) -> rusqlite::Result<Owner> {
  if let Some(owner) = find_owner(conn, key)? {
    return Ok(owner);
  }

  let (experiment_number, user_number) = key.columns();
  conn.execute(
    "INSERT INTO job_owners (experiment_number, user_number) VALUES (?1, ?2)",
    params![experiment_number, user_number],
  )?;
  let owner = Owner {
    id: conn.last_insert_rowid(),
    experiment_number,
    user_number,
  };
  tracing::debug!(owner_id = owner.id, ?key, "created owner");
  Ok(owner)
}

// ─── Instruments ─────────────────────────────────────────────────────────────

pub fn find_instrument(
  conn: &Connection,
  name: &str,
) -> rusqlite::Result<Option<RawInstrument>> {
  conn
    .query_row(
      &format!(
        "SELECT {} FROM instruments WHERE name = ?1",
        RawInstrument::COLUMNS
      ),
      params![name],
      RawInstrument::from_row,
    )
    .optional()
}

pub fn resolve_instrument(
  conn: &Connection,
  name: &str,
) -> rusqlite::Result<RawInstrument> {
  if let Some(instrument) = find_instrument(conn, name)? {
    return Ok(instrument);
  }

  conn.execute("INSERT INTO instruments (name) VALUES (?1)", params![name])?;
  let id = conn.last_insert_rowid();
  tracing::debug!(instrument_id = id, name, "created instrument");
  Ok(RawInstrument {
    id,
    name: name.to_owned(),
    latest_run: None,
    specification: None,
  })
}

// ─── Runs ────────────────────────────────────────────────────────────────────

fn query_run(
  conn: &Connection,
  condition: &str,
  params: impl rusqlite::Params,
) -> rusqlite::Result<Option<RawRun>> {
  conn
    .query_row(
      &format!("SELECT {} FROM runs r WHERE {condition}", RawRun::COLUMNS),
      params,
      RawRun::from_row,
    )
    .optional()
}

pub fn get_run(conn: &Connection, id: i64) -> rusqlite::Result<Option<RawRun>> {
  query_run(conn, "r.id = ?1", params![id])
}

pub fn find_run(conn: &Connection, filename: &str) -> rusqlite::Result<Option<RawRun>> {
  query_run(conn, "r.filename = ?1", params![filename])
}

/// Return the run for `candidate.filename`, inserting it only if unseen.
/// Descriptive fields of an already-known run are left as first recorded.
pub fn resolve_run(
  conn: &Connection,
  candidate: &NewRun,
  instrument_id: i64,
  owner_id: i64,
) -> rusqlite::Result<RawRun> {
  if let Some(existing) = find_run(conn, &candidate.filename)? {
    return Ok(existing);
  }

  let run = RawRun {
    id: 0,
    filename: candidate.filename.clone(),
    instrument_id,
    owner_id,
    title: candidate.title.clone(),
    users: candidate.users.clone(),
    run_start: encode_dt(candidate.run_start),
    run_end: encode_dt(candidate.run_end),
    good_frames: candidate.good_frames,
    raw_frames: candidate.raw_frames,
  };
  conn.execute(
    "INSERT INTO runs (
       filename, instrument_id, owner_id, title, users,
       run_start, run_end, good_frames, raw_frames
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    params![
      run.filename,
      run.instrument_id,
      run.owner_id,
      run.title,
      run.users,
      run.run_start,
      run.run_end,
      run.good_frames,
      run.raw_frames,
    ],
  )?;
  let run = RawRun { id: conn.last_insert_rowid(), ..run };
  tracing::debug!(run_id = run.id, filename = %run.filename, "created run");
  Ok(run)
}

/// Runs linked to a job, in the order they were linked.
pub fn runs_for_job(conn: &Connection, job_id: i64) -> rusqlite::Result<Vec<RawRun>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {} FROM runs r
     JOIN runs_jobs rj ON rj.run_id = r.id
     WHERE rj.job_id = ?1
     ORDER BY rj.rowid",
    RawRun::COLUMNS
  ))?;
  let runs = stmt
    .query_map(params![job_id], RawRun::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(runs)
}

// ─── Scripts ─────────────────────────────────────────────────────────────────

/// Return the script whose content hash matches `source_text`, inserting it
/// with `sha` if absent. An existing script keeps its original `sha`.
pub fn resolve_script(
  conn: &Connection,
  source_text: &str,
  sha: Option<&str>,
) -> rusqlite::Result<Script> {
  let script_hash = hash_script(source_text);

  let existing = conn
    .query_row(
      &format!("SELECT {SCRIPT_COLUMNS} FROM scripts WHERE script_hash = ?1"),
      params![script_hash],
      script_from_row,
    )
    .optional()?;
  if let Some(script) = existing {
    return Ok(script);
  }

  conn.execute(
    "INSERT INTO scripts (script, sha, script_hash) VALUES (?1, ?2, ?3)",
    params![source_text, sha, script_hash],
  )?;
  let script = Script {
    id: conn.last_insert_rowid(),
    source_text: source_text.to_owned(),
    sha: sha.map(str::to_owned),
    script_hash,
  };
  tracing::debug!(script_id = script.id, "created script");
  Ok(script)
}

// ─── Jobs ────────────────────────────────────────────────────────────────────

pub fn job_exists(conn: &Connection, id: i64) -> rusqlite::Result<bool> {
  Ok(
    conn
      .query_row("SELECT 1 FROM jobs WHERE id = ?1", params![id], |_| Ok(()))
      .optional()?
      .is_some(),
  )
}

pub fn run_ids_for_job(conn: &Connection, job_id: i64) -> rusqlite::Result<Vec<i64>> {
  let mut stmt =
    conn.prepare("SELECT run_id FROM runs_jobs WHERE job_id = ?1 ORDER BY rowid")?;
  let ids = stmt
    .query_map(params![job_id], |row| row.get(0))?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(ids)
}

pub fn get_job(conn: &Connection, id: i64) -> rusqlite::Result<Option<RawJob>> {
  let raw = conn
    .query_row(
      &format!(
        "SELECT {} FROM jobs j
         LEFT JOIN scripts s ON s.id = j.script_id
         WHERE j.id = ?1",
        RawJob::COLUMNS
      ),
      params![id],
      RawJob::from_row,
    )
    .optional()?;

  match raw {
    Some(mut job) => {
      job.run_ids = run_ids_for_job(conn, id)?;
      Ok(Some(job))
    }
    None => Ok(None),
  }
}

/// Insert a job and link it to each of its runs. Returns the new job id.
pub fn insert_job(conn: &Connection, job: &JobRow) -> rusqlite::Result<i64> {
  conn.execute(
    "INSERT INTO jobs (
       start_time, end_time, state, status_message, inputs, outputs,
       stacktrace, runner_image, job_type, owner_id, instrument_id, script_id
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
    params![
      job.start_time,
      job.end_time,
      job.state,
      job.status_message,
      job.inputs,
      job.outputs,
      job.stacktrace,
      job.runner_image,
      job.job_type,
      job.owner_id,
      job.instrument_id,
      job.script_id,
    ],
  )?;
  let job_id = conn.last_insert_rowid();

  let mut link =
    conn.prepare("INSERT INTO runs_jobs (run_id, job_id) VALUES (?1, ?2)")?;
  for run_id in &job.run_ids {
    link.execute(params![run_id, job_id])?;
  }

  tracing::info!(job_id, job_type = job.job_type, runs = ?job.run_ids, "created job");
  Ok(job_id)
}
