//! [`SqliteStore`] — the SQLite implementation of [`ReductionStore`].

use std::{path::Path, time::Duration};

use fia_core::{
  event::{CompletedRun, DetectedRun, RerunRequest},
  instrument::Instrument,
  job::{Job, JobType, NewJob},
  owner::{Owner, OwnerKey},
  run::{NewRun, Run},
  script::Script,
  store::ReductionStore,
};
use rusqlite::{OptionalExtension as _, TransactionBehavior, params};

use crate::{
  Result,
  encode::{
    JobRow, RawInstrument, RawJob, RawRun, decode_state, encode_dt,
    encode_outputs,
  },
  error::abort,
  resolve,
  schema::SCHEMA,
};

// ─── Options ─────────────────────────────────────────────────────────────────

/// Connection-level settings applied when a store is opened.
#[derive(Debug, Clone)]
pub struct StoreOptions {
  /// How long a writer waits on another process's lock before failing.
  pub busy_timeout: Duration,
}

impl Default for StoreOptions {
  fn default() -> Self {
    Self {
      busy_timeout: Duration::from_secs(5),
    }
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// An FIA reduction database backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. Every
/// mutating operation runs in its own `BEGIN IMMEDIATE` transaction, so two
/// processes sharing a file serialise their find-or-create steps at the write
/// lock.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` with default options.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    Self::open_with(path, StoreOptions::default()).await
  }

  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open_with(
    path: impl AsRef<Path>,
    options: StoreOptions,
  ) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init(options).await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init(StoreOptions::default()).await?;
    Ok(store)
  }

  async fn init(&self, options: StoreOptions) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.busy_timeout(options.busy_timeout)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `work` inside one write transaction. The transaction commits only if
  /// `work` succeeds; any error rolls it back.
  async fn write<T, F>(&self, work: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&rusqlite::Transaction<'_>) -> tokio_rusqlite::Result<T>
      + Send
      + 'static,
  {
    let value = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = work(&tx)?;
        tx.commit()?;
        Ok(value)
      })
      .await?;
    Ok(value)
  }

  /// Run `work` inside one read transaction, for a consistent snapshot.
  async fn read<T, F>(&self, work: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&rusqlite::Transaction<'_>) -> rusqlite::Result<T>
      + Send
      + 'static,
  {
    let value = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        Ok(work(&tx)?)
      })
      .await?;
    Ok(value)
  }
}

/// Load a job that was just written in the same transaction.
fn reload_job(tx: &rusqlite::Transaction<'_>, id: i64) -> tokio_rusqlite::Result<RawJob> {
  resolve::get_job(tx, id)?.ok_or_else(|| {
    abort(fia_core::Error::DataInconsistency(format!(
      "job {id} vanished inside its own transaction"
    )))
  })
}

// ─── ReductionStore impl ─────────────────────────────────────────────────────

impl ReductionStore for SqliteStore {
  type Error = crate::Error;

  // ── Identity resolution ───────────────────────────────────────────────────

  async fn resolve_owner(
    &self,
    experiment_number: Option<i64>,
    user_number: Option<i64>,
  ) -> Result<Owner> {
    let key = OwnerKey::select(experiment_number, user_number)?;
    self
      .write(move |tx| Ok(resolve::resolve_owner(tx, key)?))
      .await
  }

  async fn resolve_instrument(&self, name: &str) -> Result<Instrument> {
    let name = name.to_owned();
    self
      .write(move |tx| Ok(resolve::resolve_instrument(tx, &name)?))
      .await?
      .into_instrument()
  }

  async fn resolve_run(
    &self,
    candidate: NewRun,
    instrument: &Instrument,
    owner: &Owner,
  ) -> Result<Run> {
    let (instrument_id, owner_id) = (instrument.id, owner.id);
    self
      .write(move |tx| {
        Ok(resolve::resolve_run(tx, &candidate, instrument_id, owner_id)?)
      })
      .await?
      .into_run()
  }

  async fn resolve_script(
    &self,
    source_text: &str,
    sha: Option<&str>,
  ) -> Result<Script> {
    let source_text = source_text.to_owned();
    let sha = sha.map(str::to_owned);
    self
      .write(move |tx| {
        Ok(resolve::resolve_script(tx, &source_text, sha.as_deref())?)
      })
      .await
  }

  // ── Job lifecycle ─────────────────────────────────────────────────────────

  async fn record_detected_run(&self, detected: DetectedRun) -> Result<Job> {
    let candidate = detected.new_run();
    let mut row = JobRow::encode(NewJob {
      inputs: detected.reduction_inputs,
      runner_image: Some(detected.runner_image),
      ..NewJob::new(JobType::Autoreduction, 0, 0, Vec::new())
    })?;
    let instrument_name = detected.instrument_name;
    let experiment_number = detected.experiment_number;

    self
      .write(move |tx| {
        // A run seen before keeps the instrument and owner it was first
        // recorded with; nothing else is resolved for it.
        let run = match resolve::find_run(tx, &candidate.filename)? {
          Some(run) => run,
          None => {
            let instrument = resolve::resolve_instrument(tx, &instrument_name)?;
            let owner = resolve::resolve_owner(
              tx,
              OwnerKey::Experiment(experiment_number),
            )?;
            resolve::resolve_run(tx, &candidate, instrument.id, owner.id)?
          }
        };

        row.owner_id = run.owner_id;
        row.instrument_id = run.instrument_id;
        row.run_ids = vec![run.id];

        let job_id = resolve::insert_job(tx, &row)?;
        reload_job(tx, job_id)
      })
      .await?
      .into_job()
  }

  async fn record_simple_job(&self, job: NewJob) -> Result<Job> {
    if job.run_ids.is_empty() {
      return Err(
        fia_core::Error::InvalidArgument("a job needs at least one run".into())
          .into(),
      );
    }
    let row = JobRow::encode(job)?;

    self
      .write(move |tx| {
        let job_id = resolve::insert_job(tx, &row)?;
        reload_job(tx, job_id)
      })
      .await?
      .into_job()
  }

  async fn record_rerun(&self, request: RerunRequest) -> Result<(Run, Job)> {
    let mut row = JobRow::encode(NewJob {
      runner_image: Some(request.runner_image),
      ..NewJob::new(JobType::Rerun, request.owner_id, 0, Vec::new())
    })?;
    let original_job_id = request.original_job_id;
    let script_text = request.script;

    let (run, job) = self
      .write(move |tx| {
        let instrument_id = tx
          .query_row(
            "SELECT instrument_id FROM jobs WHERE id = ?1",
            params![original_job_id],
            |r| r.get::<_, i64>(0),
          )
          .optional()?
          .ok_or_else(|| abort(fia_core::Error::JobNotFound(original_job_id)))?;

        let runs = resolve::runs_for_job(tx, original_job_id)?;
        if runs.len() > 1 {
          tracing::warn!(
            original_job_id,
            runs = runs.len(),
            "rerun source job has several runs; rerunning the first"
          );
        }
        let run = runs.into_iter().next().ok_or_else(|| {
          abort(fia_core::Error::DataInconsistency(format!(
            "job {original_job_id} has no associated run"
          )))
        })?;

        let script = resolve::resolve_script(tx, &script_text, None)?;
        row.instrument_id = instrument_id;
        row.script_id = Some(script.id);
        row.run_ids = vec![run.id];

        let job_id = resolve::insert_job(tx, &row)?;
        Ok((run, reload_job(tx, job_id)?))
      })
      .await?;

    Ok((run.into_run()?, job.into_job()?))
  }

  async fn attach_script(
    &self,
    job_id: i64,
    source_text: &str,
    sha: Option<&str>,
  ) -> Result<Script> {
    let source_text = source_text.to_owned();
    let sha = sha.map(str::to_owned);

    self
      .write(move |tx| {
        if !resolve::job_exists(tx, job_id)? {
          return Err(abort(fia_core::Error::JobNotFound(job_id)));
        }
        let script = resolve::resolve_script(tx, &source_text, sha.as_deref())?;
        tx.execute(
          "UPDATE jobs SET script_id = ?1 WHERE id = ?2",
          params![script.id, job_id],
        )?;
        Ok(script)
      })
      .await
  }

  async fn record_completion(&self, completed: CompletedRun) -> Result<()> {
    let job_id = completed.job_id;
    let state = completed.state;
    let outputs = encode_outputs(&completed.output_files)?;
    let start = completed.start.map(encode_dt);
    let end = completed.end.map(encode_dt);
    let status_message = completed.status_message;
    let stacktrace = completed.stacktrace;

    let previous = self
      .write(move |tx| {
        let previous = tx
          .query_row(
            "SELECT state FROM jobs WHERE id = ?1",
            params![job_id],
            |r| r.get::<_, String>(0),
          )
          .optional()?
          .ok_or_else(|| abort(fia_core::Error::JobNotFound(job_id)))?;
        let previous = decode_state(&previous).map_err(abort)?;

        tx.execute(
          "UPDATE jobs
           SET state = ?1, outputs = ?2, status_message = ?3,
               stacktrace = ?4, start_time = ?5, end_time = ?6
           WHERE id = ?7",
          params![
            <&'static str>::from(state),
            outputs,
            status_message,
            stacktrace,
            start,
            end,
            job_id,
          ],
        )?;
        Ok(previous)
      })
      .await?;

    if previous.is_terminal() {
      tracing::warn!(
        job_id,
        %previous,
        %state,
        "completion overwrote an already finished job"
      );
    }
    tracing::info!(job_id, %state, "recorded job completion");
    Ok(())
  }

  // ── Instrument maintenance ────────────────────────────────────────────────

  async fn set_latest_run(
    &self,
    instrument_name: &str,
    filename: &str,
  ) -> Result<Instrument> {
    let name = instrument_name.to_owned();
    let filename = filename.to_owned();

    self
      .write(move |tx| {
        let mut instrument = resolve::resolve_instrument(tx, &name)?;
        tx.execute(
          "UPDATE instruments SET latest_run = ?1 WHERE id = ?2",
          params![filename, instrument.id],
        )?;
        instrument.latest_run = Some(filename);
        Ok(instrument)
      })
      .await?
      .into_instrument()
  }

  async fn set_specification(
    &self,
    instrument_name: &str,
    specification: serde_json::Value,
  ) -> Result<Instrument> {
    let name = instrument_name.to_owned();
    let encoded = serde_json::to_string(&specification)?;

    self
      .write(move |tx| {
        let mut instrument = resolve::find_instrument(tx, &name)?
          .ok_or_else(|| abort(fia_core::Error::InstrumentNotFound(name)))?;
        tx.execute(
          "UPDATE instruments SET specification = ?1 WHERE id = ?2",
          params![encoded, instrument.id],
        )?;
        instrument.specification = Some(encoded);
        Ok(instrument)
      })
      .await?
      .into_instrument()
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn get_job(&self, id: i64) -> Result<Option<Job>> {
    self
      .read(move |tx| resolve::get_job(tx, id))
      .await?
      .map(RawJob::into_job)
      .transpose()
  }

  async fn get_run(&self, id: i64) -> Result<Option<Run>> {
    self
      .read(move |tx| resolve::get_run(tx, id))
      .await?
      .map(RawRun::into_run)
      .transpose()
  }

  async fn get_run_by_filename(&self, filename: &str) -> Result<Option<Run>> {
    let filename = filename.to_owned();
    self
      .read(move |tx| resolve::find_run(tx, &filename))
      .await?
      .map(RawRun::into_run)
      .transpose()
  }

  async fn get_instrument(&self, name: &str) -> Result<Option<Instrument>> {
    let name = name.to_owned();
    self
      .read(move |tx| resolve::find_instrument(tx, &name))
      .await?
      .map(RawInstrument::into_instrument)
      .transpose()
  }

  async fn get_owner(&self, id: i64) -> Result<Option<Owner>> {
    self.read(move |tx| resolve::get_owner(tx, id)).await
  }

  async fn runs_for_job(&self, job_id: i64) -> Result<Vec<Run>> {
    self
      .read(move |tx| resolve::runs_for_job(tx, job_id))
      .await?
      .into_iter()
      .map(RawRun::into_run)
      .collect()
  }

  async fn jobs_for_run(&self, run_id: i64) -> Result<Vec<Job>> {
    let raws = self
      .read(move |tx| {
        let mut stmt = tx.prepare(
          "SELECT job_id FROM runs_jobs WHERE run_id = ?1 ORDER BY job_id",
        )?;
        let ids = stmt
          .query_map(params![run_id], |r| r.get::<_, i64>(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut jobs = Vec::with_capacity(ids.len());
        for id in ids {
          if let Some(job) = resolve::get_job(tx, id)? {
            jobs.push(job);
          }
        }
        Ok(jobs)
      })
      .await?;

    raws.into_iter().map(RawJob::into_job).collect()
  }

  async fn find_run_for_job(&self, job_id: i64) -> Result<Option<Run>> {
    self
      .read(move |tx| {
        Ok(resolve::runs_for_job(tx, job_id)?.into_iter().next())
      })
      .await?
      .map(RawRun::into_run)
      .transpose()
  }
}
