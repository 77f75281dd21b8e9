//! The `ReductionStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `fia-store-sqlite`).
//! Collaborators that react to run detection, job completion, and rerun
//! requests depend on this abstraction, not on any concrete backend.
//!
//! Every method is one unit of work: it either commits all of its changes or
//! none of them. No transaction spans two calls.

use std::future::Future;

use crate::{
  event::{CompletedRun, DetectedRun, RerunRequest},
  instrument::Instrument,
  job::{Job, NewJob},
  owner::Owner,
  run::{NewRun, Run},
  script::Script,
};

/// Abstraction over an FIA reduction database backend.
///
/// Rows for instruments, owners, runs and scripts are created lazily by the
/// `resolve_*` family: the natural key is looked up first and a row is only
/// inserted when none exists. Two callers racing to create the same natural
/// key are not serialised here; the loser sees the backend's constraint
/// violation and is expected to resolve again.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes.
pub trait ReductionStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Identity resolution ───────────────────────────────────────────────

  /// Find the owner for a user number (preferred) or an experiment number,
  /// creating it if absent. Fails if neither number is given.
  fn resolve_owner(
    &self,
    experiment_number: Option<i64>,
    user_number: Option<i64>,
  ) -> impl Future<Output = Result<Owner, Self::Error>> + Send + '_;

  /// Find an instrument by name, creating it with no latest run and no
  /// specification if absent.
  fn resolve_instrument<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<Instrument, Self::Error>> + Send + 'a;

  /// Find a run by `candidate.filename`. An existing run is returned
  /// unchanged and `candidate` is discarded; otherwise a run is created from
  /// `candidate` and linked to `instrument` and `owner`.
  fn resolve_run<'a>(
    &'a self,
    candidate: NewRun,
    instrument: &'a Instrument,
    owner: &'a Owner,
  ) -> impl Future<Output = Result<Run, Self::Error>> + Send + 'a;

  /// Find a script by the content hash of `source_text`, creating it with
  /// `sha` if absent. An existing script keeps its original `sha`.
  fn resolve_script<'a>(
    &'a self,
    source_text: &'a str,
    sha: Option<&'a str>,
  ) -> impl Future<Output = Result<Script, Self::Error>> + Send + 'a;

  // ── Job lifecycle ─────────────────────────────────────────────────────

  /// Resolve the instrument, owner (by experiment number) and run named by
  /// `detected` and create a not-started autoreduction job for them.
  fn record_detected_run(
    &self,
    detected: DetectedRun,
  ) -> impl Future<Output = Result<Job, Self::Error>> + Send + '_;

  /// Persist a caller-built job as given. No identity resolution happens;
  /// the job must name at least one run.
  fn record_simple_job(
    &self,
    job: NewJob,
  ) -> impl Future<Output = Result<Job, Self::Error>> + Send + '_;

  /// Create a not-started rerun job for the run of an existing job.
  ///
  /// Fails if the original job does not exist or has no associated run.
  fn record_rerun(
    &self,
    request: RerunRequest,
  ) -> impl Future<Output = Result<(Run, Job), Self::Error>> + Send + '_;

  /// Resolve a script by content and attach it to the job.
  fn attach_script<'a>(
    &'a self,
    job_id: i64,
    source_text: &'a str,
    sha: Option<&'a str>,
  ) -> impl Future<Output = Result<Script, Self::Error>> + Send + 'a;

  /// Write a worker's completion report onto its job.
  ///
  /// The state transition is not validated: completing an already-finished
  /// job overwrites the earlier result.
  fn record_completion(
    &self,
    completed: CompletedRun,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Instrument maintenance ────────────────────────────────────────────

  /// Record `filename` as the instrument's latest run, resolving the
  /// instrument first.
  fn set_latest_run<'a>(
    &'a self,
    instrument_name: &'a str,
    filename: &'a str,
  ) -> impl Future<Output = Result<Instrument, Self::Error>> + Send + 'a;

  /// Replace the specification of a known instrument.
  fn set_specification<'a>(
    &'a self,
    instrument_name: &'a str,
    specification: serde_json::Value,
  ) -> impl Future<Output = Result<Instrument, Self::Error>> + Send + 'a;

  // ── Reads ─────────────────────────────────────────────────────────────

  fn get_job(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Job>, Self::Error>> + Send + '_;

  fn get_run(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Run>, Self::Error>> + Send + '_;

  fn get_run_by_filename<'a>(
    &'a self,
    filename: &'a str,
  ) -> impl Future<Output = Result<Option<Run>, Self::Error>> + Send + 'a;

  fn get_instrument<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<Option<Instrument>, Self::Error>> + Send + 'a;

  fn get_owner(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Owner>, Self::Error>> + Send + '_;

  /// Runs associated with a job, in association order.
  fn runs_for_job(
    &self,
    job_id: i64,
  ) -> impl Future<Output = Result<Vec<Run>, Self::Error>> + Send + '_;

  /// Jobs that reduced a run, oldest first.
  fn jobs_for_run(
    &self,
    run_id: i64,
  ) -> impl Future<Output = Result<Vec<Job>, Self::Error>> + Send + '_;

  /// The first run associated with a job. `None` if the job does not exist
  /// or has no runs.
  fn find_run_for_job(
    &self,
    job_id: i64,
  ) -> impl Future<Output = Result<Option<Run>, Self::Error>> + Send + '_;
}
