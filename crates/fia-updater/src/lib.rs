//! Applies collaborator events to an FIA reduction database.
//!
//! Each inbound [`Event`] maps onto exactly one [`ReductionStore`] operation
//! and therefore one unit of work. The resulting records are returned as an
//! [`Outcome`] for the caller to publish onward.

pub mod error;

pub use error::Error;

use std::{path::{Path, PathBuf}, time::Duration};

use fia_core::{
  event::Event,
  job::Job,
  run::Run,
  script::Script,
  store::ReductionStore,
};
use fia_store_sqlite::StoreOptions;
use serde::{Deserialize, Serialize};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime configuration, deserialised from `config.toml` and `FIA_*`
/// environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct UpdaterConfig {
  pub store_path:      PathBuf,
  pub busy_timeout_ms: u64,
}

impl UpdaterConfig {
  /// Load from an optional TOML file, overridden by the environment.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .set_default("store_path", "fia.sqlite3")?
      .set_default("busy_timeout_ms", 5000)?
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("FIA"))
      .build()?
      .try_deserialize()
  }

  pub fn store_options(&self) -> StoreOptions {
    StoreOptions {
      busy_timeout: Duration::from_millis(self.busy_timeout_ms),
    }
  }
}

// ─── Dispatch ────────────────────────────────────────────────────────────────

/// What applying an event produced.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
  JobCreated { job: Job },
  RerunCreated { run: Run, job: Job },
  ScriptAttached { job_id: i64, script: Script },
  JobCompleted { job_id: i64 },
}

/// Apply one event to the store.
pub async fn apply<S>(store: &S, event: Event) -> Result<Outcome, Error>
where
  S: ReductionStore,
{
  let outcome = match event {
    Event::DetectedRun(detected) => {
      tracing::info!(
        instrument = %detected.instrument_name,
        filename = %detected.filename,
        "run detected"
      );
      let job = store
        .record_detected_run(detected)
        .await
        .map_err(|e| Error::Store(Box::new(e)))?;
      Outcome::JobCreated { job }
    }
    Event::CompletedRun(completed) => {
      let job_id = completed.job_id;
      store
        .record_completion(completed)
        .await
        .map_err(|e| Error::Store(Box::new(e)))?;
      Outcome::JobCompleted { job_id }
    }
    Event::RerunRequest(request) => {
      tracing::info!(original_job_id = request.original_job_id, "rerun requested");
      let (run, job) = store
        .record_rerun(request)
        .await
        .map_err(|e| Error::Store(Box::new(e)))?;
      Outcome::RerunCreated { run, job }
    }
    Event::ScriptAttachment(attachment) => {
      let script = store
        .attach_script(
          attachment.job_id,
          &attachment.script,
          attachment.sha.as_deref(),
        )
        .await
        .map_err(|e| Error::Store(Box::new(e)))?;
      Outcome::ScriptAttached {
        job_id: attachment.job_id,
        script,
      }
    }
  };
  Ok(outcome)
}

/// Decode one line of JSON and apply it.
pub async fn apply_line<S>(store: &S, line: &str) -> Result<Outcome, Error>
where
  S: ReductionStore,
{
  let event: Event = serde_json::from_str(line)?;
  apply(store, event).await
}
