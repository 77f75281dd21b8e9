//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{DateTime, TimeZone, Utc};
use fia_core::{
  SameRecord,
  event::{CompletedRun, DetectedRun, RerunRequest},
  job::{JobType, NewJob, State},
  run::NewRun,
  script::hash_script,
  store::ReductionStore,
};

use crate::{Error, ErrorKind, SqliteStore, StoreOptions};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn at(hour: u32) -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap()
}

fn new_run(filename: &str, title: &str) -> NewRun {
  NewRun {
    filename:    filename.into(),
    title:       title.into(),
    users:       "A. Scientist, B. Scientist".into(),
    run_start:   at(9),
    run_end:     at(10),
    good_frames: 1500,
    raw_frames:  1600,
  }
}

fn detected(instrument: &str, filename: &str, title: &str) -> DetectedRun {
  DetectedRun {
    instrument_name:   instrument.into(),
    filename:          filename.into(),
    title:             title.into(),
    users:             "A. Scientist, B. Scientist".into(),
    run_start:         at(9),
    run_end:           at(10),
    good_frames:       1500,
    raw_frames:        1600,
    experiment_number: 1234,
    reduction_inputs:  serde_json::json!({ "ei": "auto", "sam_mass": 0.0 }),
    runner_image:      "ghcr.io/fiaisis/mantid:6.9".into(),
  }
}

// ─── Owners ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn resolve_owner_by_experiment_is_idempotent() {
  let s = store().await;

  let first = s.resolve_owner(Some(1234), None).await.unwrap();
  assert_eq!(first.experiment_number, Some(1234));
  assert_eq!(first.user_number, None);

  let second = s.resolve_owner(Some(1234), None).await.unwrap();
  assert_eq!(first.id, second.id);
}

#[tokio::test]
async fn resolve_owner_prefers_existing_user_number() {
  let s = store().await;

  let user = s.resolve_owner(None, Some(42)).await.unwrap();
  let again = s.resolve_owner(Some(9999), Some(42)).await.unwrap();

  assert_eq!(again.id, user.id);
  assert!(again.same_record(&user));
  assert_eq!(again.experiment_number, None);

  // The experiment number was not used to create anything.
  let experiment = s.resolve_owner(Some(9999), None).await.unwrap();
  assert_ne!(experiment.id, user.id);
}

#[tokio::test]
async fn resolve_owner_creates_user_owner_when_both_given() {
  let s = store().await;

  let owner = s.resolve_owner(Some(1234), Some(7)).await.unwrap();
  assert_eq!(owner.user_number, Some(7));
  assert_eq!(owner.experiment_number, None);

  let fetched = s.get_owner(owner.id).await.unwrap().unwrap();
  assert!(fetched.same_record(&owner));
}

#[tokio::test]
async fn resolve_owner_without_numbers_is_invalid() {
  let s = store().await;
  let err = s.resolve_owner(None, None).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

// ─── Instruments ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn resolve_instrument_creates_once() {
  let s = store().await;

  let loq = s.resolve_instrument("LOQ").await.unwrap();
  assert_eq!(loq.name, "LOQ");
  assert_eq!(loq.latest_run, None);
  assert_eq!(loq.specification, None);

  let again = s.resolve_instrument("LOQ").await.unwrap();
  assert_eq!(again.id, loq.id);

  let mari = s.resolve_instrument("MARI").await.unwrap();
  assert_ne!(mari.id, loq.id);
}

#[tokio::test]
async fn set_latest_run_creates_and_updates_instrument() {
  let s = store().await;

  let inst = s.set_latest_run("MARI", "MAR25581.nxs").await.unwrap();
  assert_eq!(inst.latest_run.as_deref(), Some("MAR25581.nxs"));

  s.set_latest_run("MARI", "MAR25582.nxs").await.unwrap();
  let fetched = s.get_instrument("MARI").await.unwrap().unwrap();
  assert_eq!(fetched.id, inst.id);
  assert_eq!(fetched.latest_run.as_deref(), Some("MAR25582.nxs"));
}

#[tokio::test]
async fn set_specification_round_trips_json() {
  let s = store().await;
  s.resolve_instrument("MARI").await.unwrap();

  let spec = serde_json::json!({ "enabled": true, "ei": [10, 20] });
  let inst = s.set_specification("MARI", spec.clone()).await.unwrap();
  assert_eq!(inst.specification.as_ref(), Some(&spec));

  let fetched = s.get_instrument("MARI").await.unwrap().unwrap();
  assert!(fetched.same_record(&inst));
}

#[tokio::test]
async fn set_specification_on_unknown_instrument_is_not_found() {
  let s = store().await;
  let err = s
    .set_specification("NOPE", serde_json::json!({}))
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::Core(fia_core::Error::InstrumentNotFound(ref name)) if name == "NOPE"
  ));
  assert_eq!(err.kind(), ErrorKind::NotFound);
}

// ─── Runs ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn resolve_run_twice_returns_same_row() {
  let s = store().await;
  let inst = s.resolve_instrument("LOQ").await.unwrap();
  let owner = s.resolve_owner(Some(1234), None).await.unwrap();

  let first = s
    .resolve_run(new_run("LOQ00001.nxs", "first title"), &inst, &owner)
    .await
    .unwrap();
  let second = s
    .resolve_run(new_run("LOQ00001.nxs", "other title"), &inst, &owner)
    .await
    .unwrap();

  assert_eq!(first.id, second.id);
  assert_eq!(second.title, "first title");
  assert!(first.same_record(&second));

  let fetched = s.get_run_by_filename("LOQ00001.nxs").await.unwrap().unwrap();
  assert_eq!(fetched.id, first.id);
  assert_eq!(fetched.run_start, at(9));
  assert_eq!(fetched.good_frames, 1500);
}

#[tokio::test]
async fn get_run_missing_returns_none() {
  let s = store().await;
  assert!(s.get_run(12345).await.unwrap().is_none());
  assert!(s.get_run_by_filename("MAR1.nxs").await.unwrap().is_none());
}

// ─── Scripts ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn resolve_script_is_keyed_by_content_only() {
  let s = store().await;

  let a = s.resolve_script("print(1)", Some("abc123")).await.unwrap();
  let b = s.resolve_script("print(1)", Some("def456")).await.unwrap();
  let c = s.resolve_script("print(2)", Some("abc123")).await.unwrap();

  assert_eq!(a.id, b.id);
  assert_eq!(b.sha.as_deref(), Some("abc123"));
  assert_eq!(a.script_hash, hash_script("print(1)"));
  assert_ne!(a.id, c.id);
  assert_ne!(a.script_hash, c.script_hash);
}

// ─── Detected runs ───────────────────────────────────────────────────────────

#[tokio::test]
async fn detected_run_creates_instrument_owner_run_and_job() {
  let s = store().await;

  let job = s
    .record_detected_run(detected("LOQ", "LOQ00001.nxs", "sample run"))
    .await
    .unwrap();

  assert_eq!(job.state, State::NotStarted);
  assert_eq!(job.job_type, JobType::Autoreduction);
  assert_eq!(job.inputs["ei"], "auto");
  assert_eq!(job.runner_image.as_deref(), Some("ghcr.io/fiaisis/mantid:6.9"));
  assert!(job.script.is_none());
  assert!(job.start.is_none() && job.end.is_none());

  let inst = s.get_instrument("LOQ").await.unwrap().unwrap();
  assert_eq!(job.instrument_id, inst.id);

  let owner = s.get_owner(job.owner_id).await.unwrap().unwrap();
  assert_eq!(owner.experiment_number, Some(1234));

  let run = s.get_run_by_filename("LOQ00001.nxs").await.unwrap().unwrap();
  assert_eq!(job.run_ids, vec![run.id]);
  assert_eq!(run.instrument_id, inst.id);
  assert_eq!(run.owner_id, owner.id);
  assert_eq!(run.title, "sample run");

  let fetched = s.get_job(job.id).await.unwrap().unwrap();
  assert!(fetched.same_record(&job));
}

#[tokio::test]
async fn second_detection_reuses_run_and_keeps_first_title() {
  let s = store().await;

  let first = s
    .record_detected_run(detected("LOQ", "LOQ00001.nxs", "sample run"))
    .await
    .unwrap();
  let second = s
    .record_detected_run(detected("LOQ", "LOQ00001.nxs", "renamed run"))
    .await
    .unwrap();

  assert_ne!(first.id, second.id);
  assert_eq!(first.run_ids, second.run_ids);
  assert_eq!(first.owner_id, second.owner_id);
  assert_eq!(first.instrument_id, second.instrument_id);

  let run = s.get_run(first.run_ids[0]).await.unwrap().unwrap();
  assert_eq!(run.title, "sample run");

  let jobs = s.jobs_for_run(run.id).await.unwrap();
  let ids: Vec<_> = jobs.iter().map(|j| j.id).collect();
  assert_eq!(ids, vec![first.id, second.id]);
}

#[tokio::test]
async fn redetection_under_new_experiment_keeps_first_owner() {
  let s = store().await;

  let first = s
    .record_detected_run(detected("LOQ", "LOQ00001.nxs", "sample run"))
    .await
    .unwrap();
  let second = s
    .record_detected_run(DetectedRun {
      experiment_number: 5678,
      ..detected("LOQ", "LOQ00001.nxs", "sample run")
    })
    .await
    .unwrap();

  assert_eq!(second.run_ids, first.run_ids);
  assert_eq!(second.owner_id, first.owner_id);
  let owner = s.get_owner(second.owner_id).await.unwrap().unwrap();
  assert_eq!(owner.experiment_number, Some(1234));

  let unused_owners = s
    .conn
    .call(|conn| {
      Ok(conn.query_row(
        "SELECT COUNT(*) FROM job_owners WHERE experiment_number = 5678",
        [],
        |r| r.get::<_, i64>(0),
      )?)
    })
    .await
    .unwrap();
  assert_eq!(unused_owners, 0);
}

// ─── Simple jobs ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn simple_job_is_stored_as_given() {
  let s = store().await;
  let auto = s
    .record_detected_run(detected("MARI", "MAR25581.nxs", "vanadium"))
    .await
    .unwrap();
  let script = s.resolve_script("print('simple')", None).await.unwrap();

  let mut input = NewJob::new(
    JobType::Simple,
    auto.owner_id,
    auto.instrument_id,
    auto.run_ids.clone(),
  );
  input.inputs = serde_json::json!({ "mask": "mask.xml" });
  input.runner_image = Some("runner:2".into());
  input.script_id = Some(script.id);

  let job = s.record_simple_job(input).await.unwrap();
  assert_eq!(job.job_type, JobType::Simple);
  assert_eq!(job.state, State::NotStarted);
  assert_eq!(job.run_ids, auto.run_ids);
  assert_eq!(job.inputs["mask"], "mask.xml");
  assert!(job.script.same_record(&Some(script)));
}

#[tokio::test]
async fn simple_job_without_runs_is_invalid() {
  let s = store().await;
  let owner = s.resolve_owner(None, Some(1)).await.unwrap();
  let inst = s.resolve_instrument("LOQ").await.unwrap();

  let err = s
    .record_simple_job(NewJob::new(JobType::Simple, owner.id, inst.id, vec![]))
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[tokio::test]
async fn simple_job_with_unknown_run_violates_constraint_and_rolls_back() {
  let s = store().await;
  let auto = s
    .record_detected_run(detected("LOQ", "LOQ00001.nxs", "sample"))
    .await
    .unwrap();

  let err = s
    .record_simple_job(NewJob::new(
      JobType::Simple,
      auto.owner_id,
      auto.instrument_id,
      vec![auto.run_ids[0], 9999],
    ))
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::ConstraintViolation);

  // The job row inserted before the failing link was rolled back.
  assert!(s.get_job(auto.id + 1).await.unwrap().is_none());
  let jobs = s.jobs_for_run(auto.run_ids[0]).await.unwrap();
  assert_eq!(jobs.len(), 1);
}

// ─── Scripts on jobs ─────────────────────────────────────────────────────────

#[tokio::test]
async fn attach_same_script_to_two_jobs_shares_row() {
  let s = store().await;
  let job = s
    .record_detected_run(detected("LOQ", "LOQ00001.nxs", "a"))
    .await
    .unwrap();
  let job2 = s
    .record_detected_run(detected("LOQ", "LOQ00002.nxs", "b"))
    .await
    .unwrap();

  let first = s.attach_script(job.id, "print(1)", Some("abc123")).await.unwrap();
  let second = s.attach_script(job2.id, "print(1)", Some("def456")).await.unwrap();
  assert_eq!(first.id, second.id);

  let job = s.get_job(job.id).await.unwrap().unwrap();
  let job2 = s.get_job(job2.id).await.unwrap().unwrap();
  let (script, script2) = (job.script.unwrap(), job2.script.unwrap());
  assert_eq!(script.id, script2.id);
  assert_eq!(script.script_hash, script2.script_hash);
  assert_eq!(script2.sha.as_deref(), Some("abc123"));
}

#[tokio::test]
async fn attach_script_to_missing_job_is_not_found() {
  let s = store().await;
  let err = s.attach_script(77, "print(1)", None).await.unwrap_err();
  assert!(matches!(err, Error::Core(fia_core::Error::JobNotFound(77))));

  // Nothing was created on the failed path.
  let script = s.resolve_script("print(1)", Some("later")).await.unwrap();
  assert_eq!(script.sha.as_deref(), Some("later"));
}

// ─── Completion ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn completion_updates_result_fields() {
  let s = store().await;
  let job = s
    .record_detected_run(detected("LOQ", "LOQ00001.nxs", "sample"))
    .await
    .unwrap();

  s.record_completion(CompletedRun {
    job_id:         job.id,
    state:          State::Successful,
    status_message: Some("Reduction complete".into()),
    output_files:   vec!["LOQ00001_reduced.nxs".into(), "LOQ00001.log".into()],
    start:          Some(at(11)),
    end:            Some(at(12)),
    stacktrace:     None,
  })
  .await
  .unwrap();

  let done = s.get_job(job.id).await.unwrap().unwrap();
  assert_eq!(done.state, State::Successful);
  assert_eq!(done.job_type, JobType::Autoreduction);
  assert_eq!(done.status_message.as_deref(), Some("Reduction complete"));
  assert_eq!(
    done.outputs,
    Some(vec!["LOQ00001_reduced.nxs".to_string(), "LOQ00001.log".to_string()])
  );
  assert_eq!(done.start, Some(at(11)));
  assert_eq!(done.end, Some(at(12)));
  assert_eq!(done.stacktrace, None);
  assert_eq!(done.run_ids, job.run_ids);
}

#[tokio::test]
async fn completion_records_error_stacktrace() {
  let s = store().await;
  let job = s
    .record_detected_run(detected("LOQ", "LOQ00001.nxs", "sample"))
    .await
    .unwrap();

  s.record_completion(CompletedRun {
    job_id:         job.id,
    state:          State::Error,
    status_message: Some("worker crashed".into()),
    output_files:   vec![],
    start:          Some(at(11)),
    end:            None,
    stacktrace:     Some("Traceback (most recent call last): ...".into()),
  })
  .await
  .unwrap();

  let failed = s.get_job(job.id).await.unwrap().unwrap();
  assert_eq!(failed.state, State::Error);
  assert_eq!(failed.outputs, Some(vec![]));
  assert!(failed.stacktrace.unwrap().starts_with("Traceback"));
}

#[tokio::test]
async fn second_completion_overwrites_first() {
  let s = store().await;
  let job = s
    .record_detected_run(detected("LOQ", "LOQ00001.nxs", "sample"))
    .await
    .unwrap();

  s.record_completion(CompletedRun {
    job_id:         job.id,
    state:          State::Successful,
    status_message: Some("Reduction complete".into()),
    output_files:   vec!["LOQ00001_reduced.nxs".into()],
    start:          Some(at(11)),
    end:            Some(at(12)),
    stacktrace:     None,
  })
  .await
  .unwrap();
  s.record_completion(CompletedRun {
    job_id:         job.id,
    state:          State::Error,
    status_message: Some("output upload failed".into()),
    output_files:   vec![],
    start:          Some(at(13)),
    end:            Some(at(14)),
    stacktrace:     Some("Traceback ...".into()),
  })
  .await
  .unwrap();

  let last = s.get_job(job.id).await.unwrap().unwrap();
  assert_eq!(last.state, State::Error);
  assert_eq!(last.status_message.as_deref(), Some("output upload failed"));
  assert_eq!(last.outputs, Some(vec![]));
  assert_eq!(last.start, Some(at(13)));
  assert_eq!(last.end, Some(at(14)));
  assert_eq!(last.stacktrace.as_deref(), Some("Traceback ..."));
  assert_eq!(last.job_type, JobType::Autoreduction);
}

#[tokio::test]
async fn completion_over_unreadable_state_writes_nothing() {
  let s = store().await;
  let job = s
    .record_detected_run(detected("LOQ", "LOQ00001.nxs", "sample"))
    .await
    .unwrap();

  let job_id = job.id;
  s.conn
    .call(move |conn| {
      conn.execute(
        "UPDATE jobs SET state = 'RUNNING' WHERE id = ?1",
        rusqlite::params![job_id],
      )?;
      Ok(())
    })
    .await
    .unwrap();

  let err = s
    .record_completion(CompletedRun {
      job_id,
      state:          State::Successful,
      status_message: Some("done".into()),
      output_files:   vec![],
      start:          None,
      end:            None,
      stacktrace:     None,
    })
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::DataInconsistency);

  let (state, message) = s
    .conn
    .call(move |conn| {
      Ok(conn.query_row(
        "SELECT state, status_message FROM jobs WHERE id = ?1",
        rusqlite::params![job_id],
        |r| Ok((r.get::<_, String>(0)?, r.get::<_, Option<String>>(1)?)),
      )?)
    })
    .await
    .unwrap();
  assert_eq!(state, "RUNNING");
  assert_eq!(message, None);
}

#[tokio::test]
async fn completion_of_missing_job_is_not_found() {
  let s = store().await;
  let err = s
    .record_completion(CompletedRun {
      job_id:         404,
      state:          State::Successful,
      status_message: None,
      output_files:   vec![],
      start:          None,
      end:            None,
      stacktrace:     None,
    })
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
}

// ─── Reruns ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn rerun_creates_new_job_on_same_run() {
  let s = store().await;
  let original = s
    .record_detected_run(detected("LOQ", "LOQ00001.nxs", "sample"))
    .await
    .unwrap();
  let new_owner = s.resolve_owner(None, Some(555)).await.unwrap();

  let (run, rerun) = s
    .record_rerun(RerunRequest {
      original_job_id: original.id,
      script:          "print('again')".into(),
      owner_id:        new_owner.id,
      runner_image:    "runner:3".into(),
    })
    .await
    .unwrap();

  assert_eq!(run.id, original.run_ids[0]);
  assert_ne!(rerun.id, original.id);
  assert_eq!(rerun.job_type, JobType::Rerun);
  assert_eq!(rerun.state, State::NotStarted);
  assert_eq!(rerun.run_ids, vec![run.id]);
  assert_eq!(rerun.owner_id, new_owner.id);
  assert_eq!(rerun.instrument_id, original.instrument_id);
  assert_eq!(rerun.runner_image.as_deref(), Some("runner:3"));

  let script = rerun.script.unwrap();
  assert_eq!(script.source_text, "print('again')");
  assert_eq!(script.script_hash, hash_script("print('again')"));

  // The original job is untouched.
  let original_again = s.get_job(original.id).await.unwrap().unwrap();
  assert!(original_again.same_record(&original));
}

#[tokio::test]
async fn rerun_of_missing_job_is_not_found() {
  let s = store().await;
  let err = s
    .record_rerun(RerunRequest {
      original_job_id: 3,
      script:          "print(1)".into(),
      owner_id:        1,
      runner_image:    "runner:1".into(),
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(fia_core::Error::JobNotFound(3))));
}

#[tokio::test]
async fn rerun_of_job_without_run_is_data_inconsistency() {
  let s = store().await;
  let original = s
    .record_detected_run(detected("LOQ", "LOQ00001.nxs", "sample"))
    .await
    .unwrap();

  // Simulate a job whose association was lost outside this layer.
  let original_id = original.id;
  s.conn
    .call(move |conn| {
      conn.execute(
        "DELETE FROM runs_jobs WHERE job_id = ?1",
        rusqlite::params![original_id],
      )?;
      Ok(())
    })
    .await
    .unwrap();

  let err = s
    .record_rerun(RerunRequest {
      original_job_id: original.id,
      script:          "print(1)".into(),
      owner_id:        original.owner_id,
      runner_image:    "runner:1".into(),
    })
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::DataInconsistency);

  // Nothing was written: the script resolution never happened.
  assert!(s.get_job(original.id + 1).await.unwrap().is_none());
  assert!(s.find_run_for_job(original.id).await.unwrap().is_none());
}

#[tokio::test]
async fn rerun_with_unknown_owner_violates_constraint() {
  let s = store().await;
  let original = s
    .record_detected_run(detected("LOQ", "LOQ00001.nxs", "sample"))
    .await
    .unwrap();

  let err = s
    .record_rerun(RerunRequest {
      original_job_id: original.id,
      script:          "print('orphan')".into(),
      owner_id:        9999,
      runner_image:    "runner:1".into(),
    })
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::ConstraintViolation);

  // The script created earlier in the failed unit of work was rolled back.
  let script = s.resolve_script("print('orphan')", Some("v2")).await.unwrap();
  assert_eq!(script.sha.as_deref(), Some("v2"));
}

#[tokio::test]
async fn rerun_of_multi_run_job_uses_first_run() {
  let s = store().await;
  let a = s
    .record_detected_run(detected("LOQ", "LOQ00001.nxs", "a"))
    .await
    .unwrap();
  let b = s
    .record_detected_run(detected("LOQ", "LOQ00002.nxs", "b"))
    .await
    .unwrap();

  let combined = s
    .record_simple_job(NewJob::new(
      JobType::Simple,
      a.owner_id,
      a.instrument_id,
      vec![b.run_ids[0], a.run_ids[0]],
    ))
    .await
    .unwrap();
  assert_eq!(combined.run_ids, vec![b.run_ids[0], a.run_ids[0]]);

  let runs = s.runs_for_job(combined.id).await.unwrap();
  assert_eq!(runs.len(), 2);
  assert_eq!(runs[0].filename, "LOQ00002.nxs");

  let (run, rerun) = s
    .record_rerun(RerunRequest {
      original_job_id: combined.id,
      script:          "print(1)".into(),
      owner_id:        a.owner_id,
      runner_image:    "runner:1".into(),
    })
    .await
    .unwrap();
  assert_eq!(run.filename, "LOQ00002.nxs");
  assert_eq!(rerun.run_ids, vec![run.id]);
}

#[tokio::test]
async fn find_run_for_job_returns_first_run_or_none() {
  let s = store().await;
  let job = s
    .record_detected_run(detected("LOQ", "LOQ00001.nxs", "sample"))
    .await
    .unwrap();

  let run = s.find_run_for_job(job.id).await.unwrap().unwrap();
  assert_eq!(run.filename, "LOQ00001.nxs");
  assert!(s.find_run_for_job(job.id + 100).await.unwrap().is_none());
}

// ─── Storage engine constraints ──────────────────────────────────────────────

#[tokio::test]
async fn uniqueness_is_enforced_by_the_schema() {
  let s = store().await;
  s.resolve_owner(Some(1234), None).await.unwrap();
  s.resolve_instrument("LOQ").await.unwrap();

  let results = s
    .conn
    .call(|conn| {
      let owner = conn
        .execute("INSERT INTO job_owners (experiment_number) VALUES (1234)", [])
        .map(|_| ());
      let instrument = conn
        .execute("INSERT INTO instruments (name) VALUES ('LOQ')", [])
        .map(|_| ());
      let both = conn
        .execute(
          "INSERT INTO job_owners (experiment_number, user_number) VALUES (1, 2)",
          [],
        )
        .map(|_| ());
      Ok(vec![owner, instrument, both])
    })
    .await
    .unwrap();

  for result in results {
    let err = Error::from(result.unwrap_err());
    assert_eq!(err.kind(), ErrorKind::ConstraintViolation);
  }
}

#[tokio::test]
async fn two_handles_on_one_file_share_natural_keys() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("fia.sqlite3");

  let options = StoreOptions {
    busy_timeout: std::time::Duration::from_millis(500),
  };
  let a = SqliteStore::open_with(&path, options.clone()).await.unwrap();
  let b = SqliteStore::open_with(&path, options).await.unwrap();

  let (first, second) = tokio::join!(
    a.record_detected_run(detected("LOQ", "LOQ00001.nxs", "from a")),
    b.record_detected_run(detected("LOQ", "LOQ00001.nxs", "from b")),
  );
  let (first, second) = (first.unwrap(), second.unwrap());

  assert_ne!(first.id, second.id);
  assert_eq!(first.run_ids, second.run_ids);
  assert_eq!(first.owner_id, second.owner_id);
  assert_eq!(first.instrument_id, second.instrument_id);
}
