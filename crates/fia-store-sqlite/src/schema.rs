//! SQL schema for the FIA SQLite store.
//!
//! Executed once at connection startup. The version is recorded in
//! `PRAGMA user_version`; migrations are handled outside this crate.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS instruments (
    id            INTEGER PRIMARY KEY,
    name          TEXT NOT NULL UNIQUE,
    latest_run    TEXT,
    specification TEXT              -- JSON or NULL
);

-- Exactly one of the two numbers is set per owner.
CREATE TABLE IF NOT EXISTS job_owners (
    id                INTEGER PRIMARY KEY,
    experiment_number INTEGER UNIQUE,
    user_number       INTEGER UNIQUE,
    CHECK ((experiment_number IS NULL) != (user_number IS NULL))
);

-- Content-addressed; rows are never updated.
CREATE TABLE IF NOT EXISTS scripts (
    id          INTEGER PRIMARY KEY,
    script      TEXT NOT NULL,
    sha         TEXT,
    script_hash TEXT NOT NULL UNIQUE   -- hex SHA-512 of script
);

CREATE TABLE IF NOT EXISTS runs (
    id            INTEGER PRIMARY KEY,
    filename      TEXT NOT NULL UNIQUE,
    instrument_id INTEGER NOT NULL REFERENCES instruments(id),
    owner_id      INTEGER NOT NULL REFERENCES job_owners(id),
    title         TEXT NOT NULL,
    users         TEXT NOT NULL,
    run_start     TEXT NOT NULL,    -- RFC 3339 UTC
    run_end       TEXT NOT NULL,    -- RFC 3339 UTC
    good_frames   INTEGER NOT NULL,
    raw_frames    INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS jobs (
    id             INTEGER PRIMARY KEY,
    start_time     TEXT,            -- RFC 3339 UTC or NULL
    end_time       TEXT,            -- RFC 3339 UTC or NULL
    state          TEXT NOT NULL,   -- 'NOT_STARTED' | 'SUCCESSFUL' | 'UNSUCCESSFUL' | 'ERROR'
    status_message TEXT,
    inputs         TEXT NOT NULL DEFAULT '{}',
    outputs        TEXT,            -- JSON array of paths or NULL
    stacktrace     TEXT,
    runner_image   TEXT,
    job_type       TEXT NOT NULL,   -- 'AUTOREDUCTION' | 'SIMPLE' | 'RERUN'
    owner_id       INTEGER NOT NULL REFERENCES job_owners(id),
    instrument_id  INTEGER NOT NULL REFERENCES instruments(id),
    script_id      INTEGER REFERENCES scripts(id)
);

-- Pure many-to-many link; rowid keeps association order.
CREATE TABLE IF NOT EXISTS runs_jobs (
    run_id INTEGER NOT NULL REFERENCES runs(id),
    job_id INTEGER NOT NULL REFERENCES jobs(id),
    UNIQUE (run_id, job_id)
);

CREATE INDEX IF NOT EXISTS runs_jobs_job_idx ON runs_jobs(job_id);
CREATE INDEX IF NOT EXISTS runs_jobs_run_idx ON runs_jobs(run_id);

PRAGMA user_version = 1;
";
