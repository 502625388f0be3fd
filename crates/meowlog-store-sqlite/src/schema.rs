//! SQL schema for the Meowlog SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.
//!
//! Foreign keys are enforced but never cascade on their own; the store
//! deletes children explicitly, inside one transaction, before the parent.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS cats (
    cat_id        TEXT PRIMARY KEY,
    name          TEXT NOT NULL,
    birth_date    TEXT,              -- YYYY-MM-DD
    adoption_date TEXT,              -- YYYY-MM-DD
    breed         TEXT NOT NULL DEFAULT '',
    gender        TEXT NOT NULL DEFAULT 'unknown',
    is_neutered   INTEGER NOT NULL DEFAULT 0,
    weight_kg     REAL,
    notes         TEXT NOT NULL DEFAULT '',
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS health_records (
    record_id        TEXT PRIMARY KEY,
    cat_id           TEXT NOT NULL REFERENCES cats(cat_id),
    observation_type TEXT NOT NULL,  -- ObservationKind discriminant
    value_json       TEXT NOT NULL,  -- JSON payload (inner data only)
    date             TEXT NOT NULL,
    notes            TEXT NOT NULL DEFAULT '',
    created_at       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS medication_schedules (
    schedule_id   TEXT PRIMARY KEY,
    cat_id        TEXT REFERENCES cats(cat_id),
    name          TEXT NOT NULL,
    dosage        TEXT NOT NULL DEFAULT '',
    frequency     TEXT NOT NULL,     -- 'daily' | 'weekly' | 'monthly' | 'as_needed'
    start_date    TEXT NOT NULL,
    end_date      TEXT,
    reminder_time TEXT NOT NULL,
    is_active     INTEGER NOT NULL DEFAULT 1,
    notes         TEXT NOT NULL DEFAULT '',
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

-- Dose logs are append-only. Rows leave only with their schedule.
CREATE TABLE IF NOT EXISTS medication_logs (
    log_id      TEXT PRIMARY KEY,
    schedule_id TEXT NOT NULL REFERENCES medication_schedules(schedule_id),
    date        TEXT NOT NULL,
    was_given   INTEGER NOT NULL,
    notes       TEXT NOT NULL DEFAULT '',
    created_at  TEXT NOT NULL
);

-- Stand-in for the platform notification queue.
CREATE TABLE IF NOT EXISTS pending_alerts (
    alert_id      TEXT PRIMARY KEY,
    trigger_json  TEXT NOT NULL,
    content_json  TEXT NOT NULL,
    registered_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS health_records_cat_idx  ON health_records(cat_id, date);
CREATE INDEX IF NOT EXISTS schedules_cat_idx       ON medication_schedules(cat_id);
CREATE INDEX IF NOT EXISTS logs_schedule_idx       ON medication_logs(schedule_id, date);

PRAGMA user_version = 1;
";
