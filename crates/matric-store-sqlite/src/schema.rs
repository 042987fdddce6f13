//! SQL schema for the Matric SQLite store.
//!
//! Executed once at connection startup. Referential actions are declared per
//! relationship: country and staff references null out on delete, documents
//! and activity rows cascade with their student, leads and email logs keep
//! their rows with the student reference nulled.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS countries (
    id   INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS tags (
    id   INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS staff (
    id         INTEGER PRIMARY KEY,
    username   TEXT NOT NULL UNIQUE,
    first_name TEXT NOT NULL DEFAULT '',
    last_name  TEXT NOT NULL DEFAULT '',
    email      TEXT NOT NULL DEFAULT '',
    role       TEXT NOT NULL,           -- 'admin' | 'manager' | 'staff'
    active     INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS students (
    id                 INTEGER PRIMARY KEY,
    first_name         TEXT NOT NULL,
    last_name          TEXT NOT NULL DEFAULT '',
    gender             TEXT,            -- 'male' | 'female' | 'other' | NULL
    age                INTEGER,
    country_id         INTEGER REFERENCES countries(id) ON DELETE SET NULL,
    enrollment_date    TEXT,            -- ISO 8601 date
    phone              TEXT NOT NULL DEFAULT '',
    email              TEXT NOT NULL DEFAULT '',
    passport_number    TEXT,
    visa_type          TEXT,
    visa_expiry        TEXT,
    course             TEXT,
    application_status TEXT NOT NULL DEFAULT 'pending',
    notes              TEXT NOT NULL DEFAULT '',
    consent_given      INTEGER NOT NULL DEFAULT 0,
    consent_timestamp  TEXT,            -- written once, never overwritten
    created_by         INTEGER REFERENCES staff(id) ON DELETE SET NULL,
    archived           INTEGER NOT NULL DEFAULT 0,
    created_at         TEXT NOT NULL,   -- ISO 8601 UTC; server-assigned
    updated_at         TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS students_email_idx ON students(email);
CREATE INDEX IF NOT EXISTS students_phone_idx ON students(phone);

CREATE TABLE IF NOT EXISTS student_tags (
    student_id INTEGER NOT NULL REFERENCES students(id) ON DELETE CASCADE,
    tag_id     INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
    PRIMARY KEY (student_id, tag_id)
);

CREATE TABLE IF NOT EXISTS student_documents (
    id          INTEGER PRIMARY KEY,
    student_id  INTEGER NOT NULL REFERENCES students(id) ON DELETE CASCADE,
    title       TEXT NOT NULL DEFAULT '',
    file_path   TEXT NOT NULL,
    note        TEXT NOT NULL DEFAULT '',
    uploaded_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS leads (
    id               INTEGER PRIMARY KEY,
    source           TEXT NOT NULL DEFAULT 'other',
    payload          TEXT NOT NULL,   -- verbatim inbound JSON
    phone            TEXT,
    email            TEXT,
    student_id       INTEGER REFERENCES students(id) ON DELETE SET NULL,
    campaign_name    TEXT NOT NULL DEFAULT '',
    adset_name       TEXT NOT NULL DEFAULT '',
    ad_name          TEXT NOT NULL DEFAULT '',
    external_lead_id TEXT NOT NULL DEFAULT '',
    processed        INTEGER NOT NULL DEFAULT 0,
    assigned_to      INTEGER REFERENCES staff(id) ON DELETE SET NULL,
    created_at       TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS leads_source_processed_idx ON leads(source, processed);

-- Append-only. No UPDATE or DELETE is ever issued against this table;
-- rows disappear only through the student cascade.
CREATE TABLE IF NOT EXISTS activity_log (
    id         INTEGER PRIMARY KEY,
    actor_id   INTEGER REFERENCES staff(id) ON DELETE SET NULL,
    student_id INTEGER REFERENCES students(id) ON DELETE CASCADE,
    action     TEXT NOT NULL,
    data       TEXT,                   -- JSON payload or NULL
    created_at TEXT NOT NULL
);

-- Write-once. One row per message per recipient, broadcasts included.
CREATE TABLE IF NOT EXISTS email_log (
    id            INTEGER PRIMARY KEY,
    student_id    INTEGER REFERENCES students(id) ON DELETE SET NULL,
    lead_id       INTEGER REFERENCES leads(id) ON DELETE SET NULL,
    to_email      TEXT NOT NULL,
    from_email    TEXT NOT NULL,
    subject       TEXT NOT NULL,
    body          TEXT NOT NULL,
    status        TEXT NOT NULL DEFAULT 'sent',
    error_message TEXT NOT NULL DEFAULT '',
    sent_at       TEXT NOT NULL
);

PRAGMA user_version = 1;
";
