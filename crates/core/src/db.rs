//! SQLite storage.
//!
//! A single connection is shared behind a mutex. Multi-step writes go through
//! [`Database::with_transaction`], which opens an `IMMEDIATE` transaction so that the write lock
//! is taken before the first read of a read-then-write check.
//!
//! ## One active admission per patient
//!
//! The rule is enforced twice: services check it inside the transaction to produce a friendly
//! error, and the partial unique index [`ONE_ACTIVE_ADMISSION_INDEX`] guarantees it for any
//! writer, including concurrent processes sharing the database file.

use crate::config::CoreConfig;
use crate::constants::ONE_ACTIVE_ADMISSION_INDEX;
use crate::error::{ClinicaError, ClinicaResult};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS staff (
    id                  INTEGER PRIMARY KEY,
    national_id         TEXT NOT NULL UNIQUE,
    given_names         TEXT NOT NULL,
    last_names          TEXT NOT NULL,
    institutional_email TEXT NOT NULL UNIQUE,
    role                TEXT NOT NULL
        CHECK (role IN ('administrative_intake', 'physician', 'director')),
    api_key_hash        TEXT UNIQUE
);

CREATE TABLE IF NOT EXISTS health_centers (
    id   INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    kind TEXT NOT NULL CHECK (kind IN ('hospital', 'cesfam')),
    city TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS areas (
    id        INTEGER PRIMARY KEY,
    center_id INTEGER NOT NULL REFERENCES health_centers(id) ON DELETE CASCADE,
    name      TEXT NOT NULL,
    UNIQUE (center_id, name)
);

CREATE TABLE IF NOT EXISTS patients (
    id            INTEGER PRIMARY KEY,
    national_id   TEXT NOT NULL UNIQUE,
    given_names   TEXT NOT NULL,
    last_names    TEXT NOT NULL,
    email         TEXT,
    phone         TEXT,
    sex           TEXT,
    weight_kg     REAL,
    height_m      REAL,
    blood_type    TEXT,
    birth_date    TEXT,
    allergy_notes TEXT,
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS admissions (
    id                INTEGER PRIMARY KEY,
    patient_id        INTEGER NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
    center_id         INTEGER NOT NULL REFERENCES health_centers(id) ON DELETE RESTRICT,
    area_id           INTEGER NOT NULL REFERENCES areas(id) ON DELETE RESTRICT,
    status            TEXT NOT NULL DEFAULT 'in_treatment'
        CHECK (status IN ('in_treatment', 'pre_operative', 'discharged')),
    admitted_at       TEXT NOT NULL,
    discharge_details TEXT,
    active            INTEGER NOT NULL DEFAULT 1 CHECK (active IN (0, 1)),
    CHECK (active = 0 OR status <> 'discharged')
);

CREATE UNIQUE INDEX IF NOT EXISTS one_active_admission_per_patient
    ON admissions (patient_id) WHERE active = 1;

CREATE TABLE IF NOT EXISTS clinical_records (
    id                       INTEGER PRIMARY KEY,
    admission_id             INTEGER NOT NULL REFERENCES admissions(id) ON DELETE CASCADE,
    current_status           TEXT NOT NULL DEFAULT 'in_treatment'
        CHECK (current_status IN ('in_treatment', 'pre_operative', 'discharged')),
    sector                   TEXT NOT NULL DEFAULT '',
    subsector                TEXT NOT NULL DEFAULT '',
    treatment_summary        TEXT NOT NULL DEFAULT '',
    responsible_physician_id INTEGER NOT NULL REFERENCES staff(id) ON DELETE RESTRICT
);

CREATE TABLE IF NOT EXISTS notes (
    id           INTEGER PRIMARY KEY,
    record_id    INTEGER NOT NULL REFERENCES clinical_records(id) ON DELETE CASCADE,
    physician_id INTEGER NOT NULL REFERENCES staff(id) ON DELETE RESTRICT,
    written_at   TEXT NOT NULL,
    detail       TEXT NOT NULL
);

CREATE TRIGGER IF NOT EXISTS notes_are_append_only
    BEFORE UPDATE ON notes
BEGIN
    SELECT RAISE(ABORT, 'notes are append-only');
END;

CREATE TABLE IF NOT EXISTS staff_assignments (
    id        INTEGER PRIMARY KEY,
    staff_id  INTEGER NOT NULL REFERENCES staff(id) ON DELETE CASCADE,
    center_id INTEGER NOT NULL REFERENCES health_centers(id) ON DELETE CASCADE,
    area_id   INTEGER REFERENCES areas(id) ON DELETE SET NULL,
    active    INTEGER NOT NULL DEFAULT 1 CHECK (active IN (0, 1))
);

CREATE TABLE IF NOT EXISTS allergy_categories (
    id   INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS allergies (
    id          INTEGER PRIMARY KEY,
    category_id INTEGER NOT NULL REFERENCES allergy_categories(id) ON DELETE CASCADE,
    name        TEXT NOT NULL,
    UNIQUE (category_id, name)
);

CREATE TABLE IF NOT EXISTS patient_allergies (
    patient_id INTEGER NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
    allergy_id INTEGER NOT NULL REFERENCES allergies(id) ON DELETE CASCADE,
    PRIMARY KEY (patient_id, allergy_id)
);
"#;

/// Shared handle to the Clinica database.
#[derive(Clone, Debug)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Opens (creating if needed) the database configured in `cfg` and applies the schema.
    pub fn open(cfg: &CoreConfig) -> ClinicaResult<Self> {
        Self::open_path(cfg.database_path())
    }

    /// Opens (creating if needed) a database file and applies the schema.
    pub fn open_path(path: &Path) -> ClinicaResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(ClinicaError::StorageDirCreation)?;
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        tracing::debug!("journal mode {mode}");
        tracing::info!("opened database at {}", path.display());
        Self::from_connection(conn)
    }

    /// Opens a private in-memory database. Used by tests and throwaway tooling.
    pub fn open_in_memory() -> ClinicaResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> ClinicaResult<Self> {
        conn.pragma_update(None, "foreign_keys", true)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> ClinicaResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| ClinicaError::LockPoisoned)
    }

    /// Runs read-only work on the connection.
    pub fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> ClinicaResult<T>) -> ClinicaResult<T> {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Runs `f` inside an immediate transaction.
    ///
    /// The transaction commits only if `f` returns `Ok`; on any error it is rolled back and
    /// nothing `f` wrote is kept.
    pub fn with_transaction<T>(
        &self,
        f: impl FnOnce(&Transaction<'_>) -> ClinicaResult<T>,
    ) -> ClinicaResult<T> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}

/// True if `err` is the partial unique index rejecting a second active admission.
pub fn is_active_admission_conflict(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(code, Some(message)) => {
            code.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                && (message.contains(ONE_ACTIVE_ADMISSION_INDEX)
                    || message.contains("admissions.patient_id"))
        }
        _ => false,
    }
}

/// Maps a write error on `admissions` to the domain error when it is the active-admission index.
pub(crate) fn map_admission_write_error(err: rusqlite::Error) -> ClinicaError {
    if is_active_admission_conflict(&err) {
        tracing::warn!("active admission index rejected a concurrent write");
        ClinicaError::ActiveAdmissionExists
    } else {
        ClinicaError::Database(err)
    }
}
