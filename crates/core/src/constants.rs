//! Constants used throughout the Clinica core crate.

/// Default SQLite database file when no explicit path is configured.
pub const DEFAULT_DATABASE_PATH: &str = "clinica.db";

/// Name of the partial unique index that allows one active admission per patient.
pub const ONE_ACTIVE_ADMISSION_INDEX: &str = "one_active_admission_per_patient";

/// Lower and upper bounds for a patient's weight, in kilograms.
pub const WEIGHT_KG_RANGE: (f64, f64) = (0.5, 500.0);

/// Lower and upper bounds for a patient's height, in metres.
pub const HEIGHT_M_RANGE: (f64, f64) = (0.3, 2.5);

/// Maximum length of free-text clinical fields (summaries, notes, discharge details).
pub const MAX_FREE_TEXT_LEN: usize = 10_000;

/// Maximum length of short labels such as record sector and subsector.
pub const MAX_LABEL_LEN: usize = 80;
