//! # Clinica Core
//!
//! Core business logic for the Clinica patient admission system.
//!
//! This crate contains pure data operations over a SQLite store:
//! - patients, admissions and the one-active-admission rule
//! - clinical records, append-only notes and the printable record document
//! - the allergy catalog, staff, reference data and director reports
//! - idempotent demo seeding
//!
//! Every protected operation takes an explicit [`RequestContext`] and checks the caller's role
//! before touching storage.
//!
//! **No API concerns**: HTTP servers, routing and response formatting belong in `api-rest`.

pub mod access;
pub mod config;
pub mod constants;
pub mod db;
pub mod document;
pub mod error;
pub mod models;
pub mod repositories;
pub mod seed;
pub mod validation;

pub use api_shared::pb;

pub use access::{Actor, Operation, RequestContext, Role};
pub use clinica_types::{
    EmailAddress, NationalId, NonEmptyText, PersonName, PhoneNumber, TextError,
};
pub use config::CoreConfig;
pub use db::Database;
pub use error::{ClinicaError, ClinicaResult, ErrorKind};
pub use models::{AdmissionStatus, BloodType, CenterKind, Sex};
pub use repositories::admissions::AdmissionService;
pub use repositories::allergies::AllergyService;
pub use repositories::patients::PatientService;
pub use repositories::records::ClinicalRecordService;
pub use repositories::reference::ReferenceService;
pub use repositories::reports::ReportService;
pub use repositories::staff::{NewStaff, StaffService};
pub use seed::{seed_demo_data, SeedSummary};

#[cfg(test)]
pub(crate) mod test_support;
