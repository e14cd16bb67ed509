//! Wire types for the Clinica APIs.
//!
//! These are the request and response bodies of the REST API. `clinica-core` builds the
//! response types directly from storage rows, so they double as its read models.
//!
//! Enumerations travel as lowercase snake_case strings:
//! - admission / record status: `in_treatment`, `pre_operative`, `discharged`
//! - staff role: `administrative_intake`, `physician`, `director`
//! - center kind: `hospital`, `cesfam`
//!
//! Timestamps are RFC 3339 strings in UTC; dates are `YYYY-MM-DD`.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub error: String,
}

// ----------------------------------------------------------------------------
// Patients
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Patient {
    pub id: i64,
    pub national_id: String,
    pub given_names: String,
    pub last_names: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub sex: Option<String>,
    pub weight_kg: Option<f64>,
    pub height_m: Option<f64>,
    pub blood_type: Option<String>,
    pub birth_date: Option<String>,
    pub allergy_notes: Option<String>,
    pub created_at: String,
}

/// Patient list entry annotated with the latest admission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PatientSummary {
    pub id: i64,
    pub national_id: String,
    pub given_names: String,
    pub last_names: String,
    pub latest_status: Option<String>,
    pub latest_admitted_at: Option<String>,
    pub current_center: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ListPatientsRes {
    pub patients: Vec<PatientSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PatientDetailRes {
    pub patient: Patient,
    pub allergies: Vec<Allergy>,
    pub admissions: Vec<Admission>,
}

/// Identity and contact fields, used both to create and to update a patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PatientReq {
    pub national_id: String,
    pub given_names: String,
    pub last_names: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub sex: Option<String>,
}

/// Clinical subset of a patient, edited by physicians alongside a clinical record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PatientClinicalReq {
    #[serde(default)]
    pub weight_kg: Option<f64>,
    #[serde(default)]
    pub height_m: Option<f64>,
    #[serde(default)]
    pub blood_type: Option<String>,
    #[serde(default)]
    pub birth_date: Option<String>,
    #[serde(default)]
    pub allergy_notes: Option<String>,
}

// ----------------------------------------------------------------------------
// Admissions
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Admission {
    pub id: i64,
    pub patient_id: i64,
    pub patient_name: String,
    pub patient_national_id: String,
    pub center_id: i64,
    pub center_name: String,
    pub area_id: i64,
    pub area_name: String,
    pub status: String,
    pub admitted_at: String,
    pub discharge_details: Option<String>,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ListAdmissionsRes {
    pub admissions: Vec<Admission>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CreateAdmissionReq {
    pub patient_id: i64,
    pub center_id: i64,
    pub area_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UpdateAdmissionReq {
    pub patient_id: i64,
    pub center_id: i64,
    pub area_id: i64,
    /// `in_treatment` or `pre_operative`; discharge has its own endpoint.
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DischargeAdmissionReq {
    pub details: String,
}

// ----------------------------------------------------------------------------
// Clinical records and notes
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ClinicalRecord {
    pub id: i64,
    pub admission_id: i64,
    pub patient_id: i64,
    pub patient_name: String,
    pub center_name: String,
    pub area_name: String,
    pub current_status: String,
    pub sector: String,
    pub subsector: String,
    pub treatment_summary: String,
    pub responsible_physician_id: i64,
    pub responsible_physician_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ListRecordsRes {
    pub records: Vec<ClinicalRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RecordDetailRes {
    pub record: ClinicalRecord,
    pub admission: Admission,
    pub patient: Patient,
    pub allergies: Vec<Allergy>,
    pub notes: Vec<Note>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CreateRecordReq {
    /// Defaults to the acting physician.
    #[serde(default)]
    pub responsible_physician_id: Option<i64>,
    #[serde(default)]
    pub current_status: Option<String>,
    #[serde(default)]
    pub sector: String,
    #[serde(default)]
    pub subsector: String,
    #[serde(default)]
    pub treatment_summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UpdateRecordReq {
    pub current_status: String,
    #[serde(default)]
    pub sector: String,
    #[serde(default)]
    pub subsector: String,
    #[serde(default)]
    pub treatment_summary: String,
    #[serde(default)]
    pub responsible_physician_id: Option<i64>,
    #[serde(default)]
    pub clinical: Option<PatientClinicalReq>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Note {
    pub id: i64,
    pub record_id: i64,
    pub physician_id: i64,
    pub physician_name: String,
    pub written_at: String,
    pub detail: String,
}

/// Only the text is accepted; author and time are stamped by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CreateNoteReq {
    pub detail: String,
}

// ----------------------------------------------------------------------------
// Allergy catalog
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AllergyCategory {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Allergy {
    pub id: i64,
    pub category_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PatientAllergyReq {
    pub patient_id: i64,
    pub allergy_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PatientAllergyRes {
    pub status: String,
    /// Whether the call changed anything (a new tag, or a removed one).
    pub changed: bool,
    pub allergy: Allergy,
}

// ----------------------------------------------------------------------------
// Reference data and staff
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Area {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HealthCenter {
    pub id: i64,
    pub name: String,
    pub kind: String,
    pub city: String,
    pub areas: Vec<Area>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ListCentersRes {
    pub centers: Vec<HealthCenter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StaffAssignment {
    pub center_name: String,
    pub area_name: Option<String>,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Staff {
    pub id: i64,
    pub national_id: String,
    pub given_names: String,
    pub last_names: String,
    pub institutional_email: String,
    pub role: String,
    pub assignments: Vec<StaffAssignment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ListStaffRes {
    pub staff: Vec<Staff>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UpdateStaffReq {
    pub role: String,
    pub institutional_email: String,
}

// ----------------------------------------------------------------------------
// Reports
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PhysicianReportRow {
    pub record_id: i64,
    pub physician_id: i64,
    pub physician_name: String,
    pub center_name: String,
    pub area_name: String,
    pub patient_name: String,
    pub patient_national_id: String,
    pub admission_status: String,
    pub record_status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PhysicianReportRes {
    pub rows: Vec<PhysicianReportRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CenterAdmissionSummary {
    pub center_id: i64,
    pub center_name: String,
    pub in_treatment: i64,
    pub pre_operative: i64,
    pub discharged: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AdmissionSummaryRes {
    pub centers: Vec<CenterAdmissionSummary>,
}
