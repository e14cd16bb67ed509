//! HTTP handlers.
//!
//! Handlers are thin: they resolve the request context, call the matching core service and wrap
//! the result. All authorization and validation happens in `clinica-core`.

use crate::context::{Ctx, JsonBody};
use crate::error::ApiResult;
use crate::AppState;
use api_shared::{pb, HealthService};
use axum::{
    extract::{Path, State},
    http::{header, HeaderName, StatusCode},
    response::Json,
};

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = pb::HealthRes)
    )
)]
/// Health check endpoint for the REST API
///
/// Used by monitoring and load balancers; needs no API key.
#[axum::debug_handler]
pub(crate) async fn health(State(_state): State<AppState>) -> Json<pb::HealthRes> {
    Json(HealthService::check_health())
}

// ----------------------------------------------------------------------------
// Patients
// ----------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/patients",
    responses(
        (status = 200, description = "Patients ordered by last names", body = pb::ListPatientsRes),
        (status = 403, description = "Intake or physician role required", body = pb::ErrorRes)
    )
)]
/// List all patients with a summary of their latest admission
#[axum::debug_handler]
pub(crate) async fn list_patients(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
) -> ApiResult<Json<pb::ListPatientsRes>> {
    Ok(Json(state.patients.list(&ctx)?))
}

#[utoipa::path(
    post,
    path = "/patients",
    request_body = pb::PatientReq,
    responses(
        (status = 201, description = "Patient registered", body = pb::Patient),
        (status = 403, description = "Intake role required", body = pb::ErrorRes),
        (status = 422, description = "Invalid or duplicate patient data", body = pb::ErrorRes)
    )
)]
/// Register a new patient
#[axum::debug_handler]
pub(crate) async fn create_patient(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    JsonBody(req): JsonBody<pb::PatientReq>,
) -> ApiResult<(StatusCode, Json<pb::Patient>)> {
    let patient = state.patients.create(&ctx, req)?;
    Ok((StatusCode::CREATED, Json(patient)))
}

#[utoipa::path(
    get,
    path = "/patients/{id}",
    params(("id" = i64, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Patient with allergy tags and admissions", body = pb::PatientDetailRes),
        (status = 403, description = "Intake or physician role required", body = pb::ErrorRes),
        (status = 404, description = "Unknown patient", body = pb::ErrorRes)
    )
)]
/// Read a patient with allergy tags and admission history
#[axum::debug_handler]
pub(crate) async fn get_patient(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    Path(id): Path<i64>,
) -> ApiResult<Json<pb::PatientDetailRes>> {
    Ok(Json(state.patients.get(&ctx, id)?))
}

#[utoipa::path(
    put,
    path = "/patients/{id}",
    params(("id" = i64, Path, description = "Patient id")),
    request_body = pb::PatientReq,
    responses(
        (status = 200, description = "Patient updated", body = pb::Patient),
        (status = 403, description = "Intake role required", body = pb::ErrorRes),
        (status = 404, description = "Unknown patient", body = pb::ErrorRes),
        (status = 422, description = "Invalid or duplicate patient data", body = pb::ErrorRes)
    )
)]
/// Replace a patient's identity and contact fields
#[axum::debug_handler]
pub(crate) async fn update_patient(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    Path(id): Path<i64>,
    JsonBody(req): JsonBody<pb::PatientReq>,
) -> ApiResult<Json<pb::Patient>> {
    Ok(Json(state.patients.update(&ctx, id, req)?))
}

// ----------------------------------------------------------------------------
// Admissions
// ----------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/admissions",
    responses(
        (status = 200, description = "Admissions, newest first", body = pb::ListAdmissionsRes),
        (status = 403, description = "Intake or physician role required", body = pb::ErrorRes)
    )
)]
#[axum::debug_handler]
pub(crate) async fn list_admissions(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
) -> ApiResult<Json<pb::ListAdmissionsRes>> {
    Ok(Json(state.admissions.list(&ctx)?))
}

#[utoipa::path(
    post,
    path = "/admissions",
    request_body = pb::CreateAdmissionReq,
    responses(
        (status = 201, description = "Patient admitted", body = pb::Admission),
        (status = 403, description = "Intake role required", body = pb::ErrorRes),
        (status = 404, description = "Unknown patient, center or area", body = pb::ErrorRes),
        (status = 422, description = "Patient already has an active admission, or area not in center", body = pb::ErrorRes)
    )
)]
/// Admit a patient to an area of a health center
///
/// Fails with 422 while the patient has another active admission.
#[axum::debug_handler]
pub(crate) async fn create_admission(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    JsonBody(req): JsonBody<pb::CreateAdmissionReq>,
) -> ApiResult<(StatusCode, Json<pb::Admission>)> {
    let admission = state.admissions.create(&ctx, &req)?;
    Ok((StatusCode::CREATED, Json(admission)))
}

#[utoipa::path(
    get,
    path = "/admissions/{id}",
    params(("id" = i64, Path, description = "Admission id")),
    responses(
        (status = 200, description = "Admission", body = pb::Admission),
        (status = 403, description = "Intake or physician role required", body = pb::ErrorRes),
        (status = 404, description = "Unknown admission", body = pb::ErrorRes)
    )
)]
#[axum::debug_handler]
pub(crate) async fn get_admission(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    Path(id): Path<i64>,
) -> ApiResult<Json<pb::Admission>> {
    Ok(Json(state.admissions.get(&ctx, id)?))
}

#[utoipa::path(
    put,
    path = "/admissions/{id}",
    params(("id" = i64, Path, description = "Admission id")),
    request_body = pb::UpdateAdmissionReq,
    responses(
        (status = 200, description = "Admission updated", body = pb::Admission),
        (status = 403, description = "Intake role required", body = pb::ErrorRes),
        (status = 404, description = "Unknown admission, patient, center or area", body = pb::ErrorRes),
        (status = 422, description = "Invalid status or conflicting active admission", body = pb::ErrorRes)
    )
)]
/// Edit an admission's placement and open status
#[axum::debug_handler]
pub(crate) async fn update_admission(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    Path(id): Path<i64>,
    JsonBody(req): JsonBody<pb::UpdateAdmissionReq>,
) -> ApiResult<Json<pb::Admission>> {
    Ok(Json(state.admissions.update(&ctx, id, &req)?))
}

#[utoipa::path(
    delete,
    path = "/admissions/{id}",
    params(("id" = i64, Path, description = "Admission id")),
    responses(
        (status = 204, description = "Admission and its records deleted"),
        (status = 403, description = "Intake role required", body = pb::ErrorRes),
        (status = 404, description = "Unknown admission", body = pb::ErrorRes)
    )
)]
#[axum::debug_handler]
pub(crate) async fn delete_admission(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    state.admissions.delete(&ctx, id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/admissions/{id}/discharge",
    params(("id" = i64, Path, description = "Admission id")),
    request_body = pb::DischargeAdmissionReq,
    responses(
        (status = 200, description = "Admission discharged", body = pb::Admission),
        (status = 403, description = "Intake or physician role required", body = pb::ErrorRes),
        (status = 404, description = "Unknown admission", body = pb::ErrorRes),
        (status = 422, description = "Missing details or already discharged", body = pb::ErrorRes)
    )
)]
/// Discharge an active admission
#[axum::debug_handler]
pub(crate) async fn discharge_admission(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    Path(id): Path<i64>,
    JsonBody(req): JsonBody<pb::DischargeAdmissionReq>,
) -> ApiResult<Json<pb::Admission>> {
    Ok(Json(state.admissions.discharge(&ctx, id, &req)?))
}

#[utoipa::path(
    post,
    path = "/admissions/{id}/reactivate",
    params(("id" = i64, Path, description = "Admission id")),
    responses(
        (status = 200, description = "Admission reactivated", body = pb::Admission),
        (status = 403, description = "Intake role required", body = pb::ErrorRes),
        (status = 404, description = "Unknown admission", body = pb::ErrorRes),
        (status = 422, description = "Already active, or another admission is active", body = pb::ErrorRes)
    )
)]
#[axum::debug_handler]
pub(crate) async fn reactivate_admission(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    Path(id): Path<i64>,
) -> ApiResult<Json<pb::Admission>> {
    Ok(Json(state.admissions.reactivate(&ctx, id)?))
}

#[utoipa::path(
    get,
    path = "/physician/admissions",
    responses(
        (status = 200, description = "Active admissions, newest first", body = pb::ListAdmissionsRes),
        (status = 403, description = "Physician role required", body = pb::ErrorRes)
    )
)]
/// Physician worklist of active admissions
#[axum::debug_handler]
pub(crate) async fn list_active_admissions(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
) -> ApiResult<Json<pb::ListAdmissionsRes>> {
    Ok(Json(state.admissions.list_active(&ctx)?))
}

// ----------------------------------------------------------------------------
// Clinical records and notes
// ----------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/admissions/{id}/records",
    params(("id" = i64, Path, description = "Admission id")),
    request_body = pb::CreateRecordReq,
    responses(
        (status = 201, description = "Clinical record opened", body = pb::ClinicalRecord),
        (status = 403, description = "Physician role required", body = pb::ErrorRes),
        (status = 404, description = "Unknown admission", body = pb::ErrorRes),
        (status = 422, description = "Discharged admission or responsible is not a physician", body = pb::ErrorRes)
    )
)]
/// Open a clinical record on an active admission
#[axum::debug_handler]
pub(crate) async fn create_record(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    Path(admission_id): Path<i64>,
    JsonBody(req): JsonBody<pb::CreateRecordReq>,
) -> ApiResult<(StatusCode, Json<pb::ClinicalRecord>)> {
    let record = state.records.create(&ctx, admission_id, req)?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[utoipa::path(
    get,
    path = "/records",
    responses(
        (status = 200, description = "Records the caller is responsible for", body = pb::ListRecordsRes),
        (status = 403, description = "Physician role required", body = pb::ErrorRes)
    )
)]
#[axum::debug_handler]
pub(crate) async fn list_own_records(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
) -> ApiResult<Json<pb::ListRecordsRes>> {
    Ok(Json(state.records.list_own(&ctx)?))
}

#[utoipa::path(
    get,
    path = "/records/{id}",
    params(("id" = i64, Path, description = "Clinical record id")),
    responses(
        (status = 200, description = "Record with admission, patient and notes", body = pb::RecordDetailRes),
        (status = 403, description = "Physician or director role required", body = pb::ErrorRes),
        (status = 404, description = "Unknown record", body = pb::ErrorRes)
    )
)]
#[axum::debug_handler]
pub(crate) async fn get_record(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    Path(id): Path<i64>,
) -> ApiResult<Json<pb::RecordDetailRes>> {
    Ok(Json(state.records.get(&ctx, id)?))
}

#[utoipa::path(
    put,
    path = "/records/{id}",
    params(("id" = i64, Path, description = "Clinical record id")),
    request_body = pb::UpdateRecordReq,
    responses(
        (status = 200, description = "Record updated", body = pb::ClinicalRecord),
        (status = 403, description = "Physician role required", body = pb::ErrorRes),
        (status = 404, description = "Unknown record", body = pb::ErrorRes),
        (status = 422, description = "Invalid record or clinical data", body = pb::ErrorRes)
    )
)]
/// Save a clinical record and, optionally, the patient's clinical data
#[axum::debug_handler]
pub(crate) async fn update_record(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    Path(id): Path<i64>,
    JsonBody(req): JsonBody<pb::UpdateRecordReq>,
) -> ApiResult<Json<pb::ClinicalRecord>> {
    Ok(Json(state.records.update(&ctx, id, req)?))
}

#[utoipa::path(
    post,
    path = "/records/{id}/notes",
    params(("id" = i64, Path, description = "Clinical record id")),
    request_body = pb::CreateNoteReq,
    responses(
        (status = 201, description = "Note appended", body = pb::Note),
        (status = 403, description = "Physician role required", body = pb::ErrorRes),
        (status = 404, description = "Unknown record", body = pb::ErrorRes),
        (status = 422, description = "Empty note", body = pb::ErrorRes)
    )
)]
/// Append a note; author and time are set by the server
#[axum::debug_handler]
pub(crate) async fn create_note(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    Path(record_id): Path<i64>,
    JsonBody(req): JsonBody<pb::CreateNoteReq>,
) -> ApiResult<(StatusCode, Json<pb::Note>)> {
    let note = state.records.create_note(&ctx, record_id, &req)?;
    Ok((StatusCode::CREATED, Json(note)))
}

#[utoipa::path(
    get,
    path = "/records/{id}/document",
    params(("id" = i64, Path, description = "Clinical record id")),
    responses(
        (status = 200, description = "Printable record", body = Vec<u8>, content_type = "application/pdf"),
        (status = 403, description = "Physician or director role required", body = pb::ErrorRes),
        (status = 404, description = "Unknown record", body = pb::ErrorRes),
        (status = 500, description = "Document generation failed", body = pb::ErrorRes)
    )
)]
/// Download the clinical record as a PDF
#[axum::debug_handler]
pub(crate) async fn record_document(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    Path(id): Path<i64>,
) -> ApiResult<([(HeaderName, String); 2], Vec<u8>)> {
    let bytes = state.records.render_document(&ctx, id)?;
    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"ficha_{id}.pdf\""),
        ),
    ];
    Ok((headers, bytes))
}

// ----------------------------------------------------------------------------
// Allergy catalog
// ----------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/allergies/categories",
    responses(
        (status = 200, description = "Allergy categories", body = [pb::AllergyCategory]),
        (status = 403, description = "Intake or physician role required", body = pb::ErrorRes)
    )
)]
#[axum::debug_handler]
pub(crate) async fn allergy_categories(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
) -> ApiResult<Json<Vec<pb::AllergyCategory>>> {
    Ok(Json(state.allergies.list_categories(&ctx)?))
}

#[utoipa::path(
    get,
    path = "/api/allergies/category/{id}",
    params(("id" = i64, Path, description = "Allergy category id")),
    responses(
        (status = 200, description = "Allergies in the category", body = [pb::Allergy]),
        (status = 403, description = "Intake or physician role required", body = pb::ErrorRes),
        (status = 404, description = "Unknown category", body = pb::ErrorRes)
    )
)]
#[axum::debug_handler]
pub(crate) async fn allergies_by_category(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<pb::Allergy>>> {
    Ok(Json(state.allergies.list_by_category(&ctx, id)?))
}

#[utoipa::path(
    post,
    path = "/api/allergies/add",
    request_body = pb::PatientAllergyReq,
    responses(
        (status = 200, description = "Allergy tagged (or already present)", body = pb::PatientAllergyRes),
        (status = 403, description = "Physician role required", body = pb::ErrorRes),
        (status = 404, description = "Unknown patient or allergy", body = pb::ErrorRes)
    )
)]
#[axum::debug_handler]
pub(crate) async fn add_patient_allergy(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    JsonBody(req): JsonBody<pb::PatientAllergyReq>,
) -> ApiResult<Json<pb::PatientAllergyRes>> {
    Ok(Json(state.allergies.add_patient_allergy(&ctx, &req)?))
}

#[utoipa::path(
    post,
    path = "/api/allergies/remove",
    request_body = pb::PatientAllergyReq,
    responses(
        (status = 200, description = "Allergy tag removed (or was not present)", body = pb::PatientAllergyRes),
        (status = 403, description = "Physician role required", body = pb::ErrorRes),
        (status = 404, description = "Unknown patient or allergy", body = pb::ErrorRes)
    )
)]
#[axum::debug_handler]
pub(crate) async fn remove_patient_allergy(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    JsonBody(req): JsonBody<pb::PatientAllergyReq>,
) -> ApiResult<Json<pb::PatientAllergyRes>> {
    Ok(Json(state.allergies.remove_patient_allergy(&ctx, &req)?))
}

// ----------------------------------------------------------------------------
// Reports, reference data and staff
// ----------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/reports/physicians",
    responses(
        (status = 200, description = "Records by center and responsible physician", body = pb::PhysicianReportRes),
        (status = 403, description = "Director role required", body = pb::ErrorRes)
    )
)]
#[axum::debug_handler]
pub(crate) async fn physician_report(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
) -> ApiResult<Json<pb::PhysicianReportRes>> {
    Ok(Json(state.reports.physician_report(&ctx)?))
}

#[utoipa::path(
    get,
    path = "/reports/admissions",
    responses(
        (status = 200, description = "Admission counts per center", body = pb::AdmissionSummaryRes),
        (status = 403, description = "Director role required", body = pb::ErrorRes)
    )
)]
#[axum::debug_handler]
pub(crate) async fn admission_summary(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
) -> ApiResult<Json<pb::AdmissionSummaryRes>> {
    Ok(Json(state.reports.admission_summary(&ctx)?))
}

#[utoipa::path(
    get,
    path = "/centers",
    responses(
        (status = 200, description = "Health centers with their areas", body = pb::ListCentersRes),
        (status = 403, description = "API key required", body = pb::ErrorRes)
    )
)]
#[axum::debug_handler]
pub(crate) async fn list_centers(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
) -> ApiResult<Json<pb::ListCentersRes>> {
    Ok(Json(state.reference.list_centers(&ctx)?))
}

#[utoipa::path(
    get,
    path = "/staff",
    responses(
        (status = 200, description = "Staff members with assignments", body = pb::ListStaffRes),
        (status = 403, description = "Director role required", body = pb::ErrorRes)
    )
)]
#[axum::debug_handler]
pub(crate) async fn list_staff(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
) -> ApiResult<Json<pb::ListStaffRes>> {
    Ok(Json(state.staff.list(&ctx)?))
}

#[utoipa::path(
    put,
    path = "/staff/{id}",
    params(("id" = i64, Path, description = "Staff member id")),
    request_body = pb::UpdateStaffReq,
    responses(
        (status = 200, description = "Staff member updated", body = pb::Staff),
        (status = 403, description = "Director role required", body = pb::ErrorRes),
        (status = 404, description = "Unknown staff member", body = pb::ErrorRes),
        (status = 422, description = "Invalid role or email", body = pb::ErrorRes)
    )
)]
/// Change a staff member's role and institutional email
#[axum::debug_handler]
pub(crate) async fn update_staff(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    Path(id): Path<i64>,
    JsonBody(req): JsonBody<pb::UpdateStaffReq>,
) -> ApiResult<Json<pb::Staff>> {
    Ok(Json(state.staff.update(&ctx, id, &req)?))
}
