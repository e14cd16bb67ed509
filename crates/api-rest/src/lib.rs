//! # API REST
//!
//! REST API implementation for Clinica.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS, status codes)
//!
//! Callers authenticate with an `x-api-key` header. A missing or unknown key is rejected with
//! 403 before the request body is read. Otherwise the handler passes the resolved
//! [`RequestContext`](clinica_core::RequestContext) to `clinica-core`, which performs the role
//! check. Malformed JSON bodies are rejected with 422 and the usual `{ "error": .. }` body.

#![warn(rust_2018_idioms)]

mod context;
mod error;
mod handlers;

pub use error::{ApiError, ApiResult};

use api_shared::pb;
use axum::{
    routing::{get, post, put},
    Router,
};
use clinica_core::{
    AdmissionService, AllergyService, ClinicalRecordService, Database, PatientService,
    ReferenceService, ReportService, StaffService,
};
use tower_http::cors::CorsLayer;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

/// Application state for the REST API server
///
/// Holds one handle per core service; all share the same database.
#[derive(Clone)]
pub struct AppState {
    pub patients: PatientService,
    pub admissions: AdmissionService,
    pub records: ClinicalRecordService,
    pub allergies: AllergyService,
    pub reports: ReportService,
    pub staff: StaffService,
    pub reference: ReferenceService,
}

impl AppState {
    pub fn new(db: Database) -> Self {
        Self {
            patients: PatientService::new(db.clone()),
            admissions: AdmissionService::new(db.clone()),
            records: ClinicalRecordService::new(db.clone()),
            allergies: AllergyService::new(db.clone()),
            reports: ReportService::new(db.clone()),
            staff: StaffService::new(db.clone()),
            reference: ReferenceService::new(db),
        }
    }
}

struct ApiKeyAddon;

impl Modify for ApiKeyAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(
                    api_shared::auth::API_KEY_HEADER,
                ))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::list_patients,
        handlers::create_patient,
        handlers::get_patient,
        handlers::update_patient,
        handlers::list_admissions,
        handlers::create_admission,
        handlers::get_admission,
        handlers::update_admission,
        handlers::delete_admission,
        handlers::discharge_admission,
        handlers::reactivate_admission,
        handlers::list_active_admissions,
        handlers::create_record,
        handlers::list_own_records,
        handlers::get_record,
        handlers::update_record,
        handlers::create_note,
        handlers::record_document,
        handlers::allergy_categories,
        handlers::allergies_by_category,
        handlers::add_patient_allergy,
        handlers::remove_patient_allergy,
        handlers::physician_report,
        handlers::admission_summary,
        handlers::list_centers,
        handlers::list_staff,
        handlers::update_staff,
    ),
    components(schemas(
        pb::HealthRes,
        pb::ErrorRes,
        pb::Patient,
        pb::PatientSummary,
        pb::ListPatientsRes,
        pb::PatientDetailRes,
        pb::PatientReq,
        pb::PatientClinicalReq,
        pb::Admission,
        pb::ListAdmissionsRes,
        pb::CreateAdmissionReq,
        pb::UpdateAdmissionReq,
        pb::DischargeAdmissionReq,
        pb::ClinicalRecord,
        pb::ListRecordsRes,
        pb::RecordDetailRes,
        pb::CreateRecordReq,
        pb::UpdateRecordReq,
        pb::Note,
        pb::CreateNoteReq,
        pb::AllergyCategory,
        pb::Allergy,
        pb::PatientAllergyReq,
        pb::PatientAllergyRes,
        pb::Area,
        pb::HealthCenter,
        pb::ListCentersRes,
        pb::StaffAssignment,
        pb::Staff,
        pb::ListStaffRes,
        pb::UpdateStaffReq,
        pb::PhysicianReportRow,
        pb::PhysicianReportRes,
        pb::CenterAdmissionSummary,
        pb::AdmissionSummaryRes,
    )),
    modifiers(&ApiKeyAddon),
    security(("api_key" = []))
)]
pub struct ApiDoc;

/// Builds the REST router with Swagger UI and permissive CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/patients",
            get(handlers::list_patients).post(handlers::create_patient),
        )
        .route(
            "/patients/:id",
            get(handlers::get_patient).put(handlers::update_patient),
        )
        .route(
            "/admissions",
            get(handlers::list_admissions).post(handlers::create_admission),
        )
        .route(
            "/admissions/:id",
            get(handlers::get_admission)
                .put(handlers::update_admission)
                .delete(handlers::delete_admission),
        )
        .route(
            "/admissions/:id/discharge",
            post(handlers::discharge_admission),
        )
        .route(
            "/admissions/:id/reactivate",
            post(handlers::reactivate_admission),
        )
        .route("/admissions/:id/records", post(handlers::create_record))
        .route(
            "/physician/admissions",
            get(handlers::list_active_admissions),
        )
        .route("/records", get(handlers::list_own_records))
        .route(
            "/records/:id",
            get(handlers::get_record).put(handlers::update_record),
        )
        .route("/records/:id/notes", post(handlers::create_note))
        .route("/records/:id/document", get(handlers::record_document))
        .route(
            "/api/allergies/categories",
            get(handlers::allergy_categories),
        )
        .route(
            "/api/allergies/category/:id",
            get(handlers::allergies_by_category),
        )
        .route("/api/allergies/add", post(handlers::add_patient_allergy))
        .route(
            "/api/allergies/remove",
            post(handlers::remove_patient_allergy),
        )
        .route("/reports/physicians", get(handlers::physician_report))
        .route("/reports/admissions", get(handlers::admission_summary))
        .route("/centers", get(handlers::list_centers))
        .route("/staff", get(handlers::list_staff))
        .route("/staff/:id", put(handlers::update_staff))
        .merge(
            SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use api_shared::auth::API_KEY_HEADER;
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use clinica_core::seed_demo_data;
    use http_body_util::BodyExt;
    use serde::de::DeserializeOwned;
    use tower::ServiceExt;

    struct TestApp {
        router: Router,
        intake_key: String,
        physician_key: String,
        director_key: String,
    }

    impl TestApp {
        fn new() -> Self {
            let db = Database::open_in_memory().expect("open db");
            let summary = seed_demo_data(&db).expect("seed demo data");
            let key_for = |national_id: &str| {
                summary
                    .issued_keys
                    .iter()
                    .find(|k| k.national_id == national_id)
                    .map(|k| k.api_key.clone())
                    .expect("seeded key")
            };
            Self {
                intake_key: key_for("22222222-2"),
                physician_key: key_for("11111111-1"),
                director_key: key_for("33333333-3"),
                router: router(AppState::new(db)),
            }
        }

        async fn send(
            &self,
            method: Method,
            uri: &str,
            api_key: Option<&str>,
            body: Option<serde_json::Value>,
        ) -> (StatusCode, Vec<u8>) {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(key) = api_key {
                builder = builder.header(API_KEY_HEADER, key);
            }
            let request = match body {
                Some(json) => builder
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(json.to_string())),
                None => builder.body(Body::empty()),
            }
            .expect("build request");

            let response = self
                .router
                .clone()
                .oneshot(request)
                .await
                .expect("router is infallible");
            let status = response.status();
            let bytes = response
                .into_body()
                .collect()
                .await
                .expect("read body")
                .to_bytes()
                .to_vec();
            (status, bytes)
        }

        async fn json<T: DeserializeOwned>(
            &self,
            method: Method,
            uri: &str,
            api_key: &str,
            body: Option<serde_json::Value>,
            expected: StatusCode,
        ) -> T {
            let (status, bytes) = self.send(method, uri, Some(api_key), body).await;
            assert_eq!(
                status,
                expected,
                "unexpected status for {uri}: {}",
                String::from_utf8_lossy(&bytes)
            );
            serde_json::from_slice(&bytes).expect("decode response body")
        }

        async fn register_patient(&self, national_id: &str) -> pb::Patient {
            self.json(
                Method::POST,
                "/patients",
                &self.intake_key,
                Some(serde_json::json!({
                    "national_id": national_id,
                    "given_names": "Rosa",
                    "last_names": "Fuentes",
                })),
                StatusCode::CREATED,
            )
            .await
        }

        async fn hospital_uci(&self) -> (i64, i64) {
            let centers: pb::ListCentersRes = self
                .json(Method::GET, "/centers", &self.intake_key, None, StatusCode::OK)
                .await;
            let hospital = centers
                .centers
                .iter()
                .find(|c| c.name == "Hospital Regional")
                .expect("seeded hospital");
            let uci = hospital
                .areas
                .iter()
                .find(|a| a.name == "UCI")
                .expect("seeded UCI");
            (hospital.id, uci.id)
        }
    }

    #[tokio::test]
    async fn health_needs_no_key() {
        let app = TestApp::new();
        let (status, bytes) = app.send(Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        let body: pb::HealthRes = serde_json::from_slice(&bytes).expect("health body");
        assert!(body.ok);
    }

    #[tokio::test]
    async fn missing_or_unknown_key_is_forbidden() {
        let app = TestApp::new();
        let (status, bytes) = app.send(Method::GET, "/patients", None, None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let body: pb::ErrorRes = serde_json::from_slice(&bytes).expect("error body");
        assert!(!body.error.is_empty());

        let (status, _) = app
            .send(Method::GET, "/patients", Some("bogus"), None)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn anonymous_request_is_forbidden_before_the_body_is_read() {
        let app = TestApp::new();
        let (status, bytes) = app
            .send(
                Method::POST,
                "/admissions",
                None,
                Some(serde_json::json!({ "patient_id": "x" })),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let body: pb::ErrorRes = serde_json::from_slice(&bytes).expect("error body");
        assert!(body.error.contains("API key"));
    }

    #[tokio::test]
    async fn malformed_body_is_unprocessable_json_error() {
        let app = TestApp::new();
        let body: pb::ErrorRes = app
            .json(
                Method::POST,
                "/admissions",
                &app.intake_key,
                Some(serde_json::json!({ "center_id": 1 })),
                StatusCode::UNPROCESSABLE_ENTITY,
            )
            .await;
        assert!(body.error.contains("patient_id"), "{}", body.error);
    }

    #[tokio::test]
    async fn second_active_admission_is_unprocessable_until_discharge() {
        let app = TestApp::new();
        let patient = app.register_patient("44444444-4").await;
        let (center_id, area_id) = app.hospital_uci().await;
        let admit = serde_json::json!({
            "patient_id": patient.id,
            "center_id": center_id,
            "area_id": area_id,
        });

        let first: pb::Admission = app
            .json(
                Method::POST,
                "/admissions",
                &app.intake_key,
                Some(admit.clone()),
                StatusCode::CREATED,
            )
            .await;
        assert!(first.active);

        let rejected: pb::ErrorRes = app
            .json(
                Method::POST,
                "/admissions",
                &app.intake_key,
                Some(admit.clone()),
                StatusCode::UNPROCESSABLE_ENTITY,
            )
            .await;
        assert!(rejected.error.contains("active admission"));

        let discharged: pb::Admission = app
            .json(
                Method::POST,
                &format!("/admissions/{}/discharge", first.id),
                &app.physician_key,
                Some(serde_json::json!({ "details": "Alta médica" })),
                StatusCode::OK,
            )
            .await;
        assert!(!discharged.active);

        let _second: pb::Admission = app
            .json(
                Method::POST,
                "/admissions",
                &app.intake_key,
                Some(admit),
                StatusCode::CREATED,
            )
            .await;
    }

    #[tokio::test]
    async fn notes_are_for_physicians_only() {
        let app = TestApp::new();
        let patient = app.register_patient("44444444-4").await;
        let (center_id, area_id) = app.hospital_uci().await;
        let admission: pb::Admission = app
            .json(
                Method::POST,
                "/admissions",
                &app.intake_key,
                Some(serde_json::json!({
                    "patient_id": patient.id,
                    "center_id": center_id,
                    "area_id": area_id,
                })),
                StatusCode::CREATED,
            )
            .await;
        let record: pb::ClinicalRecord = app
            .json(
                Method::POST,
                &format!("/admissions/{}/records", admission.id),
                &app.physician_key,
                Some(serde_json::json!({ "sector": "Box 1" })),
                StatusCode::CREATED,
            )
            .await;
        assert_eq!(record.responsible_physician_name, "Juan Pérez");

        let note_uri = format!("/records/{}/notes", record.id);
        let note: pb::Note = app
            .json(
                Method::POST,
                &note_uri,
                &app.physician_key,
                Some(serde_json::json!({ "detail": "Ingresa estable" })),
                StatusCode::CREATED,
            )
            .await;
        assert_eq!(note.physician_name, "Juan Pérez");

        let (status, _) = app
            .send(
                Method::POST,
                &note_uri,
                Some(&app.intake_key),
                Some(serde_json::json!({ "detail": "No corresponde" })),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn record_document_is_a_pdf() {
        let app = TestApp::new();
        let worklist: pb::ListAdmissionsRes = app
            .json(
                Method::GET,
                "/physician/admissions",
                &app.physician_key,
                None,
                StatusCode::OK,
            )
            .await;
        let admission = &worklist.admissions[0];
        let record: pb::ClinicalRecord = app
            .json(
                Method::POST,
                &format!("/admissions/{}/records", admission.id),
                &app.physician_key,
                Some(serde_json::json!({})),
                StatusCode::CREATED,
            )
            .await;

        let uri = format!("/records/{}/document", record.id);
        let (status, bytes) = app
            .send(Method::GET, &uri, Some(&app.director_key), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let app = TestApp::new();
        let (status, _) = app
            .send(Method::GET, "/patients/9999", Some(&app.intake_key), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = app
            .send(
                Method::GET,
                "/api/allergies/category/9999",
                Some(&app.physician_key),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn director_reads_reports_but_not_patients() {
        let app = TestApp::new();
        let summary: pb::AdmissionSummaryRes = app
            .json(
                Method::GET,
                "/reports/admissions",
                &app.director_key,
                None,
                StatusCode::OK,
            )
            .await;
        let total: i64 = summary.centers.iter().map(|c| c.in_treatment).sum();
        assert_eq!(total, 10);

        let (status, _) = app
            .send(Method::GET, "/patients", Some(&app.director_key), None)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[test]
    fn openapi_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/health",
            "/patients/{id}",
            "/admissions/{id}/discharge",
            "/physician/admissions",
            "/records/{id}/document",
            "/api/allergies/add",
            "/reports/physicians",
            "/staff/{id}",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
