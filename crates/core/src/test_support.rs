//! Shared fixtures for unit tests.

use crate::access::{Actor, RequestContext, Role};
use crate::db::Database;
use crate::models::CenterKind;
use crate::repositories::{
    admissions::AdmissionService, allergies, allergies::AllergyService, patients::PatientService,
    records::ClinicalRecordService, reference, reference::ReferenceService,
    reports::ReportService, staff, staff::NewStaff, staff::StaffService,
};
use api_shared::pb;

/// Context for a staff member that does not exist in storage. Enough for pure role checks.
pub(crate) fn ctx(role: Role) -> RequestContext {
    RequestContext::for_actor(Actor {
        staff_id: 0,
        role,
        display_name: "Test Staff".into(),
    })
}

pub(crate) fn patient_req(national_id: &str, given: &str, last: &str) -> pb::PatientReq {
    pb::PatientReq {
        national_id: national_id.into(),
        given_names: given.into(),
        last_names: last.into(),
        email: Some("ana.silva@saludmaule.cl".into()),
        phone: Some("+56911111110".into()),
        sex: Some("F".into()),
    }
}

/// Services over one database with two centers, four staff members and a small allergy catalog.
pub(crate) struct Fixture {
    pub db: Database,
    pub patients: PatientService,
    pub admissions: AdmissionService,
    pub records: ClinicalRecordService,
    pub allergies: AllergyService,
    pub reports: ReportService,
    pub staff: StaffService,
    pub reference: ReferenceService,

    pub hospital_id: i64,
    pub uci_id: i64,
    pub ward_id: i64,
    pub cesfam_id: i64,
    pub dental_id: i64,

    pub intake_id: i64,
    pub physician_id: i64,
    pub other_physician_id: i64,
    pub director_id: i64,

    pub intake: RequestContext,
    pub physician: RequestContext,
    pub other_physician: RequestContext,
    pub director: RequestContext,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_database(Database::open_in_memory().expect("open in-memory db"))
    }

    pub fn with_database(db: Database) -> Self {
        let ids = db
            .with_transaction(|tx| {
                let hospital =
                    reference::get_or_create_center(tx, "Hospital Regional", CenterKind::Hospital, "Talca")?;
                let uci = reference::get_or_create_area(tx, hospital, "UCI")?;
                let ward = reference::get_or_create_area(tx, hospital, "Hospitalización")?;
                let cesfam =
                    reference::get_or_create_center(tx, "CESFAM Norte", CenterKind::Cesfam, "Talca")?;
                let dental = reference::get_or_create_area(tx, cesfam, "Odontología")?;

                let mut staff_ids = Vec::new();
                for (rut, given, last, email, role) in [
                    ("22222222-2", "María", "González", "ingreso@saludmaule.cl", Role::AdministrativeIntake),
                    ("11111111-1", "Juan", "Pérez", "doctor@saludmaule.cl", Role::Physician),
                    ("10000009-1", "Pedro", "Araya", "pedro.araya@saludmaule.cl", Role::Physician),
                    ("33333333-3", "Carlos", "Rodríguez", "director@saludmaule.cl", Role::Director),
                ] {
                    let new = NewStaff::parse(rut, given, last, email, role)?;
                    staff_ids.push(staff::insert_staff(tx, &new)?);
                }

                allergies::ensure_catalog_category(tx, "Medicamentos", &["Penicilina", "Aspirina"])?;
                allergies::ensure_catalog_category(tx, "Alimentos", &["Maní"])?;

                Ok(([hospital, uci, ward, cesfam, dental], staff_ids))
            })
            .expect("seed fixture");
        let ([hospital_id, uci_id, ward_id, cesfam_id, dental_id], staff_ids) = ids;

        let actor = |staff_id: i64, role: Role, name: &str| {
            RequestContext::for_actor(Actor {
                staff_id,
                role,
                display_name: name.into(),
            })
        };

        Self {
            patients: PatientService::new(db.clone()),
            admissions: AdmissionService::new(db.clone()),
            records: ClinicalRecordService::new(db.clone()),
            allergies: AllergyService::new(db.clone()),
            reports: ReportService::new(db.clone()),
            staff: StaffService::new(db.clone()),
            reference: ReferenceService::new(db.clone()),
            db,
            hospital_id,
            uci_id,
            ward_id,
            cesfam_id,
            dental_id,
            intake_id: staff_ids[0],
            physician_id: staff_ids[1],
            other_physician_id: staff_ids[2],
            director_id: staff_ids[3],
            intake: actor(staff_ids[0], Role::AdministrativeIntake, "María González"),
            physician: actor(staff_ids[1], Role::Physician, "Juan Pérez"),
            other_physician: actor(staff_ids[2], Role::Physician, "Pedro Araya"),
            director: actor(staff_ids[3], Role::Director, "Carlos Rodríguez"),
        }
    }

    pub fn patient(&self, national_id: &str) -> pb::Patient {
        self.patient_named(national_id, "Ana", "Silva")
    }

    pub fn patient_named(&self, national_id: &str, given: &str, last: &str) -> pb::Patient {
        self.patients
            .create(&self.intake, patient_req(national_id, given, last))
            .expect("create patient")
    }

    /// Admission request for Hospital Regional / UCI.
    pub fn placement(&self, patient_id: i64) -> pb::CreateAdmissionReq {
        pb::CreateAdmissionReq {
            patient_id,
            center_id: self.hospital_id,
            area_id: self.uci_id,
        }
    }

    pub fn admit(&self, patient_id: i64) -> pb::Admission {
        self.admissions
            .create(&self.intake, &self.placement(patient_id))
            .expect("create admission")
    }

    /// Opens a record with the default physician as responsible.
    pub fn open_record(&self, admission_id: i64) -> pb::ClinicalRecord {
        self.records
            .create(
                &self.physician,
                admission_id,
                pb::CreateRecordReq {
                    sector: "Box 1".into(),
                    treatment_summary: "Observación".into(),
                    ..Default::default()
                },
            )
            .expect("create record")
    }
}
