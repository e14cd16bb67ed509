//! Patient registry.
//!
//! Intake staff create patients and maintain their identity and contact fields. The clinical
//! subset (weight, height, blood type, birth date, allergy notes) is only written by physicians
//! while editing a clinical record, through [`update_clinical_attributes`].

use super::{admissions, allergies, now_rfc3339};
use crate::access::{Operation, RequestContext};
use crate::db::Database;
use crate::error::{ClinicaError, ClinicaResult};
use crate::models::{ClinicalAttributes, NewPatient};
use api_shared::pb;
use rusqlite::{params, Connection, OptionalExtension, Row};

const PATIENT_COLUMNS: &str = "id, national_id, given_names, last_names, email, phone, sex, \
     weight_kg, height_m, blood_type, birth_date, allergy_notes, created_at";

#[derive(Clone, Debug)]
pub struct PatientService {
    db: Database,
}

impl PatientService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Registers a new patient.
    ///
    /// # Errors
    ///
    /// Returns a validation error if any field is malformed or the national ID is already
    /// registered.
    pub fn create(&self, ctx: &RequestContext, req: pb::PatientReq) -> ClinicaResult<pb::Patient> {
        let actor = ctx.require(Operation::CreatePatient)?;
        let patient = NewPatient::try_from(req)?;

        let created = self.db.with_transaction(|tx| {
            ensure_national_id_free(tx, patient.national_id.as_str(), None)?;
            let id = insert_patient(tx, &patient)?;
            load_patient(tx, id)
        })?;

        tracing::info!(patient_id = created.id, staff_id = actor.staff_id, "patient created");
        Ok(created)
    }

    /// Replaces the identity and contact fields of a patient.
    pub fn update(
        &self,
        ctx: &RequestContext,
        id: i64,
        req: pb::PatientReq,
    ) -> ClinicaResult<pb::Patient> {
        let actor = ctx.require(Operation::UpdatePatient)?;
        let patient = NewPatient::try_from(req)?;

        let updated = self.db.with_transaction(|tx| {
            load_patient(tx, id)?;
            ensure_national_id_free(tx, patient.national_id.as_str(), Some(id))?;
            tx.execute(
                "UPDATE patients
                 SET national_id = ?1, given_names = ?2, last_names = ?3, email = ?4, phone = ?5, sex = ?6
                 WHERE id = ?7",
                params![
                    patient.national_id.as_str(),
                    patient.given_names.as_str(),
                    patient.last_names.as_str(),
                    patient.email.as_ref().map(|e| e.as_str()),
                    patient.phone.as_ref().map(|p| p.as_str()),
                    patient.sex.map(|s| s.as_str()),
                    id,
                ],
            )?;
            load_patient(tx, id)
        })?;

        tracing::info!(patient_id = id, staff_id = actor.staff_id, "patient updated");
        Ok(updated)
    }

    /// A patient with allergy tags and every admission, newest first.
    pub fn get(&self, ctx: &RequestContext, id: i64) -> ClinicaResult<pb::PatientDetailRes> {
        ctx.require(Operation::ViewPatients)?;
        self.db.with_conn(|conn| {
            Ok(pb::PatientDetailRes {
                patient: load_patient(conn, id)?,
                allergies: allergies::patient_allergies(conn, id)?,
                admissions: admissions::list_for_patient(conn, id)?,
            })
        })
    }

    /// All patients ordered by last names, each with a summary of the latest admission.
    pub fn list(&self, ctx: &RequestContext) -> ClinicaResult<pb::ListPatientsRes> {
        ctx.require(Operation::ViewPatients)?;
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT p.id, p.national_id, p.given_names, p.last_names,
                        a.status, a.admitted_at, c.name
                 FROM patients p
                 LEFT JOIN admissions a ON a.id = (
                     SELECT id FROM admissions
                     WHERE patient_id = p.id
                     ORDER BY admitted_at DESC, id DESC
                     LIMIT 1
                 )
                 LEFT JOIN health_centers c ON c.id = a.center_id
                 ORDER BY p.last_names, p.given_names, p.id",
            )?;
            let patients = stmt
                .query_map([], |row| {
                    Ok(pb::PatientSummary {
                        id: row.get(0)?,
                        national_id: row.get(1)?,
                        given_names: row.get(2)?,
                        last_names: row.get(3)?,
                        latest_status: row.get(4)?,
                        latest_admitted_at: row.get(5)?,
                        current_center: row.get(6)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(pb::ListPatientsRes { patients })
        })
    }
}

fn ensure_national_id_free(
    conn: &Connection,
    national_id: &str,
    except_id: Option<i64>,
) -> ClinicaResult<()> {
    let taken: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM patients WHERE national_id = ?1 AND (?2 IS NULL OR id != ?2))",
        params![national_id, except_id],
        |row| row.get(0),
    )?;
    if taken {
        return Err(ClinicaError::InvalidInput(format!(
            "a patient with national ID {national_id} is already registered"
        )));
    }
    Ok(())
}

pub(crate) fn insert_patient(conn: &Connection, patient: &NewPatient) -> ClinicaResult<i64> {
    conn.execute(
        "INSERT INTO patients (national_id, given_names, last_names, email, phone, sex, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            patient.national_id.as_str(),
            patient.given_names.as_str(),
            patient.last_names.as_str(),
            patient.email.as_ref().map(|e| e.as_str()),
            patient.phone.as_ref().map(|p| p.as_str()),
            patient.sex.map(|s| s.as_str()),
            now_rfc3339(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn patient_from_row(row: &Row<'_>) -> rusqlite::Result<pb::Patient> {
    Ok(pb::Patient {
        id: row.get(0)?,
        national_id: row.get(1)?,
        given_names: row.get(2)?,
        last_names: row.get(3)?,
        email: row.get(4)?,
        phone: row.get(5)?,
        sex: row.get(6)?,
        weight_kg: row.get(7)?,
        height_m: row.get(8)?,
        blood_type: row.get(9)?,
        birth_date: row.get(10)?,
        allergy_notes: row.get(11)?,
        created_at: row.get(12)?,
    })
}

pub(crate) fn load_patient(conn: &Connection, id: i64) -> ClinicaResult<pb::Patient> {
    conn.query_row(
        &format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ?1"),
        [id],
        patient_from_row,
    )
    .optional()?
    .ok_or_else(|| ClinicaError::not_found("patient", id))
}

pub(crate) fn find_by_national_id(
    conn: &Connection,
    national_id: &str,
) -> ClinicaResult<Option<pb::Patient>> {
    Ok(conn
        .query_row(
            &format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE national_id = ?1"),
            [national_id],
            patient_from_row,
        )
        .optional()?)
}

/// Replaces the clinical subset of a patient. Callers run this inside their own transaction.
pub(crate) fn update_clinical_attributes(
    conn: &Connection,
    patient_id: i64,
    clinical: &ClinicalAttributes,
) -> ClinicaResult<()> {
    let changed = conn.execute(
        "UPDATE patients
         SET weight_kg = ?1, height_m = ?2, blood_type = ?3, birth_date = ?4, allergy_notes = ?5
         WHERE id = ?6",
        params![
            clinical.weight_kg,
            clinical.height_m,
            clinical.blood_type.map(|b| b.as_str()),
            clinical.birth_date.map(|d| d.format("%Y-%m-%d").to_string()),
            clinical.allergy_notes,
            patient_id,
        ],
    )?;
    if changed == 0 {
        return Err(ClinicaError::not_found("patient", patient_id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::Role;
    use crate::error::ErrorKind;
    use crate::models::BloodType;
    use crate::test_support::{ctx, patient_req, Fixture};
    use chrono::NaiveDate;

    #[test]
    fn intake_registers_a_patient() {
        let fx = Fixture::new();
        let patient = fx
            .patients
            .create(&fx.intake, patient_req("11111111-1", "Ana", "Silva"))
            .expect("intake may register patients");

        assert_eq!(patient.national_id, "11111111-1");
        assert_eq!(patient.email.as_deref(), Some("ana.silva@saludmaule.cl"));
        assert!(patient.weight_kg.is_none());
        assert!(!patient.created_at.is_empty());
    }

    #[test]
    fn physicians_cannot_register_patients() {
        let fx = Fixture::new();
        let err = fx
            .patients
            .create(&fx.physician, patient_req("11111111-1", "Ana", "Silva"))
            .expect_err("physicians do not register patients");
        assert_eq!(err.kind(), ErrorKind::Authorization);
    }

    #[test]
    fn duplicate_national_id_is_a_validation_error() {
        let fx = Fixture::new();
        fx.patient("11111111-1");
        let err = fx
            .patients
            .create(&fx.intake, patient_req("11111111-1", "Otra", "Persona"))
            .expect_err("duplicate national id");
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn update_replaces_identity_fields() {
        let fx = Fixture::new();
        let patient = fx.patient("11111111-1");
        let other = fx.patient("22222222-2");

        let mut req = patient_req("11111111-1", "Ana María", "Silva Rojas");
        req.email = None;
        let updated = fx
            .patients
            .update(&fx.intake, patient.id, req)
            .expect("update patient");
        assert_eq!(updated.given_names, "Ana María");
        assert!(updated.email.is_none());

        let err = fx
            .patients
            .update(&fx.intake, patient.id, patient_req("22222222-2", "Ana", "Silva"))
            .expect_err("national id belongs to another patient");
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_ne!(other.id, patient.id);

        let err = fx
            .patients
            .update(&fx.intake, 9_999, patient_req("33333333-3", "Ana", "Silva"))
            .expect_err("unknown patient");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn list_is_ordered_by_last_names_with_latest_admission() {
        let fx = Fixture::new();
        let zeta = fx.patient_named("11111111-1", "Ana", "Zúñiga");
        fx.patient_named("22222222-2", "Luis", "Araya");
        fx.admit(zeta.id);

        let res = fx.patients.list(&fx.physician).expect("physicians may list");
        let last_names: Vec<_> = res.patients.iter().map(|p| p.last_names.as_str()).collect();
        assert_eq!(last_names, ["Araya", "Zúñiga"]);

        assert!(res.patients[0].latest_status.is_none());
        assert_eq!(res.patients[1].latest_status.as_deref(), Some("in_treatment"));
        assert_eq!(
            res.patients[1].current_center.as_deref(),
            Some("Hospital Regional")
        );
    }

    #[test]
    fn directors_cannot_list_patients() {
        let fx = Fixture::new();
        let err = fx
            .patients
            .list(&ctx(Role::Director))
            .expect_err("directors use reports");
        assert_eq!(err.kind(), ErrorKind::Authorization);
    }

    #[test]
    fn detail_includes_admissions() {
        let fx = Fixture::new();
        let patient = fx.patient("11111111-1");
        fx.admit(patient.id);

        let detail = fx.patients.get(&fx.intake, patient.id).expect("detail");
        assert_eq!(detail.patient.id, patient.id);
        assert_eq!(detail.admissions.len(), 1);
        assert!(detail.allergies.is_empty());
    }

    #[test]
    fn clinical_attributes_are_written() {
        let fx = Fixture::new();
        let patient = fx.patient("11111111-1");
        let clinical = ClinicalAttributes {
            weight_kg: Some(70.5),
            height_m: Some(1.68),
            blood_type: Some(BloodType::ONegative),
            birth_date: NaiveDate::from_ymd_opt(1985, 3, 2),
            allergy_notes: Some("Penicilina".into()),
        };
        fx.db
            .with_transaction(|tx| update_clinical_attributes(tx, patient.id, &clinical))
            .expect("update clinical subset");

        let stored = fx.patients.get(&fx.physician, patient.id).expect("detail").patient;
        assert_eq!(stored.weight_kg, Some(70.5));
        assert_eq!(stored.blood_type.as_deref(), Some("O-"));
        assert_eq!(stored.birth_date.as_deref(), Some("1985-03-02"));
    }
}
