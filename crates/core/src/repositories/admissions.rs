//! Admissions and the one-active-admission rule.
//!
//! A patient may hold at most one admission with `active = 1`. Every write that can produce an
//! active admission (create, edit of an active admission, reactivation) checks for another active
//! admission of the same patient inside the same immediate transaction as the write, excluding
//! the admission being edited. The partial unique index declared in [`crate::db`] backs the check
//! and its violation is reported as the same validation error.

use super::{now_rfc3339, patients, reference};
use crate::access::{Operation, RequestContext};
use crate::db::{map_admission_write_error, Database};
use crate::error::{ClinicaError, ClinicaResult};
use crate::models::{clinical_text, parse_open_status, AdmissionPlacement, AdmissionStatus};
use api_shared::pb;
use rusqlite::{params, Connection, OptionalExtension, Row};

const ADMISSION_SELECT: &str = "
    SELECT a.id, a.patient_id, p.given_names || ' ' || p.last_names, p.national_id,
           a.center_id, c.name, a.area_id, ar.name,
           a.status, a.admitted_at, a.discharge_details, a.active
    FROM admissions a
    JOIN patients p ON p.id = a.patient_id
    JOIN health_centers c ON c.id = a.center_id
    JOIN areas ar ON ar.id = a.area_id";

#[derive(Clone, Debug)]
pub struct AdmissionService {
    db: Database,
}

impl AdmissionService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Admits a patient to an area of a health center.
    ///
    /// # Errors
    ///
    /// - [`ClinicaError::ActiveAdmissionExists`] if the patient already has an active admission
    /// - [`ClinicaError::AreaNotInCenter`] if the area belongs to another center
    /// - [`ClinicaError::NotFound`] for an unknown patient, center or area
    pub fn create(
        &self,
        ctx: &RequestContext,
        req: &pb::CreateAdmissionReq,
    ) -> ClinicaResult<pb::Admission> {
        let actor = ctx.require(Operation::CreateAdmission)?;
        let placement = AdmissionPlacement::from(req);

        let admission = self.db.with_transaction(|tx| {
            check_placement(tx, &placement)?;
            ensure_no_other_active(tx, placement.patient_id, None)?;
            let id = insert_active(tx, &placement)?;
            load_admission(tx, id)
        })?;

        tracing::info!(
            admission_id = admission.id,
            patient_id = admission.patient_id,
            staff_id = actor.staff_id,
            "admission created"
        );
        Ok(admission)
    }

    /// Edits the placement and, while the admission is active, its open status.
    pub fn update(
        &self,
        ctx: &RequestContext,
        id: i64,
        req: &pb::UpdateAdmissionReq,
    ) -> ClinicaResult<pb::Admission> {
        let actor = ctx.require(Operation::UpdateAdmission)?;
        let placement = AdmissionPlacement::from(req);
        let requested_status = parse_open_status(req.status.clone())?;

        let admission = self.db.with_transaction(|tx| {
            let existing = load_admission(tx, id)?;
            let status = match requested_status {
                Some(status) if !existing.active => {
                    return Err(ClinicaError::InvalidInput(format!(
                        "cannot set status {status} on a discharged admission; reactivate it first"
                    )));
                }
                Some(status) => status,
                None => existing.status.parse::<AdmissionStatus>()?,
            };

            check_placement(tx, &placement)?;
            if existing.active {
                ensure_no_other_active(tx, placement.patient_id, Some(id))?;
            }
            tx.execute(
                "UPDATE admissions SET patient_id = ?1, center_id = ?2, area_id = ?3, status = ?4
                 WHERE id = ?5",
                params![
                    placement.patient_id,
                    placement.center_id,
                    placement.area_id,
                    status.as_str(),
                    id,
                ],
            )
            .map_err(map_admission_write_error)?;
            load_admission(tx, id)
        })?;

        tracing::info!(admission_id = id, staff_id = actor.staff_id, "admission updated");
        Ok(admission)
    }

    /// Discharges an active admission, recording the discharge details.
    pub fn discharge(
        &self,
        ctx: &RequestContext,
        id: i64,
        req: &pb::DischargeAdmissionReq,
    ) -> ClinicaResult<pb::Admission> {
        let actor = ctx.require(Operation::DischargeAdmission)?;
        let details = clinical_text("details", &req.details)?;

        let admission = self.db.with_transaction(|tx| {
            let existing = load_admission(tx, id)?;
            if !existing.active {
                return Err(ClinicaError::InvalidInput(format!(
                    "admission {id} is already discharged"
                )));
            }
            tx.execute(
                "UPDATE admissions SET status = ?1, discharge_details = ?2, active = 0 WHERE id = ?3",
                params![AdmissionStatus::Discharged.as_str(), details.as_str(), id],
            )?;
            load_admission(tx, id)
        })?;

        tracing::info!(admission_id = id, staff_id = actor.staff_id, "admission discharged");
        Ok(admission)
    }

    /// Reopens a discharged admission as `in_treatment`, clearing its discharge details.
    pub fn reactivate(&self, ctx: &RequestContext, id: i64) -> ClinicaResult<pb::Admission> {
        let actor = ctx.require(Operation::ReactivateAdmission)?;

        let admission = self.db.with_transaction(|tx| {
            let existing = load_admission(tx, id)?;
            if existing.active {
                return Err(ClinicaError::InvalidInput(format!(
                    "admission {id} is already active"
                )));
            }
            ensure_no_other_active(tx, existing.patient_id, Some(id))?;
            tx.execute(
                "UPDATE admissions SET status = ?1, discharge_details = NULL, active = 1 WHERE id = ?2",
                params![AdmissionStatus::InTreatment.as_str(), id],
            )
            .map_err(map_admission_write_error)?;
            load_admission(tx, id)
        })?;

        tracing::info!(admission_id = id, staff_id = actor.staff_id, "admission reactivated");
        Ok(admission)
    }

    /// Deletes an admission together with its clinical records and their notes.
    pub fn delete(&self, ctx: &RequestContext, id: i64) -> ClinicaResult<()> {
        let actor = ctx.require(Operation::DeleteAdmission)?;
        self.db.with_transaction(|tx| {
            let deleted = tx.execute("DELETE FROM admissions WHERE id = ?1", [id])?;
            if deleted == 0 {
                return Err(ClinicaError::not_found("admission", id));
            }
            Ok(())
        })?;
        tracing::info!(admission_id = id, staff_id = actor.staff_id, "admission deleted");
        Ok(())
    }

    pub fn get(&self, ctx: &RequestContext, id: i64) -> ClinicaResult<pb::Admission> {
        ctx.require(Operation::ViewAdmissions)?;
        self.db.with_conn(|conn| load_admission(conn, id))
    }

    /// Every admission, newest first.
    pub fn list(&self, ctx: &RequestContext) -> ClinicaResult<pb::ListAdmissionsRes> {
        ctx.require(Operation::ViewAdmissions)?;
        self.db.with_conn(|conn| {
            let admissions = query_admissions(
                conn,
                &format!("{ADMISSION_SELECT} ORDER BY a.admitted_at DESC, a.id DESC"),
                [],
            )?;
            Ok(pb::ListAdmissionsRes { admissions })
        })
    }

    /// Physician worklist: active admissions, newest first.
    pub fn list_active(&self, ctx: &RequestContext) -> ClinicaResult<pb::ListAdmissionsRes> {
        ctx.require(Operation::ViewActiveAdmissions)?;
        self.db.with_conn(|conn| {
            let admissions = query_admissions(
                conn,
                &format!(
                    "{ADMISSION_SELECT} WHERE a.active = 1 ORDER BY a.admitted_at DESC, a.id DESC"
                ),
                [],
            )?;
            Ok(pb::ListAdmissionsRes { admissions })
        })
    }
}

fn check_placement(conn: &Connection, placement: &AdmissionPlacement) -> ClinicaResult<()> {
    patients::load_patient(conn, placement.patient_id)?;
    reference::ensure_area_in_center(conn, placement.center_id, placement.area_id)
}

/// Fails if `patient_id` has an active admission other than `except_id`.
pub(crate) fn ensure_no_other_active(
    conn: &Connection,
    patient_id: i64,
    except_id: Option<i64>,
) -> ClinicaResult<()> {
    let other: Option<i64> = conn
        .query_row(
            "SELECT id FROM admissions
             WHERE patient_id = ?1 AND active = 1 AND (?2 IS NULL OR id != ?2)
             LIMIT 1",
            params![patient_id, except_id],
            |row| row.get(0),
        )
        .optional()?;
    if let Some(other) = other {
        tracing::debug!(patient_id, other, "patient already has an active admission");
        return Err(ClinicaError::ActiveAdmissionExists);
    }
    Ok(())
}

/// Inserts an `in_treatment` admission. Callers check the placement and the active rule first.
pub(crate) fn insert_active(conn: &Connection, placement: &AdmissionPlacement) -> ClinicaResult<i64> {
    conn.execute(
        "INSERT INTO admissions (patient_id, center_id, area_id, status, admitted_at, active)
         VALUES (?1, ?2, ?3, ?4, ?5, 1)",
        params![
            placement.patient_id,
            placement.center_id,
            placement.area_id,
            AdmissionStatus::InTreatment.as_str(),
            now_rfc3339(),
        ],
    )
    .map_err(map_admission_write_error)?;
    Ok(conn.last_insert_rowid())
}

fn admission_from_row(row: &Row<'_>) -> rusqlite::Result<pb::Admission> {
    Ok(pb::Admission {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        patient_name: row.get(2)?,
        patient_national_id: row.get(3)?,
        center_id: row.get(4)?,
        center_name: row.get(5)?,
        area_id: row.get(6)?,
        area_name: row.get(7)?,
        status: row.get(8)?,
        admitted_at: row.get(9)?,
        discharge_details: row.get(10)?,
        active: row.get(11)?,
    })
}

fn query_admissions<P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> ClinicaResult<Vec<pb::Admission>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, admission_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub(crate) fn load_admission(conn: &Connection, id: i64) -> ClinicaResult<pb::Admission> {
    conn.query_row(
        &format!("{ADMISSION_SELECT} WHERE a.id = ?1"),
        [id],
        admission_from_row,
    )
    .optional()?
    .ok_or_else(|| ClinicaError::not_found("admission", id))
}

pub(crate) fn list_for_patient(
    conn: &Connection,
    patient_id: i64,
) -> ClinicaResult<Vec<pb::Admission>> {
    query_admissions(
        conn,
        &format!("{ADMISSION_SELECT} WHERE a.patient_id = ?1 ORDER BY a.admitted_at DESC, a.id DESC"),
        [patient_id],
    )
}
