//! Clinical records (fichas) and their notes.
//!
//! Records hang off an admission and name a responsible staff member, who must hold the
//! physician role whenever the record is saved. Notes are append-only: the author and time are
//! always taken from the request context and the clock, and the schema rejects updates.

use super::{admissions, allergies, now_rfc3339, patients, staff};
use crate::access::{Operation, RequestContext, Role};
use crate::db::Database;
use crate::document;
use crate::error::{ClinicaError, ClinicaResult};
use crate::models::{clinical_text, NewClinicalRecord, RecordUpdate};
use api_shared::pb;
use rusqlite::{params, Connection, OptionalExtension, Row};

const RECORD_SELECT: &str = "
    SELECT r.id, r.admission_id, a.patient_id, p.given_names || ' ' || p.last_names,
           c.name, ar.name, r.current_status, r.sector, r.subsector, r.treatment_summary,
           r.responsible_physician_id, s.given_names || ' ' || s.last_names
    FROM clinical_records r
    JOIN admissions a ON a.id = r.admission_id
    JOIN patients p ON p.id = a.patient_id
    JOIN health_centers c ON c.id = a.center_id
    JOIN areas ar ON ar.id = a.area_id
    JOIN staff s ON s.id = r.responsible_physician_id";

#[derive(Clone, Debug)]
pub struct ClinicalRecordService {
    db: Database,
}

impl ClinicalRecordService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Opens a clinical record on an active admission.
    ///
    /// The acting physician becomes responsible unless the request names someone else.
    ///
    /// # Errors
    ///
    /// - [`ClinicaError::ResponsibleNotPhysician`] if the responsible staff member is not a physician
    /// - a validation error if the admission is discharged or the responsible does not exist
    pub fn create(
        &self,
        ctx: &RequestContext,
        admission_id: i64,
        req: pb::CreateRecordReq,
    ) -> ClinicaResult<pb::ClinicalRecord> {
        let actor = ctx.require(Operation::CreateClinicalRecord)?;
        let record = NewClinicalRecord::try_from(req)?;
        let responsible = record.responsible_physician_id.unwrap_or(actor.staff_id);

        let created = self.db.with_transaction(|tx| {
            let admission = admissions::load_admission(tx, admission_id)?;
            if !admission.active {
                return Err(ClinicaError::InvalidInput(format!(
                    "admission {admission_id} is discharged; records can only be opened on active admissions"
                )));
            }
            ensure_physician(tx, responsible)?;
            tx.execute(
                "INSERT INTO clinical_records
                     (admission_id, current_status, sector, subsector, treatment_summary, responsible_physician_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    admission_id,
                    record.fields.current_status.as_str(),
                    record.fields.sector,
                    record.fields.subsector,
                    record.fields.treatment_summary,
                    responsible,
                ],
            )?;
            load_record(tx, tx.last_insert_rowid())
        })?;

        tracing::info!(
            record_id = created.id,
            admission_id,
            staff_id = actor.staff_id,
            "clinical record created"
        );
        Ok(created)
    }

    /// Saves record fields and, when given, the patient's clinical subset in one transaction.
    pub fn update(
        &self,
        ctx: &RequestContext,
        id: i64,
        req: pb::UpdateRecordReq,
    ) -> ClinicaResult<pb::ClinicalRecord> {
        let actor = ctx.require(Operation::UpdateClinicalRecord)?;
        let update = RecordUpdate::try_from(req)?;

        let updated = self.db.with_transaction(|tx| {
            let existing = load_record(tx, id)?;
            let responsible = update
                .responsible_physician_id
                .unwrap_or(existing.responsible_physician_id);
            ensure_physician(tx, responsible)?;
            tx.execute(
                "UPDATE clinical_records
                 SET current_status = ?1, sector = ?2, subsector = ?3, treatment_summary = ?4,
                     responsible_physician_id = ?5
                 WHERE id = ?6",
                params![
                    update.fields.current_status.as_str(),
                    update.fields.sector,
                    update.fields.subsector,
                    update.fields.treatment_summary,
                    responsible,
                    id,
                ],
            )?;
            if let Some(clinical) = &update.clinical {
                patients::update_clinical_attributes(tx, existing.patient_id, clinical)?;
            }
            load_record(tx, id)
        })?;

        tracing::info!(record_id = id, staff_id = actor.staff_id, "clinical record updated");
        Ok(updated)
    }

    /// Records for which the acting physician is responsible, newest first.
    pub fn list_own(&self, ctx: &RequestContext) -> ClinicaResult<pb::ListRecordsRes> {
        let actor = ctx.require(Operation::ListOwnClinicalRecords)?;
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{RECORD_SELECT} WHERE r.responsible_physician_id = ?1 ORDER BY r.id DESC"
            ))?;
            let records = stmt
                .query_map([actor.staff_id], record_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(pb::ListRecordsRes { records })
        })
    }

    /// A record with its admission, patient, allergy tags and notes (oldest first).
    pub fn get(&self, ctx: &RequestContext, id: i64) -> ClinicaResult<pb::RecordDetailRes> {
        ctx.require(Operation::ViewClinicalRecord)?;
        self.db.with_conn(|conn| load_record_detail(conn, id))
    }

    /// Appends a note to a record, stamped with the acting physician and the current time.
    pub fn create_note(
        &self,
        ctx: &RequestContext,
        record_id: i64,
        req: &pb::CreateNoteReq,
    ) -> ClinicaResult<pb::Note> {
        let actor = ctx.require(Operation::CreateNote)?;
        let detail = clinical_text("detail", &req.detail)?;

        let note = self.db.with_transaction(|tx| {
            load_record(tx, record_id)?;
            tx.execute(
                "INSERT INTO notes (record_id, physician_id, written_at, detail)
                 VALUES (?1, ?2, ?3, ?4)",
                params![record_id, actor.staff_id, now_rfc3339(), detail.as_str()],
            )?;
            load_note(tx, tx.last_insert_rowid())
        })?;

        tracing::info!(
            note_id = note.id,
            record_id,
            staff_id = actor.staff_id,
            "note written"
        );
        Ok(note)
    }

    /// Renders the record as a printable PDF.
    pub fn render_document(&self, ctx: &RequestContext, id: i64) -> ClinicaResult<Vec<u8>> {
        let actor = ctx.require(Operation::RenderRecordDocument)?;
        let detail = self.db.with_conn(|conn| load_record_detail(conn, id))?;
        let bytes = document::render_record(&detail)?;
        tracing::info!(record_id = id, staff_id = actor.staff_id, bytes = bytes.len(), "record document rendered");
        Ok(bytes)
    }
}

fn ensure_physician(conn: &Connection, staff_id: i64) -> ClinicaResult<()> {
    match staff::load_role(conn, staff_id)? {
        Some(Role::Physician) => Ok(()),
        Some(role) => {
            tracing::debug!(staff_id, %role, "responsible staff member is not a physician");
            Err(ClinicaError::ResponsibleNotPhysician)
        }
        None => Err(ClinicaError::InvalidInput(format!(
            "responsible staff member {staff_id} does not exist"
        ))),
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<pb::ClinicalRecord> {
    Ok(pb::ClinicalRecord {
        id: row.get(0)?,
        admission_id: row.get(1)?,
        patient_id: row.get(2)?,
        patient_name: row.get(3)?,
        center_name: row.get(4)?,
        area_name: row.get(5)?,
        current_status: row.get(6)?,
        sector: row.get(7)?,
        subsector: row.get(8)?,
        treatment_summary: row.get(9)?,
        responsible_physician_id: row.get(10)?,
        responsible_physician_name: row.get(11)?,
    })
}

fn note_from_row(row: &Row<'_>) -> rusqlite::Result<pb::Note> {
    Ok(pb::Note {
        id: row.get(0)?,
        record_id: row.get(1)?,
        physician_id: row.get(2)?,
        physician_name: row.get(3)?,
        written_at: row.get(4)?,
        detail: row.get(5)?,
    })
}

const NOTE_SELECT: &str = "
    SELECT n.id, n.record_id, n.physician_id, s.given_names || ' ' || s.last_names,
           n.written_at, n.detail
    FROM notes n
    JOIN staff s ON s.id = n.physician_id";

pub(crate) fn load_record(conn: &Connection, id: i64) -> ClinicaResult<pb::ClinicalRecord> {
    conn.query_row(
        &format!("{RECORD_SELECT} WHERE r.id = ?1"),
        [id],
        record_from_row,
    )
    .optional()?
    .ok_or_else(|| ClinicaError::not_found("clinical record", id))
}

fn load_note(conn: &Connection, id: i64) -> ClinicaResult<pb::Note> {
    conn.query_row(&format!("{NOTE_SELECT} WHERE n.id = ?1"), [id], note_from_row)
        .optional()?
        .ok_or_else(|| ClinicaError::not_found("note", id))
}

fn load_record_detail(conn: &Connection, id: i64) -> ClinicaResult<pb::RecordDetailRes> {
    let record = load_record(conn, id)?;
    let admission = admissions::load_admission(conn, record.admission_id)?;
    let patient = patients::load_patient(conn, record.patient_id)?;
    let allergies = allergies::patient_allergies(conn, record.patient_id)?;

    let mut stmt = conn.prepare(&format!(
        "{NOTE_SELECT} WHERE n.record_id = ?1 ORDER BY n.written_at, n.id"
    ))?;
    let notes = stmt
        .query_map([id], note_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(pb::RecordDetailRes {
        record,
        admission,
        patient,
        allergies,
        notes,
    })
}
