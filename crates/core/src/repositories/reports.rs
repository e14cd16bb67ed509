//! Director reports.

use crate::access::{Operation, RequestContext};
use crate::db::Database;
use crate::error::ClinicaResult;
use api_shared::pb;

#[derive(Clone, Debug)]
pub struct ReportService {
    db: Database,
}

impl ReportService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Every clinical record with its responsible physician, ordered by center name and then
    /// physician last names.
    pub fn physician_report(&self, ctx: &RequestContext) -> ClinicaResult<pb::PhysicianReportRes> {
        ctx.require(Operation::ViewPhysicianReport)?;
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT r.id, s.id, s.given_names || ' ' || s.last_names,
                        c.name, ar.name,
                        p.given_names || ' ' || p.last_names, p.national_id,
                        a.status, r.current_status
                 FROM clinical_records r
                 JOIN staff s ON s.id = r.responsible_physician_id
                 JOIN admissions a ON a.id = r.admission_id
                 JOIN patients p ON p.id = a.patient_id
                 JOIN health_centers c ON c.id = a.center_id
                 JOIN areas ar ON ar.id = a.area_id
                 ORDER BY c.name, s.last_names, s.given_names, r.id",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(pb::PhysicianReportRow {
                        record_id: row.get(0)?,
                        physician_id: row.get(1)?,
                        physician_name: row.get(2)?,
                        center_name: row.get(3)?,
                        area_name: row.get(4)?,
                        patient_name: row.get(5)?,
                        patient_national_id: row.get(6)?,
                        admission_status: row.get(7)?,
                        record_status: row.get(8)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(pb::PhysicianReportRes { rows })
        })
    }

    /// Per center: active admissions by status, plus all discharged admissions.
    ///
    /// Centers without admissions are listed with zero counts.
    pub fn admission_summary(&self, ctx: &RequestContext) -> ClinicaResult<pb::AdmissionSummaryRes> {
        ctx.require(Operation::ViewAdmissionSummary)?;
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id, c.name,
                        COALESCE(SUM(a.active = 1 AND a.status = 'in_treatment'), 0),
                        COALESCE(SUM(a.active = 1 AND a.status = 'pre_operative'), 0),
                        COALESCE(SUM(a.status = 'discharged'), 0)
                 FROM health_centers c
                 LEFT JOIN admissions a ON a.center_id = c.id
                 GROUP BY c.id, c.name
                 ORDER BY c.name",
            )?;
            let centers = stmt
                .query_map([], |row| {
                    Ok(pb::CenterAdmissionSummary {
                        center_id: row.get(0)?,
                        center_name: row.get(1)?,
                        in_treatment: row.get(2)?,
                        pre_operative: row.get(3)?,
                        discharged: row.get(4)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(pb::AdmissionSummaryRes { centers })
        })
    }
}
