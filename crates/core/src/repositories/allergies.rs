//! Allergy catalog and patient allergy tags.

use crate::access::{Operation, RequestContext};
use crate::db::Database;
use crate::error::{ClinicaError, ClinicaResult};
use api_shared::pb;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::patients;

#[derive(Clone, Debug)]
pub struct AllergyService {
    db: Database,
}

impl AllergyService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn list_categories(&self, ctx: &RequestContext) -> ClinicaResult<Vec<pb::AllergyCategory>> {
        ctx.require(Operation::ViewAllergyCatalog)?;
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, name FROM allergy_categories ORDER BY id")?;
            let categories = stmt
                .query_map([], |row| {
                    Ok(pb::AllergyCategory {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(categories)
        })
    }

    /// Allergies of one category, by name.
    pub fn list_by_category(
        &self,
        ctx: &RequestContext,
        category_id: i64,
    ) -> ClinicaResult<Vec<pb::Allergy>> {
        ctx.require(Operation::ViewAllergyCatalog)?;
        self.db.with_conn(|conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM allergy_categories WHERE id = ?1)",
                [category_id],
                |row| row.get(0),
            )?;
            if !exists {
                return Err(ClinicaError::not_found("allergy category", category_id));
            }
            let mut stmt = conn.prepare(
                "SELECT id, category_id, name FROM allergies WHERE category_id = ?1 ORDER BY name",
            )?;
            let allergies = stmt
                .query_map([category_id], allergy_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(allergies)
        })
    }

    /// Tags a patient with an allergy. Tagging twice is not an error; `changed` tells them apart.
    pub fn add_patient_allergy(
        &self,
        ctx: &RequestContext,
        req: &pb::PatientAllergyReq,
    ) -> ClinicaResult<pb::PatientAllergyRes> {
        let actor = ctx.require(Operation::TagPatientAllergy)?;
        let (allergy, changed) = self.db.with_transaction(|tx| {
            patients::load_patient(tx, req.patient_id)?;
            let allergy = load_allergy(tx, req.allergy_id)?;
            let inserted = tx.execute(
                "INSERT OR IGNORE INTO patient_allergies (patient_id, allergy_id) VALUES (?1, ?2)",
                params![req.patient_id, req.allergy_id],
            )?;
            Ok((allergy, inserted == 1))
        })?;

        if changed {
            tracing::info!(
                patient_id = req.patient_id,
                allergy_id = req.allergy_id,
                staff_id = actor.staff_id,
                "allergy tagged"
            );
        }
        Ok(pb::PatientAllergyRes {
            status: if changed { "added" } else { "already_present" }.into(),
            changed,
            allergy,
        })
    }

    pub fn remove_patient_allergy(
        &self,
        ctx: &RequestContext,
        req: &pb::PatientAllergyReq,
    ) -> ClinicaResult<pb::PatientAllergyRes> {
        let actor = ctx.require(Operation::TagPatientAllergy)?;
        let (allergy, changed) = self.db.with_transaction(|tx| {
            patients::load_patient(tx, req.patient_id)?;
            let allergy = load_allergy(tx, req.allergy_id)?;
            let deleted = tx.execute(
                "DELETE FROM patient_allergies WHERE patient_id = ?1 AND allergy_id = ?2",
                params![req.patient_id, req.allergy_id],
            )?;
            Ok((allergy, deleted == 1))
        })?;

        if changed {
            tracing::info!(
                patient_id = req.patient_id,
                allergy_id = req.allergy_id,
                staff_id = actor.staff_id,
                "allergy tag removed"
            );
        }
        Ok(pb::PatientAllergyRes {
            status: if changed { "removed" } else { "not_present" }.into(),
            changed,
            allergy,
        })
    }
}

fn allergy_from_row(row: &Row<'_>) -> rusqlite::Result<pb::Allergy> {
    Ok(pb::Allergy {
        id: row.get(0)?,
        category_id: row.get(1)?,
        name: row.get(2)?,
    })
}

fn load_allergy(conn: &Connection, id: i64) -> ClinicaResult<pb::Allergy> {
    conn.query_row(
        "SELECT id, category_id, name FROM allergies WHERE id = ?1",
        [id],
        allergy_from_row,
    )
    .optional()?
    .ok_or_else(|| ClinicaError::not_found("allergy", id))
}

/// Allergies a patient is tagged with, by name.
pub(crate) fn patient_allergies(
    conn: &Connection,
    patient_id: i64,
) -> ClinicaResult<Vec<pb::Allergy>> {
    let mut stmt = conn.prepare(
        "SELECT a.id, a.category_id, a.name
         FROM patient_allergies pa
         JOIN allergies a ON a.id = pa.allergy_id
         WHERE pa.patient_id = ?1
         ORDER BY a.name",
    )?;
    let allergies = stmt
        .query_map([patient_id], allergy_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(allergies)
}

/// Inserts a category and its allergies, keeping whatever already exists.
pub(crate) fn ensure_catalog_category(
    conn: &Connection,
    category: &str,
    allergies: &[&str],
) -> ClinicaResult<i64> {
    conn.execute(
        "INSERT INTO allergy_categories (name) VALUES (?1) ON CONFLICT(name) DO NOTHING",
        [category],
    )?;
    let category_id: i64 = conn.query_row(
        "SELECT id FROM allergy_categories WHERE name = ?1",
        [category],
        |row| row.get(0),
    )?;
    let mut insert = conn.prepare(
        "INSERT INTO allergies (category_id, name) VALUES (?1, ?2)
         ON CONFLICT(category_id, name) DO NOTHING",
    )?;
    for name in allergies {
        insert.execute(params![category_id, name])?;
    }
    Ok(category_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::test_support::Fixture;

    fn first_allergy(fx: &Fixture) -> pb::Allergy {
        let categories = fx.allergies.list_categories(&fx.physician).expect("categories");
        fx.allergies
            .list_by_category(&fx.physician, categories[0].id)
            .expect("allergies")
            .remove(0)
    }

    #[test]
    fn catalog_is_readable_by_intake_and_physicians() {
        let fx = Fixture::new();
        let categories = fx.allergies.list_categories(&fx.intake).expect("intake may read");
        assert_eq!(categories[0].name, "Medicamentos");

        let names: Vec<_> = fx
            .allergies
            .list_by_category(&fx.physician, categories[0].id)
            .expect("allergies")
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(names, ["Aspirina", "Penicilina"]);

        let err = fx
            .allergies
            .list_categories(&fx.director)
            .expect_err("directors do not read the catalog");
        assert_eq!(err.kind(), ErrorKind::Authorization);
    }

    #[test]
    fn unknown_category_is_not_found() {
        let fx = Fixture::new();
        let err = fx
            .allergies
            .list_by_category(&fx.physician, 9_999)
            .expect_err("unknown category");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn tagging_is_idempotent_and_removal_reports_change() {
        let fx = Fixture::new();
        let patient = fx.patient("11111111-1");
        let allergy = first_allergy(&fx);
        let req = pb::PatientAllergyReq {
            patient_id: patient.id,
            allergy_id: allergy.id,
        };

        let added = fx.allergies.add_patient_allergy(&fx.physician, &req).expect("tag");
        assert!(added.changed);
        assert_eq!(added.status, "added");
        let again = fx.allergies.add_patient_allergy(&fx.physician, &req).expect("tag again");
        assert!(!again.changed);
        assert_eq!(again.status, "already_present");

        let detail = fx.patients.get(&fx.physician, patient.id).expect("detail");
        assert_eq!(detail.allergies, vec![allergy.clone()]);

        let removed = fx
            .allergies
            .remove_patient_allergy(&fx.physician, &req)
            .expect("untag");
        assert!(removed.changed);
        let missing = fx
            .allergies
            .remove_patient_allergy(&fx.physician, &req)
            .expect("untag again");
        assert!(!missing.changed);
        assert_eq!(missing.status, "not_present");
    }

    #[test]
    fn tagging_requires_physician_and_known_ids() {
        let fx = Fixture::new();
        let patient = fx.patient("11111111-1");
        let allergy = first_allergy(&fx);

        let err = fx
            .allergies
            .add_patient_allergy(
                &fx.intake,
                &pb::PatientAllergyReq {
                    patient_id: patient.id,
                    allergy_id: allergy.id,
                },
            )
            .expect_err("intake cannot tag");
        assert_eq!(err.kind(), ErrorKind::Authorization);

        let err = fx
            .allergies
            .add_patient_allergy(
                &fx.physician,
                &pb::PatientAllergyReq {
                    patient_id: patient.id,
                    allergy_id: 9_999,
                },
            )
            .expect_err("unknown allergy");
        assert!(matches!(err, ClinicaError::NotFound { entity: "allergy", .. }));
    }
}
