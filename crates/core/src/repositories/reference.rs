//! Health centers and their areas.

use crate::access::{Operation, RequestContext};
use crate::db::Database;
use crate::error::{ClinicaError, ClinicaResult};
use crate::models::CenterKind;
use api_shared::pb;
use rusqlite::{params, Connection, OptionalExtension};

#[derive(Clone, Debug)]
pub struct ReferenceService {
    db: Database,
}

impl ReferenceService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Lists every health center with its areas, ordered by name.
    pub fn list_centers(&self, ctx: &RequestContext) -> ClinicaResult<pb::ListCentersRes> {
        ctx.require(Operation::ViewReferenceData)?;
        self.db.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, name, kind, city FROM health_centers ORDER BY name")?;
            let mut centers = stmt
                .query_map([], |row| {
                    Ok(pb::HealthCenter {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        kind: row.get(2)?,
                        city: row.get(3)?,
                        areas: Vec::new(),
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            let mut areas =
                conn.prepare("SELECT id, name FROM areas WHERE center_id = ?1 ORDER BY name")?;
            for center in &mut centers {
                center.areas = areas
                    .query_map([center.id], |row| {
                        Ok(pb::Area {
                            id: row.get(0)?,
                            name: row.get(1)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
            }

            Ok(pb::ListCentersRes { centers })
        })
    }
}

/// Checks that both exist and that the area belongs to the center.
pub(crate) fn ensure_area_in_center(
    conn: &Connection,
    center_id: i64,
    area_id: i64,
) -> ClinicaResult<()> {
    let center_exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM health_centers WHERE id = ?1)",
        [center_id],
        |row| row.get(0),
    )?;
    if !center_exists {
        return Err(ClinicaError::not_found("health center", center_id));
    }

    let owner: Option<i64> = conn
        .query_row(
            "SELECT center_id FROM areas WHERE id = ?1",
            [area_id],
            |row| row.get(0),
        )
        .optional()?;
    match owner {
        None => Err(ClinicaError::not_found("area", area_id)),
        Some(owner) if owner != center_id => Err(ClinicaError::AreaNotInCenter),
        Some(_) => Ok(()),
    }
}

pub(crate) fn get_or_create_center(
    conn: &Connection,
    name: &str,
    kind: CenterKind,
    city: &str,
) -> ClinicaResult<i64> {
    conn.execute(
        "INSERT INTO health_centers (name, kind, city) VALUES (?1, ?2, ?3)
         ON CONFLICT(name) DO NOTHING",
        params![name, kind.as_str(), city],
    )?;
    Ok(conn.query_row(
        "SELECT id FROM health_centers WHERE name = ?1",
        [name],
        |row| row.get(0),
    )?)
}

pub(crate) fn get_or_create_area(
    conn: &Connection,
    center_id: i64,
    name: &str,
) -> ClinicaResult<i64> {
    conn.execute(
        "INSERT INTO areas (center_id, name) VALUES (?1, ?2)
         ON CONFLICT(center_id, name) DO NOTHING",
        params![center_id, name],
    )?;
    Ok(conn.query_row(
        "SELECT id FROM areas WHERE center_id = ?1 AND name = ?2",
        params![center_id, name],
        |row| row.get(0),
    )?)
}
