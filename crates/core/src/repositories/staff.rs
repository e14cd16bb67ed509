//! Staff members, API keys and assignments.
//!
//! API keys are shown once when issued and only their SHA-256 digest is stored. Resolving a
//! key yields the [`RequestContext`] used for every later call; an unknown key resolves to an
//! anonymous context rather than an error, so the authorization check of the operation itself
//! produces the failure.

use crate::access::{Actor, Operation, RequestContext, Role};
use crate::db::Database;
use crate::error::{ClinicaError, ClinicaResult};
use api_shared::auth::{generate_api_key, hash_api_key};
use api_shared::pb;
use clinica_types::{EmailAddress, NationalId, PersonName};
use rusqlite::{params, Connection, OptionalExtension};

use super::full_name;

/// A staff member to register.
#[derive(Clone, Debug)]
pub struct NewStaff {
    pub national_id: NationalId,
    pub given_names: PersonName,
    pub last_names: PersonName,
    pub institutional_email: EmailAddress,
    pub role: Role,
}

impl NewStaff {
    pub fn parse(
        national_id: &str,
        given_names: &str,
        last_names: &str,
        institutional_email: &str,
        role: Role,
    ) -> ClinicaResult<Self> {
        Ok(Self {
            national_id: NationalId::new(national_id)
                .map_err(ClinicaError::field("national_id"))?,
            given_names: PersonName::new(given_names)
                .map_err(ClinicaError::field("given_names"))?,
            last_names: PersonName::new(last_names).map_err(ClinicaError::field("last_names"))?,
            institutional_email: EmailAddress::new(institutional_email)
                .map_err(ClinicaError::field("institutional_email"))?,
            role,
        })
    }
}

#[derive(Clone, Debug)]
pub struct StaffService {
    db: Database,
}

impl StaffService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Registers a staff member and issues their first API key.
    ///
    /// This is an operator action run from the command line, so it takes no request context.
    pub fn create(&self, staff: &NewStaff) -> ClinicaResult<(pb::Staff, String)> {
        let api_key = generate_api_key();
        let created = self.db.with_transaction(|tx| {
            let id = insert_staff(tx, staff)?;
            store_key_hash(tx, id, &api_key)?;
            load_staff(tx, id)
        })?;
        tracing::info!(staff_id = created.id, role = %staff.role, "staff member created");
        Ok((created, api_key))
    }

    /// Replaces the API key of the staff member with `national_id`. The old key stops working.
    pub fn issue_key(&self, national_id: &str) -> ClinicaResult<String> {
        let national_id =
            NationalId::new(national_id).map_err(ClinicaError::field("national_id"))?;
        let api_key = generate_api_key();
        let staff_id = self.db.with_transaction(|tx| {
            let id = find_id_by_national_id(tx, national_id.as_str())?.ok_or_else(|| {
                ClinicaError::InvalidInput(format!(
                    "no staff member with national ID {national_id}"
                ))
            })?;
            store_key_hash(tx, id, &api_key)?;
            Ok(id)
        })?;
        tracing::info!(staff_id, "API key issued");
        Ok(api_key)
    }

    /// Resolves an API key to a request context. Unknown or blank keys give an anonymous one.
    pub fn authenticate(&self, api_key: Option<&str>) -> ClinicaResult<RequestContext> {
        let Some(api_key) = api_key.map(str::trim).filter(|k| !k.is_empty()) else {
            return Ok(RequestContext::anonymous());
        };
        let digest = hash_api_key(api_key);
        let found = self.db.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT id, role, given_names, last_names FROM staff WHERE api_key_hash = ?1",
                    [digest],
                    |row| {
                        Ok((
                            row.get::<_, i64>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, String>(3)?,
                        ))
                    },
                )
                .optional()?)
        })?;

        match found {
            Some((staff_id, role, given, last)) => Ok(RequestContext::for_actor(Actor {
                staff_id,
                role: role.parse()?,
                display_name: full_name(&given, &last),
            })),
            None => {
                tracing::debug!("unknown API key");
                Ok(RequestContext::anonymous())
            }
        }
    }

    /// Every staff member with assignments, ordered by last names.
    pub fn list(&self, ctx: &RequestContext) -> ClinicaResult<pb::ListStaffRes> {
        ctx.require(Operation::ManageStaff)?;
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id FROM staff ORDER BY last_names, given_names, id")?;
            let ids = stmt
                .query_map([], |row| row.get::<_, i64>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            let staff = ids
                .into_iter()
                .map(|id| load_staff(conn, id))
                .collect::<ClinicaResult<Vec<_>>>()?;
            Ok(pb::ListStaffRes { staff })
        })
    }

    /// Changes the role and institutional email of a staff member.
    ///
    /// A physician who is still responsible for clinical records keeps the physician role.
    pub fn update(
        &self,
        ctx: &RequestContext,
        id: i64,
        req: &pb::UpdateStaffReq,
    ) -> ClinicaResult<pb::Staff> {
        let actor = ctx.require(Operation::ManageStaff)?;
        let role: Role = req.role.parse()?;
        let email = EmailAddress::new(&req.institutional_email)
            .map_err(ClinicaError::field("institutional_email"))?;

        let updated = self.db.with_transaction(|tx| {
            let current = load_role(tx, id)?.ok_or_else(|| ClinicaError::not_found("staff", id))?;
            if current == Role::Physician && role != Role::Physician {
                let responsible: i64 = tx.query_row(
                    "SELECT COUNT(*) FROM clinical_records WHERE responsible_physician_id = ?1",
                    [id],
                    |row| row.get(0),
                )?;
                if responsible > 0 {
                    return Err(ClinicaError::InvalidInput(format!(
                        "staff member {id} is responsible for {responsible} clinical records and must remain a physician"
                    )));
                }
            }
            let email_taken: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM staff WHERE institutional_email = ?1 AND id != ?2)",
                params![email.as_str(), id],
                |row| row.get(0),
            )?;
            if email_taken {
                return Err(ClinicaError::InvalidInput(format!(
                    "institutional email {email} is already in use"
                )));
            }
            tx.execute(
                "UPDATE staff SET role = ?1, institutional_email = ?2 WHERE id = ?3",
                params![role.as_str(), email.as_str(), id],
            )?;
            load_staff(tx, id)
        })?;

        tracing::info!(staff_id = id, role = %role, by = actor.staff_id, "staff member updated");
        Ok(updated)
    }
}

pub(crate) fn insert_staff(conn: &Connection, staff: &NewStaff) -> ClinicaResult<i64> {
    let conflict: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM staff WHERE national_id = ?1 OR institutional_email = ?2)",
        params![staff.national_id.as_str(), staff.institutional_email.as_str()],
        |row| row.get(0),
    )?;
    if conflict {
        return Err(ClinicaError::InvalidInput(format!(
            "a staff member with national ID {} or email {} already exists",
            staff.national_id, staff.institutional_email
        )));
    }
    conn.execute(
        "INSERT INTO staff (national_id, given_names, last_names, institutional_email, role)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            staff.national_id.as_str(),
            staff.given_names.as_str(),
            staff.last_names.as_str(),
            staff.institutional_email.as_str(),
            staff.role.as_str(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub(crate) fn store_key_hash(conn: &Connection, staff_id: i64, api_key: &str) -> ClinicaResult<()> {
    conn.execute(
        "UPDATE staff SET api_key_hash = ?1 WHERE id = ?2",
        params![hash_api_key(api_key), staff_id],
    )?;
    Ok(())
}

pub(crate) fn find_id_by_national_id(
    conn: &Connection,
    national_id: &str,
) -> ClinicaResult<Option<i64>> {
    Ok(conn
        .query_row(
            "SELECT id FROM staff WHERE national_id = ?1",
            [national_id],
            |row| row.get(0),
        )
        .optional()?)
}

pub(crate) fn load_role(conn: &Connection, staff_id: i64) -> ClinicaResult<Option<Role>> {
    let role: Option<String> = conn
        .query_row("SELECT role FROM staff WHERE id = ?1", [staff_id], |row| {
            row.get(0)
        })
        .optional()?;
    role.map(|r| r.parse()).transpose()
}

/// Adds an active assignment unless the same one already exists.
pub(crate) fn assign(
    conn: &Connection,
    staff_id: i64,
    center_id: i64,
    area_id: Option<i64>,
) -> ClinicaResult<()> {
    conn.execute(
        "INSERT INTO staff_assignments (staff_id, center_id, area_id, active)
         SELECT ?1, ?2, ?3, 1
         WHERE NOT EXISTS (
             SELECT 1 FROM staff_assignments
             WHERE staff_id = ?1 AND center_id = ?2 AND area_id IS ?3
         )",
        params![staff_id, center_id, area_id],
    )?;
    Ok(())
}

pub(crate) fn load_staff(conn: &Connection, id: i64) -> ClinicaResult<pb::Staff> {
    let mut staff = conn
        .query_row(
            "SELECT id, national_id, given_names, last_names, institutional_email, role
             FROM staff WHERE id = ?1",
            [id],
            |row| {
                Ok(pb::Staff {
                    id: row.get(0)?,
                    national_id: row.get(1)?,
                    given_names: row.get(2)?,
                    last_names: row.get(3)?,
                    institutional_email: row.get(4)?,
                    role: row.get(5)?,
                    assignments: Vec::new(),
                })
            },
        )
        .optional()?
        .ok_or_else(|| ClinicaError::not_found("staff", id))?;

    let mut stmt = conn.prepare(
        "SELECT c.name, ar.name, sa.active
         FROM staff_assignments sa
         JOIN health_centers c ON c.id = sa.center_id
         LEFT JOIN areas ar ON ar.id = sa.area_id
         WHERE sa.staff_id = ?1
         ORDER BY c.name, ar.name",
    )?;
    staff.assignments = stmt
        .query_map([id], |row| {
            Ok(pb::StaffAssignment {
                center_name: row.get(0)?,
                area_name: row.get(1)?,
                active: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(staff)
}
