//! Demo data.
//!
//! Seeding is idempotent: every row is looked up by its natural key first and only missing rows
//! are created, so it is safe to run against a database that is already in use. API keys are
//! only issued for staff members created by this run.

use crate::access::Role;
use crate::db::Database;
use crate::error::ClinicaResult;
use crate::models::{AdmissionPlacement, CenterKind, ClinicalAttributes, NewPatient};
use crate::repositories::{admissions, allergies, patients, reference, staff};
use api_shared::auth::generate_api_key;
use api_shared::pb;
use chrono::NaiveDate;
use rusqlite::Connection;

const DEMO_STAFF: [(&str, &str, &str, &str, Role); 3] = [
    ("11111111-1", "Juan", "Pérez", "doctor@saludmaule.cl", Role::Physician),
    ("22222222-2", "María", "González", "ingreso@saludmaule.cl", Role::AdministrativeIntake),
    ("33333333-3", "Carlos", "Rodríguez", "director@saludmaule.cl", Role::Director),
];

const CENTERS: [(&str, CenterKind, &str, &[&str]); 2] = [
    (
        "Hospital Regional",
        CenterKind::Hospital,
        "Talca",
        &[
            "UCI",
            "Hospitalización",
            "Urgencias",
            "Parto",
            "Laboratorio",
            "Banco de sangre",
            "Imagenología",
            "Sala de espera",
        ],
    ),
    (
        "CESFAM Norte",
        CenterKind::Cesfam,
        "Talca",
        &["Banco de sangre", "Odontología", "Sala de espera"],
    ),
];

const GIVEN_NAMES: [&str; 10] = [
    "Ana", "Luis", "Pedro", "Carmen", "Diego", "Sofia", "Lucia", "Miguel", "Javier", "Elena",
];
const LAST_NAMES: [&str; 10] = [
    "Silva", "Rojas", "Molina", "Castro", "Ortiz", "Morales", "López", "Diaz", "Romero", "Torres",
];

const ALLERGY_CATALOG: [(&str, &[&str]); 4] = [
    (
        "Medicamentos",
        &[
            "Penicilina",
            "Sulfamidas",
            "Aspirina",
            "Ibuprofeno",
            "Codeína",
            "Morfina",
            "Anestesia Local",
            "Contrastes Yodados",
        ],
    ),
    (
        "Alimentos",
        &[
            "Maní", "Nueces", "Leche", "Huevos", "Pescado", "Mariscos", "Trigo", "Soya",
            "Frutillas", "Kiwi",
        ],
    ),
    (
        "Ambientales",
        &[
            "Polen",
            "Ácaros del polvo",
            "Moho",
            "Caspa de animales",
            "Picaduras de insectos (Abejas/Avispas)",
            "Látex",
        ],
    ),
    (
        "Otras",
        &["Níquel", "Cromo", "Cobalto", "Tintes de cabello", "Protectores solares"],
    ),
];

/// An API key issued to a staff member created during seeding. Shown once.
#[derive(Clone, Debug)]
pub struct IssuedKey {
    pub national_id: String,
    pub display_name: String,
    pub role: Role,
    pub api_key: String,
}

#[derive(Clone, Debug, Default)]
pub struct SeedSummary {
    pub issued_keys: Vec<IssuedKey>,
    pub areas: usize,
    pub patients_created: usize,
    pub admissions_created: usize,
}

#[derive(Clone, Copy)]
struct SeededArea {
    center_id: i64,
    area_id: i64,
}

/// Seeds staff, centers, per-area physicians, demo patients and the allergy catalog.
pub fn seed_demo_data(db: &Database) -> ClinicaResult<SeedSummary> {
    let summary = db.with_transaction(|tx| {
        let mut summary = SeedSummary::default();

        for (national_id, given, last, email, role) in DEMO_STAFF {
            ensure_staff(tx, &mut summary, national_id, given, last, email, role)?;
        }

        let areas = seed_centers(tx)?;
        summary.areas = areas.len();
        seed_area_physicians(tx, &mut summary, &areas)?;
        assign_static_physician(tx, &areas)?;
        seed_patients(tx, &mut summary, &areas)?;

        for (category, names) in ALLERGY_CATALOG {
            allergies::ensure_catalog_category(tx, category, names)?;
        }
        Ok(summary)
    })?;

    tracing::info!(
        staff_created = summary.issued_keys.len(),
        patients_created = summary.patients_created,
        admissions_created = summary.admissions_created,
        "demo data seeded"
    );
    Ok(summary)
}

/// Creates the staff member unless the national ID is already registered.
fn ensure_staff(
    conn: &Connection,
    summary: &mut SeedSummary,
    national_id: &str,
    given: &str,
    last: &str,
    email: &str,
    role: Role,
) -> ClinicaResult<Option<i64>> {
    if staff::find_id_by_national_id(conn, national_id)?.is_some() {
        tracing::debug!(national_id, "staff member already exists");
        return Ok(None);
    }
    let new = staff::NewStaff::parse(national_id, given, last, email, role)?;
    let id = staff::insert_staff(conn, &new)?;
    let api_key = generate_api_key();
    staff::store_key_hash(conn, id, &api_key)?;
    summary.issued_keys.push(IssuedKey {
        national_id: new.national_id.into_inner(),
        display_name: format!("{given} {last}"),
        role,
        api_key,
    });
    Ok(Some(id))
}

fn seed_centers(conn: &Connection) -> ClinicaResult<Vec<(SeededArea, String, String)>> {
    let mut areas = Vec::new();
    for (center_name, kind, city, area_names) in CENTERS {
        let center_id = reference::get_or_create_center(conn, center_name, kind, city)?;
        for area_name in area_names {
            let area_id = reference::get_or_create_area(conn, center_id, area_name)?;
            areas.push((
                SeededArea { center_id, area_id },
                center_name.to_string(),
                area_name.to_string(),
            ));
        }
    }
    Ok(areas)
}

/// One physician per area, numbered from 1 in seeding order.
fn seed_area_physicians(
    conn: &Connection,
    summary: &mut SeedSummary,
    areas: &[(SeededArea, String, String)],
) -> ClinicaResult<()> {
    for (i, (area, center_name, area_name)) in areas.iter().enumerate() {
        let i = i + 1;
        let national_id = format!("{}-{}", 10_000_000 + i, (i % 9) + 1);
        let created = ensure_staff(
            conn,
            summary,
            &national_id,
            &format!("Doctor {area_name}"),
            &format!("Area {center_name}"),
            &format!("doctor{i}@saludmaule.cl"),
            Role::Physician,
        )?;
        if let Some(staff_id) = created {
            staff::assign(conn, staff_id, area.center_id, Some(area.area_id))?;
        }
    }
    Ok(())
}

fn assign_static_physician(
    conn: &Connection,
    areas: &[(SeededArea, String, String)],
) -> ClinicaResult<()> {
    let Some((first, _, _)) = areas.first() else {
        return Ok(());
    };
    let Some(staff_id) = staff::find_id_by_national_id(conn, DEMO_STAFF[0].0)? else {
        return Ok(());
    };
    let has_assignment: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM staff_assignments WHERE staff_id = ?1 AND active = 1)",
        [staff_id],
        |row| row.get(0),
    )?;
    if !has_assignment {
        staff::assign(conn, staff_id, first.center_id, Some(first.area_id))?;
    }
    Ok(())
}

/// Ten patients, each admitted to `areas[i % len]` unless already actively admitted.
fn seed_patients(
    conn: &Connection,
    summary: &mut SeedSummary,
    areas: &[(SeededArea, String, String)],
) -> ClinicaResult<()> {
    if areas.is_empty() {
        return Ok(());
    }
    for i in 0..GIVEN_NAMES.len() {
        let national_id = format!("{}-{}", 15_000_000 + i, (i % 9) + 1);
        let given = GIVEN_NAMES[i % GIVEN_NAMES.len()];
        let last = LAST_NAMES[i % LAST_NAMES.len()];

        let patient_id = match patients::find_by_national_id(conn, &national_id)? {
            Some(existing) => existing.id,
            None => {
                let new = NewPatient::try_from(pb::PatientReq {
                    national_id: national_id.clone(),
                    given_names: given.into(),
                    last_names: last.into(),
                    email: Some(format!(
                        "{}.{}@saludmaule.cl",
                        given.to_lowercase(),
                        last.to_lowercase()
                    )),
                    phone: Some(format!("+5691111111{i}")),
                    sex: Some(if i % 2 == 0 { "M" } else { "F" }.into()),
                })?;
                let id = patients::insert_patient(conn, &new)?;
                let clinical = ClinicalAttributes {
                    birth_date: NaiveDate::from_ymd_opt(1980 + i as i32, 1, 1),
                    ..Default::default()
                };
                patients::update_clinical_attributes(conn, id, &clinical)?;
                summary.patients_created += 1;
                id
            }
        };

        let has_active: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM admissions WHERE patient_id = ?1 AND active = 1)",
            [patient_id],
            |row| row.get(0),
        )?;
        if !has_active {
            let (area, _, _) = areas[i % areas.len()];
            admissions::insert_active(
                conn,
                &AdmissionPlacement {
                    patient_id,
                    center_id: area.center_id,
                    area_id: area.area_id,
                },
            )?;
            summary.admissions_created += 1;
        }
    }
    Ok(())
}
