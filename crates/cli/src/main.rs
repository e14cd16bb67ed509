use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clinica_core::{
    config::database_path_from_env_value, seed_demo_data, CoreConfig, Database, NewStaff,
    PatientService, Role, StaffService,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "clinica")]
#[command(about = "Clinica admission and clinical-record system CLI")]
struct Cli {
    /// SQLite database file
    #[arg(long, env = "CLINICA_DATABASE_PATH")]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed demo centers, staff, patients and the allergy catalog
    Seed,
    /// List all patients with their latest admission
    ListPatients {
        /// API key of an administrative-intake or physician staff member
        #[arg(long, env = "CLINICA_API_KEY", hide_env_values = true)]
        api_key: String,
    },
    /// Register a staff member and print their API key
    AddStaff {
        /// National ID (RUT), e.g. 12345678-9
        national_id: String,
        /// Given names
        given_names: String,
        /// Last names
        last_names: String,
        /// Institutional email
        email: String,
        /// One of: administrative_intake, physician, director
        #[arg(long)]
        role: Role,
    },
    /// Issue a fresh API key for an existing staff member
    IssueKey {
        /// National ID (RUT) of the staff member
        national_id: String,
    },
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("clinica=warn".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("Use 'clinica --help' for commands");
        return Ok(());
    };

    let cfg = CoreConfig::new(database_path_from_env_value(
        cli.database.map(|p| p.to_string_lossy().into_owned()),
    ))?;
    let db = Database::open(&cfg)?;

    run(command, db, &mut std::io::stdout().lock())
}

fn run(command: Commands, db: Database, out: &mut impl Write) -> anyhow::Result<()> {
    match command {
        Commands::Seed => {
            let summary = seed_demo_data(&db)?;
            writeln!(
                out,
                "Seeded {} areas, {} patients, {} admissions.",
                summary.areas, summary.patients_created, summary.admissions_created
            )?;
            if summary.issued_keys.is_empty() {
                writeln!(out, "No new staff; use 'clinica issue-key' for fresh keys.")?;
            }
            for key in summary.issued_keys {
                writeln!(
                    out,
                    "{:<12} {:<22} {:<40} {}",
                    key.national_id, key.role, key.display_name, key.api_key
                )?;
            }
        }
        Commands::ListPatients { api_key } => {
            let ctx = StaffService::new(db.clone()).authenticate(Some(&api_key))?;
            let patients = PatientService::new(db).list(&ctx)?.patients;
            if patients.is_empty() {
                writeln!(out, "No patients found.")?;
            }
            for patient in patients {
                writeln!(
                    out,
                    "ID: {}, RUT: {}, Name: {} {}, Status: {}, Center: {}",
                    patient.id,
                    patient.national_id,
                    patient.given_names,
                    patient.last_names,
                    patient.latest_status.as_deref().unwrap_or("-"),
                    patient.current_center.as_deref().unwrap_or("-"),
                )?;
            }
        }
        Commands::AddStaff {
            national_id,
            given_names,
            last_names,
            email,
            role,
        } => {
            let new = NewStaff::parse(&national_id, &given_names, &last_names, &email, role)?;
            let (staff, api_key) = StaffService::new(db).create(&new)?;
            writeln!(out, "Registered staff {} ({})", staff.id, staff.role)?;
            writeln!(out, "API key: {api_key}")?;
        }
        Commands::IssueKey { national_id } => {
            let api_key = StaffService::new(db).issue_key(&national_id)?;
            writeln!(out, "API key: {api_key}")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_to_string(command: Commands, db: &Database) -> anyhow::Result<String> {
        let mut out = Vec::new();
        run(command, db.clone(), &mut out)?;
        Ok(String::from_utf8(out).expect("utf-8 output"))
    }

    fn last_key(output: &str) -> String {
        output
            .lines()
            .find_map(|line| line.strip_prefix("API key: "))
            .expect("key line")
            .to_string()
    }

    #[test]
    fn parses_role_names() {
        let cli = Cli::try_parse_from([
            "clinica",
            "add-staff",
            "12345678-5",
            "Ana",
            "Soto",
            "ana@saludmaule.cl",
            "--role",
            "physician",
        ])
        .expect("parse");
        assert!(matches!(
            cli.command,
            Some(Commands::AddStaff {
                role: Role::Physician,
                ..
            })
        ));

        assert!(Cli::try_parse_from([
            "clinica", "add-staff", "1-9", "A", "B", "a@b.cl", "--role", "nurse"
        ])
        .is_err());
    }

    #[test]
    fn seed_then_list_with_intake_key() {
        let db = Database::open_in_memory().expect("open db");
        let seeded = run_to_string(Commands::Seed, &db).expect("seed");
        assert!(seeded.contains("Seeded 11 areas, 10 patients, 10 admissions."));

        let issued = run_to_string(
            Commands::IssueKey {
                national_id: "22222222-2".into(),
            },
            &db,
        )
        .expect("issue key");

        let listed = run_to_string(
            Commands::ListPatients {
                api_key: last_key(&issued),
            },
            &db,
        )
        .expect("list");
        assert_eq!(listed.lines().count(), 10);
        assert!(listed.contains("in_treatment"));

        let reseeded = run_to_string(Commands::Seed, &db).expect("reseed");
        assert!(reseeded.contains("No new staff"));
    }

    fn add_staff(db: &Database, national_id: &str, email: &str, role: Role) -> String {
        let added = run_to_string(
            Commands::AddStaff {
                national_id: national_id.into(),
                given_names: "Ana".into(),
                last_names: "Soto".into(),
                email: email.into(),
                role,
            },
            db,
        )
        .expect("add staff");
        last_key(&added)
    }

    #[test]
    fn physician_key_lists_patients() {
        let db = Database::open_in_memory().expect("open db");
        let api_key = add_staff(&db, "12345678-5", "ana@saludmaule.cl", Role::Physician);

        let listed = run_to_string(Commands::ListPatients { api_key }, &db).expect("list");
        assert_eq!(listed.trim(), "No patients found.");
    }

    #[test]
    fn director_key_cannot_list_patients() {
        let db = Database::open_in_memory().expect("open db");
        let api_key = add_staff(&db, "12345678-5", "ana@saludmaule.cl", Role::Director);

        let err = run_to_string(Commands::ListPatients { api_key }, &db)
            .expect_err("directors do not list patients");
        assert!(err.to_string().contains("may not"));
    }
}
