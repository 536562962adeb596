//! Offline administration CLI.
//!
//! Opens the same store the server uses and runs one record operation per invocation. sled
//! holds an exclusive lock on the database directory, so the server must be stopped first.

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use dialysis_core::config::database_path_from_env_value;
use dialysis_core::repositories::ReadingQuery;
use dialysis_core::{ensure_indexes, DocumentStore, RecordServices};
use dialysis_ids::{RecordId, RecordIdGenerator, RecordKind};
use dialysis_store::SledStore;
use serde::Serialize;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "dialysis")]
#[command(about = "Dialysis record service CLI")]
struct Cli {
    /// Store location (`sled://<path>` or a path); defaults to `DATABASE_URL`
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List all patients
    Patients,
    /// Show one patient
    Patient {
        /// Patient identifier
        patient_id: String,
    },
    /// List a patient's sessions, most recent first
    Sessions {
        /// Patient identifier
        patient_id: String,
    },
    /// List a session's readings, newest first
    Readings {
        /// Session identifier
        session_id: String,
        /// Maximum number of readings
        #[arg(long)]
        limit: Option<usize>,
        /// Inclusive lower bound (RFC 3339)
        #[arg(long)]
        start: Option<DateTime<Utc>>,
        /// Inclusive upper bound (RFC 3339)
        #[arg(long)]
        end: Option<DateTime<Utc>>,
    },
    /// List a patient's reports, newest first
    Reports {
        /// Patient identifier
        patient_id: String,
    },
    /// Aggregate a patient's readings
    Analytics {
        /// Patient identifier
        patient_id: String,
        /// Inclusive lower bound (RFC 3339)
        #[arg(long)]
        start_date: Option<DateTime<Utc>>,
        /// Inclusive upper bound (RFC 3339)
        #[arg(long)]
        end_date: Option<DateTime<Utc>>,
    },
    /// Set a session's dialysis progress, e.g. to repair a failed update after a reading
    SyncProgress {
        /// Session identifier
        session_id: String,
        /// Progress percentage (0-100)
        progress: f64,
    },
}

/// Parses `raw` as a `SES_<millis>_<patientId>` identifier.
fn parse_session_id(raw: &str) -> Result<RecordId, Box<dyn std::error::Error>> {
    let id: RecordId = raw.parse()?;
    if id.kind() != RecordKind::Session {
        return Err(format!("'{}' is not a session identifier", raw).into());
    }
    Ok(id)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("No command given. Use --help for usage.");
        return Ok(());
    };

    let database_url = cli
        .database_url
        .or_else(|| std::env::var("DATABASE_URL").ok());
    let database_path = database_path_from_env_value(database_url)?;
    let store = Arc::new(SledStore::open(&database_path)?);
    ensure_indexes(store.as_ref())?;
    let services = RecordServices::new(store.clone(), Arc::new(RecordIdGenerator::new()));

    let result = run(&services, command);
    store.close()?;
    result
}

fn run(services: &RecordServices, command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Patients => {
            let patients = services.patients.list()?;
            if patients.is_empty() {
                println!("No patients found.");
            } else {
                for patient in patients {
                    println!(
                        "ID: {}, Name: {}, Age: {}, Created: {}",
                        patient.patient_id,
                        patient.name,
                        patient.age,
                        patient.created_at.to_rfc3339()
                    );
                }
            }
        }
        Commands::Patient { patient_id } => print_json(&services.patients.get(&patient_id)?)?,
        Commands::Sessions { patient_id } => {
            print_json(&services.sessions.list_for_patient(&patient_id)?)?
        }
        Commands::Readings {
            session_id,
            limit,
            start,
            end,
        } => {
            let session_id = parse_session_id(&session_id)?.to_string();
            let query = ReadingQuery {
                start_time: start,
                end_time: end,
                limit,
            };
            print_json(&services.readings.query(&session_id, &query)?)?
        }
        Commands::Reports { patient_id } => {
            print_json(&services.reports.list_for_patient(&patient_id)?)?
        }
        Commands::Analytics {
            patient_id,
            start_date,
            end_date,
        } => match services
            .analytics
            .patient_summary(&patient_id, start_date, end_date)?
        {
            Some(summary) => print_json(&summary)?,
            None => println!("{{}}"),
        },
        Commands::SyncProgress {
            session_id,
            progress,
        } => {
            let id = parse_session_id(&session_id)?;
            if services
                .readings
                .sync_session_progress(&session_id, progress)?
            {
                println!(
                    "Session {} (patient {}, issued {}) progress set to {}",
                    session_id,
                    id.owner(),
                    id.issued_at().map_or_else(|| "?".to_string(), |t| t.to_rfc3339()),
                    progress
                );
            } else {
                eprintln!("Session not found: {}", session_id);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_session_id_accepts_session_ids() {
        let id = parse_session_id("SES_1704067200000_P1").expect("session id should parse");
        assert_eq!(id.owner(), "P1");
        assert_eq!(id.millis(), 1_704_067_200_000);
    }

    #[test]
    fn test_parse_session_id_rejects_other_shapes() {
        assert!(parse_session_id("RPT_1704067200000_P1").is_err());
        assert!(parse_session_id("session-42").is_err());
    }
}
