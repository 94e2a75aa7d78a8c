//! Carebook — appointment scheduling demo CLI.
//!
//! Drives the full conversational workflow (identify, schedule, insurance,
//! confirm, remind) over JSON tables on disk, with fixture collaborators in
//! place of real NLU and document-extraction services.
//!
//! Usage:
//!   cargo run -p demo -- seed
//!   cargo run -p demo -- chat
//!   cargo run -p demo -- say "My name is Rahul Mehta, DOB 1990-05-15, prefer D1"
//!   cargo run -p demo -- slots D1 --date 2025-07-01
//!   cargo run -p demo -- cancel 1

use std::io::{self, BufRead, Write as _};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use carebook_contracts::appointment::InsuranceInfo;
use carebook_contracts::error::CarebookResult;
use carebook_contracts::ids::{AppointmentId, DoctorId, PatientId, SlotId};
use carebook_contracts::patient::Patient;
use carebook_contracts::schedule::Slot;
use carebook_contracts::session::SessionContext;
use carebook_store::{RecordStore, TableKind};
use carebook_workflow::{
    CarebookConfig, Collaborators, InsuranceExtractor, LoggingNotifier, RegexFieldExtractor,
    Workflow,
};

// ── CLI definition ────────────────────────────────────────────────────────────

/// Carebook — conversational appointment scheduling demo.
#[derive(Parser)]
#[command(
    name = "carebook",
    about = "Carebook appointment scheduling demo",
    long_about = "Runs the carebook appointment workflow against JSON tables on disk:\n\
                  patient identification, slot booking, intake forms, insurance\n\
                  capture, confirmation, and reminder scheduling."
)]
struct Cli {
    /// Path to a TOML configuration file. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Seed the data directory with demo doctor schedules and patients.
    Seed,
    /// Interactive conversation: one utterance per line, Ctrl-D to end.
    Chat,
    /// Run one conversational turn from a fresh session.
    Say {
        /// The caller's utterance.
        utterance: String,
    },
    /// List free slots for a doctor.
    Slots {
        /// Doctor id, e.g. D1.
        doctor: String,
        /// Restrict to one date (YYYY-MM-DD).
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Cancel an appointment and free its slot.
    Cancel {
        /// The appointment id to cancel.
        appointment_id: u64,
    },
    /// Show one registered patient.
    Patient {
        /// The patient id to look up.
        patient_id: u64,
    },
}

// ── Fixture collaborator ──────────────────────────────────────────────────────

/// Returns the same insurance fields for every intake form, standing in for
/// a real document-extraction service.
struct FixtureInsuranceExtractor;

impl InsuranceExtractor for FixtureInsuranceExtractor {
    fn extract(&self, _form_path: &Path) -> CarebookResult<InsuranceInfo> {
        Ok(InsuranceInfo {
            carrier: "HealthPrime".to_string(),
            member_id: "AB12345".to_string(),
            group_number: "7890".to_string(),
        })
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Set RUST_LOG=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("carebook error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> CarebookResult<()> {
    let config = match &cli.config {
        Some(path) => CarebookConfig::from_file(path)?,
        None => CarebookConfig::default(),
    };
    let store = Arc::new(RecordStore::open(&config.data_dir)?);

    match cli.command {
        Command::Seed => seed(&store),
        Command::Chat => chat(store, &config),
        Command::Say { utterance } => say(store, &config, &utterance),
        Command::Slots { doctor, date } => slots(&store, &config, &doctor, date),
        Command::Cancel { appointment_id } => cancel(store, &config, appointment_id),
        Command::Patient { patient_id } => patient(&store, patient_id),
    }
}

fn build_workflow(store: Arc<RecordStore>, config: &CarebookConfig) -> CarebookResult<Workflow> {
    Workflow::new(
        store,
        Collaborators {
            fields: Arc::new(RegexFieldExtractor::new()),
            insurance: Arc::new(FixtureInsuranceExtractor),
            notifier: Arc::new(LoggingNotifier),
        },
        config,
    )
}

// ── Subcommands ───────────────────────────────────────────────────────────────

/// Three days of morning slots for two doctors, plus two returning patients.
fn seed(store: &RecordStore) -> CarebookResult<()> {
    let today = Utc::now().date_naive();
    let mut schedule = Vec::new();
    for day in 0..3 {
        let date = today + Duration::days(day + 1);
        for (doctor, hour) in [("D1", 9), ("D1", 10), ("D2", 9), ("D2", 11)] {
            schedule.push(Slot {
                slot_id: SlotId::new(format!("{}-{}-{:02}00", doctor, date, hour)),
                doctor_id: DoctorId::new(doctor),
                date,
                time: NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN),
                is_booked: false,
            });
        }
    }

    store.transaction(|tx| {
        tx.replace(TableKind::Slots, &schedule)?;
        tx.replace(
            TableKind::Patients,
            &vec![
                Patient {
                    patient_id: Some(PatientId(1)),
                    full_name: "Asha Rao".to_string(),
                    date_of_birth: NaiveDate::from_ymd_opt(1991, 2, 3),
                    email: Some("asha@example.com".to_string()),
                    phone: Some("+91-98765-43210".to_string()),
                    preferred_doctor_id: Some(DoctorId::new("D2")),
                },
                Patient {
                    patient_id: Some(PatientId(2)),
                    full_name: "Vikram Shah".to_string(),
                    date_of_birth: NaiveDate::from_ymd_opt(1978, 11, 30),
                    email: Some("vikram@example.com".to_string()),
                    phone: None,
                    preferred_doctor_id: Some(DoctorId::new("D1")),
                },
            ],
        )
    })?;

    println!("Seeded {} slots for D1 and D2 and 2 returning patients.", schedule.len());
    Ok(())
}

fn chat(store: Arc<RecordStore>, config: &CarebookConfig) -> CarebookResult<()> {
    let workflow = build_workflow(store, config)?;
    print_banner();

    let stdin = io::stdin();
    let mut ctx: Option<SessionContext> = None;

    prompt()?;
    for line in stdin.lock().lines() {
        let utterance = line.map_err(|e| carebook_contracts::error::CarebookError::InvalidInput {
            reason: format!("cannot read utterance: {}", e),
        })?;
        if utterance.trim().is_empty() {
            prompt()?;
            continue;
        }

        let turn = match ctx.take() {
            Some(previous) => previous.next_turn(utterance),
            None => SessionContext::new(utterance),
        };
        let spoken = turn.messages.len();
        let next = workflow.invoke(turn)?;
        print_turn(&next.messages, spoken);
        ctx = Some(next);
        prompt()?;
    }
    println!();
    Ok(())
}

fn prompt() -> CarebookResult<()> {
    print!("caller> ");
    io::stdout()
        .flush()
        .map_err(|e| carebook_contracts::error::CarebookError::InvalidInput {
            reason: format!("cannot flush stdout: {}", e),
        })
}

fn say(store: Arc<RecordStore>, config: &CarebookConfig, utterance: &str) -> CarebookResult<()> {
    let workflow = build_workflow(store, config)?;
    let ctx = workflow.invoke(SessionContext::new(utterance))?;
    print_turn(&ctx.messages, 0);
    Ok(())
}

fn slots(
    store: &Arc<RecordStore>,
    config: &CarebookConfig,
    doctor: &str,
    date: Option<NaiveDate>,
) -> CarebookResult<()> {
    let workflow = build_workflow(Arc::clone(store), config)?;
    let free = workflow
        .ledger()
        .find_free_slots(&DoctorId::new(doctor.to_uppercase()), date)?;

    if free.is_empty() {
        println!("No free slots for doctor {}.", doctor);
        return Ok(());
    }
    for slot in free {
        println!("{}  {} {}  doctor {}", slot.slot_id, slot.date, slot.time, slot.doctor_id);
    }
    Ok(())
}

fn cancel(
    store: Arc<RecordStore>,
    config: &CarebookConfig,
    appointment_id: u64,
) -> CarebookResult<()> {
    let workflow = build_workflow(store, config)?;
    let receipt = workflow.ledger().cancel(AppointmentId(appointment_id))?;
    println!(
        "Cancelled appointment {}; slot {} is free again.",
        receipt.appointment_id, receipt.slot_id
    );
    Ok(())
}

fn patient(store: &Arc<RecordStore>, patient_id: u64) -> CarebookResult<()> {
    let directory = carebook_directory::PatientDirectory::new(Arc::clone(store));
    let patient = directory.find_by_id(PatientId(patient_id))?;

    println!("Patient {}: {}", patient_id, patient.full_name);
    if let Some(dob) = patient.date_of_birth {
        println!("  date of birth: {}", dob);
    }
    if let Some(email) = &patient.email {
        println!("  email: {}", email);
    }
    if let Some(phone) = &patient.phone {
        println!("  phone: {}", phone);
    }
    if let Some(doctor) = &patient.preferred_doctor_id {
        println!("  preferred doctor: {}", doctor);
    }
    Ok(())
}

// ── Output helpers ────────────────────────────────────────────────────────────

fn print_turn(messages: &[String], already_spoken: usize) {
    for message in &messages[already_spoken..] {
        println!("carebook> {}", message);
    }
    println!();
}

fn print_banner() {
    println!();
    println!("Carebook — Appointment Scheduling Demo");
    println!("======================================");
    println!();
    println!("Workflow per turn:");
    println!("  [1] Greet the caller");
    println!("  [2] Identify the patient (regex NLU, register if unknown)");
    println!("  [3] Book the first free slot with the preferred doctor");
    println!("  [4] New patients: intake form + insurance extraction");
    println!("  [5] Confirm from the stored appointment row");
    println!("  [6] Schedule three reminders (email, email, sms)");
    println!();
}
