//! The appointment workflow: a linear pipeline over the session context.
//!
//! Stages run strictly in order within one turn:
//!
//!   Greeting → Identify → Schedule → Insurance → Confirm → Remind → Done
//!
//! No stage is revisited and no external event reroutes a turn mid-run. A
//! stage either advances or soft-halts: a halt ends the turn with a prompt
//! message and the caller supplies the missing information on a later turn.
//! Only `Persistence` errors cross the `invoke` boundary; everything else is
//! recovered into a plain-language message on the session log.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use carebook_contracts::appointment::{BookingRequest, FormRecord};
use carebook_contracts::error::CarebookResult;
use carebook_contracts::patient::NewPatient;
use carebook_contracts::reminder::ReminderChannel;
use carebook_contracts::session::{PatientStatus, SessionContext};
use carebook_directory::PatientDirectory;
use carebook_ledger::SlotLedger;
use carebook_reminders::ReminderScheduler;
use carebook_store::{RecordStore, TableKind};

use crate::config::CarebookConfig;
use crate::external::{call_with_policy, ExternalCallPolicy};
use crate::traits::{ExtractedFields, FieldExtractor, InsuranceExtractor, Notifier};

const DEFAULT_REASON: &str = "general consultation";

/// The workflow's lifecycle stages, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Greeting,
    Identify,
    Schedule,
    Insurance,
    Confirm,
    Remind,
    Done,
}

impl Stage {
    fn next(self) -> Stage {
        match self {
            Stage::Greeting => Stage::Identify,
            Stage::Identify => Stage::Schedule,
            Stage::Schedule => Stage::Insurance,
            Stage::Insurance => Stage::Confirm,
            Stage::Confirm => Stage::Remind,
            Stage::Remind => Stage::Done,
            Stage::Done => Stage::Done,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Greeting => "greeting",
            Stage::Identify => "identify",
            Stage::Schedule => "schedule",
            Stage::Insurance => "insurance",
            Stage::Confirm => "confirm",
            Stage::Remind => "remind",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

enum StepOutcome {
    Advance,
    Halt,
}

/// The workflow's external collaborators, each a named dependency.
pub struct Collaborators {
    pub fields: Arc<dyn FieldExtractor>,
    pub insurance: Arc<dyn InsuranceExtractor>,
    pub notifier: Arc<dyn Notifier>,
}

/// The appointment workflow state machine.
///
/// One instance serves any number of conversations; all per-conversation
/// state lives in the [`SessionContext`] the caller threads through
/// [`Workflow::invoke`].
pub struct Workflow {
    directory: PatientDirectory,
    ledger: SlotLedger,
    scheduler: ReminderScheduler,
    store: Arc<RecordStore>,
    collaborators: Collaborators,
    forms_dir: PathBuf,
    external: ExternalCallPolicy,
}

impl Workflow {
    pub fn new(
        store: Arc<RecordStore>,
        collaborators: Collaborators,
        config: &CarebookConfig,
    ) -> CarebookResult<Self> {
        Ok(Self {
            directory: PatientDirectory::new(Arc::clone(&store)),
            ledger: SlotLedger::new(Arc::clone(&store))?,
            scheduler: ReminderScheduler::new(Arc::clone(&store), config.reminders.clone()),
            store,
            collaborators,
            forms_dir: config.forms_dir.clone(),
            external: config.external_policy(),
        })
    }

    /// Direct access to the ledger, for admin callers (slot queries,
    /// cancellation).
    pub fn ledger(&self) -> &SlotLedger {
        &self.ledger
    }

    /// Process one conversational turn: advance the context through every
    /// reachable stage, extending its message log.
    pub fn invoke(&self, mut ctx: SessionContext) -> CarebookResult<SessionContext> {
        let mut stage = Stage::Greeting;
        while stage != Stage::Done {
            debug!(session_id = %ctx.session_id, stage = %stage, "workflow stage");
            let outcome = match stage {
                Stage::Greeting => self.greet(&mut ctx),
                Stage::Identify => self.identify(&mut ctx)?,
                Stage::Schedule => self.schedule(&mut ctx)?,
                Stage::Insurance => self.collect_insurance(&mut ctx)?,
                Stage::Confirm => self.confirm(&mut ctx)?,
                Stage::Remind => self.remind(&mut ctx)?,
                Stage::Done => StepOutcome::Advance,
            };
            match outcome {
                StepOutcome::Advance => stage = stage.next(),
                StepOutcome::Halt => {
                    info!(session_id = %ctx.session_id, stage = %stage, "turn halted");
                    break;
                }
            }
        }
        Ok(ctx)
    }

    // ── Greeting ──────────────────────────────────────────────────────────────

    fn greet(&self, ctx: &mut SessionContext) -> StepOutcome {
        ctx.say("Hello! Please share your name, date of birth, and preferred doctor.");
        StepOutcome::Advance
    }

    // ── Identify ──────────────────────────────────────────────────────────────

    fn identify(&self, ctx: &mut SessionContext) -> CarebookResult<StepOutcome> {
        let fields = self.extract_fields(&ctx.user_input);

        // A context identified on an earlier turn only absorbs a newly
        // stated doctor preference.
        if let Some(patient) = ctx.patient.as_mut() {
            if let Some(doctor) = fields.preferred_doctor {
                patient.preferred_doctor_id = Some(doctor);
            }
            let name = patient.full_name.clone();
            ctx.say(format!("Thanks, {}. Continuing with your booking.", name));
            return Ok(StepOutcome::Advance);
        }

        let looked_up = if fields.name.is_some() || fields.date_of_birth.is_some() {
            self.directory
                .lookup(fields.name.as_deref(), fields.date_of_birth)?
        } else {
            None
        };

        match looked_up {
            Some(mut patient) => {
                if fields.preferred_doctor.is_some() {
                    patient.preferred_doctor_id = fields.preferred_doctor;
                }
                ctx.patient_status = Some(PatientStatus::Returning);
                ctx.say(format!("Welcome back, {}! Let's continue.", patient.full_name));
                ctx.patient = Some(patient);
            }
            None => {
                // Unknown caller: register immediately so the booking can
                // reference a real patient id.
                let registered = self.directory.register(NewPatient {
                    full_name: fields.name.unwrap_or_else(|| "Unknown".to_string()),
                    date_of_birth: fields.date_of_birth,
                    email: None,
                    phone: None,
                    preferred_doctor_id: fields.preferred_doctor,
                })?;
                ctx.patient_status = Some(PatientStatus::New);
                ctx.say(format!(
                    "You seem to be a new patient, {}. We've registered you.",
                    registered.full_name
                ));
                ctx.patient = Some(registered);
            }
        }
        Ok(StepOutcome::Advance)
    }

    fn extract_fields(&self, utterance: &str) -> ExtractedFields {
        let extractor = Arc::clone(&self.collaborators.fields);
        let text = utterance.to_string();
        call_with_policy(&self.external, "nlu-extractor", move || extractor.extract(&text))
            .unwrap_or_else(|error| {
                // Extraction failure degrades to "nothing recognized"; the
                // caller lands on the new-patient path.
                warn!(error = %error, "field extraction failed, treating caller as unidentified");
                ExtractedFields::default()
            })
    }

    // ── Schedule ──────────────────────────────────────────────────────────────

    fn schedule(&self, ctx: &mut SessionContext) -> CarebookResult<StepOutcome> {
        if ctx.appointment.is_some() {
            return Ok(StepOutcome::Advance);
        }

        let Some(patient) = ctx.patient.clone() else {
            ctx.say("I need your name and date of birth before scheduling.");
            return Ok(StepOutcome::Halt);
        };
        let Some(doctor_id) = patient.preferred_doctor_id.clone() else {
            ctx.say("Please provide your preferred doctor ID before scheduling.");
            return Ok(StepOutcome::Halt);
        };

        let free = self.ledger.find_free_slots(&doctor_id, None)?;
        let Some(slot) = free.first() else {
            ctx.say(format!(
                "No free slots for doctor {}. Please try another day.",
                doctor_id
            ));
            return Ok(StepOutcome::Halt);
        };

        // Deterministic pick: the first free slot in store order.
        let booking = self.ledger.book(BookingRequest {
            slot_id: slot.slot_id.clone(),
            patient_id: patient.patient_id,
            patient_name: patient.full_name.clone(),
            reason: DEFAULT_REASON.to_string(),
        });
        let appointment = match booking {
            Ok(appointment) => appointment,
            Err(error) if !error.is_fatal() => {
                ctx.say(format!("Could not book that slot: {}.", error));
                return Ok(StepOutcome::Halt);
            }
            Err(error) => return Err(error),
        };

        ctx.say(format!(
            "Booked appointment for {} with doctor {} on {} at {}.",
            appointment.patient_name,
            appointment.doctor_id,
            appointment.date,
            appointment.time.format("%H:%M")
        ));

        if ctx.patient_status == Some(PatientStatus::New) {
            let form_path = self
                .forms_dir
                .join(format!("{}_intake_form.pdf", appointment.appointment_id));
            self.store.append(
                TableKind::Forms,
                &FormRecord {
                    appointment_id: appointment.appointment_id,
                    email: patient.email.clone(),
                    form_path: form_path.display().to_string(),
                    sent_at: Utc::now(),
                },
            )?;

            match patient.email.as_deref() {
                Some(email) => {
                    // Delivery is fire-and-forget; a refusal only gets logged.
                    if let Err(error) = self.collaborators.notifier.notify(
                        email,
                        ReminderChannel::Email,
                        "Please fill in the attached intake form before your visit.",
                    ) {
                        warn!(error = %error, "intake form notification failed");
                    }
                    ctx.say(format!("Intake form sent to {}.", email));
                }
                None => ctx.say("Your intake form is ready; we have no email on file to send it to."),
            }
        }

        ctx.appointment = Some(appointment);
        Ok(StepOutcome::Advance)
    }

    // ── Insurance ─────────────────────────────────────────────────────────────

    fn collect_insurance(&self, ctx: &mut SessionContext) -> CarebookResult<StepOutcome> {
        // Returning patients skip silently; so does a turn that never booked.
        if ctx.patient_status != Some(PatientStatus::New) {
            return Ok(StepOutcome::Advance);
        }
        let Some(appointment) = ctx.appointment.clone() else {
            return Ok(StepOutcome::Advance);
        };

        let form_path = self
            .forms_dir
            .join(format!("{}_intake_form.pdf", appointment.appointment_id));
        let extractor = Arc::clone(&self.collaborators.insurance);
        let extraction = call_with_policy(&self.external, "insurance-extractor", move || {
            extractor.extract(&form_path)
        });

        match extraction {
            Ok(info) => {
                let updated = match self.ledger.attach_insurance(appointment.appointment_id, &info)
                {
                    Ok(updated) => updated,
                    Err(error) if !error.is_fatal() => {
                        ctx.say(format!("Could not record insurance details: {}.", error));
                        return Ok(StepOutcome::Advance);
                    }
                    Err(error) => return Err(error),
                };
                ctx.insurance = Some(info);
                ctx.appointment = Some(updated);
                ctx.say("Insurance details recorded.");
            }
            Err(error) => {
                warn!(error = %error, "insurance extraction failed, continuing without");
                ctx.say(
                    "We could not read insurance details from your intake form; \
                     we'll collect them at the clinic.",
                );
            }
        }
        Ok(StepOutcome::Advance)
    }

    // ── Confirm ───────────────────────────────────────────────────────────────

    fn confirm(&self, ctx: &mut SessionContext) -> CarebookResult<StepOutcome> {
        let Some(appointment) = ctx.appointment.as_ref() else {
            ctx.say("No appointment to confirm.");
            return Ok(StepOutcome::Advance);
        };

        // Confirm from the stored row, not the context copy.
        let stored = match self.ledger.appointment(appointment.appointment_id) {
            Ok(stored) => stored,
            Err(error) if !error.is_fatal() => {
                ctx.say("No appointment to confirm.");
                return Ok(StepOutcome::Advance);
            }
            Err(error) => return Err(error),
        };

        ctx.say(format!(
            "Confirmed: {} with doctor {} on {} at {} ({}).",
            stored.patient_name,
            stored.doctor_id,
            stored.date,
            stored.time.format("%H:%M"),
            stored.reason
        ));
        Ok(StepOutcome::Advance)
    }

    // ── Remind ────────────────────────────────────────────────────────────────

    fn remind(&self, ctx: &mut SessionContext) -> CarebookResult<StepOutcome> {
        let Some(appointment) = ctx.appointment.as_ref() else {
            ctx.say("No appointment found. Skipping reminders.");
            return Ok(StepOutcome::Advance);
        };

        let (email, phone) = match ctx.patient.as_ref() {
            Some(patient) => (patient.email.clone(), patient.phone.clone()),
            None => (None, None),
        };

        match self.scheduler.create_reminders(
            appointment.appointment_id,
            email.as_deref(),
            phone.as_deref(),
        ) {
            Ok(batch) => {
                ctx.say(format!(
                    "{} reminders scheduled for appointment {}.",
                    batch.len(),
                    appointment.appointment_id
                ));
                ctx.reminders = batch;
            }
            Err(error) if !error.is_fatal() => {
                ctx.say(format!("Could not schedule reminders: {}.", error));
            }
            Err(error) => return Err(error),
        }
        Ok(StepOutcome::Advance)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
