//! Per-conversation session context.
//!
//! The context is owned by the caller (UI or CLI) and threaded through the
//! workflow steps each turn. The core never persists it — only the entity
//! tables are durable.

use serde::{Deserialize, Serialize};

use crate::{
    appointment::{Appointment, InsuranceInfo},
    ids::SessionId,
    patient::Patient,
    reminder::Reminder,
};

/// Whether the identified patient was already in the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatientStatus {
    New,
    Returning,
}

/// All state one conversation carries between workflow steps and turns.
///
/// `messages` is an append-only, ordered log of human-readable output; the
/// workflow extends it and never truncates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionContext {
    pub session_id: SessionId,
    pub user_input: String,
    pub patient: Option<Patient>,
    pub patient_status: Option<PatientStatus>,
    pub appointment: Option<Appointment>,
    pub insurance: Option<InsuranceInfo>,
    pub reminders: Vec<Reminder>,
    pub messages: Vec<String>,
}

impl SessionContext {
    /// Start a fresh conversation from the first utterance.
    pub fn new(user_input: impl Into<String>) -> Self {
        Self {
            session_id: SessionId::new(),
            user_input: user_input.into(),
            patient: None,
            patient_status: None,
            appointment: None,
            insurance: None,
            reminders: Vec::new(),
            messages: Vec::new(),
        }
    }

    /// Carry the context into the next turn with a new utterance.
    ///
    /// Everything accumulated so far — patient, appointment, message log —
    /// is preserved; only `user_input` is replaced.
    pub fn next_turn(mut self, user_input: impl Into<String>) -> Self {
        self.user_input = user_input.into();
        self
    }

    /// Append one human-readable message to the log.
    pub fn say(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    pub fn last_message(&self) -> Option<&str> {
        self.messages.last().map(String::as_str)
    }
}
