//! Error taxonomy for the carebook workspace.
//!
//! All fallible operations return `CarebookResult<T>`. The workflow recovers
//! from `NotFound` / `Conflict` / `InvalidInput` locally by appending a
//! plain-language message to the session log; `Persistence` is the one fatal
//! class and always propagates past the workflow boundary.

use thiserror::Error;

/// The unified error type for the carebook crates.
#[derive(Debug, Error)]
pub enum CarebookError {
    /// No patient matched the given identifier.
    #[error("patient {patient_id} not found")]
    PatientNotFound { patient_id: u64 },

    /// The requested slot id does not exist in the schedule table.
    #[error("slot '{slot_id}' not found")]
    SlotNotFound { slot_id: String },

    /// The requested slot exists but is already booked (conflict).
    #[error("slot '{slot_id}' is already booked")]
    SlotAlreadyBooked { slot_id: String },

    /// No appointment row matched the given identifier.
    #[error("appointment {appointment_id} not found")]
    AppointmentNotFound { appointment_id: u64 },

    /// A required field or query argument is missing or malformed.
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    /// An external collaborator (NLU extraction, document extraction,
    /// notification) failed or timed out. Non-fatal: callers degrade.
    #[error("external service '{service}' failed: {reason}")]
    ExternalService { service: String, reason: String },

    /// The record store could not read or write a table.
    ///
    /// This is fatal for the current turn — the enclosing transaction
    /// commits nothing.
    #[error("persistence failure: {reason}")]
    Persistence { reason: String },

    /// A configuration file is missing, unreadable, or malformed.
    #[error("configuration error: {reason}")]
    Config { reason: String },
}

impl CarebookError {
    /// True for errors that must abort the current turn instead of being
    /// surfaced as a session message.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CarebookError::Persistence { .. })
    }
}

/// Convenience alias used throughout the carebook crates.
pub type CarebookResult<T> = Result<T, CarebookError>;
