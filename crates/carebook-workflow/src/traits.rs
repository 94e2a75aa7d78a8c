//! Collaborator trait definitions for the appointment workflow.
//!
//! These three traits define the workflow's external seam:
//!
//! - `FieldExtractor`     — best-effort NLU over the raw utterance
//! - `InsuranceExtractor` — document-based field extraction (slow, flaky)
//! - `Notifier`           — simulated email/SMS delivery
//!
//! All three are untrusted from the core's perspective: a null extraction is
//! a normal, expected result, an extractor failure degrades the step instead
//! of aborting the turn, and notification is fire-and-forget.

use std::path::Path;

use chrono::NaiveDate;

use carebook_contracts::appointment::InsuranceInfo;
use carebook_contracts::error::CarebookResult;
use carebook_contracts::ids::DoctorId;
use carebook_contracts::reminder::ReminderChannel;

/// What the NLU collaborator could recover from one utterance. Every field
/// may be `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedFields {
    pub name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub preferred_doctor: Option<DoctorId>,
}

/// Best-effort extraction of patient fields from free text.
///
/// Implementations may be backed by a regex heuristic or a language model.
/// The workflow never lets an extraction failure cross its boundary: errors
/// and all-null results both fall into the new-patient path.
pub trait FieldExtractor: Send + Sync {
    fn extract(&self, text: &str) -> CarebookResult<ExtractedFields>;
}

/// Maps a filled intake form to a structured insurance field set.
///
/// Modeled as an opaque, potentially slow service call; the workflow runs it
/// through the external-call policy (timeout plus one retry) and proceeds
/// without insurance data on failure.
pub trait InsuranceExtractor: Send + Sync {
    fn extract(&self, form_path: &Path) -> CarebookResult<InsuranceInfo>;
}

/// Delivery of one notification. Simulated — the core only needs the call to
/// be fire-and-forget with a logged acknowledgment.
pub trait Notifier: Send + Sync {
    fn notify(&self, recipient: &str, channel: ReminderChannel, message: &str)
        -> CarebookResult<()>;
}
