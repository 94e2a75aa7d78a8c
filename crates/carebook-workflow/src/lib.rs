//! The conversational appointment workflow.
//!
//! Ties the directory, ledger, and reminder services into a linear
//! per-turn pipeline driven by a [`SessionContext`], with pluggable
//! collaborators for NLU extraction, document extraction, and notification
//! delivery.
//!
//! [`SessionContext`]: carebook_contracts::session::SessionContext

pub mod config;
pub mod engine;
pub mod external;
pub mod extract;
pub mod notify;
pub mod traits;

pub use config::CarebookConfig;
pub use engine::{Collaborators, Stage, Workflow};
pub use external::{call_with_policy, ExternalCallPolicy};
pub use extract::RegexFieldExtractor;
pub use notify::LoggingNotifier;
pub use traits::{ExtractedFields, FieldExtractor, InsuranceExtractor, Notifier};
