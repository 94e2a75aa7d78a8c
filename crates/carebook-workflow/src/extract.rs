//! The default regex-based field extractor.
//!
//! A thin heuristic, not a parser: it recognizes "My name is First Last" /
//! "I am First Last", ISO (`YYYY-MM-DD`) and day-first (`DD/MM/YYYY`)
//! birth dates, and a doctor code after "prefer"/"doctor"/"dr". Anything it
//! cannot match comes back as `None`.

use chrono::NaiveDate;
use regex::Regex;
use tracing::debug;

use carebook_contracts::error::CarebookResult;
use carebook_contracts::ids::DoctorId;

use crate::traits::{ExtractedFields, FieldExtractor};

pub struct RegexFieldExtractor {
    name: Regex,
    dob_iso: Regex,
    dob_day_first: Regex,
    doctor: Regex,
}

impl RegexFieldExtractor {
    pub fn new() -> Self {
        // Patterns are fixed literals; compilation cannot fail at runtime.
        Self {
            name: Regex::new(r"(?:[Mm]y name is|I am)\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)+)")
                .expect("name pattern compiles"),
            dob_iso: Regex::new(r"\b(\d{4}-\d{2}-\d{2})\b").expect("iso dob pattern compiles"),
            dob_day_first: Regex::new(r"\b(\d{2}/\d{2}/\d{4})\b")
                .expect("day-first dob pattern compiles"),
            doctor: Regex::new(r"(?i)(?:prefer(?:red)?(?:\s+doctor)?|doctor|dr\.?)\s+([A-Za-z]+\d+)")
                .expect("doctor pattern compiles"),
        }
    }

    fn extract_dob(&self, text: &str) -> Option<NaiveDate> {
        if let Some(capture) = self.dob_iso.captures(text) {
            return NaiveDate::parse_from_str(&capture[1], "%Y-%m-%d").ok();
        }
        if let Some(capture) = self.dob_day_first.captures(text) {
            return NaiveDate::parse_from_str(&capture[1], "%d/%m/%Y").ok();
        }
        None
    }
}

impl Default for RegexFieldExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for RegexFieldExtractor {
    fn extract(&self, text: &str) -> CarebookResult<ExtractedFields> {
        let fields = ExtractedFields {
            name: self.name.captures(text).map(|c| c[1].to_string()),
            date_of_birth: self.extract_dob(text),
            preferred_doctor: self
                .doctor
                .captures(text)
                .map(|c| DoctorId::new(c[1].to_uppercase())),
        };
        debug!(
            name = fields.name.as_deref().unwrap_or("-"),
            has_dob = fields.date_of_birth.is_some(),
            doctor = fields.preferred_doctor.as_ref().map(|d| d.0.as_str()).unwrap_or("-"),
            "utterance fields extracted"
        );
        Ok(fields)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
