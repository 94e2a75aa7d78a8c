//! # carebook-directory
//!
//! Lookup-or-register logic for patients, keyed by `(name, date of birth)`
//! or by identifier.
//!
//! Lookup is deliberately lenient: case-insensitive substring on the name,
//! exact match on the date of birth, intersected when both are given.
//! Registration never deduplicates — two patients may legitimately share a
//! name and birth date (twins), so the caller decides whether to look up
//! before registering.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info};

use carebook_contracts::error::{CarebookError, CarebookResult};
use carebook_contracts::ids::PatientId;
use carebook_contracts::patient::{NewPatient, Patient};
use carebook_store::{RecordStore, TableKind};

/// The patient directory service.
pub struct PatientDirectory {
    store: Arc<RecordStore>,
}

impl PatientDirectory {
    pub fn new(store: Arc<RecordStore>) -> Self {
        Self { store }
    }

    /// Find the first patient matching the given name and/or date of birth.
    ///
    /// At least one of the two must be given, otherwise this fails with
    /// `InvalidInput`. Returns `Ok(None)` on no match — an absent patient is
    /// an expected outcome here, not an error.
    pub fn lookup(
        &self,
        name: Option<&str>,
        date_of_birth: Option<NaiveDate>,
    ) -> CarebookResult<Option<Patient>> {
        if name.is_none() && date_of_birth.is_none() {
            return Err(CarebookError::InvalidInput {
                reason: "patient lookup needs a name or a date of birth".to_string(),
            });
        }

        let needle = name.map(str::to_lowercase);
        let patients: Vec<Patient> = self.store.load(TableKind::Patients)?;
        let hit = patients.into_iter().find(|p| {
            let name_ok = needle
                .as_deref()
                .map(|n| p.full_name.to_lowercase().contains(n))
                .unwrap_or(true);
            let dob_ok = date_of_birth
                .map(|dob| p.date_of_birth == Some(dob))
                .unwrap_or(true);
            name_ok && dob_ok
        });

        debug!(
            name = name.unwrap_or("-"),
            found = hit.is_some(),
            "patient lookup"
        );
        Ok(hit)
    }

    /// Fetch a registered patient by id.
    pub fn find_by_id(&self, patient_id: PatientId) -> CarebookResult<Patient> {
        let patients: Vec<Patient> = self.store.load(TableKind::Patients)?;
        patients
            .into_iter()
            .find(|p| p.patient_id == Some(patient_id))
            .ok_or(CarebookError::PatientNotFound { patient_id: patient_id.0 })
    }

    /// Register a patient: assign the next unused id, append, persist.
    ///
    /// Re-registration of an existing `(name, dob)` pair produces a second
    /// record; no duplicate check is performed.
    pub fn register(&self, new_patient: NewPatient) -> CarebookResult<Patient> {
        self.store.transaction(|tx| {
            let patients: Vec<Patient> = tx.load(TableKind::Patients)?;
            let next_id = patients
                .iter()
                .filter_map(|p| p.patient_id)
                .map(|id| id.0)
                .max()
                .unwrap_or(0)
                + 1;

            let patient = new_patient.clone().into_patient(PatientId(next_id));
            tx.append(TableKind::Patients, &patient)?;

            info!(
                patient_id = next_id,
                name = %patient.full_name,
                "patient registered"
            );
            Ok(patient)
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
