//! Patient records.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::ids::{DoctorId, PatientId};

/// A patient row in the durable patient table.
///
/// Immutable once created except for the contact fields (`email`, `phone`).
/// `patient_id` is `None` only for a patient that has been described in a
/// conversation but not yet registered; the directory assigns a real id on
/// registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub patient_id: Option<PatientId>,
    pub full_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub preferred_doctor_id: Option<DoctorId>,
}

/// The fields needed to register a patient. The directory assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPatient {
    pub full_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub preferred_doctor_id: Option<DoctorId>,
}

impl NewPatient {
    /// Attach the assigned id, producing the durable record.
    pub fn into_patient(self, patient_id: PatientId) -> Patient {
        Patient {
            patient_id: Some(patient_id),
            full_name: self.full_name,
            date_of_birth: self.date_of_birth,
            email: self.email,
            phone: self.phone,
            preferred_doctor_id: self.preferred_doctor_id,
        }
    }
}
