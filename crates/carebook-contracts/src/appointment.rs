//! Appointments, insurance details, and intake form records.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{AppointmentId, DoctorId, PatientId, SlotId};

/// An appointment row: created only by a successful slot booking (1:1 with a
/// booked slot), removed only by cancellation.
///
/// The three insurance columns are nullable and attached post-creation by
/// the ledger's insurance-patch path; they are never removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub appointment_id: AppointmentId,
    pub slot_id: SlotId,
    pub patient_id: Option<PatientId>,
    pub patient_name: String,
    pub doctor_id: DoctorId,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub reason: String,
    pub booked_at: DateTime<Utc>,
    pub insurance_carrier: Option<String>,
    pub insurance_member_id: Option<String>,
    pub insurance_group: Option<String>,
}

impl Appointment {
    /// Patch the insurance columns from an extracted field set.
    pub fn apply_insurance(&mut self, info: &InsuranceInfo) {
        self.insurance_carrier = Some(info.carrier.clone());
        self.insurance_member_id = Some(info.member_id.clone());
        self.insurance_group = Some(info.group_number.clone());
    }

    /// The slot's wall-clock date and time as one naive timestamp.
    pub fn scheduled_at(&self) -> chrono::NaiveDateTime {
        self.date.and_time(self.time)
    }
}

/// The structured field set the document-extraction collaborator returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsuranceInfo {
    pub carrier: String,
    pub member_id: String,
    pub group_number: String,
}

/// What a caller hands the ledger to book a slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub slot_id: SlotId,
    pub patient_id: Option<PatientId>,
    pub patient_name: String,
    pub reason: String,
}

/// Returned by a successful cancellation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancellationReceipt {
    pub appointment_id: AppointmentId,
    pub slot_id: SlotId,
}

/// One row in the forms table: an intake form sent to a new patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormRecord {
    pub appointment_id: AppointmentId,
    pub email: Option<String>,
    pub form_path: String,
    pub sent_at: DateTime<Utc>,
}
