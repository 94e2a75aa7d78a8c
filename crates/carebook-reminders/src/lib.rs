//! # carebook-reminders
//!
//! Derives the fixed batch of three notification events from a confirmed
//! appointment: two emails and one SMS at the `[24h, 6h, 1h]` offsets.
//!
//! By default the offsets count **backwards from the appointment's scheduled
//! date-time**. The legacy behavior — counting forwards from the moment of
//! the call — is preserved behind [`ReminderAnchor::CallTime`] so existing
//! data pipelines can opt into it explicitly instead of getting it silently.
//!
//! Re-scheduling is an upsert keyed by appointment id: the appointment's
//! previous reminder rows are replaced, so calling twice leaves three rows.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use carebook_contracts::appointment::Appointment;
use carebook_contracts::error::{CarebookError, CarebookResult};
use carebook_contracts::ids::AppointmentId;
use carebook_contracts::reminder::{Reminder, ReminderChannel, ReminderStatus};
use carebook_store::{RecordStore, TableKind};

/// What the reminder offsets are measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReminderAnchor {
    /// Offsets before the appointment's scheduled date-time (default).
    AppointmentTime,
    /// Offsets after the moment `create_reminders` is called (legacy).
    CallTime,
}

/// Offsets and anchor for one reminder batch. Loadable from TOML as part of
/// the workflow configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderPolicy {
    /// Hours for reminders 1..3. Channels are fixed: email, email, sms.
    pub offsets_hours: [i64; 3],
    pub anchor: ReminderAnchor,
}

impl Default for ReminderPolicy {
    fn default() -> Self {
        Self {
            offsets_hours: [24, 6, 1],
            anchor: ReminderAnchor::AppointmentTime,
        }
    }
}

const CHANNELS: [ReminderChannel; 3] =
    [ReminderChannel::Email, ReminderChannel::Email, ReminderChannel::Sms];

/// The reminder scheduler service.
pub struct ReminderScheduler {
    store: Arc<RecordStore>,
    policy: ReminderPolicy,
}

impl ReminderScheduler {
    pub fn new(store: Arc<RecordStore>, policy: ReminderPolicy) -> Self {
        Self { store, policy }
    }

    /// Create (or replace) the three reminders for an appointment.
    ///
    /// Recipients follow the fixed channel table: the first two reminders go
    /// to `email`, the third to `phone`; a missing recipient leaves the row's
    /// recipient null rather than dropping the row. Fails with
    /// `AppointmentNotFound` when the appointment is not on record.
    pub fn create_reminders(
        &self,
        appointment_id: AppointmentId,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> CarebookResult<Vec<Reminder>> {
        let policy = self.policy.clone();
        let batch = self.store.transaction(|tx| {
            let appointments: Vec<Appointment> = tx.load(TableKind::Appointments)?;
            let appointment = appointments
                .iter()
                .find(|a| a.appointment_id == appointment_id)
                .ok_or(CarebookError::AppointmentNotFound {
                    appointment_id: appointment_id.0,
                })?;

            let batch = build_batch(&policy, appointment, email, phone);

            // Upsert: replace any reminders already on record for this
            // appointment instead of appending a second batch.
            let mut reminders: Vec<Reminder> = tx.load(TableKind::Reminders)?;
            reminders.retain(|r| r.appointment_id != appointment_id);
            reminders.extend(batch.iter().cloned());
            tx.replace(TableKind::Reminders, &reminders)?;
            Ok(batch)
        })?;

        info!(
            appointment_id = appointment_id.0,
            count = batch.len(),
            anchor = ?self.policy.anchor,
            "reminders scheduled"
        );
        Ok(batch)
    }
}

fn build_batch(
    policy: &ReminderPolicy,
    appointment: &Appointment,
    email: Option<&str>,
    phone: Option<&str>,
) -> Vec<Reminder> {
    let anchor: DateTime<Utc> = match policy.anchor {
        ReminderAnchor::AppointmentTime => Utc.from_utc_datetime(&appointment.scheduled_at()),
        ReminderAnchor::CallTime => Utc::now(),
    };

    policy
        .offsets_hours
        .iter()
        .zip(CHANNELS)
        .enumerate()
        .map(|(i, (hours, channel))| {
            let offset = Duration::hours(*hours);
            let send_time = match policy.anchor {
                ReminderAnchor::AppointmentTime => anchor - offset,
                ReminderAnchor::CallTime => anchor + offset,
            };
            let recipient = match channel {
                ReminderChannel::Email => email.map(str::to_string),
                ReminderChannel::Sms => phone.map(str::to_string),
            };
            Reminder {
                appointment_id: appointment.appointment_id,
                reminder_number: (i + 1) as u8,
                send_time,
                recipient,
                channel,
                status: ReminderStatus::Scheduled,
            }
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, NaiveDate, NaiveTime, TimeZone, Utc};

    use carebook_contracts::appointment::Appointment;
    use carebook_contracts::error::CarebookError;
    use carebook_contracts::ids::{AppointmentId, DoctorId, PatientId, SlotId};
    use carebook_contracts::reminder::{Reminder, ReminderChannel};
    use carebook_store::{RecordStore, TableKind};

    use super::{ReminderAnchor, ReminderPolicy, ReminderScheduler};

    fn store_with_appointment() -> Arc<RecordStore> {
        let store = Arc::new(RecordStore::in_memory());
        let appointment = Appointment {
            appointment_id: AppointmentId(1),
            slot_id: SlotId::new("S1"),
            patient_id: Some(PatientId(1)),
            patient_name: "Rahul Mehta".to_string(),
            doctor_id: DoctorId::new("D1"),
            date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            reason: "general consultation".to_string(),
            booked_at: Utc::now(),
            insurance_carrier: None,
            insurance_member_id: None,
            insurance_group: None,
        };
        store.append(TableKind::Appointments, &appointment).unwrap();
        store
    }

    fn scheduler(anchor: ReminderAnchor) -> ReminderScheduler {
        ReminderScheduler::new(
            store_with_appointment(),
            ReminderPolicy { anchor, ..ReminderPolicy::default() },
        )
    }

    #[test]
    fn three_reminders_with_email_email_phone_recipients() {
        let scheduler = scheduler(ReminderAnchor::AppointmentTime);
        let batch = scheduler
            .create_reminders(AppointmentId(1), Some("a@x.com"), Some("555-0100"))
            .unwrap();

        assert_eq!(batch.len(), 3);
        assert_eq!(batch[0].channel, ReminderChannel::Email);
        assert_eq!(batch[0].recipient.as_deref(), Some("a@x.com"));
        assert_eq!(batch[1].channel, ReminderChannel::Email);
        assert_eq!(batch[1].recipient.as_deref(), Some("a@x.com"));
        assert_eq!(batch[2].channel, ReminderChannel::Sms);
        assert_eq!(batch[2].recipient.as_deref(), Some("555-0100"));
        assert_eq!(
            batch.iter().map(|r| r.reminder_number).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn appointment_anchor_counts_backwards_from_the_slot_time() {
        let scheduler = scheduler(ReminderAnchor::AppointmentTime);
        let batch = scheduler
            .create_reminders(AppointmentId(1), Some("a@x.com"), None)
            .unwrap();

        let scheduled = Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap();
        assert_eq!(batch[0].send_time, scheduled - Duration::hours(24));
        assert_eq!(batch[1].send_time, scheduled - Duration::hours(6));
        assert_eq!(batch[2].send_time, scheduled - Duration::hours(1));
    }

    #[test]
    fn call_time_anchor_counts_forwards_from_now() {
        let scheduler = scheduler(ReminderAnchor::CallTime);
        let before = Utc::now();
        let batch = scheduler
            .create_reminders(AppointmentId(1), Some("a@x.com"), Some("555-0100"))
            .unwrap();
        let after = Utc::now();

        for (reminder, hours) in batch.iter().zip([24i64, 6, 1]) {
            let offset = Duration::hours(hours);
            assert!(reminder.send_time >= before + offset);
            assert!(reminder.send_time <= after + offset);
        }
    }

    #[test]
    fn rescheduling_replaces_instead_of_duplicating() {
        let scheduler = scheduler(ReminderAnchor::AppointmentTime);
        scheduler
            .create_reminders(AppointmentId(1), Some("a@x.com"), Some("555-0100"))
            .unwrap();
        scheduler
            .create_reminders(AppointmentId(1), Some("b@x.com"), Some("555-0100"))
            .unwrap();

        let rows: Vec<Reminder> = scheduler.store.load(TableKind::Reminders).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].recipient.as_deref(), Some("b@x.com"));
    }

    #[test]
    fn unknown_appointment_is_an_error_and_writes_nothing() {
        let scheduler = scheduler(ReminderAnchor::AppointmentTime);
        match scheduler.create_reminders(AppointmentId(9), Some("a@x.com"), None) {
            Err(CarebookError::AppointmentNotFound { appointment_id }) => {
                assert_eq!(appointment_id, 9);
            }
            other => panic!("expected AppointmentNotFound, got {:?}", other),
        }

        let rows: Vec<Reminder> = scheduler.store.load(TableKind::Reminders).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn missing_phone_leaves_the_sms_recipient_null() {
        let scheduler = scheduler(ReminderAnchor::AppointmentTime);
        let batch = scheduler
            .create_reminders(AppointmentId(1), Some("a@x.com"), None)
            .unwrap();
        assert_eq!(batch[2].channel, ReminderChannel::Sms);
        assert!(batch[2].recipient.is_none());
    }
}
