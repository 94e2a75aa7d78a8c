//! The slot ledger: free-slot queries, booking, cancellation, and the
//! insurance-patch path.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{debug, info, warn};

use carebook_contracts::appointment::{
    Appointment, BookingRequest, CancellationReceipt, InsuranceInfo,
};
use carebook_contracts::error::{CarebookError, CarebookResult};
use carebook_contracts::ids::{AppointmentId, DoctorId};
use carebook_contracts::schedule::Slot;
use carebook_store::{RecordStore, TableKind};

/// Manages doctor schedule slots and enforces the no-double-booking
/// invariant.
///
/// Appointment ids are assigned `max + 1` over the appointment table, with a
/// monotone floor kept in the ledger so an id is never reused after its
/// appointment is cancelled.
pub struct SlotLedger {
    store: Arc<RecordStore>,
    id_floor: AtomicU64,
}

impl SlotLedger {
    /// Create a ledger over `store`, seeding the id floor from the highest
    /// appointment id currently on record.
    pub fn new(store: Arc<RecordStore>) -> CarebookResult<Self> {
        let appointments: Vec<Appointment> = store.load(TableKind::Appointments)?;
        let floor = appointments
            .iter()
            .map(|a| a.appointment_id.0)
            .max()
            .unwrap_or(0);
        Ok(Self { store, id_floor: AtomicU64::new(floor) })
    }

    /// Free slots for a doctor, optionally restricted to one date, in store
    /// order. May be empty.
    pub fn find_free_slots(
        &self,
        doctor_id: &DoctorId,
        date: Option<NaiveDate>,
    ) -> CarebookResult<Vec<Slot>> {
        let slots: Vec<Slot> = self.store.load(TableKind::Slots)?;
        let free: Vec<Slot> = slots
            .into_iter()
            .filter(|s| {
                s.doctor_id == *doctor_id
                    && s.is_free()
                    && date.map(|d| s.date == d).unwrap_or(true)
            })
            .collect();

        debug!(doctor_id = %doctor_id, free = free.len(), "free slot query");
        Ok(free)
    }

    /// Book a slot: flip `is_booked`, assign the next appointment id, and
    /// durably write both tables — all in one transaction.
    ///
    /// Fails with `SlotNotFound` when the slot id is absent and with
    /// `SlotAlreadyBooked` when another booking got there first.
    pub fn book(&self, request: BookingRequest) -> CarebookResult<Appointment> {
        let appointment = self.store.transaction(|tx| {
            let mut slots: Vec<Slot> = tx.load(TableKind::Slots)?;
            let slot = slots
                .iter_mut()
                .find(|s| s.slot_id == request.slot_id)
                .ok_or_else(|| CarebookError::SlotNotFound {
                    slot_id: request.slot_id.0.clone(),
                })?;

            if slot.is_booked {
                return Err(CarebookError::SlotAlreadyBooked {
                    slot_id: request.slot_id.0.clone(),
                });
            }
            slot.is_booked = true;
            let booked_slot = slot.clone();

            let appointments: Vec<Appointment> = tx.load(TableKind::Appointments)?;
            let table_max = appointments
                .iter()
                .map(|a| a.appointment_id.0)
                .max()
                .unwrap_or(0);
            let next_id = table_max.max(self.id_floor.load(Ordering::SeqCst)) + 1;

            let appointment = Appointment {
                appointment_id: AppointmentId(next_id),
                slot_id: booked_slot.slot_id.clone(),
                patient_id: request.patient_id,
                patient_name: request.patient_name.clone(),
                doctor_id: booked_slot.doctor_id.clone(),
                date: booked_slot.date,
                time: booked_slot.time,
                reason: request.reason.clone(),
                booked_at: Utc::now(),
                insurance_carrier: None,
                insurance_member_id: None,
                insurance_group: None,
            };

            tx.replace(TableKind::Slots, &slots)?;
            tx.append(TableKind::Appointments, &appointment)?;
            self.id_floor.store(next_id, Ordering::SeqCst);
            Ok(appointment)
        })?;

        info!(
            appointment_id = appointment.appointment_id.0,
            slot_id = %appointment.slot_id,
            patient = %appointment.patient_name,
            doctor_id = %appointment.doctor_id,
            "slot booked"
        );
        Ok(appointment)
    }

    /// Cancel an appointment: free its slot and remove the appointment row,
    /// committed together or not at all.
    pub fn cancel(&self, appointment_id: AppointmentId) -> CarebookResult<CancellationReceipt> {
        let receipt = self.store.transaction(|tx| {
            let mut appointments: Vec<Appointment> = tx.load(TableKind::Appointments)?;
            let position = appointments
                .iter()
                .position(|a| a.appointment_id == appointment_id)
                .ok_or(CarebookError::AppointmentNotFound {
                    appointment_id: appointment_id.0,
                })?;
            let appointment = appointments.remove(position);

            let mut slots: Vec<Slot> = tx.load(TableKind::Slots)?;
            match slots.iter_mut().find(|s| s.slot_id == appointment.slot_id) {
                Some(slot) => slot.is_booked = false,
                // The schedule was re-seeded under us; the appointment is
                // still removed so the ledger stays internally consistent.
                None => warn!(
                    slot_id = %appointment.slot_id,
                    "cancelled appointment references a slot no longer in the schedule"
                ),
            }

            tx.replace(TableKind::Slots, &slots)?;
            tx.replace(TableKind::Appointments, &appointments)?;
            Ok(CancellationReceipt {
                appointment_id,
                slot_id: appointment.slot_id,
            })
        })?;

        info!(
            appointment_id = receipt.appointment_id.0,
            slot_id = %receipt.slot_id,
            "appointment cancelled, slot freed"
        );
        Ok(receipt)
    }

    /// Attach extracted insurance fields to an appointment. The fields are
    /// only ever added, never removed.
    pub fn attach_insurance(
        &self,
        appointment_id: AppointmentId,
        info: &InsuranceInfo,
    ) -> CarebookResult<Appointment> {
        self.store.transaction(|tx| {
            let mut appointments: Vec<Appointment> = tx.load(TableKind::Appointments)?;
            let appointment = appointments
                .iter_mut()
                .find(|a| a.appointment_id == appointment_id)
                .ok_or(CarebookError::AppointmentNotFound {
                    appointment_id: appointment_id.0,
                })?;

            appointment.apply_insurance(info);
            let updated = appointment.clone();
            tx.replace(TableKind::Appointments, &appointments)?;

            info!(appointment_id = appointment_id.0, "insurance details attached");
            Ok(updated)
        })
    }

    /// Fetch one appointment by id.
    pub fn appointment(&self, appointment_id: AppointmentId) -> CarebookResult<Appointment> {
        let appointments: Vec<Appointment> = self.store.load(TableKind::Appointments)?;
        appointments
            .into_iter()
            .find(|a| a.appointment_id == appointment_id)
            .ok_or(CarebookError::AppointmentNotFound {
                appointment_id: appointment_id.0,
            })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use chrono::{NaiveDate, NaiveTime};

    use carebook_contracts::appointment::{BookingRequest, InsuranceInfo};
    use carebook_contracts::error::CarebookError;
    use carebook_contracts::ids::{AppointmentId, DoctorId, PatientId, SlotId};
    use carebook_contracts::schedule::Slot;
    use carebook_store::{RecordStore, TableKind};

    use super::SlotLedger;

    fn seeded_ledger(slot_ids: &[&str]) -> (Arc<RecordStore>, SlotLedger) {
        let store = Arc::new(RecordStore::in_memory());
        for (i, id) in slot_ids.iter().enumerate() {
            let slot = Slot {
                slot_id: SlotId::new(*id),
                doctor_id: DoctorId::new("D1"),
                date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
                time: NaiveTime::from_hms_opt(9 + i as u32, 0, 0).unwrap(),
                is_booked: false,
            };
            store.append(TableKind::Slots, &slot).unwrap();
        }
        let ledger = SlotLedger::new(Arc::clone(&store)).unwrap();
        (store, ledger)
    }

    fn request(slot_id: &str, patient_name: &str) -> BookingRequest {
        BookingRequest {
            slot_id: SlotId::new(slot_id),
            patient_id: Some(PatientId(1)),
            patient_name: patient_name.to_string(),
            reason: "general consultation".to_string(),
        }
    }

    #[test]
    fn book_flips_slot_and_copies_its_fields() {
        let (store, ledger) = seeded_ledger(&["S1"]);

        let appt = ledger.book(request("S1", "Rahul Mehta")).unwrap();
        assert_eq!(appt.appointment_id, AppointmentId(1));
        assert_eq!(appt.doctor_id, DoctorId::new("D1"));
        assert_eq!(appt.time, NaiveTime::from_hms_opt(9, 0, 0).unwrap());

        let slots: Vec<Slot> = store.load(TableKind::Slots).unwrap();
        assert!(slots[0].is_booked);
    }

    #[test]
    fn booking_an_unknown_slot_fails() {
        let (_store, ledger) = seeded_ledger(&["S1"]);
        match ledger.book(request("S9", "Rahul Mehta")) {
            Err(CarebookError::SlotNotFound { slot_id }) => assert_eq!(slot_id, "S9"),
            other => panic!("expected SlotNotFound, got {:?}", other),
        }
    }

    #[test]
    fn booking_a_booked_slot_is_a_conflict() {
        let (_store, ledger) = seeded_ledger(&["S1"]);
        ledger.book(request("S1", "Rahul Mehta")).unwrap();

        match ledger.book(request("S1", "Asha Rao")) {
            Err(CarebookError::SlotAlreadyBooked { slot_id }) => assert_eq!(slot_id, "S1"),
            other => panic!("expected SlotAlreadyBooked, got {:?}", other),
        }
    }

    /// Under concurrent booking of one slot, exactly one caller wins.
    #[test]
    fn concurrent_booking_of_one_slot_has_one_winner() {
        let (_store, ledger) = seeded_ledger(&["S1"]);
        let ledger = Arc::new(ledger);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let ledger = Arc::clone(&ledger);
                thread::spawn(move || ledger.book(request("S1", &format!("Caller {}", i))))
            })
            .collect();

        let mut won = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.join().unwrap() {
                Ok(_) => won += 1,
                Err(CarebookError::SlotAlreadyBooked { .. }) => conflicts += 1,
                Err(other) => panic!("unexpected error: {:?}", other),
            }
        }
        assert_eq!(won, 1);
        assert_eq!(conflicts, 7);
    }

    /// Cancellation restores the slot and removes the appointment.
    #[test]
    fn cancel_restores_capacity() {
        let (store, ledger) = seeded_ledger(&["S1"]);
        let appt = ledger.book(request("S1", "Rahul Mehta")).unwrap();

        let receipt = ledger.cancel(appt.appointment_id).unwrap();
        assert_eq!(receipt.slot_id, SlotId::new("S1"));

        let slots: Vec<Slot> = store.load(TableKind::Slots).unwrap();
        assert!(slots[0].is_free());
        match ledger.appointment(appt.appointment_id) {
            Err(CarebookError::AppointmentNotFound { .. }) => {}
            other => panic!("expected AppointmentNotFound, got {:?}", other),
        }
    }

    #[test]
    fn cancel_unknown_appointment_fails() {
        let (_store, ledger) = seeded_ledger(&["S1"]);
        match ledger.cancel(AppointmentId(7)) {
            Err(CarebookError::AppointmentNotFound { appointment_id }) => {
                assert_eq!(appointment_id, 7);
            }
            other => panic!("expected AppointmentNotFound, got {:?}", other),
        }
    }

    /// Ids are strictly increasing and never reused after cancellation.
    #[test]
    fn appointment_ids_are_never_reused() {
        let (_store, ledger) = seeded_ledger(&["S1", "S2", "S3"]);

        let first = ledger.book(request("S1", "A")).unwrap();
        let second = ledger.book(request("S2", "B")).unwrap();
        assert!(second.appointment_id > first.appointment_id);

        // Cancelling the newest appointment must not free its id.
        ledger.cancel(second.appointment_id).unwrap();
        let third = ledger.book(request("S3", "C")).unwrap();
        assert!(third.appointment_id > second.appointment_id);
    }

    #[test]
    fn find_free_slots_filters_by_doctor_and_booking_state() {
        let (store, ledger) = seeded_ledger(&["S1", "S2"]);
        let other_doctor = Slot {
            slot_id: SlotId::new("S3"),
            doctor_id: DoctorId::new("D2"),
            date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            time: NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
            is_booked: false,
        };
        store.append(TableKind::Slots, &other_doctor).unwrap();
        ledger.book(request("S1", "Rahul Mehta")).unwrap();

        let free = ledger.find_free_slots(&DoctorId::new("D1"), None).unwrap();
        let ids: Vec<&str> = free.iter().map(|s| s.slot_id.0.as_str()).collect();
        assert_eq!(ids, vec!["S2"]);
    }

    #[test]
    fn find_free_slots_honors_the_date_filter() {
        let (store, ledger) = seeded_ledger(&["S1"]);
        let later = Slot {
            slot_id: SlotId::new("S2"),
            doctor_id: DoctorId::new("D1"),
            date: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            is_booked: false,
        };
        store.append(TableKind::Slots, &later).unwrap();

        let free = ledger
            .find_free_slots(&DoctorId::new("D1"), NaiveDate::from_ymd_opt(2025, 6, 2))
            .unwrap();
        assert_eq!(free.len(), 1);
        assert_eq!(free[0].slot_id, SlotId::new("S2"));
    }

    #[test]
    fn attach_insurance_patches_the_stored_row() {
        let (_store, ledger) = seeded_ledger(&["S1"]);
        let appt = ledger.book(request("S1", "Rahul Mehta")).unwrap();

        let info = InsuranceInfo {
            carrier: "HealthPrime".to_string(),
            member_id: "AB12345".to_string(),
            group_number: "7890".to_string(),
        };
        ledger.attach_insurance(appt.appointment_id, &info).unwrap();

        let stored = ledger.appointment(appt.appointment_id).unwrap();
        assert_eq!(stored.insurance_carrier.as_deref(), Some("HealthPrime"));
        assert_eq!(stored.insurance_member_id.as_deref(), Some("AB12345"));
        assert_eq!(stored.insurance_group.as_deref(), Some("7890"));
    }
}
