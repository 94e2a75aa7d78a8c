//! Doctor schedule slots.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::ids::{DoctorId, SlotId};

/// A bookable doctor time unit, exclusive once booked.
///
/// Slots are pre-seeded externally; the core only flips `is_booked`. The
/// invariant: `false → true` exactly once per booking and `true → false`
/// exactly once per cancellation, never a double transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub slot_id: SlotId,
    pub doctor_id: DoctorId,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub is_booked: bool,
}

impl Slot {
    pub fn is_free(&self) -> bool {
        !self.is_booked
    }
}
