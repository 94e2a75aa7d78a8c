//! Reminder records.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::AppointmentId;

/// The channel a reminder (or any simulated notification) goes out on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderChannel {
    Email,
    Sms,
}

impl fmt::Display for ReminderChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReminderChannel::Email => f.write_str("email"),
            ReminderChannel::Sms => f.write_str("sms"),
        }
    }
}

/// Delivery state of a reminder. The core only ever writes `Scheduled`;
/// delivery is external.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderStatus {
    Scheduled,
    Sent,
}

/// One reminder row: three are created per confirmed appointment at fixed
/// offsets, never mutated afterwards by this core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub appointment_id: AppointmentId,
    pub reminder_number: u8,
    pub send_time: DateTime<Utc>,
    pub recipient: Option<String>,
    pub channel: ReminderChannel,
    pub status: ReminderStatus,
}
