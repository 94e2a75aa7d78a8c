//! The five entity tables and their fixed schemas.

use std::fmt;

/// The entity kinds the record store persists.
///
/// Each kind maps to one table file with a fixed column set. The column
/// names are part of the external contract so existing data stays readable
/// across releases; the on-disk format is not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKind {
    Patients,
    Slots,
    Appointments,
    Reminders,
    Forms,
}

impl TableKind {
    /// All kinds, in the order mutations are committed.
    pub const ALL: [TableKind; 5] = [
        TableKind::Patients,
        TableKind::Slots,
        TableKind::Appointments,
        TableKind::Reminders,
        TableKind::Forms,
    ];

    /// File name for this table under the store's data directory.
    pub fn file_name(self) -> &'static str {
        match self {
            TableKind::Patients => "patients.json",
            TableKind::Slots => "doctor_schedules.json",
            TableKind::Appointments => "appointments.json",
            TableKind::Reminders => "reminders.json",
            TableKind::Forms => "forms_sent.json",
        }
    }

}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TableKind::Patients => "patients",
            TableKind::Slots => "slots",
            TableKind::Appointments => "appointments",
            TableKind::Reminders => "reminders",
            TableKind::Forms => "forms",
        };
        f.write_str(name)
    }
}
