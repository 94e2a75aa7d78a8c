//! # carebook-ledger
//!
//! The authoritative record of slot booking state.
//!
//! Booking and cancellation are the only mutators of the schedule table, and
//! both run inside a single store transaction so the check-then-act sequence
//! (observe `is_booked = false`, then flip it) can never interleave with
//! another caller's. Under concurrent booking of the same slot, exactly one
//! caller succeeds; the rest get a conflict.

pub mod ledger;

pub use ledger::SlotLedger;
