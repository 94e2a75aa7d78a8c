//! # carebook-contracts
//!
//! Shared types and contracts for the carebook scheduling core.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate — only data definitions and error types.

pub mod appointment;
pub mod error;
pub mod ids;
pub mod patient;
pub mod reminder;
pub mod schedule;
pub mod session;
