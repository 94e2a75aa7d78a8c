//! # carebook-store
//!
//! Durable tabular storage for the carebook entity tables.
//!
//! The store is deliberately primitive — whole-table read-modify-write over
//! flat JSON files — but disciplined: one lock serializes every operation,
//! and multi-table mutations run as buffered transactions that commit all
//! their tables or none. See [`store::RecordStore`].

pub mod backend;
pub mod store;
pub mod table;

pub use backend::{JsonFileBackend, MemoryBackend, TableBackend};
pub use store::{RecordStore, Transaction};
pub use table::TableKind;
