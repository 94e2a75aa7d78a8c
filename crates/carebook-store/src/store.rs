//! The `RecordStore`: typed access plus the single-writer discipline.
//!
//! Every operation — reads included — runs under one `Mutex`, so readers see
//! either the pre- or post-mutation table, never a partial write, and the
//! check-then-act sequences built on [`RecordStore::transaction`] cannot
//! interleave. This is the critical section that prevents two callers from
//! both observing a free slot before either books it.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use carebook_contracts::error::{CarebookError, CarebookResult};

use crate::backend::{JsonFileBackend, MemoryBackend, Rows, TableBackend};
use crate::table::TableKind;

fn to_rows<T: Serialize>(rows: &[T]) -> CarebookResult<Rows> {
    rows.iter()
        .map(|row| {
            serde_json::to_value(row).map_err(|e| CarebookError::Persistence {
                reason: format!("cannot serialize row: {}", e),
            })
        })
        .collect()
}

fn from_rows<T: DeserializeOwned>(kind: TableKind, rows: Rows) -> CarebookResult<Vec<T>> {
    rows.into_iter()
        .map(|row| {
            serde_json::from_value(row).map_err(|e| CarebookError::Persistence {
                reason: format!("malformed row in table '{}': {}", kind, e),
            })
        })
        .collect()
}

/// Durable tabular storage for the five entity kinds.
///
/// All operations are whole-table read-modify-write: a read loads the entire
/// current table, a mutation computes the new full table and writes it back
/// before the call returns.
pub struct RecordStore {
    backend: Box<dyn TableBackend>,
    guard: Mutex<()>,
}

impl RecordStore {
    pub fn new(backend: Box<dyn TableBackend>) -> Self {
        Self { backend, guard: Mutex::new(()) }
    }

    /// Open a file-backed store under `dir` (created if missing).
    pub fn open(dir: impl Into<PathBuf>) -> CarebookResult<Self> {
        Ok(Self::new(Box::new(JsonFileBackend::new(dir)?)))
    }

    /// An in-memory store, for tests and throwaway sessions.
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryBackend::new()))
    }

    fn lock(&self) -> CarebookResult<std::sync::MutexGuard<'_, ()>> {
        self.guard.lock().map_err(|_| CarebookError::Persistence {
            reason: "record store lock poisoned".to_string(),
        })
    }

    /// Load the full table, in store order.
    pub fn load<T: DeserializeOwned>(&self, kind: TableKind) -> CarebookResult<Vec<T>> {
        let _guard = self.lock()?;
        from_rows(kind, self.backend.read_table(kind)?)
    }

    /// Append one record and write the table back.
    pub fn append<T: Serialize>(&self, kind: TableKind, record: &T) -> CarebookResult<()> {
        self.transaction(|tx| tx.append(kind, record))
    }

    /// Patch every record matching `predicate`; returns how many matched.
    pub fn update<T>(
        &self,
        kind: TableKind,
        predicate: impl Fn(&T) -> bool,
        patch: impl Fn(&mut T),
    ) -> CarebookResult<usize>
    where
        T: Serialize + DeserializeOwned,
    {
        self.transaction(|tx| {
            let mut records: Vec<T> = tx.load(kind)?;
            let mut matched = 0;
            for record in records.iter_mut().filter(|r| predicate(r)) {
                patch(record);
                matched += 1;
            }
            tx.replace(kind, &records)?;
            Ok(matched)
        })
    }

    /// Remove every record matching `predicate`; returns how many were removed.
    pub fn delete<T>(
        &self,
        kind: TableKind,
        predicate: impl Fn(&T) -> bool,
    ) -> CarebookResult<usize>
    where
        T: Serialize + DeserializeOwned,
    {
        self.transaction(|tx| {
            let records: Vec<T> = tx.load(kind)?;
            let before = records.len();
            let kept: Vec<T> = records.into_iter().filter(|r| !predicate(r)).collect();
            let removed = before - kept.len();
            tx.replace(kind, &kept)?;
            Ok(removed)
        })
    }

    /// Run `f` as one atomic read-modify-write over any number of tables.
    ///
    /// The closure reads and replaces tables through the [`Transaction`]
    /// view; nothing touches the backend until the closure returns `Ok`, at
    /// which point every dirty table is committed while the store lock is
    /// still held. A closure error commits nothing.
    pub fn transaction<R>(
        &self,
        f: impl FnOnce(&mut Transaction<'_>) -> CarebookResult<R>,
    ) -> CarebookResult<R> {
        let _guard = self.lock()?;
        let mut tx = Transaction {
            backend: self.backend.as_ref(),
            cache: HashMap::new(),
            dirty: HashSet::new(),
        };
        let result = f(&mut tx)?;

        // Commit in fixed table order so the crash window is deterministic:
        // slots are always durable before the appointments that reference them.
        for kind in TableKind::ALL {
            if tx.dirty.contains(&kind) {
                let rows = tx.cache.get(&kind).cloned().unwrap_or_default();
                self.backend.write_table(kind, &rows)?;
                debug!(table = %kind, rows = rows.len(), "table committed");
            }
        }
        Ok(result)
    }
}

/// A buffered view over the store used inside [`RecordStore::transaction`].
pub struct Transaction<'a> {
    backend: &'a dyn TableBackend,
    cache: HashMap<TableKind, Rows>,
    dirty: HashSet<TableKind>,
}

impl Transaction<'_> {
    /// Load a table through the transaction: uncommitted replacements made
    /// earlier in the same transaction are visible.
    pub fn load<T: DeserializeOwned>(&mut self, kind: TableKind) -> CarebookResult<Vec<T>> {
        if let Some(rows) = self.cache.get(&kind) {
            return from_rows(kind, rows.clone());
        }
        let rows = self.backend.read_table(kind)?;
        self.cache.insert(kind, rows.clone());
        from_rows(kind, rows)
    }

    /// Stage a full replacement of `kind`. Committed only if the whole
    /// transaction succeeds.
    pub fn replace<T: Serialize>(&mut self, kind: TableKind, records: &[T]) -> CarebookResult<()> {
        let rows = to_rows(records)?;
        self.cache.insert(kind, rows);
        self.dirty.insert(kind);
        Ok(())
    }

    /// Stage appending one record to `kind`.
    pub fn append<T: Serialize>(&mut self, kind: TableKind, record: &T) -> CarebookResult<()> {
        let mut rows = match self.cache.get(&kind) {
            Some(rows) => rows.clone(),
            None => self.backend.read_table(kind)?,
        };
        rows.push(serde_json::to_value(record).map_err(|e| CarebookError::Persistence {
            reason: format!("cannot serialize row: {}", e),
        })?);
        self.cache.insert(kind, rows);
        self.dirty.insert(kind);
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime};
    use serde::{Deserialize, Serialize};

    use carebook_contracts::error::CarebookError;
    use carebook_contracts::ids::{DoctorId, SlotId};
    use carebook_contracts::schedule::Slot;

    use crate::table::TableKind;

    use super::RecordStore;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Row {
        id: u64,
        label: String,
    }

    fn slot(id: &str, booked: bool) -> Slot {
        Slot {
            slot_id: SlotId::new(id),
            doctor_id: DoctorId::new("D1"),
            date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            is_booked: booked,
        }
    }

    #[test]
    fn missing_table_is_empty_not_an_error() {
        let store = RecordStore::in_memory();
        let rows: Vec<Row> = store.load(TableKind::Patients).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn append_then_load_preserves_store_order() {
        let store = RecordStore::in_memory();
        for i in 1..=3 {
            store
                .append(TableKind::Slots, &slot(&format!("S{}", i), false))
                .unwrap();
        }

        let slots: Vec<Slot> = store.load(TableKind::Slots).unwrap();
        let ids: Vec<&str> = slots.iter().map(|s| s.slot_id.0.as_str()).collect();
        assert_eq!(ids, vec!["S1", "S2", "S3"]);
    }

    #[test]
    fn update_patches_only_matching_rows() {
        let store = RecordStore::in_memory();
        store.append(TableKind::Slots, &slot("S1", false)).unwrap();
        store.append(TableKind::Slots, &slot("S2", false)).unwrap();

        let matched = store
            .update::<Slot>(
                TableKind::Slots,
                |s| s.slot_id.0 == "S2",
                |s| s.is_booked = true,
            )
            .unwrap();
        assert_eq!(matched, 1);

        let slots: Vec<Slot> = store.load(TableKind::Slots).unwrap();
        assert!(!slots[0].is_booked);
        assert!(slots[1].is_booked);
    }

    #[test]
    fn delete_removes_matching_rows() {
        let store = RecordStore::in_memory();
        store.append(TableKind::Slots, &slot("S1", false)).unwrap();
        store.append(TableKind::Slots, &slot("S2", true)).unwrap();

        let removed = store
            .delete::<Slot>(TableKind::Slots, |s| s.is_booked)
            .unwrap();
        assert_eq!(removed, 1);

        let slots: Vec<Slot> = store.load(TableKind::Slots).unwrap();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].slot_id.0, "S1");
    }

    #[test]
    fn failed_transaction_commits_nothing() {
        let store = RecordStore::in_memory();
        store.append(TableKind::Slots, &slot("S1", false)).unwrap();

        let result: Result<(), _> = store.transaction(|tx| {
            let mut slots: Vec<Slot> = tx.load(TableKind::Slots)?;
            slots[0].is_booked = true;
            tx.replace(TableKind::Slots, &slots)?;
            tx.append(TableKind::Forms, &serde_json::json!({ "appointment_id": 1 }))?;
            Err(CarebookError::Persistence { reason: "induced".to_string() })
        });
        assert!(result.is_err());

        // Neither staged write reached the backend.
        let slots: Vec<Slot> = store.load(TableKind::Slots).unwrap();
        assert!(!slots[0].is_booked);
        let forms: Vec<serde_json::Value> = store.load(TableKind::Forms).unwrap();
        assert!(forms.is_empty());
    }

    #[test]
    fn transaction_sees_its_own_staged_writes() {
        let store = RecordStore::in_memory();
        store
            .transaction(|tx| {
                tx.append(TableKind::Patients, &Row { id: 1, label: "a".to_string() })?;
                let rows: Vec<Row> = tx.load(TableKind::Patients)?;
                assert_eq!(rows.len(), 1);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn file_backend_round_trips_and_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = RecordStore::open(dir.path()).unwrap();
            store.append(TableKind::Slots, &slot("S1", false)).unwrap();
        }

        let store = RecordStore::open(dir.path()).unwrap();
        let slots: Vec<Slot> = store.load(TableKind::Slots).unwrap();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].slot_id.0, "S1");
        assert!(slots[0].is_free());
    }

    #[test]
    fn file_backend_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::open(dir.path()).unwrap();
        let slots: Vec<Slot> = store.load(TableKind::Slots).unwrap();
        assert!(slots.is_empty());
    }
}
