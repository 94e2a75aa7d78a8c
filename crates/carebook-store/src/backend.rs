//! Table backends: where the raw rows live.
//!
//! A backend only knows how to read and write a whole table of untyped JSON
//! rows. Serialization to domain types and all locking live in
//! [`RecordStore`](crate::store::RecordStore) — backends are dumb.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use carebook_contracts::error::{CarebookError, CarebookResult};

use crate::table::TableKind;

/// One table's rows, untyped.
pub type Rows = Vec<serde_json::Value>;

/// Storage for whole tables. Implementations must treat every call as a
/// full-table read or a full-table replace — no partial or streaming I/O.
pub trait TableBackend: Send + Sync {
    /// Read the entire current table. A table that does not exist yet is an
    /// empty table, not an error.
    fn read_table(&self, kind: TableKind) -> CarebookResult<Rows>;

    /// Replace the entire table with `rows`.
    fn write_table(&self, kind: TableKind, rows: &Rows) -> CarebookResult<()>;
}

// ── File backend ──────────────────────────────────────────────────────────────

/// One JSON array file per table under a data directory.
pub struct JsonFileBackend {
    dir: PathBuf,
}

impl JsonFileBackend {
    /// Open (and create if needed) the data directory.
    pub fn new(dir: impl Into<PathBuf>) -> CarebookResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| CarebookError::Persistence {
            reason: format!("cannot create data directory '{}': {}", dir.display(), e),
        })?;
        Ok(Self { dir })
    }

    fn path(&self, kind: TableKind) -> PathBuf {
        self.dir.join(kind.file_name())
    }
}

impl TableBackend for JsonFileBackend {
    fn read_table(&self, kind: TableKind) -> CarebookResult<Rows> {
        let path = self.path(kind);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            // Missing table file: auto-initialized empty on first write.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(CarebookError::Persistence {
                    reason: format!("cannot read table '{}': {}", path.display(), e),
                })
            }
        };
        serde_json::from_str(&contents).map_err(|e| CarebookError::Persistence {
            reason: format!("table '{}' is not a valid JSON array: {}", path.display(), e),
        })
    }

    fn write_table(&self, kind: TableKind, rows: &Rows) -> CarebookResult<()> {
        let path = self.path(kind);
        let contents =
            serde_json::to_string_pretty(rows).map_err(|e| CarebookError::Persistence {
                reason: format!("cannot serialize table '{}': {}", kind, e),
            })?;
        fs::write(&path, contents).map_err(|e| CarebookError::Persistence {
            reason: format!("cannot write table '{}': {}", path.display(), e),
        })
    }
}

// ── Memory backend ────────────────────────────────────────────────────────────

/// Tables held in a `HashMap`, for tests and the demo's dry-run paths.
#[derive(Default)]
pub struct MemoryBackend {
    tables: Mutex<HashMap<TableKind, Rows>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TableBackend for MemoryBackend {
    fn read_table(&self, kind: TableKind) -> CarebookResult<Rows> {
        let tables = self.tables.lock().map_err(|_| CarebookError::Persistence {
            reason: "memory backend lock poisoned".to_string(),
        })?;
        Ok(tables.get(&kind).cloned().unwrap_or_default())
    }

    fn write_table(&self, kind: TableKind, rows: &Rows) -> CarebookResult<()> {
        let mut tables = self.tables.lock().map_err(|_| CarebookError::Persistence {
            reason: "memory backend lock poisoned".to_string(),
        })?;
        tables.insert(kind, rows.clone());
        Ok(())
    }
}
