//! Per-table column metadata, loaded at most once.
//!
//! The cache moves Closed → Loading → Loaded exactly once. The first caller
//! performs the load; concurrent callers block until it finishes and then
//! share the same column list. A failed load still finalizes to Loaded with
//! no columns, and is never retried for the lifetime of the cache.

use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, OnceLock, PoisonError};
use std::thread::{self, ThreadId};

use serde::Serialize;

use crate::command::Command;
use crate::error::OrmResult;
use crate::item::TaggedMap;

/// One column of a table, as reported by the dialect's introspection query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    /// Stored default expression (literal or function name).
    pub default_expr: Option<String>,
    /// False for columns outside the table's explicit column projection.
    pub is_mapped: bool,
}

/// Runs introspection commands against a live connection.
///
/// Rows are returned as tagged maps keyed by result column name.
pub trait TableInfoSource {
    fn query(&self, command: &Command) -> OrmResult<Vec<TaggedMap>>;
}

impl<F> TableInfoSource for F
where
    F: Fn(&Command) -> OrmResult<Vec<TaggedMap>>,
{
    fn query(&self, command: &Command) -> OrmResult<Vec<TaggedMap>> {
        self(command)
    }
}

/// Lifecycle of a [`TableMetadataCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Closed,
    Loading,
    Loaded,
}

const CLOSED: u8 = 0;
const LOADING: u8 = 1;
const LOADED: u8 = 2;

#[derive(Debug, Default)]
struct Slot {
    loader: Option<ThreadId>,
    failure: Option<String>,
}

/// Once-only, thread-safe column metadata for one table.
#[derive(Debug)]
pub struct TableMetadataCache {
    table: String,
    state: AtomicU8,
    columns: OnceLock<Arc<[ColumnDescriptor]>>,
    slot: Mutex<Slot>,
    loaded: Condvar,
    load_count: AtomicUsize,
}

impl TableMetadataCache {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            state: AtomicU8::new(CLOSED),
            columns: OnceLock::new(),
            slot: Mutex::new(Slot::default()),
            loaded: Condvar::new(),
            load_count: AtomicUsize::new(0),
        }
    }

    pub fn state(&self) -> CacheState {
        match self.state.load(Ordering::Acquire) {
            CLOSED => CacheState::Closed,
            LOADING => CacheState::Loading,
            _ => CacheState::Loaded,
        }
    }

    /// Number of physical loads performed (0 or 1).
    pub fn load_count(&self) -> usize {
        self.load_count.load(Ordering::Acquire)
    }

    /// Message of the failed load, if the cache was finalized after an error.
    pub fn failure(&self) -> Option<String> {
        self.lock().failure.clone()
    }

    /// Cached columns, without triggering a load.
    pub fn get(&self) -> Option<Arc<[ColumnDescriptor]>> {
        self.columns.get().cloned()
    }

    /// Return the cached columns, running `load` if nobody has yet.
    ///
    /// Only the caller that ran a failing `load` sees its error; everybody
    /// else (including later callers) gets the empty column list.
    /// A re-entrant call from inside `load` on the same thread returns an
    /// empty list instead of deadlocking.
    pub fn ensure_loaded<F>(&self, load: F) -> OrmResult<Arc<[ColumnDescriptor]>>
    where
        F: FnOnce() -> OrmResult<Vec<ColumnDescriptor>>,
    {
        if let Some(columns) = self.columns.get() {
            return Ok(Arc::clone(columns));
        }

        let me = thread::current().id();
        let mut slot = self.lock();
        loop {
            match self.state() {
                CacheState::Loaded => return Ok(self.cached_or_empty()),
                CacheState::Loading if slot.loader == Some(me) => return Ok(Arc::from([])),
                CacheState::Loading => {
                    slot = self
                        .loaded
                        .wait(slot)
                        .unwrap_or_else(PoisonError::into_inner);
                }
                CacheState::Closed => break,
            }
        }
        slot.loader = Some(me);
        self.state.store(LOADING, Ordering::Release);
        drop(slot);

        self.load_count.fetch_add(1, Ordering::AcqRel);
        tracing::debug!(target: "dialorm.metadata", table = %self.table, "loading table metadata");

        let mut guard = FinalizeOnDrop { cache: self, armed: true };
        let outcome = load();
        guard.armed = false;

        match outcome {
            Ok(columns) => {
                let columns = self.finish(columns, None);
                tracing::debug!(
                    target: "dialorm.metadata",
                    table = %self.table,
                    columns = columns.len(),
                    "table metadata loaded"
                );
                Ok(columns)
            }
            Err(err) => {
                tracing::warn!(
                    target: "dialorm.metadata",
                    table = %self.table,
                    error = %err,
                    "table metadata load failed; cache finalized without columns"
                );
                self.finish(Vec::new(), Some(err.to_string()));
                Err(err)
            }
        }
    }

    fn finish(
        &self,
        columns: Vec<ColumnDescriptor>,
        failure: Option<String>,
    ) -> Arc<[ColumnDescriptor]> {
        let _ = self.columns.set(Arc::from(columns));
        let mut slot = self.lock();
        slot.loader = None;
        slot.failure = failure;
        self.state.store(LOADED, Ordering::Release);
        drop(slot);
        self.loaded.notify_all();
        self.cached_or_empty()
    }

    fn cached_or_empty(&self) -> Arc<[ColumnDescriptor]> {
        self.columns.get().cloned().unwrap_or_else(|| Arc::from([]))
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Finalizes the cache if the load closure panics, so waiters are released.
struct FinalizeOnDrop<'a> {
    cache: &'a TableMetadataCache,
    armed: bool,
}

impl Drop for FinalizeOnDrop<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.cache
                .finish(Vec::new(), Some("table metadata load panicked".to_string()));
        }
    }
}

/// Mark each column as mapped or not according to an explicit projection.
///
/// With no projection every column is mapped.
pub(crate) fn apply_projection(columns: &mut [ColumnDescriptor], projection: Option<&[String]>) {
    for column in columns {
        column.is_mapped = match projection {
            None => true,
            Some(names) => names.iter().any(|n| n.eq_ignore_ascii_case(&column.name)),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OrmError;

    fn column(name: &str) -> ColumnDescriptor {
        ColumnDescriptor {
            name: name.into(),
            data_type: "int".into(),
            nullable: false,
            default_expr: None,
            is_mapped: true,
        }
    }

    #[test]
    fn loads_once() {
        let cache = TableMetadataCache::new("t");
        assert_eq!(cache.state(), CacheState::Closed);
        let cols = cache.ensure_loaded(|| Ok(vec![column("Id")])).unwrap();
        assert_eq!(cols.len(), 1);
        let again = cache
            .ensure_loaded(|| panic!("must not load twice"))
            .unwrap();
        assert_eq!(again[0].name, "Id");
        assert_eq!(cache.load_count(), 1);
        assert_eq!(cache.state(), CacheState::Loaded);
    }

    #[test]
    fn failure_is_final() {
        let cache = TableMetadataCache::new("t");
        let err = cache
            .ensure_loaded(|| Err(OrmError::metadata("t", "connection reset")))
            .unwrap_err();
        assert!(err.is_metadata());
        assert_eq!(cache.state(), CacheState::Loaded);
        assert!(cache.failure().unwrap().contains("connection reset"));

        let cols = cache.ensure_loaded(|| Ok(vec![column("Id")])).unwrap();
        assert!(cols.is_empty());
        assert_eq!(cache.load_count(), 1);
    }

    #[test]
    fn reentrant_call_sees_empty_columns() {
        let cache = TableMetadataCache::new("t");
        let cols = cache
            .ensure_loaded(|| {
                let inner = cache.ensure_loaded(|| Ok(vec![column("Nested")]))?;
                assert!(inner.is_empty());
                assert_eq!(cache.state(), CacheState::Loading);
                Ok(vec![column("Id")])
            })
            .unwrap();
        assert_eq!(cols[0].name, "Id");
        assert_eq!(cache.load_count(), 1);
    }

    #[test]
    fn panicking_load_releases_the_cache() {
        let cache = TableMetadataCache::new("t");
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = cache.ensure_loaded(|| panic!("boom"));
        }));
        assert!(result.is_err());
        assert_eq!(cache.state(), CacheState::Loaded);
        assert!(cache.ensure_loaded(|| Ok(vec![column("Id")])).unwrap().is_empty());
    }

    #[test]
    fn projection_flags_columns() {
        let mut cols = vec![column("Id"), column("Name"), column("Secret")];
        let projection = vec!["id".to_string(), "NAME".to_string()];
        apply_projection(&mut cols, Some(&projection));
        let mapped: Vec<_> = cols.iter().map(|c| c.is_mapped).collect();
        assert_eq!(mapped, [true, true, false]);
    }
}
