//! Uniform facade over row-oriented tables with a look-aside primary key
//! cache.
//!
//! Client code registers a table descriptor together with a [`RowProvider`]
//! and, optionally, a [`CacheProvider`], then issues create, retrieve,
//! update and delete accesses by table name. The facade keeps the cache
//! consistent with the authoritative row store: every successful mutation
//! refreshes the cached row (reading it back first when the mutation was
//! partial), a delete records a negative entry instead of evicting, a
//! retrieve by full primary key consults the cache before the row store,
//! and a retrieve by partition key populates the cache for each returned
//! row.
//!
//! No lock is held across provider calls and no ordering holds between
//! concurrent callers: two accesses racing on the same key can leave the
//! cache stale until the next mutation of that key. Callers that need
//! linearizability must serialize externally.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

pub mod cache;
pub mod codec;
mod errors;
pub mod row;
pub mod step;
pub mod test_utils;

#[cfg(test)]
mod tests;

pub use errors::Error;
pub use heptane_primitives::{
    FieldMap, FieldName, FieldType, FieldValue, Table, TableName, TableValidationError,
    TableValidationReason,
};

use crate::cache::{CacheAccess, CacheLookup, CacheProvider};
use crate::row::{RowAccess, RowProvider};
use crate::step::{Batch, BatchHandle, BatchStep, Step, StepResult};

/// One logical operation against a registered table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    /// Insert a row; `fields` must carry the full primary key.
    Create { table: TableName, fields: FieldMap },
    /// Fetch rows; `fields` must carry at least the full partition key.
    Retrieve { table: TableName, fields: FieldMap },
    /// Update a row; `fields` must carry the full primary key.
    Update { table: TableName, fields: FieldMap },
    /// Delete a row; `fields` must carry the full primary key.
    Delete { table: TableName, fields: FieldMap },
}

impl Access {
    /// Name of the table the access targets.
    pub fn table_name(&self) -> &str {
        match self {
            Access::Create { table, .. }
            | Access::Retrieve { table, .. }
            | Access::Update { table, .. }
            | Access::Delete { table, .. } => table,
        }
    }
}

/// A registered table with its drivers.
struct Registration {
    table: Table,
    row: Arc<dyn RowProvider>,
    cache: Option<Arc<dyn CacheProvider>>,
}

impl Registration {
    /// The cache driver, when the table has its primary key cache
    /// configured. Both the provider and the descriptor prefix must be
    /// present for any cache traffic to happen.
    fn cache(&self) -> Option<&Arc<dyn CacheProvider>> {
        if self.table.cache_enabled() { self.cache.as_ref() } else { None }
    }
}

/// The facade handle: a registry of tables and the orchestrator of accesses
/// over their row stores and look-aside caches.
pub struct Heptane {
    // Snapshot the registration under the lock and release it before any
    // provider call; providers may block for arbitrarily long.
    tables: Mutex<HashMap<TableName, Arc<Registration>>>,
}

impl Default for Heptane {
    fn default() -> Heptane {
        Heptane::new()
    }
}

impl Heptane {
    /// An empty registry.
    pub fn new() -> Heptane {
        Heptane { tables: Mutex::new(HashMap::new()) }
    }

    /// Validates `table` and registers it with its drivers, replacing any
    /// previous registration under the same name.
    pub fn register(
        &self,
        table: Table,
        row: Arc<dyn RowProvider>,
        cache: Option<Arc<dyn CacheProvider>>,
    ) -> Result<(), Error> {
        table.validate()?;
        debug!(target: "heptane", table = %table.name, cached = cache.is_some(), "register table");
        let registration = Arc::new(Registration { table, row, cache });
        self.tables
            .lock()
            .unwrap()
            .insert(registration.table.name.clone(), registration);
        Ok(())
    }

    /// Removes the registration under `name`, if any.
    pub fn unregister(&self, name: &str) {
        debug!(target: "heptane", table = %name, "unregister table");
        self.tables.lock().unwrap().remove(name);
    }

    /// Names of every registered table, in no particular order.
    pub fn table_names(&self) -> Vec<TableName> {
        self.tables.lock().unwrap().keys().cloned().collect()
    }

    /// The registered descriptor under `name`.
    pub fn table(&self, name: &str) -> Option<Table> {
        self.registration(name).map(|reg| reg.table.clone())
    }

    /// The registered row provider under `name`.
    pub fn row_provider(&self, name: &str) -> Option<Arc<dyn RowProvider>> {
        self.registration(name).map(|reg| reg.row.clone())
    }

    /// The registered cache provider under `name`.
    pub fn cache_provider(&self, name: &str) -> Option<Arc<dyn CacheProvider>> {
        self.registration(name).and_then(|reg| reg.cache.clone())
    }

    /// Performs one access. A retrieve yields the matching rows; mutations
    /// yield an empty list.
    pub fn access(&self, access: Access) -> Result<Vec<FieldMap>, Error> {
        match access {
            Access::Create { table, fields } => self.create(&table, fields).map(|()| Vec::new()),
            Access::Retrieve { table, fields } => self.retrieve(&table, fields),
            Access::Update { table, fields } => self.update(&table, fields).map(|()| Vec::new()),
            Access::Delete { table, fields } => self.delete(&table, fields).map(|()| Vec::new()),
        }
    }

    /// Performs several accesses, one result per access in input order.
    /// Each access is independent: a failure does not stop the rest.
    pub fn access_slice(&self, accesses: Vec<Access>) -> Vec<Result<Vec<FieldMap>, Error>> {
        accesses.into_iter().map(|access| self.access(access)).collect()
    }

    /// Inserts the row in `fields` and refreshes its cache entry.
    #[tracing::instrument(target = "heptane", level = "trace", skip_all, fields(table = %table))]
    pub fn create(&self, table: &str, fields: FieldMap) -> Result<(), Error> {
        let reg = self.require(table)?;
        self.write_through(&reg, WriteKind::Create, fields)
    }

    /// Updates the row in `fields` and refreshes its cache entry. When any
    /// value field is absent from `fields` the row is read back first, so
    /// the cache is written from the authoritative copy.
    #[tracing::instrument(target = "heptane", level = "trace", skip_all, fields(table = %table))]
    pub fn update(&self, table: &str, fields: FieldMap) -> Result<(), Error> {
        let reg = self.require(table)?;
        self.write_through(&reg, WriteKind::Update, fields)
    }

    /// Fetches rows. With the full primary key present and the cache
    /// enabled the cache answers first; otherwise (or on a miss) the row
    /// store answers and the cache is populated with every returned row.
    #[tracing::instrument(target = "heptane", level = "trace", skip_all, fields(table = %table))]
    pub fn retrieve(&self, table: &str, fields: FieldMap) -> Result<Vec<FieldMap>, Error> {
        let reg = self.require(table)?;
        if let Some(cache) = reg.cache() {
            // A failure to assemble the key (typically a partition-key-only
            // request) skips the lookup and falls through to the row store.
            if let Ok(key) = codec::cache_key(&reg.table, &fields) {
                let lookup = cache_call(cache.as_ref(), CacheAccess::Get { key })?;
                if let Some(row) = cached_row(&reg.table, &fields, &lookup)? {
                    debug!(target: "heptane", table = %reg.table.name, "cache hit");
                    return Ok(vec![row]);
                }
                debug!(target: "heptane", table = %reg.table.name, "cache miss");
            }
        }
        let retrieve = RowAccess::Retrieve { table: reg.table.clone(), key: fields };
        let rows = row_call(reg.row.as_ref(), retrieve)?;
        if let Some(cache) = reg.cache() {
            populate(cache, &reg.table, &rows)?;
        }
        Ok(rows)
    }

    /// Deletes the row keyed by `fields` and records a negative cache
    /// entry, so later retrieves of the key are answered from the cache
    /// without consulting the row store.
    #[tracing::instrument(target = "heptane", level = "trace", skip_all, fields(table = %table))]
    pub fn delete(&self, table: &str, fields: FieldMap) -> Result<(), Error> {
        let reg = self.require(table)?;
        let key = codec::cache_key(&reg.table, &fields)?;
        let delete = RowAccess::Delete { table: reg.table.clone(), key: fields };
        row_call(reg.row.as_ref(), delete)?;
        let Some(cache) = reg.cache() else { return Ok(()) };
        cache_call(cache.as_ref(), CacheAccess::Set { key, value: None })?;
        Ok(())
    }

    fn write_through(
        &self,
        reg: &Registration,
        kind: WriteKind,
        mut fields: FieldMap,
    ) -> Result<(), Error> {
        // The key is assembled up front: it both validates the primary key
        // and pins the cache entry to the fields of the request, not of the
        // read-back.
        let key = codec::cache_key(&reg.table, &fields)?;
        let write = match kind {
            WriteKind::Create => RowAccess::Create { table: reg.table.clone(), row: fields.clone() },
            WriteKind::Update => RowAccess::Update { table: reg.table.clone(), row: fields.clone() },
        };
        row_call(reg.row.as_ref(), write)?;
        if !reg.table.contains_all_values(&fields) {
            let retrieve = RowAccess::Retrieve { table: reg.table.clone(), key: fields.clone() };
            let rows = row_call(reg.row.as_ref(), retrieve)?;
            fields = rows.into_iter().next().unwrap_or_default();
        }
        let Some(cache) = reg.cache() else { return Ok(()) };
        let value = codec::encode_row(&reg.table, &fields)?;
        cache_call(cache.as_ref(), CacheAccess::Set { key, value: Some(value) })?;
        Ok(())
    }

    fn registration(&self, name: &str) -> Option<Arc<Registration>> {
        self.tables.lock().unwrap().get(name).cloned()
    }

    fn require(&self, name: &str) -> Result<Arc<Registration>, Error> {
        self.registration(name).ok_or_else(|| Error::UnregisteredTable(name.to_string()))
    }
}

enum WriteKind {
    Create,
    Update,
}

fn row_call(provider: &dyn RowProvider, access: RowAccess) -> Result<Vec<FieldMap>, Error> {
    match provider.access(&access) {
        Ok(rows) => Ok(rows),
        Err(source) => Err(Error::RowProviderAccess { access, source }),
    }
}

fn cache_call(provider: &dyn CacheProvider, access: CacheAccess) -> Result<CacheLookup, Error> {
    match provider.access(&access) {
        Ok(lookup) => Ok(lookup.unwrap_or(CacheLookup::Miss)),
        Err(source) => Err(Error::CacheProviderAccess { access, source }),
    }
}

/// Decodes a cache hit into a row, merging the primary key fields of the
/// request back in. A negative entry decodes to the key fields alone; a
/// miss yields `None`.
fn cached_row(
    table: &Table,
    fields: &FieldMap,
    lookup: &CacheLookup,
) -> Result<Option<FieldMap>, Error> {
    let mut row = match lookup {
        CacheLookup::Miss => return Ok(None),
        CacheLookup::Negative => FieldMap::new(),
        CacheLookup::Row(bytes) => codec::decode_row(table, bytes)?,
    };
    for field in &table.primary_key {
        if let Some(value) = fields.get(field) {
            row.insert(field.clone(), value.clone());
        }
    }
    Ok(Some(row))
}

/// Writes one cache entry per retrieved row, every set of the fan-out
/// coalesced into a single batched provider call by the step executor.
fn populate(
    cache: &Arc<dyn CacheProvider>,
    table: &Table,
    rows: &[FieldMap],
) -> Result<(), Error> {
    let mut sets = Vec::with_capacity(rows.len());
    for row in rows {
        let key = codec::cache_key(table, row)?;
        let value = codec::encode_row(table, row)?;
        sets.push(CacheAccess::Set { key, value: Some(value) });
    }
    if sets.is_empty() {
        return Ok(());
    }
    let handle = BatchHandle::new(Arc::new(CacheSetBatch { cache: cache.clone() }));
    let steps = sets
        .iter()
        .map(|set| {
            Step::Batch(Box::new(CacheSetStep { handle: handle.clone(), set: set.clone() }))
        })
        .collect();
    let mut errors: Vec<Error> = step::exec(steps)
        .into_iter()
        .zip(sets)
        .filter_map(|(err, set)| {
            err.map(|source| Error::CacheProviderAccess { access: set, source })
        })
        .collect();
    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        _ => Err(Error::MultipleErrors(errors)),
    }
}

/// One cache write of a retrieve fan-out.
struct CacheSetStep {
    handle: BatchHandle,
    set: CacheAccess,
}

impl BatchStep for CacheSetStep {
    fn batch(&self) -> BatchHandle {
        self.handle.clone()
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// Delivers a round of cache writes as one `access_slice` call.
struct CacheSetBatch {
    cache: Arc<dyn CacheProvider>,
}

impl Batch for CacheSetBatch {
    fn exec(&self, steps: Vec<Box<dyn BatchStep>>) -> Vec<StepResult> {
        let sets: Vec<CacheAccess> = steps
            .into_iter()
            .filter_map(|step| step.into_any().downcast::<CacheSetStep>().ok())
            .map(|step| step.set)
            .collect();
        self.cache
            .access_slice(&sets)
            .into_iter()
            .map(|result| result.map(|_| None))
            .collect()
    }
}
