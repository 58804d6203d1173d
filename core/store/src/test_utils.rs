//! Scripted providers for exercising the facade without a real store.
//!
//! Expectations are matched structurally in scripting order; an access with
//! no matching expectation fails with a "not mocked" error. Every access is
//! recorded, so tests can assert the exact provider call sequence.

use crate::cache::{CacheAccess, CacheKey, CacheLookup, CacheProvider, CacheValue};
use crate::row::{RowAccess, RowProvider};
use anyhow::anyhow;
use heptane_primitives::FieldMap;
use std::sync::Mutex;

enum Scripted<T> {
    Ok(T),
    Err(String),
}

impl<T: Clone> Scripted<T> {
    fn result(&self) -> anyhow::Result<T> {
        match self {
            Scripted::Ok(value) => Ok(value.clone()),
            Scripted::Err(message) => Err(anyhow!("{message}")),
        }
    }
}

/// [`RowProvider`] answering from scripted expectations.
#[derive(Default)]
pub struct MockRowProvider {
    expectations: Mutex<Vec<(RowAccess, Scripted<Vec<FieldMap>>)>>,
    calls: Mutex<Vec<RowAccess>>,
}

impl MockRowProvider {
    pub fn new() -> MockRowProvider {
        MockRowProvider::default()
    }

    /// Scripts the rows returned for `access`. Mutations should script an
    /// empty list.
    pub fn returns(&self, access: RowAccess, rows: Vec<FieldMap>) {
        self.expectations.lock().unwrap().push((access, Scripted::Ok(rows)));
    }

    /// Scripts a failure for `access`.
    pub fn fails(&self, access: RowAccess, message: &str) {
        self.expectations.lock().unwrap().push((access, Scripted::Err(message.to_string())));
    }

    /// Every access performed so far, in order.
    pub fn calls(&self) -> Vec<RowAccess> {
        self.calls.lock().unwrap().clone()
    }
}

impl RowProvider for MockRowProvider {
    fn access(&self, access: &RowAccess) -> anyhow::Result<Vec<FieldMap>> {
        self.calls.lock().unwrap().push(access.clone());
        let expectations = self.expectations.lock().unwrap();
        match expectations.iter().find(|(expected, _)| expected == access) {
            Some((_, outcome)) => outcome.result(),
            None => Err(anyhow!("not mocked: {access:?}")),
        }
    }
}

/// [`CacheProvider`] answering from scripted expectations.
#[derive(Default)]
pub struct MockCacheProvider {
    expectations: Mutex<Vec<(CacheAccess, Scripted<Option<CacheLookup>>)>>,
    calls: Mutex<Vec<CacheAccess>>,
    batches: Mutex<Vec<usize>>,
}

impl MockCacheProvider {
    pub fn new() -> MockCacheProvider {
        MockCacheProvider::default()
    }

    /// Scripts the lookup state answered for a get of `key`.
    pub fn on_get(&self, key: CacheKey, lookup: CacheLookup) {
        self.expectations
            .lock()
            .unwrap()
            .push((CacheAccess::Get { key }, Scripted::Ok(Some(lookup))));
    }

    /// Scripts the acknowledgement of a set of `key` to `value`.
    pub fn on_set(&self, key: CacheKey, value: CacheValue) {
        self.expectations
            .lock()
            .unwrap()
            .push((CacheAccess::Set { key, value }, Scripted::Ok(None)));
    }

    /// Scripts a failure for `access`.
    pub fn fails(&self, access: CacheAccess, message: &str) {
        self.expectations.lock().unwrap().push((access, Scripted::Err(message.to_string())));
    }

    /// Every access performed so far, in order, slice accesses flattened.
    pub fn calls(&self) -> Vec<CacheAccess> {
        self.calls.lock().unwrap().clone()
    }

    /// Size of every `access_slice` call performed so far.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().unwrap().clone()
    }
}

impl CacheProvider for MockCacheProvider {
    fn access(&self, access: &CacheAccess) -> anyhow::Result<Option<CacheLookup>> {
        self.calls.lock().unwrap().push(access.clone());
        let expectations = self.expectations.lock().unwrap();
        match expectations.iter().find(|(expected, _)| expected == access) {
            Some((_, outcome)) => outcome.result(),
            None => Err(anyhow!("not mocked: {access:?}")),
        }
    }

    fn access_slice(&self, accesses: &[CacheAccess]) -> Vec<anyhow::Result<Option<CacheLookup>>> {
        self.batches.lock().unwrap().push(accesses.len());
        accesses.iter().map(|access| self.access(access)).collect()
    }
}
