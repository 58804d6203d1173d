//! Scenario tests of the access orchestration, driven through scripted
//! providers so every provider call sequence can be asserted exactly.

mod registry;

use crate::cache::{CacheKey, CacheProvider};
use crate::test_utils::{MockCacheProvider, MockRowProvider};
use crate::Heptane;
use heptane_primitives::{FieldType, Table};
use std::sync::Arc;

/// Partition key `foo`, primary key `foo, bar`, one string value `baz`,
/// cache prefix `table1_pk # 0`.
fn table1() -> Table {
    Table {
        name: "table1".to_string(),
        partition_key: vec!["foo".to_string()],
        primary_key: vec!["foo".to_string(), "bar".to_string()],
        values: vec!["baz".to_string()],
        types: [
            ("foo".to_string(), FieldType::String),
            ("bar".to_string(), FieldType::String),
            ("baz".to_string(), FieldType::String),
        ]
        .into(),
        cache_prefix: Some(vec!["table1_pk".to_string(), "0".to_string()]),
    }
}

/// Same table with the primary key cache disabled.
fn table1_uncached() -> Table {
    Table { cache_prefix: None, ..table1() }
}

/// A facade with `table1` registered over scripted providers.
fn setup() -> (Heptane, Arc<MockRowProvider>, Arc<MockCacheProvider>) {
    let row = Arc::new(MockRowProvider::new());
    let cache = Arc::new(MockCacheProvider::new());
    let heptane = Heptane::new();
    heptane.register(table1(), row.clone(), Some(cache.clone() as Arc<dyn CacheProvider>)).unwrap();
    (heptane, row, cache)
}

fn key(text: &str) -> CacheKey {
    CacheKey(text.as_bytes().to_vec())
}
