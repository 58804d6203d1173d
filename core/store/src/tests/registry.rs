use super::{key, setup, table1, table1_uncached};
use crate::cache::{CacheLookup, CacheProvider, MemoryCache};
use crate::row::RowAccess;
use crate::test_utils::{MockCacheProvider, MockRowProvider};
use crate::{Access, Error, Heptane, Table, TableValidationReason};
use assert_matches::assert_matches;
use heptane_primitives::fields;
use std::sync::Arc;

#[test]
fn register_rejects_an_invalid_table() {
    let heptane = Heptane::new();
    let broken = Table { name: String::new(), ..table1() };

    let err = heptane.register(broken, Arc::new(MockRowProvider::new()), None).unwrap_err();

    assert_matches!(
        err,
        Error::InvalidTable(validation) => {
            assert_eq!(validation.reason, TableValidationReason::EmptyName);
        }
    );
    assert!(heptane.table_names().is_empty());
}

#[test]
fn register_replaces_the_previous_registration() {
    let (heptane, _row, _cache) = setup();
    assert!(heptane.cache_provider("table1").is_some());
    assert!(heptane.table("table1").unwrap().cache_enabled());

    heptane.register(table1_uncached(), Arc::new(MockRowProvider::new()), None).unwrap();

    assert_eq!(heptane.table_names(), vec!["table1".to_string()]);
    assert!(!heptane.table("table1").unwrap().cache_enabled());
    assert!(heptane.cache_provider("table1").is_none());
}

#[test]
fn unregister_is_idempotent() {
    let (heptane, _row, _cache) = setup();
    heptane.unregister("table1");
    heptane.unregister("table1");
    assert!(heptane.table("table1").is_none());
    assert!(heptane.row_provider("table1").is_none());
}

#[test]
fn table_names_snapshots_every_registration() {
    let (heptane, row, _cache) = setup();
    let other = Table { name: "other".to_string(), ..table1() };
    heptane.register(other, row, None).unwrap();

    let mut names = heptane.table_names();
    names.sort();
    assert_eq!(names, vec!["other".to_string(), "table1".to_string()]);
}

#[test]
fn lookups_on_an_unregistered_name_return_nothing() {
    let heptane = Heptane::new();
    assert!(heptane.table("ghost").is_none());
    assert!(heptane.row_provider("ghost").is_none());
    assert!(heptane.cache_provider("ghost").is_none());
}

#[test]
fn access_slice_isolates_failures_per_access() {
    let (heptane, _row, cache) = setup();
    cache.on_get(key("table1_pk#0#1#2"), CacheLookup::Row(b"3".to_vec()));

    let results = heptane.access_slice(vec![
        Access::Retrieve { table: "ghost".to_string(), fields: fields! {} },
        Access::Retrieve {
            table: "table1".to_string(),
            fields: fields! { "foo" => "1", "bar" => "2" },
        },
    ]);

    assert_eq!(results.len(), 2);
    assert_matches!(&results[0], Err(Error::UnregisteredTable(name)) if name == "ghost");
    assert_eq!(
        results[1].as_ref().unwrap(),
        &vec![fields! { "foo" => "1", "bar" => "2", "baz" => "3" }]
    );
}

#[test]
fn registry_survives_concurrent_callers() {
    let row = Arc::new(MockRowProvider::new());
    let request = fields! { "foo" => "1", "bar" => "2" };
    row.returns(
        RowAccess::Retrieve { table: table1(), key: request.clone() },
        vec![fields! { "foo" => "1", "bar" => "2", "baz" => "3" }],
    );
    let heptane = Heptane::new();
    heptane.register(table1(), row.clone(), Some(Arc::new(MemoryCache::unbounded()) as Arc<dyn CacheProvider>)).unwrap();

    let churn = Table { name: "churn".to_string(), ..table1() };
    std::thread::scope(|scope| {
        let heptane = &heptane;
        let request = &request;
        scope.spawn(move || {
            for _ in 0..100 {
                let rows = heptane.retrieve("table1", request.clone()).unwrap();
                assert_eq!(rows.len(), 1);
            }
        });
        scope.spawn({
            let row = row.clone();
            move || {
                for _ in 0..100 {
                    heptane.register(churn.clone(), row.clone(), None).unwrap();
                    heptane.unregister("churn");
                }
            }
        });
        scope.spawn(move || {
            for _ in 0..100 {
                let names = heptane.table_names();
                assert!(names.contains(&"table1".to_string()));
            }
        });
    });

    // The first retrieve populated the cache; every later one hit it, so
    // the row store served at most one retrieve.
    assert_eq!(row.calls().iter().filter(|call| matches!(call, RowAccess::Retrieve { .. })).count(), 1);
}

#[test]
fn register_from_json_config() {
    let table: Table = serde_json::from_str(
        r#"{
            "name": "table1",
            "partitionKey": ["foo"],
            "primaryKey": ["foo", "bar"],
            "values": ["baz"],
            "types": {"foo": "string", "bar": "string", "baz": "string"},
            "cachePrefix": ["table1_pk", "0"]
        }"#,
    )
    .unwrap();
    assert_eq!(table, table1());

    let heptane = Heptane::new();
    let cache = Arc::new(MockCacheProvider::new());
    heptane.register(table, Arc::new(MockRowProvider::new()), Some(cache.clone() as Arc<dyn CacheProvider>)).unwrap();
    cache.on_get(key("table1_pk#0#1#2"), CacheLookup::Row(b"3".to_vec()));
    let rows = heptane.retrieve("table1", fields! { "foo" => "1", "bar" => "2" }).unwrap();
    assert_eq!(rows, vec![fields! { "foo" => "1", "bar" => "2", "baz" => "3" }]);
}
