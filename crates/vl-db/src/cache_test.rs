use super::*;
use crate::static_catalog::StaticCatalog;
use std::sync::atomic::AtomicBool;

/// Counts provider calls and can be switched into a failing state
struct CountingProvider {
    inner: StaticCatalog,
    calls: AtomicUsize,
    column_calls: AtomicUsize,
    failing: AtomicBool,
}

impl CountingProvider {
    fn new(inner: StaticCatalog) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
            column_calls: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> DbResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(DbError::ConnectionError("catalog unavailable".to_string()));
        }
        Ok(())
    }
}

impl CatalogProvider for CountingProvider {
    fn schema_names(&self) -> DbResult<Vec<String>> {
        self.check()?;
        self.inner.schema_names()
    }

    fn table_names(&self, schema: &str) -> DbResult<Vec<String>> {
        self.check()?;
        self.inner.table_names(schema)
    }

    fn view_names(&self, schema: &str) -> DbResult<Vec<String>> {
        self.check()?;
        self.inner.view_names(schema)
    }

    fn view_definition(&self, view: &str, schema: &str) -> DbResult<String> {
        self.check()?;
        self.inner.view_definition(view, schema)
    }

    fn columns(&self, table: &str, schema: &str) -> DbResult<Vec<ColumnDescription>> {
        self.check()?;
        self.column_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.columns(table, schema)
    }

    fn catalog_type(&self) -> &'static str {
        "counting"
    }
}

fn hotel() -> CatalogCache<CountingProvider> {
    let catalog = StaticCatalog::new()
        .with_table("HOTEL", "ROOM", &["HNO", "Type", "PRICE"])
        .with_table("HOTEL", "HOTEL", &["HNO", "NAME"])
        .with_view(
            "HOTEL",
            "Cheap_Rooms",
            "SELECT HNO FROM HOTEL.ROOM",
            &["HNO"],
        );
    CatalogCache::new(CountingProvider::new(catalog))
}

#[test]
fn test_repeated_calls_hit_the_cache() {
    let cache = hotel();
    for _ in 0..5 {
        assert_eq!(cache.columns("ROOM", "HOTEL").unwrap().len(), 3);
    }
    assert_eq!(cache.provider().column_calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.stats(), CacheStats { hits: 4, misses: 1 });
}

#[test]
fn test_keys_are_full_argument_tuples() {
    let cache = hotel();
    cache.columns("ROOM", "HOTEL").unwrap();
    cache.columns("HOTEL", "HOTEL").unwrap();
    cache.columns("ROOM", "OTHER").unwrap();
    cache.columns("ROOM", "HOTEL").unwrap();
    assert_eq!(cache.provider().column_calls.load(Ordering::SeqCst), 3);
}

#[test]
fn test_every_method_is_memoized() {
    let cache = hotel();
    for _ in 0..3 {
        cache.schema_names().unwrap();
        cache.table_names("HOTEL").unwrap();
        cache.view_names("HOTEL").unwrap();
        cache.view_definition("Cheap_Rooms", "HOTEL").unwrap();
    }
    assert_eq!(cache.provider().calls(), 4);
}

#[test]
fn test_results_are_shared_snapshots() {
    let cache = hotel();
    let first = cache.schema_names().unwrap();
    let second = cache.schema_names().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn test_table_schema_is_case_insensitive_and_keeps_catalog_casing() {
    let cache = hotel();
    let schema = cache.table_schema("ROOM", "HOTEL").unwrap();
    assert_eq!(schema.len(), 3);
    assert_eq!(schema["type"].name, "Type");
    assert!(!schema.contains_key("Type"));

    // derived from the memoized column list
    cache.table_schema("ROOM", "HOTEL").unwrap();
    cache.columns("ROOM", "HOTEL").unwrap();
    assert_eq!(cache.provider().column_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_relation_index_covers_tables_and_views() {
    let cache = hotel();
    let index = cache.relation_index("HOTEL").unwrap();
    assert_eq!(index["room"], "ROOM");
    assert_eq!(index["hotel"], "HOTEL");
    assert_eq!(index["cheap_rooms"], "Cheap_Rooms");
    assert!(cache.relation_index("NOPE").unwrap().is_empty());
}

#[test]
fn test_errors_propagate_and_are_not_cached() {
    let cache = hotel();
    cache.provider().failing.store(true, Ordering::SeqCst);
    let err = cache.view_names("HOTEL").unwrap_err();
    assert!(matches!(err, DbError::ConnectionError(_)));

    cache.provider().failing.store(false, Ordering::SeqCst);
    assert_eq!(cache.view_names("HOTEL").unwrap().len(), 1);
    assert_eq!(cache.provider().calls(), 2);
}

#[test]
fn test_unknown_view_definition_is_empty() {
    let cache = hotel();
    assert!(cache.view_definition("missing", "HOTEL").unwrap().is_empty());
}

#[test]
fn test_shared_across_threads() {
    let cache = Arc::new(hotel());
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let cache = Arc::clone(&cache);
            std::thread::spawn(move || cache.table_schema("HOTEL", "HOTEL").unwrap().len())
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), 2);
    }
    assert_eq!(cache.provider().column_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_hit_does_not_build_label() {
    let cache = CatalogCache::new(StaticCatalog::new().with_table("hotel", "room", &["hno"]));
    let first = cache
        .memoize(&cache.table_names, "hotel".to_string(), || "first".to_string(), || {
            Ok(vec!["room".to_string()])
        })
        .unwrap();
    let second = cache
        .memoize(
            &cache.table_names,
            "hotel".to_string(),
            || panic!("label built on a cache hit"),
            || Ok(Vec::new()),
        )
        .unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1 });
}
