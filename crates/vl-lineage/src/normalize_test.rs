use super::*;
use vl_db::StaticCatalog;

fn cache() -> CatalogCache<StaticCatalog> {
    CatalogCache::new(
        StaticCatalog::new()
            .with_table("HOTEL", "ROOM", &["HNO", "TYPE", "PRICE"])
            .with_table("HOTEL", "HOTEL", &["HNO", "NAME"])
            .with_view(
                "HOTEL",
                "flat_rooms",
                "SELECT R.HNO, R.PRICE FROM HOTEL.ROOM AS R",
                &["HNO", "price"],
            )
            .with_table("RESERVATIONS", "BOOKING", &["ID", "HNO"]),
    )
}

fn view() -> View {
    View::new("HOTEL", "flat_rooms", "SELECT R.HNO, R.PRICE FROM HOTEL.ROOM AS R")
}

fn raw(schema: Option<&str>, table: &str, column: &str) -> RawColumnRef {
    RawColumnRef::new(schema.map(str::to_string), table, column)
}

#[test]
fn test_upstream_gets_catalog_casing() {
    let cache = cache();
    let normalizer = IdentifierNormalizer::new(&cache);
    let upstream = normalizer
        .normalize_upstream(&raw(Some("hotel"), "room", "price"), &view())
        .unwrap();
    assert_eq!(upstream.name, "PRICE");
    assert_eq!(upstream.dataset, Dataset::new("HOTEL", "ROOM"));
}

#[test]
fn test_normalization_is_idempotent() {
    let cache = cache();
    let normalizer = IdentifierNormalizer::new(&cache);
    let reference = raw(Some("hotel"), "room", "type");
    let first = normalizer.normalize_upstream(&reference, &view()).unwrap();
    let second = normalizer.normalize_upstream(&reference, &view()).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.to_string(), second.to_string());
}

#[test]
fn test_unqualified_reference_defaults_to_view_schema() {
    let cache = cache();
    let normalizer = IdentifierNormalizer::new(&cache);
    let upstream = normalizer
        .normalize_upstream(&raw(None, "hotel", "name"), &view())
        .unwrap();
    assert_eq!(upstream.dataset, Dataset::new("HOTEL", "HOTEL"));
    assert_eq!(upstream.name, "NAME");
}

#[test]
fn test_cross_schema_reference() {
    let cache = cache();
    let normalizer = IdentifierNormalizer::new(&cache);
    let upstream = normalizer
        .normalize_upstream(&raw(Some("reservations"), "booking", "id"), &view())
        .unwrap();
    assert_eq!(upstream.dataset.schema, "RESERVATIONS");
}

#[test]
fn test_downstream_uses_view_columns() {
    let cache = cache();
    let normalizer = IdentifierNormalizer::new(&cache);
    let downstream = normalizer.normalize_downstream("hno", &view()).unwrap();
    assert_eq!(downstream.name, "HNO");
    assert_eq!(downstream.dataset, Dataset::new("HOTEL", "flat_rooms"));
    assert_eq!(
        normalizer.normalize_downstream("PRICE", &view()).unwrap().name,
        "price"
    );
}

#[test]
fn test_missing_column_is_unresolved() {
    let cache = cache();
    let normalizer = IdentifierNormalizer::new(&cache);
    let err = normalizer
        .normalize_upstream(&raw(Some("hotel"), "room", "colour"), &view())
        .unwrap_err();
    match err {
        LineageError::UnresolvedIdentifier { reference, reason } => {
            assert_eq!(reference, "hotel.room.colour");
            assert!(reason.contains("column"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_missing_relation_and_schema_are_unresolved() {
    let cache = cache();
    let normalizer = IdentifierNormalizer::new(&cache);
    let err = normalizer
        .normalize_upstream(&raw(Some("hotel"), "suite", "hno"), &view())
        .unwrap_err();
    assert!(err.to_string().contains("relation not found"));

    let err = normalizer
        .normalize_upstream(&raw(Some("archive"), "room", "hno"), &view())
        .unwrap_err();
    assert!(err.to_string().contains("schema not found"));
    assert!(err.to_string().starts_with("[L002]"));
}

#[test]
fn test_exact_schema_match_preferred() {
    let cache = CatalogCache::new(
        StaticCatalog::new()
            .with_table("sales", "t", &["a"])
            .with_table("SALES", "t", &["A"]),
    );
    let normalizer = IdentifierNormalizer::new(&cache);
    assert_eq!(normalizer.resolve_schema("SALES").unwrap(), "SALES");
    assert_eq!(normalizer.resolve_schema("sales").unwrap(), "sales");
    assert_eq!(normalizer.resolve_schema("Sales").unwrap(), "sales");
}
