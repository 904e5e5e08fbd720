use super::*;
use crate::emit::{EmitOptions, LineageFactEmitter, UrnNamer};
use vl_core::Dataset;
use vl_db::{ColumnDescription, DbError, DbResult, StaticCatalog};

const FLAT_HOTEL_ROOMS: &str = "SELECT H.HNO, H.NAME, H.ADDRESS, H.CITY, H.STATE, H.ZIP, \
     R.TYPE, R.PRICE, R.FREE FROM HOTEL.ROOM AS R LEFT JOIN HOTEL.HOTEL AS H ON H.HNO = R.HNO";

const LATEST_MAINTENANCE: &str = r#"
    SELECT
      H.NAME,
      R.TYPE,
      R.PRICE,
      COUNT(R.TYPE) OVER (PARTITION BY H.NAME, R.TYPE) AS TOTAL_ROOM_COUNT,
      SUM(R.PRICE) OVER (PARTITION BY H.NAME) AS TOTAL_PRICE,
      ROW_NUMBER() OVER (PARTITION BY H.NAME ORDER BY R.PRICE DESC) AS RANK,
      MAX(M.DESCRIPTION) OVER (PARTITION BY H.NAME) AS LATEST_MAINTENANCE
    FROM
      HOTEL.HOTEL AS H
      INNER JOIN HOTEL.ROOM AS R ON H.HNO = R.HNO
      LEFT JOIN HOTEL.RESERVATION AS RES ON R.HNO = RES.HNO AND R.TYPE = RES.TYPE
      LEFT JOIN HOTEL.MAINTENANCE AS M ON H.HNO = M.HNO
    WHERE
      RES.RESNO IS NULL
    GROUP BY
      H.NAME, R.TYPE, R.PRICE, M.DESCRIPTION
"#;

fn hotel_catalog() -> StaticCatalog {
    StaticCatalog::new()
        .with_table(
            "hotel",
            "hotel",
            &["hno", "name", "address", "city", "state", "zip"],
        )
        .with_table("hotel", "room", &["hno", "type", "price", "free"])
        .with_table("hotel", "reservation", &["resno", "hno", "type", "arrival"])
        .with_table("hotel", "maintenance", &["mno", "hno", "description"])
        .with_view(
            "hotel",
            "flat_hotel_rooms",
            FLAT_HOTEL_ROOMS,
            &[
                "hno", "name", "address", "city", "state", "zip", "type", "price", "free",
            ],
        )
        .with_view(
            "hotel",
            "latest_maintenance",
            LATEST_MAINTENANCE,
            &[
                "name",
                "type",
                "price",
                "total_room_count",
                "total_price",
                "rank",
                "latest_maintenance",
            ],
        )
}

fn build(catalog: StaticCatalog) -> LineageGraph {
    let cache = CatalogCache::new(catalog);
    build_lineage(&cache, ColumnLineageAnalyzer::default(), |_| true, |_| true).unwrap()
}

fn downstream_names(lineage: &ViewLineage) -> Vec<&str> {
    lineage
        .edges()
        .iter()
        .map(|e| e.downstream().name.as_str())
        .collect()
}

fn upstreams_of(lineage: &ViewLineage, column: &str) -> Vec<String> {
    let edge = lineage
        .edge(column)
        .unwrap_or_else(|| panic!("no edge for '{column}'"));
    let mut upstreams: Vec<String> = edge.upstreams().iter().map(|u| u.to_string()).collect();
    upstreams.sort();
    upstreams
}

#[test]
fn test_flat_hotel_rooms() {
    let graph = build(hotel_catalog());
    let lineage = graph.view("hotel", "flat_hotel_rooms").unwrap();

    assert_eq!(
        downstream_names(lineage),
        vec!["hno", "name", "address", "city", "state", "zip", "type", "price", "free"]
    );
    for edge in &lineage.edges()[..6] {
        assert_eq!(edge.upstreams().len(), 1);
        assert_eq!(edge.upstreams()[0].dataset, Dataset::new("hotel", "hotel"));
    }
    for edge in &lineage.edges()[6..] {
        assert_eq!(edge.upstreams().len(), 1);
        assert_eq!(edge.upstreams()[0].dataset, Dataset::new("hotel", "room"));
    }
    assert_eq!(
        lineage.edge("hno").unwrap().downstream().dataset,
        Dataset::new("hotel", "flat_hotel_rooms")
    );
}

#[test]
fn test_latest_maintenance_window_lineage() {
    let graph = build(hotel_catalog());
    let lineage = graph.view("hotel", "latest_maintenance").unwrap();

    assert_eq!(
        downstream_names(lineage),
        vec![
            "name",
            "type",
            "price",
            "total_room_count",
            "total_price",
            "rank",
            "latest_maintenance"
        ]
    );
    assert_eq!(
        upstreams_of(lineage, "total_room_count"),
        vec!["hotel.hotel.name", "hotel.room.type"]
    );
    assert_eq!(
        upstreams_of(lineage, "latest_maintenance"),
        vec!["hotel.hotel.name", "hotel.maintenance.description"]
    );
    assert!(graph.report.is_clean());
}

#[test]
fn test_views_follow_catalog_order() {
    let graph = build(hotel_catalog());
    let names: Vec<&str> = graph.views.iter().map(|v| v.view().name()).collect();
    assert_eq!(names, vec!["flat_hotel_rooms", "latest_maintenance"]);
    assert_eq!(graph.report.schemas_scanned, 1);
    assert_eq!(graph.report.views_scanned, 2);
}

#[test]
fn test_column_order_follows_select_list() {
    let catalog = StaticCatalog::new()
        .with_table("s", "t", &["c", "b", "a"])
        .with_view("s", "v", "SELECT a, b, c FROM t", &["a", "b", "c"]);
    let graph = build(catalog);
    assert_eq!(
        downstream_names(graph.view("s", "v").unwrap()),
        vec!["a", "b", "c"]
    );
}

#[test]
fn test_shared_upstream_is_identical() {
    let catalog = StaticCatalog::new()
        .with_table("S", "T", &["Amount"])
        .with_view(
            "S",
            "v",
            "SELECT amount AS gross, AMOUNT * 2 AS doubled FROM s.t",
            &["GROSS", "DOUBLED"],
        );
    let graph = build(catalog);
    let lineage = graph.view("S", "v").unwrap();
    let gross = &lineage.edge("GROSS").unwrap().upstreams()[0];
    let doubled = &lineage.edge("DOUBLED").unwrap().upstreams()[0];
    assert_eq!(gross, doubled);
    assert_eq!(gross.name, "Amount");
    assert_eq!(gross.dataset, Dataset::new("S", "T"));
}

#[test]
fn test_literal_column_has_no_edge() {
    let catalog = StaticCatalog::new()
        .with_table("s", "t", &["id"])
        .with_view(
            "s",
            "v",
            "SELECT id, 1 AS constant_col FROM t",
            &["id", "constant_col"],
        );
    let graph = build(catalog);
    let lineage = graph.view("s", "v").unwrap();
    assert_eq!(downstream_names(lineage), vec!["id"]);
    assert!(lineage.edge("constant_col").is_none());
    assert!(graph.report.is_clean());
}

#[test]
fn test_cross_schema_reference() {
    let catalog = hotel_catalog().with_view(
        "reservations",
        "v",
        "SELECT h.name FROM hotel.hotel AS h",
        &["name"],
    );
    let graph = build(catalog);
    let lineage = graph.view("reservations", "v").unwrap();
    let upstream = &lineage.edge("name").unwrap().upstreams()[0];
    assert_eq!(upstream.dataset.schema, "hotel");
    assert_eq!(upstream.dataset.name, "hotel");
}

#[test]
fn test_aggregate_fan_in() {
    let catalog = hotel_catalog().with_view(
        "hotel",
        "room_totals",
        "SELECT COUNT(r.type) * r.price AS total FROM hotel.room r GROUP BY r.price",
        &["total"],
    );
    let graph = build(catalog);
    let lineage = graph.view("hotel", "room_totals").unwrap();
    assert_eq!(
        upstreams_of(lineage, "total"),
        vec!["hotel.room.price", "hotel.room.type"]
    );
    assert_eq!(
        lineage.upstream_datasets().iter().collect::<Vec<_>>(),
        vec![&Dataset::new("hotel", "room")]
    );
}

#[test]
fn test_unparsable_view_is_skipped() {
    let catalog = hotel_catalog().with_view(
        "hotel",
        "broken",
        "SELECT * FROM (",
        &["x"],
    );
    let graph = build(catalog);

    assert_eq!(graph.views.len(), 2);
    assert!(graph.view("hotel", "broken").is_none());
    assert_eq!(graph.report.unparsable.len(), 1);
    assert_eq!(graph.report.unparsable[0].view, "hotel.broken");
    assert!(!graph.report.unparsable[0].message.is_empty());
}

#[test]
fn test_unresolved_reference_is_dropped_and_reported() {
    let catalog = hotel_catalog().with_view(
        "hotel",
        "rooms_with_ghost",
        "SELECT r.hno, r.ghost, r.price + r.ghost AS adjusted FROM hotel.room r",
        &["hno", "ghost", "adjusted"],
    );
    let graph = build(catalog);
    let lineage = graph.view("hotel", "rooms_with_ghost").unwrap();

    assert_eq!(downstream_names(lineage), vec!["hno", "adjusted"]);
    assert_eq!(upstreams_of(lineage, "adjusted"), vec!["hotel.room.price"]);

    let unresolved = &graph.report.unresolved;
    assert_eq!(unresolved.len(), 2);
    assert!(unresolved
        .iter()
        .all(|u| u.view == "hotel.rooms_with_ghost" && u.reference == "hotel.room.ghost"));
    assert_eq!(unresolved[0].column, "ghost");
    assert_eq!(unresolved[1].column, "adjusted");
}

#[test]
fn test_missing_downstream_column_is_reported() {
    let catalog = hotel_catalog().with_view(
        "hotel",
        "stale",
        "SELECT r.hno, r.price FROM hotel.room r",
        &["hno"],
    );
    let graph = build(catalog);
    let lineage = graph.view("hotel", "stale").unwrap();
    assert_eq!(downstream_names(lineage), vec!["hno"]);
    assert_eq!(graph.report.unresolved.len(), 1);
    assert_eq!(graph.report.unresolved[0].column, "price");
}

#[test]
fn test_relations_without_column_edges_are_upstreams() {
    let catalog = hotel_catalog()
        .with_view(
            "hotel",
            "room_count",
            "SELECT COUNT(*) AS n FROM hotel.room",
            &["n"],
        )
        .with_view(
            "hotel",
            "hotels_with_rooms",
            "SELECT h.name FROM hotel.hotel h WHERE h.hno IN (SELECT r.hno FROM hotel.room r)",
            &["name"],
        );
    let graph = build(catalog);

    let room_count = graph.view("hotel", "room_count").unwrap();
    assert!(room_count.edges().is_empty());
    assert_eq!(
        room_count.upstream_datasets().iter().collect::<Vec<_>>(),
        vec![&Dataset::new("hotel", "room")]
    );

    let with_rooms = graph.view("hotel", "hotels_with_rooms").unwrap();
    assert_eq!(upstreams_of(with_rooms, "name"), vec!["hotel.hotel.name"]);
    assert_eq!(
        with_rooms.upstream_datasets().iter().collect::<Vec<_>>(),
        vec![&Dataset::new("hotel", "hotel"), &Dataset::new("hotel", "room")]
    );

    let mut emitter = LineageFactEmitter::new(UrnNamer::new("hana", "PROD"), EmitOptions::default());
    let facts = emitter.emit_graph(&graph);
    let room_count_facts = facts
        .iter()
        .find(|f| f.downstream.contains("hotel.room_count"))
        .unwrap();
    assert!(room_count_facts.edges.is_empty());
    assert_eq!(
        room_count_facts.upstreams.iter().collect::<Vec<_>>(),
        vec!["urn:li:dataset:(urn:li:dataPlatform:hana,hotel.room,PROD)"]
    );
}

#[test]
fn test_join_only_relation_is_an_upstream() {
    let graph = build(hotel_catalog());
    let lineage = graph.view("hotel", "latest_maintenance").unwrap();
    assert!(lineage
        .upstream_datasets()
        .contains(&Dataset::new("hotel", "reservation")));
    assert!(lineage
        .edges()
        .iter()
        .flat_map(|e| e.upstreams())
        .all(|u| u.dataset.name != "reservation"));
}

#[test]
fn test_references_missing_from_scope_are_reported() {
    let catalog = hotel_catalog()
        .with_view(
            "hotel",
            "derived_ghost",
            "SELECT x.price AS p, x.nope AS q FROM (SELECT * FROM hotel.room) AS x",
            &["p", "q"],
        )
        .with_view(
            "hotel",
            "lateral_alias",
            "SELECT h.name AS nm, upper(nm) AS up FROM hotel.hotel h",
            &["nm", "up"],
        );
    let graph = build(catalog);

    let derived = graph.view("hotel", "derived_ghost").unwrap();
    assert_eq!(downstream_names(derived), vec!["p"]);
    let lateral = graph.view("hotel", "lateral_alias").unwrap();
    assert_eq!(downstream_names(lateral), vec!["nm"]);

    let unresolved = |view: &str| {
        graph
            .report
            .unresolved
            .iter()
            .filter(|u| u.view == view)
            .map(|u| (u.column.as_str(), u.reference.as_str()))
            .collect::<Vec<_>>()
    };
    assert_eq!(unresolved("hotel.derived_ghost"), vec![("q", "x.nope")]);
    assert_eq!(unresolved("hotel.lateral_alias"), vec![("up", "nm")]);
    assert!(!graph.report.is_clean());
}

#[test]
fn test_filters_and_empty_definitions() {
    let catalog = hotel_catalog()
        .with_view("hotel", "empty_view", "", &[])
        .with_view("staging", "tmp_rooms", "SELECT hno FROM hotel.room", &["hno"]);
    let cache = CatalogCache::new(catalog);
    let graph = LineageGraphBuilder::new(&cache, ColumnLineageAnalyzer::default())
        .build(|schema| schema != "staging", |view| view != "latest_maintenance")
        .unwrap();

    let names: Vec<&str> = graph.views.iter().map(|v| v.view().name()).collect();
    assert_eq!(names, vec!["flat_hotel_rooms"]);
    assert_eq!(
        graph.report.dropped,
        vec!["hotel.latest_maintenance".to_string(), "staging".to_string()]
    );
    assert_eq!(graph.report.empty_definitions, vec!["hotel.empty_view"]);
    assert_eq!(graph.report.schemas_scanned, 2);
    assert_eq!(graph.report.views_scanned, 3);
}

#[test]
fn test_view_over_view_is_one_hop() {
    let catalog = hotel_catalog().with_view(
        "hotel",
        "cheap_rooms",
        "SELECT name, price FROM flat_hotel_rooms WHERE price < 100",
        &["name", "price"],
    );
    let graph = build(catalog);
    let lineage = graph.view("hotel", "cheap_rooms").unwrap();
    assert_eq!(
        upstreams_of(lineage, "price"),
        vec!["hotel.flat_hotel_rooms.price"]
    );
}

#[test]
fn test_star_expands_from_catalog_columns() {
    let catalog = hotel_catalog().with_view(
        "hotel",
        "all_rooms",
        "SELECT * FROM room",
        &["HNO", "TYPE", "PRICE", "FREE"],
    );
    let graph = build(catalog);
    let lineage = graph.view("hotel", "all_rooms").unwrap();
    assert_eq!(downstream_names(lineage), vec!["HNO", "TYPE", "PRICE", "FREE"]);
    assert_eq!(upstreams_of(lineage, "FREE"), vec!["hotel.room.free"]);
}

#[test]
fn test_cache_avoids_repeated_lookups() {
    let cache = CatalogCache::new(hotel_catalog());
    let builder = LineageGraphBuilder::new(&cache, ColumnLineageAnalyzer::default());
    builder.build(|_| true, |_| true).unwrap();
    let first = cache.stats();
    builder.build(|_| true, |_| true).unwrap();
    let second = cache.stats();
    assert_eq!(first.misses, second.misses);
    assert!(second.hits > first.hits);
}

/// Catalog whose view definition lookup fails
struct UnreachableCatalog;

impl CatalogProvider for UnreachableCatalog {
    fn schema_names(&self) -> DbResult<Vec<String>> {
        Ok(vec!["hotel".to_string()])
    }

    fn table_names(&self, _schema: &str) -> DbResult<Vec<String>> {
        Ok(Vec::new())
    }

    fn view_names(&self, _schema: &str) -> DbResult<Vec<String>> {
        Ok(vec!["flat_hotel_rooms".to_string()])
    }

    fn view_definition(&self, _view: &str, _schema: &str) -> DbResult<String> {
        Err(DbError::ConnectionError("connection reset".to_string()))
    }

    fn columns(&self, _table: &str, _schema: &str) -> DbResult<Vec<ColumnDescription>> {
        Ok(Vec::new())
    }

    fn catalog_type(&self) -> &'static str {
        "unreachable"
    }
}

#[test]
fn test_catalog_failure_aborts_build() {
    let cache = CatalogCache::new(UnreachableCatalog);
    let err = LineageGraphBuilder::new(&cache, ColumnLineageAnalyzer::default())
        .build(|_| true, |_| true)
        .unwrap_err();
    assert!(matches!(err, LineageError::Catalog(DbError::ConnectionError(_))));
    assert!(err.to_string().contains("connection reset"));
}
