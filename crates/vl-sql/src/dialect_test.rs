use super::*;

#[test]
fn test_duckdb_parse() {
    let dialect = DuckDbDialect::new();
    let stmts = dialect.parse("SELECT * FROM users").unwrap();
    assert_eq!(stmts.len(), 1);
    assert_eq!(dialect.name(), "duckdb");
}

#[test]
fn test_snowflake_parse() {
    let dialect = SnowflakeDialect::new();
    let stmts = dialect
        .parse("SELECT a FROM db.sch.t QUALIFY ROW_NUMBER() OVER (ORDER BY a) = 1")
        .unwrap();
    assert_eq!(stmts.len(), 1);
}

#[test]
fn test_generic_and_postgres_parse() {
    for dialect in [
        Box::new(GenericDialect::new()) as Box<dyn SqlDialect>,
        Box::new(PostgresDialect::new()) as Box<dyn SqlDialect>,
    ] {
        let stmts = dialect
            .parse("SELECT h.name FROM hotel.hotel AS h")
            .unwrap();
        assert_eq!(stmts.len(), 1, "dialect {}", dialect.name());
    }
}

#[test]
fn test_parse_error_carries_location() {
    let dialect = DuckDbDialect::new();
    let result = dialect.parse("SELECT a\nFROM t WHERE");
    match result {
        Err(SqlError::ParseError { message, .. }) => assert!(!message.is_empty()),
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn test_parse_location_extraction() {
    let (line, col) = parse_location_from_error("Expected: something at Line: 5, Column: 10");
    assert_eq!(line, 5);
    assert_eq!(col, 10);

    let (line, col) = parse_location_from_error("Some error without location");
    assert_eq!(line, 0);
    assert_eq!(col, 0);
}
