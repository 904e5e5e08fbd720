//! SQL dialect abstraction

use sqlparser::ast::Statement;
use sqlparser::dialect::{
    Dialect, DuckDbDialect as SqlParserDuckDb, GenericDialect as SqlParserGeneric,
    PostgreSqlDialect as SqlParserPostgres, SnowflakeDialect as SqlParserSnowflake,
};
use sqlparser::parser::Parser;

use crate::error::{SqlError, SqlResult};

/// Trait for SQL dialect implementations
pub trait SqlDialect: Send + Sync {
    /// Get the underlying sqlparser dialect
    fn parser_dialect(&self) -> &dyn Dialect;

    /// Parse SQL into AST statements
    fn parse(&self, sql: &str) -> SqlResult<Vec<Statement>> {
        Parser::parse_sql(self.parser_dialect(), sql).map_err(|e| {
            let msg = e.to_string();
            let (line, column) = parse_location_from_error(&msg);
            SqlError::ParseError {
                message: msg,
                line,
                column,
            }
        })
    }

    /// Get the dialect name
    fn name(&self) -> &'static str;
}

/// `(line, column)` from the "Line: N, Column: M" suffix of a sqlparser
/// message, `(0, 0)` when absent. `ParserError` has no structured location.
fn parse_location_from_error(msg: &str) -> (usize, usize) {
    match (number_after(msg, "Line: "), number_after(msg, "Column: ")) {
        (Some(line), Some(column)) => (line, column),
        _ => (0, 0),
    }
}

fn number_after(msg: &str, label: &str) -> Option<usize> {
    let rest = &msg[msg.find(label)? + label.len()..];
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

macro_rules! sql_dialect {
    ($(#[$doc:meta])* $name:ident, $inner:ident, $label:literal) => {
        $(#[$doc])*
        pub struct $name {
            dialect: $inner,
        }

        impl $name {
            /// Create a new dialect instance
            pub fn new() -> Self {
                Self { dialect: $inner {} }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl SqlDialect for $name {
            fn parser_dialect(&self) -> &dyn Dialect {
                &self.dialect
            }

            fn name(&self) -> &'static str {
                $label
            }
        }
    };
}

sql_dialect!(
    /// DuckDB SQL dialect
    DuckDbDialect,
    SqlParserDuckDb,
    "duckdb"
);

sql_dialect!(
    /// Snowflake SQL dialect
    SnowflakeDialect,
    SqlParserSnowflake,
    "snowflake"
);

sql_dialect!(
    /// PostgreSQL dialect
    PostgresDialect,
    SqlParserPostgres,
    "postgres"
);

sql_dialect!(
    /// Permissive generic dialect, used for catalogs without a dedicated parser
    GenericDialect,
    SqlParserGeneric,
    "generic"
);

#[cfg(test)]
#[path = "dialect_test.rs"]
mod tests;
