//! Build report: what a lineage build skipped and why

use serde::Serialize;

/// A view whose definition could not be parsed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnparsableView {
    /// `schema.view`
    pub view: String,
    /// Parser message
    pub message: String,
}

/// A reference that did not match anything in the catalog
///
/// Distinct from a column without lineage: this means resolution itself
/// broke for `reference`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedReference {
    /// `schema.view` being analyzed
    pub view: String,
    /// Output column whose lineage was being resolved
    pub column: String,
    /// The offending reference as written in the SQL (`schema.table.column`)
    pub reference: String,
}

/// Counters and skip lists accumulated by one build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    /// Schemas enumerated from the catalog (before filtering)
    pub schemas_scanned: usize,
    /// Views enumerated in allowed schemas (before filtering)
    pub views_scanned: usize,
    /// Schemas and views rejected by a filter
    pub dropped: Vec<String>,
    /// Views with no definition text
    pub empty_definitions: Vec<String>,
    /// Views whose SQL failed to parse
    pub unparsable: Vec<UnparsableView>,
    /// References dropped because they do not exist in the catalog
    pub unresolved: Vec<UnresolvedReference>,
}

impl BuildReport {
    /// Record a schema or view rejected by a filter
    pub fn report_dropped(&mut self, name: impl Into<String>) {
        self.dropped.push(name.into());
    }

    /// True when nothing was skipped for a reason other than filtering
    pub fn is_clean(&self) -> bool {
        self.empty_definitions.is_empty() && self.unparsable.is_empty() && self.unresolved.is_empty()
    }
}
