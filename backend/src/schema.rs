//! Schema Extractor: canonical table descriptions for the prompt.
//!
//! Column names are read back from the store's own introspection, never
//! from the decoder, so the schema the model is prompted with always
//! matches what was actually materialized after type coercion.

use crate::error::PipelineError;
use crate::store::EphemeralStore;
use regex::Regex;
use std::path::Path;

/// Derives a store table name from an uploaded filename: extension
/// stripped, spaces replaced, remaining non-identifier characters
/// collapsed to `_`. Two files sanitizing to the same name silently
/// replace each other in the store; that is a documented limitation,
/// not an error.
pub fn table_name_for(filename: &str) -> String {
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(filename);

    // Constant pattern, cannot fail to compile.
    let non_identifier = Regex::new(r"[^A-Za-z0-9_]").unwrap();
    let name = non_identifier
        .replace_all(&stem.replace(' ', "_"), "_")
        .into_owned();

    if name.is_empty() {
        "data".to_string()
    } else {
        name
    }
}

/// One table's description, in the store's own column order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<String>,
}

impl TableSchema {
    /// Reads the schema of a materialized table back from the store.
    pub fn introspect(store: &EphemeralStore, name: &str) -> Result<Self, PipelineError> {
        let columns = store.introspect_columns(name).map_err(PipelineError::Store)?;
        Ok(Self {
            name: name.to_string(),
            columns,
        })
    }

    /// The exact fragment the model is prompted with.
    pub fn fragment(&self) -> String {
        format!("Table: {}({})", self.name, self.columns.join(", "))
    }
}

/// Joins the per-table fragments with a single line break, in file
/// upload order. This text is part of the prompt contract.
pub fn combine_schemas(schemas: &[TableSchema]) -> String {
    schemas
        .iter()
        .map(TableSchema::fragment)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_names_are_sanitized() {
        assert_eq!(table_name_for("sales.csv"), "sales");
        assert_eq!(table_name_for("monthly report.csv"), "monthly_report");
        assert_eq!(table_name_for("über-data (v2).csv"), "_ber_data__v2_");
        assert_eq!(table_name_for("q1.results.csv"), "q1_results");
    }

    #[test]
    fn unusable_names_fall_back_to_data() {
        assert_eq!(table_name_for(""), "data");
    }

    #[test]
    fn fragments_join_with_single_line_break() {
        let schemas = vec![
            TableSchema {
                name: "a".to_string(),
                columns: vec!["x".to_string(), "y".to_string()],
            },
            TableSchema {
                name: "b".to_string(),
                columns: vec!["z".to_string()],
            },
        ];
        assert_eq!(combine_schemas(&schemas), "Table: a(x, y)\nTable: b(z)");
    }
}
