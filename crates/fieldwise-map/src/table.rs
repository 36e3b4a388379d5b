//! Table-backed pair matching.
//!
//! A [`TableMatcher`] resolves pairs from an explicit destination-name →
//! source-name table instead of structural name equality. Tables can be
//! built in memory or loaded from a JSON object file.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use fieldwise_model::MemberSpec;

use crate::error::MapError;
use crate::matcher::{MemberPair, PairMatcher};

/// Declarative destination → source member table.
///
/// Lookups are exact-name on both sides: the table's spelling is
/// authoritative. Entries that reference members absent from either side
/// are skipped, not errors, so a chained name matcher still gets a chance
/// at whatever stays unresolved.
#[derive(Debug, Clone)]
pub struct TableMatcher {
    table: BTreeMap<String, String>,
    label: String,
}

impl TableMatcher {
    /// Build a matcher over an in-memory table.
    ///
    /// The identity label spells out the entries, so two inline tables with
    /// different contents never share a registry cache key.
    pub fn from_table(table: BTreeMap<String, String>) -> Self {
        let entries: Vec<String> = table
            .iter()
            .map(|(destination, source)| format!("{destination}={source}"))
            .collect();
        Self {
            table,
            label: format!("inline[{}]", entries.join(",")),
        }
    }

    /// Load a table from a JSON object file of `"Destination": "Source"`
    /// entries.
    ///
    /// An unreadable or unparseable file fails the whole load. Entries
    /// whose value is not a string are dropped individually; there is no
    /// partial-entry corruption.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, MapError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|error| MapError::TableIo {
            path: path.to_path_buf(),
            error,
        })?;
        let raw: BTreeMap<String, serde_json::Value> =
            serde_json::from_str(&contents).map_err(|error| MapError::TableParse {
                path: path.to_path_buf(),
                error,
            })?;

        let total = raw.len();
        let table: BTreeMap<String, String> = raw
            .into_iter()
            .filter_map(|(destination, value)| match value {
                serde_json::Value::String(source) => Some((destination, source)),
                _ => None,
            })
            .collect();

        if table.len() < total {
            tracing::debug!(
                path = %path.display(),
                kept = table.len(),
                dropped = total - table.len(),
                "dropped non-string match table entries"
            );
        }

        Ok(Self {
            table,
            label: path.display().to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl PairMatcher for TableMatcher {
    fn identity(&self) -> String {
        format!("table:{}", self.label)
    }

    fn find_pairs(&self, unresolved: &[MemberSpec], sources: &[MemberSpec]) -> Vec<MemberPair> {
        let by_name: BTreeMap<&str, &MemberSpec> =
            sources.iter().map(|spec| (spec.name, spec)).collect();

        unresolved
            .iter()
            .filter_map(|destination| {
                let source_name = self.table.get(destination.name)?;
                by_name.get(source_name.as_str()).map(|source| MemberPair {
                    destination: destination.name.to_string(),
                    source: source.name.to_string(),
                })
            })
            .collect()
    }
}
