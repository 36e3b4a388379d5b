//! Error types for mapping operations.

use std::path::PathBuf;

use thiserror::Error;

use fieldwise_model::ConvertError;

/// Errors from rule compilation and mapping.
///
/// Compilation errors surface lazily, at the first map call after the
/// offending rule was added, not at authoring time. Per-field conditions
/// that evaluate false, lenient explicit-set mismatches, and opaque cast
/// mismatches are defined no-ops and never reach this type.
#[derive(Debug, Error)]
pub enum MapError {
    /// A rule names a destination member the destination type does not have.
    #[error("destination member `{name}` does not exist")]
    UnknownDestination { name: String },
    /// A rule names a source member the source type does not have.
    #[error("source member `{name}` does not exist")]
    UnknownSource { name: String },
    /// A direct-map rule pairs member types that can never convert.
    #[error(
        "cannot map `{source_member}` ({source_type}) into `{destination}` ({destination_type})"
    )]
    Irreconcilable {
        destination: String,
        destination_type: &'static str,
        source_member: String,
        source_type: &'static str,
    },
    /// Runtime coercion into a scalar destination failed (overflow etc.).
    #[error("converting value for `{destination}`")]
    Conversion {
        destination: String,
        #[source]
        error: ConvertError,
    },
    /// Auto-matching was requested but no pair matcher is configured.
    #[error("auto-matching requested but no pair matcher is configured")]
    MatcherMissing,
    /// A match table file could not be read.
    #[error("reading match table {path}")]
    TableIo {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },
    /// A match table file is not a JSON object.
    #[error("parsing match table {path}")]
    TableParse {
        path: PathBuf,
        #[source]
        error: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, MapError>;
