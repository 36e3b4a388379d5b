use thiserror::Error;

use crate::value::ValueKind;

/// Errors from scalar value coercion.
///
/// These are the "fails loudly" half of the coercion contract: a scalar
/// destination that cannot hold the incoming value. Mismatches against
/// string or opaque destinations never reach this type; they degrade to a
/// skipped assignment instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConvertError {
    /// The source kind has no conversion path to the destination kind.
    #[error("no conversion from {from} to {to}")]
    Unsupported { from: ValueKind, to: ValueKind },
    /// The value is numerically convertible in principle but does not fit.
    #[error("value {value} does not fit in {to}")]
    OutOfRange { value: String, to: ValueKind },
}

pub type Result<T> = std::result::Result<T, ConvertError>;
