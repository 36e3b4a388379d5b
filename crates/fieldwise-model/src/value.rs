//! Runtime value union and per-field coercion.
//!
//! A [`Value`] is what travels between a source getter and a destination
//! setter. Scalar kinds convert with checked arithmetic and fail loudly on
//! overflow; string and opaque kinds degrade to [`Coerced::Skip`] on
//! mismatch, leaving the destination slot untouched.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use crate::error::ConvertError;

/// Classification of a member's declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    Int,
    UInt,
    Float,
    Str,
    /// A type outside the scalar set, identified by its `TypeId`.
    Opaque(TypeId),
}

impl ValueKind {
    /// True for the kinds whose failed conversions are hard errors.
    ///
    /// String and opaque destinations sit on the lenient side: a value that
    /// cannot become one is skipped rather than reported.
    pub fn is_scalar(&self) -> bool {
        matches!(self, Self::Bool | Self::Int | Self::UInt | Self::Float)
    }

    /// True when the two kinds can reconcile at compile time.
    ///
    /// Numeric kinds reconcile with each other (the conversion itself is
    /// still range-checked per value). Non-scalar destinations reconcile
    /// with anything because mismatches degrade at run time.
    pub fn accepts(&self, source: ValueKind) -> bool {
        match self {
            Self::Bool => source == ValueKind::Bool,
            Self::Int | Self::UInt | Self::Float => {
                matches!(source, ValueKind::Int | ValueKind::UInt | ValueKind::Float)
            }
            Self::Str | Self::Opaque(_) => true,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::UInt => "uint",
            Self::Float => "float",
            Self::Str => "string",
            Self::Opaque(_) => "opaque",
        };
        f.write_str(name)
    }
}

/// A type-erased payload for members outside the scalar set.
///
/// Downcasting clones the payload out on an exact type match and returns
/// `None` otherwise; there is no throwing cast.
#[derive(Clone)]
pub struct OpaqueValue {
    type_id: TypeId,
    type_name: &'static str,
    value: Arc<dyn Any + Send + Sync>,
}

impl OpaqueValue {
    pub fn new<V: Any + Send + Sync>(value: V) -> Self {
        Self {
            type_id: TypeId::of::<V>(),
            type_name: std::any::type_name::<V>(),
            value: Arc::new(value),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Clone the payload out if it is exactly a `V`.
    pub fn downcast<V: Any + Clone>(&self) -> Option<V> {
        self.value.downcast_ref::<V>().cloned()
    }
}

impl fmt::Debug for OpaqueValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OpaqueValue({})", self.type_name)
    }
}

/// A single field value in transit between source and destination.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    Opaque(OpaqueValue),
}

impl Value {
    /// Wrap an arbitrary cloneable type as an opaque payload.
    pub fn opaque<V: Any + Send + Sync>(value: V) -> Self {
        Self::Opaque(OpaqueValue::new(value))
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Null => ValueKind::Opaque(TypeId::of::<()>()),
            Self::Bool(_) => ValueKind::Bool,
            Self::Int(_) => ValueKind::Int,
            Self::UInt(_) => ValueKind::UInt,
            Self::Float(_) => ValueKind::Float,
            Self::Str(_) => ValueKind::Str,
            Self::Opaque(v) => ValueKind::Opaque(v.type_id()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

macro_rules! value_from_int {
    ($($ty:ty),*) => {$(
        impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                Self::Int(i64::from(v))
            }
        }
    )*};
}

macro_rules! value_from_uint {
    ($($ty:ty),*) => {$(
        impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                Self::UInt(u64::from(v))
            }
        }
    )*};
}

value_from_int!(i8, i16, i32, i64);
value_from_uint!(u8, u16, u32, u64);

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

/// Outcome of coercing a [`Value`] into a concrete field type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coerced<T> {
    /// The coerced value, ready to assign.
    Value(T),
    /// Leave the destination slot untouched (null or lenient mismatch).
    Skip,
}

/// Conversion between a concrete field type and [`Value`].
///
/// Implemented for the scalar types and `String`; other types opt in with
/// the [`opaque_value!`](crate::opaque_value) macro.
pub trait FieldValue: Sized + 'static {
    fn kind() -> ValueKind;

    fn into_value(self) -> Value;

    /// Coerce a value into this type.
    ///
    /// `Null` always becomes [`Coerced::Skip`]. Scalar implementations
    /// return an error for unsupported or out-of-range inputs; opaque
    /// implementations skip on any mismatch.
    fn from_value(value: Value) -> Result<Coerced<Self>, ConvertError>;
}

/// Truncate a float toward zero and widen it, if it fits in `i128`.
fn float_to_wide(f: f64) -> Option<i128> {
    if !f.is_finite() {
        return None;
    }
    let t = f.trunc();
    if t >= i128::MIN as f64 && t <= i128::MAX as f64 {
        Some(t as i128)
    } else {
        None
    }
}

fn widen(value: &Value, to: ValueKind) -> Result<Coerced<i128>, ConvertError> {
    let wide = match value {
        Value::Null => return Ok(Coerced::Skip),
        Value::Int(v) => i128::from(*v),
        Value::UInt(v) => i128::from(*v),
        Value::Float(f) => float_to_wide(*f).ok_or_else(|| ConvertError::OutOfRange {
            value: f.to_string(),
            to,
        })?,
        other => {
            return Err(ConvertError::Unsupported {
                from: other.kind(),
                to,
            });
        }
    };
    Ok(Coerced::Value(wide))
}

macro_rules! integer_field_value {
    ($kind:ident => $($ty:ty),*) => {$(
        impl FieldValue for $ty {
            fn kind() -> ValueKind {
                ValueKind::$kind
            }

            fn into_value(self) -> Value {
                Value::from(self)
            }

            fn from_value(value: Value) -> Result<Coerced<Self>, ConvertError> {
                let wide = match widen(&value, Self::kind())? {
                    Coerced::Value(wide) => wide,
                    Coerced::Skip => return Ok(Coerced::Skip),
                };
                <$ty>::try_from(wide)
                    .map(Coerced::Value)
                    .map_err(|_| ConvertError::OutOfRange {
                        value: wide.to_string(),
                        to: Self::kind(),
                    })
            }
        }
    )*};
}

integer_field_value!(Int => i8, i16, i32, i64);
integer_field_value!(UInt => u8, u16, u32, u64);

macro_rules! float_field_value {
    ($($ty:ty),*) => {$(
        impl FieldValue for $ty {
            fn kind() -> ValueKind {
                ValueKind::Float
            }

            fn into_value(self) -> Value {
                Value::from(self)
            }

            fn from_value(value: Value) -> Result<Coerced<Self>, ConvertError> {
                match value {
                    Value::Null => Ok(Coerced::Skip),
                    Value::Int(v) => Ok(Coerced::Value(v as $ty)),
                    Value::UInt(v) => Ok(Coerced::Value(v as $ty)),
                    Value::Float(f) => Ok(Coerced::Value(f as $ty)),
                    other => Err(ConvertError::Unsupported {
                        from: other.kind(),
                        to: Self::kind(),
                    }),
                }
            }
        }
    )*};
}

float_field_value!(f32, f64);

impl FieldValue for bool {
    fn kind() -> ValueKind {
        ValueKind::Bool
    }

    fn into_value(self) -> Value {
        Value::Bool(self)
    }

    fn from_value(value: Value) -> Result<Coerced<Self>, ConvertError> {
        match value {
            Value::Null => Ok(Coerced::Skip),
            Value::Bool(v) => Ok(Coerced::Value(v)),
            other => Err(ConvertError::Unsupported {
                from: other.kind(),
                to: Self::kind(),
            }),
        }
    }
}

impl FieldValue for String {
    fn kind() -> ValueKind {
        ValueKind::Str
    }

    fn into_value(self) -> Value {
        Value::Str(self)
    }

    fn from_value(value: Value) -> Result<Coerced<Self>, ConvertError> {
        match value {
            Value::Null => Ok(Coerced::Skip),
            Value::Str(s) => Ok(Coerced::Value(s)),
            other => Err(ConvertError::Unsupported {
                from: other.kind(),
                to: Self::kind(),
            }),
        }
    }
}

/// Register an arbitrary `Clone + Send + Sync` type as an opaque field type.
///
/// Opaque fields travel as [`OpaqueValue`] payloads. Coercion never errors:
/// a payload of the wrong type, or any scalar value, simply skips the
/// assignment, mirroring a safe cast that yields nothing on mismatch.
///
/// ```
/// #[derive(Clone, PartialEq, Debug)]
/// struct Badge(u32);
///
/// fieldwise_model::opaque_value!(Badge);
/// ```
#[macro_export]
macro_rules! opaque_value {
    ($ty:ty) => {
        impl $crate::FieldValue for $ty {
            fn kind() -> $crate::ValueKind {
                $crate::ValueKind::Opaque(std::any::TypeId::of::<$ty>())
            }

            fn into_value(self) -> $crate::Value {
                $crate::Value::opaque(self)
            }

            fn from_value(
                value: $crate::Value,
            ) -> std::result::Result<$crate::Coerced<Self>, $crate::ConvertError> {
                match value {
                    $crate::Value::Opaque(payload) => Ok(payload
                        .downcast::<$ty>()
                        .map($crate::Coerced::Value)
                        .unwrap_or($crate::Coerced::Skip)),
                    _ => Ok($crate::Coerced::Skip),
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Clone, PartialEq, Debug)]
    struct Token(u64);

    crate::opaque_value!(Token);

    #[test]
    fn widening_int_conversion() {
        assert_eq!(
            i64::from_value(Value::Int(42)),
            Ok(Coerced::Value(42i64))
        );
        assert_eq!(
            u64::from_value(Value::Int(42)),
            Ok(Coerced::Value(42u64))
        );
        assert_eq!(
            f64::from_value(Value::Int(2)),
            Ok(Coerced::Value(2.0f64))
        );
    }

    #[test]
    fn narrowing_overflow_is_an_error() {
        let err = i8::from_value(Value::Int(1000)).unwrap_err();
        assert!(matches!(err, ConvertError::OutOfRange { .. }));

        let err = u32::from_value(Value::Int(-1)).unwrap_err();
        assert!(matches!(err, ConvertError::OutOfRange { .. }));
    }

    #[test]
    fn float_narrows_by_truncation() {
        assert_eq!(
            i32::from_value(Value::Float(3.9)),
            Ok(Coerced::Value(3i32))
        );
        assert_eq!(
            i32::from_value(Value::Float(-3.9)),
            Ok(Coerced::Value(-3i32))
        );
        assert!(i32::from_value(Value::Float(f64::NAN)).is_err());
        assert!(i32::from_value(Value::Float(1e30)).is_err());
    }

    #[test]
    fn null_always_skips() {
        assert_eq!(i64::from_value(Value::Null), Ok(Coerced::Skip));
        assert_eq!(String::from_value(Value::Null), Ok(Coerced::Skip));
        assert_eq!(bool::from_value(Value::Null), Ok(Coerced::Skip));
    }

    #[test]
    fn kind_mismatch_on_scalars_is_an_error() {
        assert!(i64::from_value(Value::Str("12".into())).is_err());
        assert!(bool::from_value(Value::Int(1)).is_err());
        assert!(String::from_value(Value::Int(1)).is_err());
    }

    #[test]
    fn opaque_roundtrip_and_mismatch() {
        let value = Token(7).into_value();
        assert_eq!(Token::from_value(value), Ok(Coerced::Value(Token(7))));

        // wrong payload or scalar input: lenient skip, never an error
        assert_eq!(
            Token::from_value(Value::opaque("other".to_string())),
            Ok(Coerced::Skip)
        );
        assert_eq!(Token::from_value(Value::Int(7)), Ok(Coerced::Skip));
    }

    #[test]
    fn kind_reconciliation_table() {
        assert!(ValueKind::Int.accepts(ValueKind::Float));
        assert!(ValueKind::Float.accepts(ValueKind::UInt));
        assert!(!ValueKind::Int.accepts(ValueKind::Str));
        assert!(!ValueKind::Bool.accepts(ValueKind::Int));
        assert!(ValueKind::Str.accepts(ValueKind::Int));
        assert!(Token::kind().accepts(ValueKind::Str));
    }

    proptest! {
        #[test]
        fn in_range_ints_convert_exactly(v in i32::MIN..=i32::MAX) {
            let coerced = i64::from_value(Value::Int(i64::from(v))).unwrap();
            prop_assert_eq!(coerced, Coerced::Value(i64::from(v)));
        }

        #[test]
        fn uint_above_i64_range_overflows_int(v in (i64::MAX as u64 + 1)..=u64::MAX) {
            prop_assert!(i64::from_value(Value::UInt(v)).is_err());
        }

        #[test]
        fn narrowing_matches_try_from(v in proptest::num::i64::ANY) {
            let coerced = i16::from_value(Value::Int(v));
            match i16::try_from(v) {
                Ok(narrow) => prop_assert_eq!(coerced.unwrap(), Coerced::Value(narrow)),
                Err(_) => prop_assert!(coerced.is_err()),
            }
        }
    }
}
