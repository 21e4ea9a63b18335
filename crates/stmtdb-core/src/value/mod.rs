mod document;


use crate::schema::{ScalarKind, ValueType};
use std::{cmp::Ordering, fmt};

// re-exports
pub use document::{Document, DocumentError, FromDocument};

///
/// Value
///
/// Closed set of runtime values a placeholder can bind and a record field
/// can hold. Each variant corresponds to exactly one bindable `ValueType`.
///

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Boolean(bool),
    Double(f64),
    Integer(i32),
    Long(i64),
    String(String),
    BooleanList(Vec<bool>),
    DoubleList(Vec<f64>),
    IntegerList(Vec<i32>),
    LongList(Vec<i64>),
    StringList(Vec<String>),
}

impl Value {
    #[must_use]
    pub const fn value_type(&self) -> ValueType {
        match self {
            Self::Boolean(_) => ValueType::Scalar(ScalarKind::Boolean),
            Self::Double(_) => ValueType::Scalar(ScalarKind::Double),
            Self::Integer(_) => ValueType::Scalar(ScalarKind::Integer),
            Self::Long(_) => ValueType::Scalar(ScalarKind::Long),
            Self::String(_) => ValueType::Scalar(ScalarKind::String),
            Self::BooleanList(_) => ValueType::List(ScalarKind::Boolean),
            Self::DoubleList(_) => ValueType::List(ScalarKind::Double),
            Self::IntegerList(_) => ValueType::List(ScalarKind::Integer),
            Self::LongList(_) => ValueType::List(ScalarKind::Long),
            Self::StringList(_) => ValueType::List(ScalarKind::String),
        }
    }

    /// Order two values of the same scalar type.
    ///
    /// Returns `None` for mismatched types, lists, booleans, and NaN doubles.
    /// Filters never match on `None`; sorting keeps such rows in place.
    #[must_use]
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Double(a), Self::Double(b)) => a.partial_cmp(b),
            (Self::Integer(a), Self::Integer(b)) => Some(a.cmp(b)),
            (Self::Long(a), Self::Long(b)) => Some(a.cmp(b)),
            (Self::String(a), Self::String(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_long(&self) -> Option<i64> {
        match self {
            Self::Long(value) => Some(*value),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_integer(&self) -> Option<i32> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_double(&self) -> Option<f64> {
        match self {
            Self::Double(value) => Some(*value),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_boolean(&self) -> Option<bool> {
        match self {
            Self::Boolean(value) => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list<T: fmt::Debug>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
            f.debug_list().entries(items).finish()
        }

        match self {
            Self::Boolean(value) => write!(f, "{value}"),
            Self::Double(value) => write!(f, "{value}"),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Long(value) => write!(f, "{value}l"),
            Self::String(value) => write!(f, "'{value}'"),
            Self::BooleanList(items) => list(f, items),
            Self::DoubleList(items) => list(f, items),
            Self::IntegerList(items) => list(f, items),
            Self::LongList(items) => list(f, items),
            Self::StringList(items) => list(f, items),
        }
    }
}

macro_rules! impl_from_for_value {
    ( $( $type:ty => $variant:ident ),* $(,)? ) => {
        $(
            impl From<$type> for Value {
                fn from(value: $type) -> Self {
                    Self::$variant(value.into())
                }
            }
        )*
    };
}

impl_from_for_value! {
    bool => Boolean,
    f64 => Double,
    i32 => Integer,
    i64 => Long,
    String => String,
    &str => String,
    Vec<bool> => BooleanList,
    Vec<f64> => DoubleList,
    Vec<i32> => IntegerList,
    Vec<i64> => LongList,
    Vec<String> => StringList,
}
