//! Schema vocabulary: typed keys, categories, and the process-wide registry.
//!
//! A category is created once by the data-access module that owns it and is
//! immutable afterwards. Descriptors are validated against these definitions.

pub mod registry;


use derive_more::Display;
use std::fmt;
use thiserror::Error as ThisError;

// re-exports
pub use registry::{CategoryRegistryError, SchemaRegistry};

///
/// CategoryError
///
/// Structural defects in a category definition.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum CategoryError {
    #[error("category name must not be empty")]
    EmptyName,

    #[error("category name '{0}' must be a single token without quotes or operators")]
    InvalidName(String),

    #[error("category '{0}' must declare at least one key")]
    NoKeys(String),

    #[error("key name '{key}' in category '{category}' must be non-empty and must not contain quotes")]
    InvalidKeyName { category: String, key: String },

    #[error("key '{key}' declared more than once in category '{category}'")]
    DuplicateKey { category: String, key: String },
}

///
/// ScalarKind
///
/// Element type shared by scalar keys, list keys, and placeholders.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[remain::sorted]
pub enum ScalarKind {
    #[display("BOOLEAN")]
    Boolean,
    #[display("DOUBLE")]
    Double,
    #[display("INTEGER")]
    Integer,
    #[display("LONG")]
    Long,
    #[display("STRING")]
    String,
}

impl ScalarKind {
    /// Resolve a placeholder type character (`?s`, `?l`, ...).
    #[must_use]
    pub const fn from_type_char(ch: char) -> Option<Self> {
        match ch {
            'b' => Some(Self::Boolean),
            'd' => Some(Self::Double),
            'i' => Some(Self::Integer),
            'l' => Some(Self::Long),
            's' => Some(Self::String),
            _ => None,
        }
    }

    #[must_use]
    pub const fn type_char(self) -> char {
        match self {
            Self::Boolean => 'b',
            Self::Double => 'd',
            Self::Integer => 'i',
            Self::Long => 'l',
            Self::String => 's',
        }
    }

    /// Whether `<`, `<=`, `>`, `>=` and SORT are meaningful for this kind.
    #[must_use]
    pub const fn is_orderable(self) -> bool {
        !matches!(self, Self::Boolean)
    }
}

///
/// ValueType
///
/// Declared type of one key.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ValueType {
    Scalar(ScalarKind),
    List(ScalarKind),

    /// Marks a key that carries no bindable value.
    PartialKeyMarker,
}

impl ValueType {
    pub const STRING: Self = Self::Scalar(ScalarKind::String);
    pub const LONG: Self = Self::Scalar(ScalarKind::Long);
    pub const INTEGER: Self = Self::Scalar(ScalarKind::Integer);
    pub const DOUBLE: Self = Self::Scalar(ScalarKind::Double);
    pub const BOOLEAN: Self = Self::Scalar(ScalarKind::Boolean);
    pub const STRING_LIST: Self = Self::List(ScalarKind::String);
    pub const DOUBLE_LIST: Self = Self::List(ScalarKind::Double);

    /// The value type a placeholder of this shape binds.
    #[must_use]
    pub const fn of_placeholder(kind: ScalarKind, list: bool) -> Self {
        if list {
            Self::List(kind)
        } else {
            Self::Scalar(kind)
        }
    }

    #[must_use]
    pub const fn is_list(self) -> bool {
        matches!(self, Self::List(_))
    }

    #[must_use]
    pub const fn is_partial_marker(self) -> bool {
        matches!(self, Self::PartialKeyMarker)
    }

    #[must_use]
    pub const fn is_orderable(self) -> bool {
        match self {
            Self::Scalar(kind) => kind.is_orderable(),
            Self::List(_) | Self::PartialKeyMarker => false,
        }
    }

    // Stable single-byte tag used by fingerprints.
    pub(crate) const fn tag(self) -> u8 {
        const fn kind_tag(kind: ScalarKind) -> u8 {
            match kind {
                ScalarKind::Boolean => 1,
                ScalarKind::Double => 2,
                ScalarKind::Integer => 3,
                ScalarKind::Long => 4,
                ScalarKind::String => 5,
            }
        }

        match self {
            Self::Scalar(kind) => kind_tag(kind),
            Self::List(kind) => 0x10 | kind_tag(kind),
            Self::PartialKeyMarker => 0xff,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(kind) => write!(f, "{kind}"),
            Self::List(kind) => write!(f, "{kind}_LIST"),
            Self::PartialKeyMarker => f.write_str("PARTIAL_KEY_MARKER"),
        }
    }
}

///
/// Key
///
/// Named, typed member of a category. Identity is name plus type.
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Key {
    name: String,
    value_type: ValueType,
}

impl Key {
    #[must_use]
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
        }
    }

    #[must_use]
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, ValueType::STRING)
    }

    #[must_use]
    pub fn long(name: impl Into<String>) -> Self {
        Self::new(name, ValueType::LONG)
    }

    #[must_use]
    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, ValueType::INTEGER)
    }

    #[must_use]
    pub fn double(name: impl Into<String>) -> Self {
        Self::new(name, ValueType::DOUBLE)
    }

    #[must_use]
    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, ValueType::BOOLEAN)
    }

    #[must_use]
    pub fn list(name: impl Into<String>, kind: ScalarKind) -> Self {
        Self::new(name, ValueType::List(kind))
    }

    #[must_use]
    pub fn partial_marker(name: impl Into<String>) -> Self {
        Self::new(name, ValueType::PartialKeyMarker)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn value_type(&self) -> ValueType {
        self.value_type
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}': {}", self.name, self.value_type)
    }
}

///
/// Category
///
/// Named, fixed schema describing one logical collection of records.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Category {
    name: String,
    keys: Vec<Key>,
    value_class: String,
}

impl Category {
    /// Build a category, checking key-name uniqueness and token safety.
    pub fn new(name: impl Into<String>, keys: Vec<Key>) -> Result<Self, CategoryError> {
        let name = name.into();

        if name.is_empty() {
            return Err(CategoryError::EmptyName);
        }
        if !is_word_token(&name) {
            return Err(CategoryError::InvalidName(name));
        }
        if keys.is_empty() {
            return Err(CategoryError::NoKeys(name));
        }

        for (index, key) in keys.iter().enumerate() {
            if key.name.is_empty() || key.name.contains('\'') {
                return Err(CategoryError::InvalidKeyName {
                    category: name,
                    key: key.name.clone(),
                });
            }
            if keys[..index].iter().any(|prior| prior.name == key.name) {
                return Err(CategoryError::DuplicateKey {
                    category: name,
                    key: key.name.clone(),
                });
            }
        }

        Ok(Self {
            value_class: name.clone(),
            name,
            keys,
        })
    }

    /// Attach the schema tag naming the record type stored in this category.
    #[must_use]
    pub fn with_value_class(mut self, value_class: impl Into<String>) -> Self {
        self.value_class = value_class.into();
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    #[must_use]
    pub fn value_class(&self) -> &str {
        &self.value_class
    }

    #[must_use]
    pub fn key(&self, name: &str) -> Option<&Key> {
        self.keys.iter().find(|key| key.name == name)
    }

    /// Keys that carry values (everything except partial markers).
    pub fn value_keys(&self) -> impl Iterator<Item = &Key> {
        self.keys
            .iter()
            .filter(|key| !key.value_type.is_partial_marker())
    }

    /// Same name and same ordered key set.
    #[must_use]
    pub fn same_schema(&self, other: &Self) -> bool {
        self.name == other.name && self.keys == other.keys
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

// Category names appear as bare words inside descriptors.
fn is_word_token(name: &str) -> bool {
    name.chars().all(|ch| {
        !ch.is_whitespace() && !matches!(ch, '\'' | ',' | '=' | '<' | '>' | '!' | '?' | '[')
    })
}
