use crate::{schema::ValueType, value::Value};
use std::collections::{BTreeMap, btree_map};
use thiserror::Error as ThisError;

///
/// DocumentError
///
/// Failures decoding a stored record into a typed schema struct.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum DocumentError {
    #[error("field '{field}' missing from record")]
    MissingField { field: String },

    #[error("field '{field}' has type {found}, expected {expected}")]
    TypeMismatch {
        field: String,
        expected: ValueType,
        found: ValueType,
    },
}

///
/// Document
///
/// One stored record: key name to value.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Document {
    fields: BTreeMap<String, Value>,
}

impl Document {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert or overwrite one field, returning the previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(name.into(), value.into())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.fields.iter()
    }

    /// Fetch a required field.
    pub fn require(&self, name: &str) -> Result<&Value, DocumentError> {
        self.get(name).ok_or_else(|| DocumentError::MissingField {
            field: name.to_string(),
        })
    }

    pub fn get_string(&self, name: &str) -> Result<&str, DocumentError> {
        let value = self.require(name)?;
        value
            .as_str()
            .ok_or_else(|| mismatch(name, ValueType::STRING, value))
    }

    pub fn get_long(&self, name: &str) -> Result<i64, DocumentError> {
        let value = self.require(name)?;
        value
            .as_long()
            .ok_or_else(|| mismatch(name, ValueType::LONG, value))
    }

    pub fn get_integer(&self, name: &str) -> Result<i32, DocumentError> {
        let value = self.require(name)?;
        value
            .as_integer()
            .ok_or_else(|| mismatch(name, ValueType::INTEGER, value))
    }

    pub fn get_double(&self, name: &str) -> Result<f64, DocumentError> {
        let value = self.require(name)?;
        value
            .as_double()
            .ok_or_else(|| mismatch(name, ValueType::DOUBLE, value))
    }

    pub fn get_boolean(&self, name: &str) -> Result<bool, DocumentError> {
        let value = self.require(name)?;
        value
            .as_boolean()
            .ok_or_else(|| mismatch(name, ValueType::BOOLEAN, value))
    }

    pub fn get_double_list(&self, name: &str) -> Result<&[f64], DocumentError> {
        match self.require(name)? {
            Value::DoubleList(items) => Ok(items),
            other => Err(mismatch(name, ValueType::DOUBLE_LIST, other)),
        }
    }

    pub fn get_string_list(&self, name: &str) -> Result<&[String], DocumentError> {
        match self.require(name)? {
            Value::StringList(items) => Ok(items),
            other => Err(mismatch(name, ValueType::STRING_LIST, other)),
        }
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<(String, Value)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

fn mismatch(name: &str, expected: ValueType, found: &Value) -> DocumentError {
    DocumentError::TypeMismatch {
        field: name.to_string(),
        expected,
        found: found.value_type(),
    }
}

///
/// FromDocument
///
/// Explicit, hand-written decoding from a stored record into a schema struct.
///

pub trait FromDocument: Sized {
    fn from_document(document: &Document) -> Result<Self, DocumentError>;
}

impl FromDocument for Document {
    fn from_document(document: &Document) -> Result<Self, DocumentError> {
        Ok(document.clone())
    }
}
