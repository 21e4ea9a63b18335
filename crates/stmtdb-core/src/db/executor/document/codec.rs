use crate::{
    db::{
        executor::ExecutionError,
        statement::{BoundFilter, BoundStatement, CompareOp},
    },
    schema::{Category, ScalarKind, ValueType},
    value::{Document, Value},
};
use serde_json::{Map, Number, Value as JsonValue, json};

/// Encode one bound value for `field`.
///
/// JSON has no NaN or infinity; non-finite doubles are `Unrepresentable`.
pub(super) fn encode_value(
    backend: &str,
    field: &str,
    value: &Value,
) -> Result<JsonValue, ExecutionError> {
    let double = |v: f64| {
        Number::from_f64(v)
            .map(JsonValue::Number)
            .ok_or_else(|| ExecutionError::Unrepresentable {
                backend: backend.to_string(),
                reason: format!("non-finite double {v} in field '{field}'"),
            })
    };

    let encoded = match value {
        Value::Boolean(v) => JsonValue::Bool(*v),
        Value::Double(v) => double(*v)?,
        Value::Integer(v) => json!(v),
        Value::Long(v) => json!(v),
        Value::String(v) => JsonValue::String(v.clone()),
        Value::BooleanList(items) => json!(items),
        Value::DoubleList(items) => JsonValue::Array(
            items
                .iter()
                .map(|v| double(*v))
                .collect::<Result<_, _>>()?,
        ),
        Value::IntegerList(items) => json!(items),
        Value::LongList(items) => json!(items),
        Value::StringList(items) => json!(items),
    };

    Ok(encoded)
}

pub(super) fn encode_assignments(
    backend: &str,
    statement: &BoundStatement,
) -> Result<JsonValue, ExecutionError> {
    let fields = statement
        .assignments()
        .map(|(key, value)| {
            let encoded = encode_value(backend, key.name(), value)?;
            Ok((key.name().to_string(), encoded))
        })
        .collect::<Result<Map<String, JsonValue>, ExecutionError>>()?;

    Ok(JsonValue::Object(fields))
}

const fn operator(op: CompareOp) -> &'static str {
    match op {
        CompareOp::Eq => "$eq",
        CompareOp::Ne => "$ne",
        CompareOp::Lt => "$lt",
        CompareOp::Lte => "$lte",
        CompareOp::Gt => "$gt",
        CompareOp::Gte => "$gte",
    }
}

/// Add one WHERE item to a key's operator object.
///
/// `$ne` also requires the field to exist: a record without the field
/// matches no comparison, `!=` included.
fn push_condition(
    backend: &str,
    filter: &BoundFilter<'_>,
    ops: &mut Map<String, JsonValue>,
) -> Result<(), ExecutionError> {
    let value = encode_value(backend, filter.key.name(), filter.value)?;
    ops.insert(operator(filter.op).to_string(), value);
    if filter.op == CompareOp::Ne {
        ops.insert("$exists".to_string(), JsonValue::Bool(true));
    }

    Ok(())
}

/// Conjunctive filter document.
///
/// Conditions on the same key merge into one operator object; a lone
/// equality stays in the short `{key: value}` form. If one key repeats the
/// same operator the whole filter falls back to `$and`.
pub(super) fn encode_filter(
    backend: &str,
    statement: &BoundStatement,
) -> Result<JsonValue, ExecutionError> {
    let mut merged: Map<String, JsonValue> = Map::new();

    for filter in statement.filters() {
        let entry = merged
            .entry(filter.key.name().to_string())
            .or_insert_with(|| JsonValue::Object(Map::new()));
        let JsonValue::Object(ops) = entry else {
            continue;
        };

        if ops.contains_key(operator(filter.op)) {
            return encode_filter_and(backend, statement);
        }
        push_condition(backend, &filter, ops)?;
    }

    for condition in merged.values_mut() {
        if let JsonValue::Object(ops) = &mut *condition
            && ops.len() == 1
            && let Some(value) = ops.remove("$eq")
        {
            *condition = value;
        }
    }

    Ok(JsonValue::Object(merged))
}

fn encode_filter_and(
    backend: &str,
    statement: &BoundStatement,
) -> Result<JsonValue, ExecutionError> {
    let clauses = statement
        .filters()
        .map(|filter| {
            let mut ops = Map::new();
            push_condition(backend, &filter, &mut ops)?;
            Ok(json!({ filter.key.name(): ops }))
        })
        .collect::<Result<Vec<JsonValue>, ExecutionError>>()?;

    Ok(json!({ "$and": clauses }))
}

/// Decode one stored document against the category's value keys.
///
/// Unknown fields (including the store's own `_id`) are ignored and absent
/// fields are left for typed decoding to report.
pub(super) fn decode_document(
    backend: &str,
    category: &Category,
    document: &JsonValue,
) -> Result<Document, ExecutionError> {
    let mismatch = |reason: String| ExecutionError::SchemaMismatch {
        backend: backend.to_string(),
        category: category.name().to_string(),
        reason,
    };

    let JsonValue::Object(fields) = document else {
        return Err(mismatch(format!("expected an object, got {document}")));
    };

    let mut out = Document::new();
    for key in category.value_keys() {
        let Some(raw) = fields.get(key.name()) else {
            continue;
        };
        let value = decode_value(key.value_type(), raw).ok_or_else(|| {
            mismatch(format!(
                "field '{}' holds {raw}, expected {}",
                key.name(),
                key.value_type()
            ))
        })?;
        out.insert(key.name(), value);
    }

    Ok(out)
}

fn decode_value(value_type: ValueType, raw: &JsonValue) -> Option<Value> {
    match value_type {
        ValueType::Scalar(kind) => decode_scalar(kind, raw),
        ValueType::List(kind) => {
            let items = raw.as_array()?;
            let value = match kind {
                ScalarKind::Boolean => Value::BooleanList(collect(items, JsonValue::as_bool)?),
                ScalarKind::Double => Value::DoubleList(collect(items, JsonValue::as_f64)?),
                ScalarKind::Integer => Value::IntegerList(collect(items, as_i32)?),
                ScalarKind::Long => Value::LongList(collect(items, JsonValue::as_i64)?),
                ScalarKind::String => Value::StringList(collect(items, |item| {
                    item.as_str().map(str::to_string)
                })?),
            };
            Some(value)
        }
        ValueType::PartialKeyMarker => None,
    }
}

fn decode_scalar(kind: ScalarKind, raw: &JsonValue) -> Option<Value> {
    let value = match kind {
        ScalarKind::Boolean => Value::Boolean(raw.as_bool()?),
        ScalarKind::Double => Value::Double(raw.as_f64()?),
        ScalarKind::Integer => Value::Integer(as_i32(raw)?),
        ScalarKind::Long => Value::Long(raw.as_i64()?),
        ScalarKind::String => Value::String(raw.as_str()?.to_string()),
    };

    Some(value)
}

fn as_i32(raw: &JsonValue) -> Option<i32> {
    raw.as_i64().and_then(|v| i32::try_from(v).ok())
}

fn collect<T>(items: &[JsonValue], decode: impl Fn(&JsonValue) -> Option<T>) -> Option<Vec<T>> {
    items.iter().map(decode).collect()
}
