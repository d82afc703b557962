//! Raw attribute text to typed column values
//!
//! Output order is the record's attribute order, never the schema's, and only
//! attributes present on the record are emitted. The insert builder relies
//! on that to keep its column list and bound values in step.
//!
//! Integer coercion is decided by value shape: any all-digit text becomes an
//! integer, whatever the column's declared kind. Attributes the schema does
//! not know are typed by the same shape rule and left for the store to
//! accept or reject.

use crate::error::RecordError;
use crate::record::Record;
use crate::schema::{CoercionKind, EntitySchema};
use crate::timestamp;
use rusqlite::types::{ToSql, ToSqlOutput};
use serde::Serialize;

/// A coerced value ready to be bound as a statement parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Text(String),
}

impl ToSql for FieldValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            FieldValue::Integer(n) => ToSqlOutput::from(*n),
            FieldValue::Text(s) => ToSqlOutput::from(s.as_str()),
        })
    }
}

/// Typed `(column, value)` pairs of one record, in source order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CoercedRow {
    fields: Vec<(String, FieldValue)>,
}

impl CoercedRow {
    pub fn fields(&self) -> &[(String, FieldValue)] {
        &self.fields
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> + '_ {
        self.fields.iter().map(|(c, _)| c.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &FieldValue> + '_ {
        self.fields.iter().map(|(_, v)| v)
    }

    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(c, _)| c == column).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Type every attribute of `record` against `schema`
pub fn coerce(schema: &EntitySchema, record: Record) -> Result<CoercedRow, RecordError> {
    let mut fields = Vec::with_capacity(record.len());

    for (column, raw) in record {
        let value = coerce_value(schema.kind_of(&column), &column, raw)?;
        fields.push((column, value));
    }

    Ok(CoercedRow { fields })
}

/// Apply one column's rule; `kind` is `None` for columns outside the schema
pub fn coerce_value(
    kind: Option<CoercionKind>,
    column: &str,
    raw: String,
) -> Result<FieldValue, RecordError> {
    match kind {
        Some(CoercionKind::Timestamp) => timestamp::normalize(&raw)
            .map(FieldValue::Integer)
            .map_err(|_| RecordError::MalformedTimestamp {
                column: column.to_string(),
                value: raw,
            }),
        Some(CoercionKind::MultivalueFirst) => Ok(FieldValue::Text(first_token(&raw).to_string())),
        _ => Ok(by_shape(raw)),
    }
}

/// First whitespace-separated token of a class-list value
fn first_token(raw: &str) -> &str {
    raw.split_whitespace().next().unwrap_or("")
}

fn by_shape(raw: String) -> FieldValue {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return FieldValue::Text(raw);
    }

    // Digit strings past i64::MAX cannot be bound as integers
    match raw.parse::<i64>() {
        Ok(n) => FieldValue::Integer(n),
        Err(_) => FieldValue::Text(raw),
    }
}
