use rusqlite::types::ValueRef;

use crate::error::DriverError;
use crate::types::Value;

/// Converts bound arguments into owned `rusqlite` values.
///
/// Booleans become 0/1 integers, timestamps and JSON become text; the
/// reverse mapping happens in the accessors on [`Value`].
#[must_use]
pub fn to_sqlite_values(args: &[Value]) -> Vec<rusqlite::types::Value> {
    args.iter().map(to_sqlite_value).collect()
}

fn to_sqlite_value(value: &Value) -> rusqlite::types::Value {
    match value {
        Value::Int(v) => rusqlite::types::Value::Integer(*v),
        Value::Float(v) => rusqlite::types::Value::Real(*v),
        Value::Text(s) => rusqlite::types::Value::Text(s.clone()),
        Value::Bool(b) => rusqlite::types::Value::Integer(i64::from(*b)),
        Value::Timestamp(dt) => rusqlite::types::Value::Text(dt.format("%F %T%.f").to_string()),
        Value::Null => rusqlite::types::Value::Null,
        Value::JSON(v) => rusqlite::types::Value::Text(v.to_string()),
        Value::Blob(b) => rusqlite::types::Value::Blob(b.clone()),
    }
}

fn from_value_ref(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(v) => Value::Int(v),
        ValueRef::Real(v) => Value::Float(v),
        ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Blob(bytes.to_vec()),
    }
}

/// Reads a full row into owned values.
///
/// # Errors
/// Returns the driver error when a column cannot be read.
pub(crate) fn read_row(row: &rusqlite::Row<'_>, width: usize) -> Result<Vec<Value>, DriverError> {
    let mut values = Vec::with_capacity(width);
    for i in 0..width {
        values.push(from_value_ref(row.get_ref(i)?));
    }
    Ok(values)
}
