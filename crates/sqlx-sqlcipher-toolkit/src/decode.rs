//! Conversion of SQLite rows into JSON-valued maps

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use sqlx::sqlite::{SqliteRow, SqliteValueRef};
use sqlx::{Column, Row as _, TypeInfo, Value, ValueRef};

use crate::{Error, Result};

/// A decoded result row, keyed by column name in select-list order.
pub type Row = IndexMap<String, JsonValue>;

/// Decode every column of `row`.
pub(crate) fn decode_row(row: &SqliteRow) -> Result<Row> {
   let mut value = IndexMap::with_capacity(row.columns().len());
   for (i, column) in row.columns().iter().enumerate() {
      let v = row.try_get_raw(i)?;
      value.insert(column.name().to_string(), to_json(v)?);
   }
   Ok(value)
}

/// Map one SQLite value to JSON by its storage class.
///
/// INTEGER and REAL become numbers, TEXT a string, BLOB a base64 string and
/// NULL `null`. A REAL that JSON cannot represent (NaN, infinity) becomes
/// `null`.
pub(crate) fn to_json(v: SqliteValueRef<'_>) -> Result<JsonValue> {
   if v.is_null() {
      return Ok(JsonValue::Null);
   }

   let type_name = v.type_info().name().to_string();
   let owned = ValueRef::to_owned(&v);

   let json = match type_name.as_str() {
      "INTEGER" | "BOOLEAN" => JsonValue::from(owned.try_decode::<i64>()?),
      "REAL" => serde_json::Number::from_f64(owned.try_decode::<f64>()?)
         .map(JsonValue::Number)
         .unwrap_or(JsonValue::Null),
      "TEXT" => JsonValue::String(owned.try_decode::<String>()?),
      "BLOB" => JsonValue::String(STANDARD.encode(owned.try_decode::<Vec<u8>>()?)),
      "NULL" => JsonValue::Null,
      other => return Err(Error::UnsupportedDatatype(other.to_string())),
   };

   Ok(json)
}
