//! Row mapping traits and utilities

use crate::error::{SqlError, SqlResult};
use crate::value::Value;
use serde::Deserializer;
use serde::de::value::{Error as DeError, MapDeserializer};
use serde::de::{self, DeserializeOwned, IntoDeserializer, Visitor};
use std::sync::Arc;

/// One result row: column names (shared by all rows of a result) and values.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    /// Build a row. Missing trailing values read as NULL.
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    /// Build a single row from `(column, value)` pairs.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let (columns, values): (Vec<String>, Vec<Value>) =
            pairs.into_iter().map(|(k, v)| (k.into(), v.into())).unzip();
        Self::new(columns.into(), values)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Value of `column`, if the row has it.
    pub fn get(&self, column: &str) -> Option<&Value> {
        let idx = self.columns.iter().position(|c| c == column)?;
        Some(self.values.get(idx).unwrap_or(&Value::Null))
    }

    /// Value at position `idx`.
    pub fn get_idx(&self, idx: usize) -> Option<&Value> {
        if idx >= self.columns.len() {
            return None;
        }
        Some(self.values.get(idx).unwrap_or(&Value::Null))
    }

    /// Typed access to a column, returning [`SqlError::Decode`] on failure.
    pub fn try_get<T: FromValue>(&self, column: &str) -> SqlResult<T> {
        let value = self
            .get(column)
            .ok_or_else(|| SqlError::decode(column, "no such column"))?;
        T::from_value(value).map_err(|message| SqlError::decode(column, message))
    }

    /// The row as a JSON object, in column order.
    pub fn to_json(&self) -> serde_json::Map<String, serde_json::Value> {
        self.columns
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let v = self.values.get(i).unwrap_or(&Value::Null);
                (c.clone(), value_to_json(v))
            })
            .collect()
    }

    /// Deserialize the row into any `serde` type keyed by column name.
    ///
    /// Text columns are parsed when the target field is numeric, boolean or
    /// a JSON sequence/map, as [`FromValue`] does, so rows from text-only
    /// drivers decode the same as typed ones.
    pub fn deserialize<T: DeserializeOwned>(&self) -> SqlResult<T> {
        let entries = self.columns.iter().enumerate().map(|(i, c)| {
            let value = self.values.get(i).unwrap_or(&Value::Null);
            (c.as_str(), ValueDeserializer(value))
        });
        T::deserialize(MapDeserializer::<_, DeError>::new(entries))
            .map_err(|e| SqlError::decode("*", e.to_string()))
    }
}

/// Reads one column value, coercing text to the type the visitor asks for.
struct ValueDeserializer<'a>(&'a Value);

impl<'de, 'a> IntoDeserializer<'de, DeError> for ValueDeserializer<'a> {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

macro_rules! deserialize_parsed {
    ($($method:ident => $visit:ident($t:ty)),* $(,)?) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
                match self.0 {
                    Value::Text(s) => {
                        let parsed = s.trim().parse::<$t>().map_err(de::Error::custom)?;
                        visitor.$visit(parsed)
                    }
                    _ => self.deserialize_any(visitor),
                }
            }
        )*
    };
}

impl<'de> Deserializer<'de> for ValueDeserializer<'_> {
    type Error = DeError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        match self.0 {
            Value::Text(s) | Value::Raw(s) => visitor.visit_str(s),
            other => value_to_json(other)
                .deserialize_any(visitor)
                .map_err(de::Error::custom),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        match self.0 {
            Value::Null => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        match self.0 {
            Value::Text(_) => {
                let parsed = bool::from_value(self.0).map_err(de::Error::custom)?;
                visitor.visit_bool(parsed)
            }
            _ => self.deserialize_any(visitor),
        }
    }

    deserialize_parsed! {
        deserialize_i8 => visit_i64(i64),
        deserialize_i16 => visit_i64(i64),
        deserialize_i32 => visit_i64(i64),
        deserialize_i64 => visit_i64(i64),
        deserialize_u8 => visit_u64(u64),
        deserialize_u16 => visit_u64(u64),
        deserialize_u32 => visit_u64(u64),
        deserialize_u64 => visit_u64(u64),
        deserialize_f32 => visit_f64(f64),
        deserialize_f64 => visit_f64(f64),
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        self.deserialize_json_text(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        self.deserialize_json_text(visitor)
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, DeError> {
        self.deserialize_json_text(visitor)
    }

    serde::forward_to_deserialize_any! {
        i128 u128 char str string bytes byte_buf unit unit_struct newtype_struct
        tuple tuple_struct enum identifier ignored_any
    }
}

impl ValueDeserializer<'_> {
    /// json/jsonb columns arrive as text from text-only drivers.
    fn deserialize_json_text<'de, V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        match self.0 {
            Value::Text(s) => serde_json::from_str::<serde_json::Value>(s)
                .map_err(de::Error::custom)?
                .deserialize_any(visitor)
                .map_err(de::Error::custom),
            _ => self.deserialize_any(visitor),
        }
    }
}

fn value_to_json(value: &Value) -> serde_json::Value {
    use serde_json::Value as Json;
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Int(n) => Json::from(*n),
        Value::UInt(n) => Json::from(*n),
        Value::Float(f) => serde_json::Number::from_f64(*f).map_or(Json::Null, Json::Number),
        Value::Text(s) | Value::Raw(s) => Json::String(s.clone()),
        Value::Bytes(b) => Json::from(b.clone()),
        Value::DateTime(dt) => Json::String(dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
        Value::Date(d) => Json::String(d.to_string()),
        Value::Uuid(u) => Json::String(u.to_string()),
        Value::Json(j) => j.clone(),
    }
}

/// Conversion from a single [`Value`].
///
/// Text values are parsed, since some drivers return every column as text.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self, String>;
}

fn mismatch(expected: &str, value: &Value) -> String {
    format!("expected {expected}, got {value:?}")
}

macro_rules! impl_from_value_int {
    ($($t:ty),*) => {
        $(
            impl FromValue for $t {
                fn from_value(value: &Value) -> Result<Self, String> {
                    match value {
                        Value::Int(n) => <$t>::try_from(*n).map_err(|e| e.to_string()),
                        Value::UInt(n) => <$t>::try_from(*n).map_err(|e| e.to_string()),
                        Value::Bool(b) => Ok(<$t>::from(*b)),
                        Value::Text(s) => s.trim().parse::<$t>().map_err(|e| e.to_string()),
                        other => Err(mismatch(stringify!($t), other)),
                    }
                }
            }
        )*
    };
}

impl_from_value_int!(i16, i32, i64, u16, u32, u64, usize);

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Float(f) => Ok(*f),
            Value::Int(n) => Ok(*n as f64),
            Value::UInt(n) => Ok(*n as f64),
            Value::Text(s) => s.trim().parse().map_err(|e: std::num::ParseFloatError| e.to_string()),
            other => Err(mismatch("f64", other)),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Bool(b) => Ok(*b),
            Value::Int(n) => Ok(*n != 0),
            Value::UInt(n) => Ok(*n != 0),
            Value::Text(s) => match s.as_str() {
                "t" | "true" | "TRUE" | "1" => Ok(true),
                "f" | "false" | "FALSE" | "0" => Ok(false),
                _ => Err(mismatch("bool", value)),
            },
            other => Err(mismatch("bool", other)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Text(s) => Ok(s.clone()),
            Value::Int(n) => Ok(n.to_string()),
            Value::UInt(n) => Ok(n.to_string()),
            Value::Float(f) => Ok(f.to_string()),
            Value::Uuid(u) => Ok(u.to_string()),
            Value::Json(j) => Ok(j.to_string()),
            other => Err(mismatch("string", other)),
        }
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self, String> {
        Ok(value.clone())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

/// Trait for converting a result row into a Rust struct.
///
/// # Example
///
/// ```ignore
/// use fluentsql::{FromRow, Row, SqlResult};
///
/// struct User {
///     id: i64,
///     name: String,
/// }
///
/// impl FromRow for User {
///     fn from_row(row: &Row) -> SqlResult<Self> {
///         Ok(Self {
///             id: row.try_get("id")?,
///             name: row.try_get("name")?,
///         })
///     }
/// }
/// ```
pub trait FromRow: Sized {
    /// Convert a result row into Self
    fn from_row(row: &Row) -> SqlResult<Self>;
}

impl FromRow for Row {
    fn from_row(row: &Row) -> SqlResult<Self> {
        Ok(row.clone())
    }
}
