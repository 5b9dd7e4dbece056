//! Literal values and column documents.
//!
//! [`Value`] is everything that can appear as a literal in generated SQL.
//! Literals are rendered through [`Dialect::escape`], except for the trusted
//! forms described on [`Value::render`].

use crate::dialect::Dialect;
use crate::error::{SqlError, SqlResult};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::sync::OnceLock;

/// A SQL literal.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// NULL value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed integer value.
    Int(i64),
    /// Unsigned integer value.
    UInt(u64),
    /// Float value.
    Float(f64),
    /// Text value.
    Text(String),
    /// Binary value.
    Bytes(Vec<u8>),
    /// Timestamp without time zone.
    DateTime(NaiveDateTime),
    /// Calendar date.
    Date(NaiveDate),
    /// UUID, rendered as text.
    Uuid(uuid::Uuid),
    /// JSON document, rendered as escaped text.
    Json(serde_json::Value),
    /// Trusted SQL expression (subquery, function call, column arithmetic).
    ///
    /// Never escaped: rendered as `(expr)`. The caller is responsible for
    /// what goes in here.
    Raw(String),
}

impl Value {
    /// Create a raw SQL value.
    pub fn raw(sql: impl Into<String>) -> Self {
        Value::Raw(sql.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Text content, if this is a text value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Render this value as a SQL literal for `dialect`.
    ///
    /// Passes through verbatim:
    /// - [`Value::Raw`], wrapped in parentheses
    /// - text that is a parenthesized subquery, e.g. `(SELECT id FROM t)`
    /// - text that starts with a backtick (a quoted identifier)
    ///
    /// The subquery match ignores case. The backtick rule applies under every
    /// dialect, although backtick quoting is MySQL syntax; under
    /// [`Dialect::Postgres`] such text reaches the server unquoted.
    ///
    /// Everything else goes through [`Dialect::escape`].
    pub fn render(&self, dialect: Dialect) -> String {
        match self {
            Value::Raw(sql) => format!("({sql})"),
            Value::Text(s) if is_trusted_text(s) => s.clone(),
            other => dialect.escape(other),
        }
    }
}

/// Text recognized as SQL rather than data.
pub(crate) fn is_trusted_text(s: &str) -> bool {
    static SUBQUERY_RE: OnceLock<regex::Regex> = OnceLock::new();
    s.starts_with('`')
        || SUBQUERY_RE
            .get_or_init(|| {
                regex::Regex::new(r"(?is)^\(SELECT\s+.*\)$").expect("invalid built-in subquery regex")
            })
            .is_match(s)
}

macro_rules! impl_from_int {
    ($variant:ident, $target:ty: $($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::$variant(<$target>::from(v))
                }
            }
        )*
    };
}

impl_from_int!(Int, i64: i8, i16, i32, i64);
impl_from_int!(UInt, u64: u8, u16, u32, u64);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::UInt(v as u64)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

impl<Tz: chrono::TimeZone> From<chrono::DateTime<Tz>> for Value {
    fn from(v: chrono::DateTime<Tz>) -> Self {
        Value::DateTime(v.naive_utc())
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<uuid::Uuid> for Value {
    fn from(v: uuid::Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// JSON scalars become the matching scalar; arrays and objects stay JSON.
impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Value::UInt(u)
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::Text(s),
            other => Value::Json(other),
        }
    }
}

/// An ordered column → value list, as written by `insert` and `update`.
///
/// Column order is preserved, so the generated SQL is deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    entries: Vec<(String, Value)>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a column, replacing an earlier value for the same column in place.
    pub fn set(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    /// In-place variant of [`Document::set`].
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        let column = column.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(c, _)| *c == column) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((column, value)),
        }
    }

    /// Build a document from a JSON object.
    pub fn from_json(json: &serde_json::Value) -> SqlResult<Self> {
        match json {
            serde_json::Value::Object(map) => Ok(map
                .iter()
                .map(|(k, v)| (k.clone(), Value::from(v.clone())))
                .collect()),
            other => Err(SqlError::validation(format!(
                "document must be a JSON object, got {other}"
            ))),
        }
    }

    /// Build a document from any serializable struct or map.
    pub fn from_serialize<T: Serialize + ?Sized>(data: &T) -> SqlResult<Self> {
        let json = serde_json::to_value(data)
            .map_err(|e| SqlError::validation(format!("document serialization failed: {e}")))?;
        Self::from_json(&json)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(c, v)| (c.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Document {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut doc = Document::new();
        for (k, v) in iter {
            doc.insert(k, v);
        }
        doc
    }
}
