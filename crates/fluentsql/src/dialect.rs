//! SQL dialect support.
//!
//! The builder emits plain SQL text with inlined literals, so everything that
//! depends on the target database lives here: literal escaping, the shape of
//! the LIMIT clause, database selection and the introspection statements.

use crate::value::Value;
use std::fmt::Write as _;

/// Target database syntax.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// MySQL / MariaDB: `LIMIT offset,count`, `USE db`, backslash escapes.
    #[default]
    MySql,
    /// PostgreSQL: `LIMIT count OFFSET offset`, `SET search_path`, `''` escapes.
    Postgres,
}

impl Dialect {
    /// Returns the name of the dialect.
    pub fn name(&self) -> &'static str {
        match self {
            Dialect::MySql => "mysql",
            Dialect::Postgres => "postgres",
        }
    }

    /// Escape a value into a SQL literal.
    ///
    /// [`Value::Raw`] is the one exception: it is wrapped in parentheses and
    /// otherwise left alone. Non-finite floats have no literal form and render
    /// as `NULL`.
    pub fn escape(&self, value: &Value) -> String {
        match value {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => match (self, b) {
                (Dialect::MySql, true) => "true".to_string(),
                (Dialect::MySql, false) => "false".to_string(),
                (Dialect::Postgres, true) => "TRUE".to_string(),
                (Dialect::Postgres, false) => "FALSE".to_string(),
            },
            Value::Int(n) => n.to_string(),
            Value::UInt(n) => n.to_string(),
            Value::Float(f) if f.is_finite() => f.to_string(),
            Value::Float(_) => "NULL".to_string(),
            Value::Text(s) => self.escape_str(s),
            Value::Bytes(b) => self.escape_bytes(b),
            Value::DateTime(dt) => {
                self.escape_str(&dt.format("%Y-%m-%d %H:%M:%S%.3f").to_string())
            }
            Value::Date(d) => self.escape_str(&d.format("%Y-%m-%d").to_string()),
            Value::Uuid(u) => self.escape_str(&u.to_string()),
            Value::Json(j) => self.escape_str(&j.to_string()),
            Value::Raw(sql) => format!("({sql})"),
        }
    }

    /// Quote and escape a string literal.
    pub fn escape_str(&self, s: &str) -> String {
        match self {
            Dialect::MySql => {
                let mut out = String::with_capacity(s.len() + 2);
                out.push('\'');
                for ch in s.chars() {
                    match ch {
                        '\0' => out.push_str("\\0"),
                        '\u{8}' => out.push_str("\\b"),
                        '\t' => out.push_str("\\t"),
                        '\n' => out.push_str("\\n"),
                        '\r' => out.push_str("\\r"),
                        '\u{1a}' => out.push_str("\\Z"),
                        '"' => out.push_str("\\\""),
                        '\'' => out.push_str("\\'"),
                        '\\' => out.push_str("\\\\"),
                        c => out.push(c),
                    }
                }
                out.push('\'');
                out
            }
            Dialect::Postgres => {
                let has_backslash = s.contains('\\');
                let mut out = String::with_capacity(s.len() + 3);
                if has_backslash {
                    out.push('E');
                }
                out.push('\'');
                for ch in s.chars() {
                    match ch {
                        '\'' => out.push_str("''"),
                        '\\' => out.push_str("\\\\"),
                        c => out.push(c),
                    }
                }
                out.push('\'');
                out
            }
        }
    }

    fn escape_bytes(&self, bytes: &[u8]) -> String {
        let mut hex = String::with_capacity(bytes.len() * 2);
        for b in bytes {
            let _ = write!(hex, "{b:02x}");
        }
        match self {
            Dialect::MySql => format!("X'{hex}'"),
            Dialect::Postgres => format!("'\\x{hex}'::bytea"),
        }
    }

    /// Render a LIMIT clause from `[count]` or `[offset, count]`.
    pub fn limit(&self, offset: Option<u64>, count: u64) -> String {
        match (self, offset) {
            (_, None) => format!("LIMIT {count}"),
            (Dialect::MySql, Some(offset)) => format!("LIMIT {offset},{count}"),
            (Dialect::Postgres, Some(offset)) => format!("LIMIT {count} OFFSET {offset}"),
        }
    }

    /// Statement that binds a connection to `database`.
    pub fn select_database(&self, database: &str) -> String {
        match self {
            Dialect::MySql => format!("USE {database}"),
            Dialect::Postgres => format!("SET search_path TO {database}"),
        }
    }

    /// Statement listing the databases visible to the connection.
    pub fn database_list_sql(&self) -> &'static str {
        match self {
            Dialect::MySql => "SHOW DATABASES",
            Dialect::Postgres => "SELECT datname FROM pg_database WHERE NOT datistemplate",
        }
    }

    /// Statement listing the tables of the current database.
    pub fn table_list_sql(&self) -> &'static str {
        match self {
            Dialect::MySql => "SHOW TABLES",
            Dialect::Postgres => {
                "SELECT tablename FROM pg_tables WHERE schemaname = current_schema()"
            }
        }
    }

    /// Clause appended to INSERT so the inserted row comes back.
    ///
    /// The whole row is returned, so tables without an identity column
    /// accept it too. MySQL reports the identity out of band and needs none.
    pub fn returning_identity(&self) -> Option<&'static str> {
        match self {
            Dialect::MySql => None,
            Dialect::Postgres => Some("RETURNING *"),
        }
    }
}
