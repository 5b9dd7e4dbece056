//! Statement classification and `tracing` output for executed SQL.
//!
//! Every statement run through a [`Router`](crate::Router) or a
//! [`QueryBuilder`](crate::QueryBuilder) is reported on the `fluentsql.sql`
//! target: `debug` before execution, `warn` on failure. Install any
//! `tracing` subscriber to see them.

use crate::error::SqlError;
use crate::pool::RoutingGroup;
use std::time::Duration;

/// Longest SQL text (in bytes) written to a log event.
pub const MAX_LOGGED_SQL: usize = 200;

/// The type of SQL operation being performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    /// SELECT query
    Select,
    /// INSERT statement
    Insert,
    /// UPDATE statement
    Update,
    /// DELETE statement
    Delete,
    /// Other SQL (e.g., USE, SHOW, DDL)
    Other,
}

impl QueryType {
    /// Detect query type from SQL string.
    pub fn from_sql(sql: &str) -> Self {
        let trimmed = strip_sql_prefix(sql);
        if starts_with_keyword(trimmed, "SELECT") || starts_with_keyword(trimmed, "WITH") {
            QueryType::Select
        } else if starts_with_keyword(trimmed, "INSERT") {
            QueryType::Insert
        } else if starts_with_keyword(trimmed, "UPDATE") {
            QueryType::Update
        } else if starts_with_keyword(trimmed, "DELETE") {
            QueryType::Delete
        } else {
            QueryType::Other
        }
    }
}

fn starts_with_keyword(s: &str, keyword: &str) -> bool {
    match s.get(0..keyword.len()) {
        Some(prefix) => prefix.eq_ignore_ascii_case(keyword),
        None => false,
    }
}

/// Skip leading whitespace, comments and opening parentheses.
fn strip_sql_prefix(sql: &str) -> &str {
    let mut s = sql;
    loop {
        let before = s;
        s = s.trim_start();
        if s.starts_with("--") {
            match s.find('\n') {
                Some(pos) => {
                    s = &s[pos + 1..];
                    continue;
                }
                None => return "",
            }
        }
        if s.starts_with("/*") {
            match s.find("*/") {
                Some(pos) => {
                    s = &s[pos + 2..];
                    continue;
                }
                None => return "",
            }
        }
        if let Some(rest) = s.strip_prefix('(') {
            s = rest;
            continue;
        }
        if s == before {
            return s;
        }
    }
}

pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

fn display_sql(sql: &str) -> String {
    if sql.len() > MAX_LOGGED_SQL {
        format!("{}...", truncate_sql_bytes(sql, MAX_LOGGED_SQL))
    } else {
        sql.to_string()
    }
}

pub(crate) fn before_query(group: RoutingGroup, sql: &str) {
    tracing::debug!(
        target: "fluentsql.sql",
        query_type = ?QueryType::from_sql(sql),
        group = %group,
        sql = %display_sql(sql),
    );
}

pub(crate) fn after_query(group: RoutingGroup, sql: &str, elapsed: Duration, rows: u64) {
    tracing::trace!(
        target: "fluentsql.sql",
        query_type = ?QueryType::from_sql(sql),
        group = %group,
        elapsed_ms = elapsed.as_millis() as u64,
        rows,
        "query complete"
    );
}

pub(crate) fn query_failed(group: RoutingGroup, err: &SqlError) {
    tracing::warn!(
        target: "fluentsql.sql",
        group = %group,
        sql = %display_sql(err.sql()),
        error = %err,
    );
}
