//! Filter expressions and their compiler.
//!
//! A [`FilterExpr`] describes the WHERE clause of a statement. It can be
//! raw SQL, a callback producing SQL, an AND/OR conjunction of nested
//! filters, or a [`FieldMap`] of per-column [`Condition`]s.
//!
//! ```rust
//! use fluentsql::filter::{Condition, FieldMap, FilterExpr};
//! use fluentsql::Dialect;
//!
//! let filter = FilterExpr::or(vec![
//!     FieldMap::new().eq("status", "active").into(),
//!     FieldMap::new()
//!         .with("age", Condition::range().gte(18).lt(30))
//!         .into(),
//! ]);
//!
//! assert_eq!(
//!     filter.to_sql(Dialect::MySql).unwrap(),
//!     "(status = 'active') OR (age >= 18 AND age < 30)"
//! );
//! ```
//!
//! The same grammar can be read from a JSON document with
//! [`FilterExpr::from_json`] (`$and`, `$or`, `$like`, `$in`, `$between`,
//! `$lt`, `$lte`, `$gt`, `$gte`, `$eq`, `$sql`).

mod compile;
mod json;

#[cfg(test)]
mod tests;

pub use compile::{compile, where_clause};

use crate::dialect::Dialect;
use crate::error::SqlResult;
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// How the terms of a [`FilterExpr::Conjunction`] are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Logic {
    And,
    Or,
}

impl Logic {
    pub(crate) fn separator(self) -> &'static str {
        match self {
            Logic::And => " AND ",
            Logic::Or => " OR ",
        }
    }
}

/// A callback producing raw predicate SQL, invoked at compile time.
#[derive(Clone)]
pub struct Predicate(Arc<dyn Fn() -> String + Send + Sync>);

impl Predicate {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(&self) -> String {
        (self.0)()
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Predicate(..)")
    }
}

/// A filter: the structured source of a WHERE clause.
#[derive(Debug, Clone)]
pub enum FilterExpr {
    /// Raw predicate SQL, used verbatim.
    ///
    /// Be careful with SQL injection when using raw filters.
    Raw(String),
    /// Predicate SQL produced by a callback.
    Predicate(Predicate),
    /// Nested filters, each parenthesized, joined by AND or OR.
    Conjunction { logic: Logic, terms: Vec<FilterExpr> },
    /// Per-column conditions, implicitly AND-ed in insertion order.
    Fields(FieldMap),
}

impl FilterExpr {
    /// Create a raw SQL filter.
    pub fn raw(sql: impl Into<String>) -> Self {
        FilterExpr::Raw(sql.into())
    }

    /// Create a filter from a callback returning predicate SQL.
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        FilterExpr::Predicate(Predicate::new(f))
    }

    /// `(t1) AND (t2) AND ...`
    pub fn and(terms: Vec<FilterExpr>) -> Self {
        FilterExpr::Conjunction {
            logic: Logic::And,
            terms,
        }
    }

    /// `(t1) OR (t2) OR ...`
    pub fn or(terms: Vec<FilterExpr>) -> Self {
        FilterExpr::Conjunction {
            logic: Logic::Or,
            terms,
        }
    }

    /// Parse the JSON filter document grammar.
    pub fn from_json(doc: &serde_json::Value) -> SqlResult<Self> {
        json::parse_filter(doc)
    }

    /// Compile to predicate SQL (without the `WHERE` keyword).
    pub fn to_sql(&self, dialect: Dialect) -> SqlResult<String> {
        compile(self, dialect)
    }
}

impl From<&str> for FilterExpr {
    fn from(sql: &str) -> Self {
        FilterExpr::Raw(sql.to_string())
    }
}

impl From<String> for FilterExpr {
    fn from(sql: String) -> Self {
        FilterExpr::Raw(sql)
    }
}

impl From<FieldMap> for FilterExpr {
    fn from(fields: FieldMap) -> Self {
        FilterExpr::Fields(fields)
    }
}

/// One inclusive or exclusive bound of a [`Range`].
#[derive(Debug, Clone, PartialEq)]
pub struct Bound {
    pub value: Value,
    pub inclusive: bool,
}

/// Lower and/or upper bound on a single column.
///
/// When both are present they compile into one fused clause:
/// `col > low AND col < high`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Range {
    pub lower: Option<Bound>,
    pub upper: Option<Bound>,
}

impl Range {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exclusive lower bound: `col > value`.
    pub fn gt(mut self, value: impl Into<Value>) -> Self {
        self.lower = Some(Bound {
            value: value.into(),
            inclusive: false,
        });
        self
    }

    /// Inclusive lower bound: `col >= value`.
    pub fn gte(mut self, value: impl Into<Value>) -> Self {
        self.lower = Some(Bound {
            value: value.into(),
            inclusive: true,
        });
        self
    }

    /// Exclusive upper bound: `col < value`.
    pub fn lt(mut self, value: impl Into<Value>) -> Self {
        self.upper = Some(Bound {
            value: value.into(),
            inclusive: false,
        });
        self
    }

    /// Inclusive upper bound: `col <= value`.
    pub fn lte(mut self, value: impl Into<Value>) -> Self {
        self.upper = Some(Bound {
            value: value.into(),
            inclusive: true,
        });
        self
    }
}

/// Condition on a single column of a [`FieldMap`].
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `col = value` (plain scalar form)
    Equals(Value),
    /// `col LIKE pattern`
    Like(Value),
    /// `col <sql>`, e.g. `IN (SELECT ...)`. Not escaped.
    RawSql(String),
    /// `col IN (v1,v2,...)`
    In(Vec<Value>),
    /// `col BETWEEN low AND high`; exactly two bounds are required.
    Between(Vec<Value>),
    /// Lower and/or upper bound.
    Range(Range),
    /// `col = value` (explicit `$eq` form)
    ExplicitEq(Value),
}

impl Condition {
    pub fn eq(value: impl Into<Value>) -> Self {
        Condition::ExplicitEq(value.into())
    }

    pub fn like(pattern: impl Into<Value>) -> Self {
        Condition::Like(pattern.into())
    }

    pub fn raw(sql: impl Into<String>) -> Self {
        Condition::RawSql(sql.into())
    }

    pub fn in_list<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Condition::In(values.into_iter().map(Into::into).collect())
    }

    pub fn between(low: impl Into<Value>, high: impl Into<Value>) -> Self {
        Condition::Between(vec![low.into(), high.into()])
    }

    /// Start an empty range; add bounds with `gt`/`gte`/`lt`/`lte`.
    pub fn range() -> Range {
        Range::new()
    }
}

impl From<Range> for Condition {
    fn from(range: Range) -> Self {
        Condition::Range(range)
    }
}

/// Ordered column → [`Condition`] map.
///
/// Setting a column twice replaces the earlier condition in place, so the
/// compiled text stays in first-insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMap {
    entries: Vec<(String, Condition)>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the condition for `field`.
    pub fn with(mut self, field: impl Into<String>, condition: impl Into<Condition>) -> Self {
        self.insert(field, condition);
        self
    }

    /// In-place variant of [`FieldMap::with`].
    pub fn insert(&mut self, field: impl Into<String>, condition: impl Into<Condition>) {
        let field = field.into();
        let condition = condition.into();
        match self.entries.iter_mut().find(|(f, _)| *f == field) {
            Some(slot) => slot.1 = condition,
            None => self.entries.push((field, condition)),
        }
    }

    /// `field = value`
    pub fn eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, Condition::Equals(value.into()))
    }

    /// `field LIKE pattern`
    pub fn like(self, field: impl Into<String>, pattern: impl Into<Value>) -> Self {
        self.with(field, Condition::like(pattern))
    }

    /// `field IN (...)`
    pub fn in_list<I, V>(self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.with(field, Condition::in_list(values))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Condition)> {
        self.entries.iter().map(|(f, c)| (f.as_str(), c))
    }
}

impl<K: Into<String>> FromIterator<(K, Condition)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (K, Condition)>>(iter: I) -> Self {
        let mut map = FieldMap::new();
        for (k, c) in iter {
            map.insert(k, c);
        }
        map
    }
}
