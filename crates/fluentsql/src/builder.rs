//! Table-scoped fluent query builder.
//!
//! Chain methods only record intent in the builder's [`QuerySpec`]; nothing
//! is validated or sent until a terminal call (`get_all`, `get`, `count`,
//! `insert`, `update`, `remove`). Each terminal call compiles its statement,
//! borrows one connection from the router, runs the statement and releases
//! the connection.
//!
//! ```ignore
//! let mut q = router.table("users")?;
//! q.left_join([("roles r", "users.role_id = r.id")])
//!     .filter(FieldMap::new().with("age", Condition::range().gt(18)))
//!     .sort([("created_at", SortOrder::Desc)])
//!     .slice(0, 10);
//! let rows = q.get_all().await?;
//! ```

use crate::clause::{self, Join, JoinKind, Paging, SortOrder};
use crate::dialect::Dialect;
use crate::error::{SqlError, SqlResult};
use crate::filter::{self, Condition, FieldMap, FilterExpr};
use crate::pool::{ConnectionPool, QueryOutput};
use crate::router::Router;
use crate::row::{FromRow, FromValue, Row};
use crate::value::{Document, Value};

/// Everything a builder has recorded.
#[derive(Debug, Clone)]
pub struct QuerySpec {
    pub table: String,
    pub left_join: Vec<Join>,
    pub right_join: Vec<Join>,
    pub join: Vec<Join>,
    pub filter: Option<FilterExpr>,
    pub fields: Vec<String>,
    pub sort: Vec<(String, SortOrder)>,
    pub paging: Paging,
    /// Primary key column used by the id lookups and the INSERT identity.
    pub id_column: String,
}

impl QuerySpec {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            left_join: Vec::new(),
            right_join: Vec::new(),
            join: Vec::new(),
            filter: None,
            fields: vec!["*".to_string()],
            sort: Vec::new(),
            paging: Paging::default(),
            id_column: "id".to_string(),
        }
    }

    fn ensure_table(&self) -> SqlResult<()> {
        if self.table.trim().is_empty() {
            return Err(SqlError::validation("empty table"));
        }
        Ok(())
    }

    /// `WHERE ...` for the recorded filter, if any.
    fn where_clause(&self, dialect: Dialect) -> SqlResult<Option<String>> {
        match &self.filter {
            Some(expr) => filter::where_clause(expr, dialect),
            None => Ok(None),
        }
    }

    /// Compile the SELECT.
    ///
    /// `ids` become `id IN (...)` only when no filter has been set.
    pub fn select_sql(&self, ids: Option<&[Value]>, dialect: Dialect) -> SqlResult<String> {
        self.ensure_table()?;

        let id_filter;
        let filter = match (&self.filter, ids) {
            (Some(expr), _) => Some(expr),
            (None, Some(ids)) => {
                id_filter = FilterExpr::Fields(
                    FieldMap::new().with(self.id_column.as_str(), Condition::In(ids.to_vec())),
                );
                Some(&id_filter)
            }
            (None, None) => None,
        };

        let mut parts = vec![
            clause::select(&self.fields),
            format!("FROM {}", self.table),
        ];
        parts.extend(clause::join(JoinKind::Left, &self.left_join));
        parts.extend(clause::join(JoinKind::Right, &self.right_join));
        parts.extend(clause::join(JoinKind::Inner, &self.join));
        if let Some(expr) = filter {
            parts.extend(filter::where_clause(expr, dialect)?);
        }
        parts.extend(clause::sort(&self.sort));
        parts.extend(clause::limit(&self.paging, dialect));
        Ok(parts.join(" "))
    }

    /// Compile the INSERT of `doc`.
    pub fn insert_sql(&self, doc: &Document, dialect: Dialect) -> SqlResult<String> {
        self.ensure_table()?;
        if doc.is_empty() {
            return Err(SqlError::validation("insert: empty document"));
        }

        let (columns, values): (Vec<&str>, Vec<String>) =
            doc.iter().map(|(c, v)| (c, v.render(dialect))).unzip();
        let mut sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table,
            columns.join(","),
            values.join(",")
        );
        if let Some(returning) = dialect.returning_identity() {
            sql.push(' ');
            sql.push_str(returning);
        }
        Ok(sql)
    }

    /// Compile the UPDATE of `doc`, scoped by the recorded filter.
    pub fn update_sql(&self, doc: &Document, dialect: Dialect) -> SqlResult<String> {
        self.ensure_table()?;
        if doc.is_empty() {
            return Err(SqlError::validation("update: empty document"));
        }

        let assignments: Vec<String> = doc
            .iter()
            .map(|(c, v)| format!("{c} = {}", v.render(dialect)))
            .collect();
        let mut parts = vec![format!(
            "UPDATE {} SET {}",
            self.table,
            assignments.join(", ")
        )];
        parts.extend(self.where_clause(dialect)?);
        Ok(parts.join(" "))
    }

    /// Compile the DELETE, scoped by the recorded filter.
    ///
    /// Without a filter this deletes every row of the table.
    pub fn delete_sql(&self, dialect: Dialect) -> SqlResult<String> {
        self.ensure_table()?;
        let mut parts = vec![format!("DELETE FROM {}", self.table)];
        parts.extend(self.where_clause(dialect)?);
        Ok(parts.join(" "))
    }
}

/// Fluent builder for statements on one table.
///
/// Obtained from [`Router::table`]. Chain methods return `&mut Self` and
/// replace what they set; terminal methods take `&self`, so one builder can
/// run several statements, each on its own connection.
pub struct QueryBuilder<P: ConnectionPool> {
    router: Router<P>,
    spec: QuerySpec,
}

impl<P: ConnectionPool> std::fmt::Debug for QueryBuilder<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("router", &self.router)
            .field("spec", &self.spec)
            .finish()
    }
}

impl<P: ConnectionPool> QueryBuilder<P> {
    pub(crate) fn new(router: Router<P>, table: &str) -> Self {
        Self {
            router,
            spec: QuerySpec::new(table),
        }
    }

    /// The recorded query state.
    pub fn spec(&self) -> &QuerySpec {
        &self.spec
    }

    pub fn router(&self) -> &Router<P> {
        &self.router
    }

    // ==================== Chain methods ====================

    /// Set the LEFT JOIN list.
    pub fn left_join<I, J>(&mut self, tables: I) -> &mut Self
    where
        I: IntoIterator<Item = J>,
        J: Into<Join>,
    {
        self.spec.left_join = tables.into_iter().map(Into::into).collect();
        self
    }

    /// Set the RIGHT JOIN list.
    pub fn right_join<I, J>(&mut self, tables: I) -> &mut Self
    where
        I: IntoIterator<Item = J>,
        J: Into<Join>,
    {
        self.spec.right_join = tables.into_iter().map(Into::into).collect();
        self
    }

    /// Set the (inner) JOIN list.
    pub fn join<I, J>(&mut self, tables: I) -> &mut Self
    where
        I: IntoIterator<Item = J>,
        J: Into<Join>,
    {
        self.spec.join = tables.into_iter().map(Into::into).collect();
        self
    }

    /// Set the filter: raw SQL, a [`FieldMap`], or any [`FilterExpr`].
    pub fn filter(&mut self, filter: impl Into<FilterExpr>) -> &mut Self {
        self.spec.filter = Some(filter.into());
        self
    }

    /// Set the sort keys, in priority order.
    pub fn sort<I, K>(&mut self, keys: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, SortOrder)>,
        K: Into<String>,
    {
        self.spec.sort = keys.into_iter().map(|(k, o)| (k.into(), o)).collect();
        self
    }

    /// Rows to skip. Ignored unless [`limit`](Self::limit) is also set.
    pub fn skip(&mut self, skip: u64) -> &mut Self {
        self.spec.paging.skip = Some(skip);
        self
    }

    /// Maximum number of rows; `0` means unlimited.
    pub fn limit(&mut self, size: u64) -> &mut Self {
        self.spec.paging.size = Some(size);
        self
    }

    /// Rows `start..end`. Takes precedence over `skip`/`limit`.
    pub fn slice(&mut self, start: u64, end: u64) -> &mut Self {
        self.spec.paging.slice = Some((start, end.saturating_sub(start)));
        self
    }

    /// Select only these columns (default `*`).
    pub fn with_fields<I, S>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.spec.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Primary key column (default `id`).
    pub fn id_column(&mut self, column: impl Into<String>) -> &mut Self {
        self.spec.id_column = column.into();
        self
    }

    // ==================== SQL build ====================

    /// SELECT that [`get_all`](Self::get_all) would run.
    pub fn to_select_sql(&self) -> SqlResult<String> {
        self.spec.select_sql(None, self.router.dialect())
    }

    /// INSERT that [`insert`](Self::insert) would run.
    pub fn to_insert_sql(&self, doc: &Document) -> SqlResult<String> {
        self.spec.insert_sql(doc, self.router.dialect())
    }

    /// UPDATE that [`update`](Self::update) would run.
    pub fn to_update_sql(&self, doc: &Document) -> SqlResult<String> {
        self.spec.update_sql(doc, self.router.dialect())
    }

    /// DELETE that [`remove`](Self::remove) would run.
    pub fn to_delete_sql(&self) -> SqlResult<String> {
        self.spec.delete_sql(self.router.dialect())
    }

    // ==================== Terminal operations ====================

    async fn fetch(&self, ids: Option<&[Value]>) -> SqlResult<Vec<Row>> {
        let sql = self.spec.select_sql(ids, self.router.dialect())?;
        Ok(self.router.execute(sql, "find").await?.into_rows())
    }

    /// All matching rows.
    pub async fn get_all(&self) -> SqlResult<Vec<Row>> {
        self.fetch(None).await
    }

    /// Rows whose id is in `ids`, unless a filter is set (the filter wins).
    pub async fn get_all_by_ids<I, V>(&self, ids: I) -> SqlResult<Vec<Row>>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let ids: Vec<Value> = ids.into_iter().map(Into::into).collect();
        self.fetch(Some(&ids)).await
    }

    /// First matching row.
    pub async fn get(&self) -> SqlResult<Option<Row>> {
        Ok(self.fetch(None).await?.into_iter().next())
    }

    /// Row with primary key `id`, unless a filter is set (the filter wins).
    pub async fn get_by_id(&self, id: impl Into<Value>) -> SqlResult<Option<Row>> {
        let ids = [id.into()];
        Ok(self.fetch(Some(&ids)).await?.into_iter().next())
    }

    /// All matching rows, mapped to `T`.
    pub async fn get_all_as<T: FromRow>(&self) -> SqlResult<Vec<T>> {
        let rows = self.get_all().await?;
        rows.iter().map(T::from_row).collect()
    }

    /// First matching row, mapped to `T`.
    pub async fn get_as<T: FromRow>(&self) -> SqlResult<Option<T>> {
        let row = self.get().await?;
        row.as_ref().map(T::from_row).transpose()
    }

    /// Number of matching rows, ignoring any paging.
    ///
    /// This fetches every matching row and counts them client-side rather
    /// than issuing `SELECT COUNT(*)`; it is slow on large tables.
    pub async fn count(&self) -> SqlResult<u64> {
        let mut spec = self.spec.clone();
        spec.paging = Paging::default();
        let sql = spec.select_sql(None, self.router.dialect())?;
        Ok(self.router.execute(sql, "count").await?.into_rows().len() as u64)
    }

    /// Insert one row; resolves with the identity reported for it.
    ///
    /// When the driver returns the inserted row instead, the identity is read
    /// from the id column; a table without that column resolves `None`.
    pub async fn insert(&self, doc: &Document) -> SqlResult<Option<u64>> {
        let sql = self.spec.insert_sql(doc, self.router.dialect())?;
        let output = self.router.execute(sql, "insert").await?;
        let id_column = self.spec.id_column.as_str();
        match output {
            QueryOutput::Done { insert_id, .. } => Ok(insert_id),
            QueryOutput::Rows(rows) => match rows.first().and_then(|r| r.get(id_column)) {
                Some(value) => Option::<u64>::from_value(value)
                    .map_err(|message| SqlError::decode(id_column, message)),
                None => Ok(None),
            },
        }
    }

    /// Update matching rows; resolves with the affected row count.
    pub async fn update(&self, doc: &Document) -> SqlResult<u64> {
        let sql = self.spec.update_sql(doc, self.router.dialect())?;
        Ok(self.router.execute(sql, "update").await?.affected_rows())
    }

    /// Delete matching rows; resolves with the affected row count.
    ///
    /// Without a filter every row of the table is deleted.
    pub async fn remove(&self) -> SqlResult<u64> {
        let sql = self.spec.delete_sql(self.router.dialect())?;
        Ok(self.router.execute(sql, "remove").await?.affected_rows())
    }
}
