//! Connection routing.
//!
//! A [`Router`] pairs a pool handle with a fixed [`RoutingGroup`] and an
//! optional database binding. Every statement it runs gets its own
//! connection, which is released as soon as the statement finishes.

use crate::builder::QueryBuilder;
use crate::dialect::Dialect;
use crate::error::{SqlError, SqlResult};
use crate::monitor;
use crate::pool::{Connection, ConnectionPool, QueryOutput, RoutingGroup};
use crate::row::FromValue;
use std::sync::Arc;
use std::time::Instant;

/// Routes statements to connections of one routing group.
///
/// Cloning is cheap: clones share the pool.
///
/// # Example
///
/// ```ignore
/// let router = Router::new(pool, RoutingGroup::AllSlaves).with_database("shop");
///
/// let users = router
///     .table("users")?
///     .filter(FieldMap::new().eq("status", "active"))
///     .limit(10)
///     .get_all()
///     .await?;
/// ```
pub struct Router<P: ConnectionPool> {
    pool: Arc<P>,
    group: RoutingGroup,
    database: Option<String>,
}

impl<P: ConnectionPool> Clone for Router<P> {
    fn clone(&self) -> Self {
        Self {
            pool: Arc::clone(&self.pool),
            group: self.group,
            database: self.database.clone(),
        }
    }
}

impl<P: ConnectionPool> std::fmt::Debug for Router<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("group", &self.group)
            .field("database", &self.database)
            .finish_non_exhaustive()
    }
}

impl<P: ConnectionPool> Router<P> {
    /// Create a router for `group` with no database binding.
    pub fn new(pool: Arc<P>, group: RoutingGroup) -> Self {
        Self {
            pool,
            group,
            database: None,
        }
    }

    /// Bind a database, selected on every acquired connection.
    ///
    /// An empty name means no binding.
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        let database = database.into();
        self.database = (!database.is_empty()).then_some(database);
        self
    }

    pub fn group(&self) -> RoutingGroup {
        self.group
    }

    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    pub fn dialect(&self) -> Dialect {
        self.pool.dialect()
    }

    pub fn pool(&self) -> &Arc<P> {
        &self.pool
    }

    /// Acquire a connection for this router's group, with the bound database
    /// selected.
    ///
    /// The caller owns the connection and must release it.
    pub async fn connect(&self) -> SqlResult<P::Connection> {
        tracing::trace!(target: "fluentsql.sql", group = %self.group, "acquiring connection");
        let mut conn = self
            .pool
            .get_connection(self.group)
            .await
            .map_err(|e| SqlError::Connection(format!("connect {}: {e}", self.group)))?;

        if let Some(database) = &self.database {
            let sql = self.dialect().select_database(database);
            monitor::before_query(self.group, &sql);
            let selected = conn.query(&sql).await;
            if let Err(e) = selected {
                conn.release();
                let err = SqlError::DatabaseSelect {
                    message: e.to_string(),
                    sql,
                };
                monitor::query_failed(self.group, &err);
                return Err(err);
            }
        }
        Ok(conn)
    }

    /// Start a query on `name`.
    pub fn table(&self, name: &str) -> SqlResult<QueryBuilder<P>> {
        if name.trim().is_empty() {
            return Err(SqlError::validation("empty table"));
        }
        Ok(QueryBuilder::new(self.clone(), name))
    }

    /// Run raw SQL as-is.
    pub async fn query(&self, sql: &str) -> SqlResult<QueryOutput> {
        if sql.trim().is_empty() {
            return Err(SqlError::validation("query SQL must be a non-empty string"));
        }
        self.execute(sql.to_string(), "query").await
    }

    /// Names of the databases visible to this router's connections.
    pub async fn db_list(&self) -> SqlResult<Vec<String>> {
        let sql = self.dialect().database_list_sql();
        let rows = self.execute(sql.to_string(), "list databases").await?;
        first_column_names(rows)
    }

    /// Names of the tables in the bound (or default) database.
    pub async fn table_list(&self) -> SqlResult<Vec<String>> {
        let sql = self.dialect().table_list_sql();
        let rows = self.execute(sql.to_string(), "list tables").await?;
        first_column_names(rows)
    }

    /// Run one statement on a fresh connection and release it, success or
    /// failure.
    pub(crate) async fn execute(&self, sql: String, context: &str) -> SqlResult<QueryOutput> {
        let mut conn = self.connect().await?;
        monitor::before_query(self.group, &sql);
        let start = Instant::now();
        let result = conn.query(&sql).await;
        conn.release();

        match result {
            Ok(output) => {
                monitor::after_query(self.group, &sql, start.elapsed(), output.affected_rows());
                Ok(output)
            }
            Err(e) => {
                let err = SqlError::query(format!("{context}: {e}"), sql);
                monitor::query_failed(self.group, &err);
                Err(err)
            }
        }
    }
}

fn first_column_names(output: QueryOutput) -> SqlResult<Vec<String>> {
    output
        .into_rows()
        .iter()
        .map(|row| {
            let column = row.columns().first().map_or("0", String::as_str);
            let value = row
                .get_idx(0)
                .ok_or_else(|| SqlError::decode(column, "empty row"))?;
            String::from_value(value).map_err(|message| SqlError::decode(column, message))
        })
        .collect()
}
