//! # fluentsql
//!
//! A fluent SQL query builder that compiles filter documents into `WHERE`
//! clauses and runs the resulting statements over a routed master/replica
//! connection pool.
//!
//! ## Features
//!
//! - **Filter documents**: raw SQL, predicates, nested `AND`/`OR`, field maps
//!   with `LIKE`/`IN`/`BETWEEN`/range conditions, or a JSON filter DSL
//! - **Fluent builder**: joins, sort, paging and field projection per table
//! - **Routing**: every statement gets its own connection from the master or
//!   a replica, with an optional database selected first
//! - **Escaping**: all user values go through one dialect-aware primitive;
//!   `Value::Raw` is the explicit escape hatch
//! - **Tracing**: executed SQL is reported on the `fluentsql.sql` target
//!
//! ## Example
//!
//! ```ignore
//! use fluentsql::{Cluster, ClusterConfig, Condition, Document, FieldMap, SortOrder};
//! use std::sync::Arc;
//!
//! let cluster = Arc::new(Cluster::from_config(
//!     &ClusterConfig::new("postgres://app@primary/shop").replica("postgres://app@replica/shop"),
//! )?);
//!
//! // Reads go to a replica
//! let reader = cluster.router(true, None);
//! let mut q = reader.table("users")?;
//! q.filter(FieldMap::new().eq("status", "active").with("age", Condition::range().gte(18)))
//!     .sort([("created_at", SortOrder::Desc)])
//!     .limit(10);
//! let users = q.get_all().await?;
//!
//! // Writes go to the master
//! let writer = cluster.router(false, None);
//! let id = writer
//!     .table("users")?
//!     .insert(&Document::new().set("name", "alice"))
//!     .await?;
//! ```

pub mod builder;
pub mod clause;
pub mod dialect;
pub mod error;
pub mod filter;
pub mod monitor;
pub mod pool;
pub mod router;
pub mod row;
pub mod value;

pub use builder::{QueryBuilder, QuerySpec};
pub use clause::{Join, JoinKind, Paging, SortOrder};
pub use dialect::Dialect;
pub use error::{DriverError, SqlError, SqlResult};
pub use filter::{Bound, Condition, FieldMap, FilterExpr, Logic, Predicate, Range};
pub use monitor::QueryType;
pub use pool::{Connection, ConnectionPool, QueryOutput, RoutingGroup};
pub use router::Router;
pub use row::{FromRow, FromValue, Row};
pub use value::{Document, Value};

#[cfg(feature = "pool")]
pub mod cluster;

#[cfg(feature = "pool")]
pub use cluster::{Cluster, ClusterConfig, PgConnection};
