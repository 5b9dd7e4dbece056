//! The connection capability a router is built on.
//!
//! The pool itself (node management, acquisition, the wire protocol) is not
//! part of this crate's core. Anything that can hand out connections for a
//! [`RoutingGroup`] and run SQL text on them implements [`ConnectionPool`];
//! the bundled [`Cluster`](crate::cluster::Cluster) is one such implementation.

use crate::dialect::Dialect;
use crate::error::DriverError;
use crate::row::Row;
use std::fmt;
use std::future::Future;

/// Which class of pool member serves a connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RoutingGroup {
    /// The primary node.
    #[default]
    Master,
    /// Any replica node.
    AllSlaves,
}

impl RoutingGroup {
    /// Node-name pattern of this group.
    pub fn as_str(&self) -> &'static str {
        match self {
            RoutingGroup::Master => "MASTER",
            RoutingGroup::AllSlaves => "SLAVE*",
        }
    }
}

impl fmt::Display for RoutingGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a statement produced.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutput {
    /// Result rows (SELECT, SHOW, `... RETURNING`).
    Rows(Vec<Row>),
    /// Completion of a statement without a result set.
    Done {
        affected_rows: u64,
        /// Identity generated by an INSERT, when the driver reports one.
        insert_id: Option<u64>,
    },
}

impl QueryOutput {
    /// Rows of the result; a statement without a result set yields none.
    pub fn into_rows(self) -> Vec<Row> {
        match self {
            QueryOutput::Rows(rows) => rows,
            QueryOutput::Done { .. } => Vec::new(),
        }
    }

    /// Affected rows; for a result set this is the number of rows returned.
    pub fn affected_rows(&self) -> u64 {
        match self {
            QueryOutput::Rows(rows) => rows.len() as u64,
            QueryOutput::Done { affected_rows, .. } => *affected_rows,
        }
    }

    pub fn insert_id(&self) -> Option<u64> {
        match self {
            QueryOutput::Rows(_) => None,
            QueryOutput::Done { insert_id, .. } => *insert_id,
        }
    }
}

/// A live connection borrowed from a pool.
pub trait Connection: Send {
    /// Run one SQL statement.
    fn query(
        &mut self,
        sql: &str,
    ) -> impl Future<Output = Result<QueryOutput, DriverError>> + Send;

    /// Hand the connection back to its pool.
    ///
    /// The default implementation drops it, which is enough for pools that
    /// recycle on drop.
    fn release(self)
    where
        Self: Sized,
    {
        drop(self);
    }
}

/// A pool of connections partitioned by [`RoutingGroup`].
pub trait ConnectionPool: Send + Sync + 'static {
    type Connection: Connection;

    /// Acquire a connection served by `group`.
    fn get_connection(
        &self,
        group: RoutingGroup,
    ) -> impl Future<Output = Result<Self::Connection, DriverError>> + Send;

    /// SQL syntax spoken by this pool's nodes.
    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }
}
