//! Master/replica cluster over `deadpool-postgres`.
//!
//! One pool per node. [`RoutingGroup::Master`] always draws from the master
//! pool; [`RoutingGroup::AllSlaves`] walks the replica pools round-robin and
//! falls back to the master when none are configured.

use crate::dialect::Dialect;
use crate::error::{DriverError, SqlError, SqlResult};
use crate::pool::{Connection, ConnectionPool, QueryOutput, RoutingGroup};
use crate::router::Router;
use crate::row::Row;
use crate::value::Value;
use deadpool_postgres::{Manager, ManagerConfig, Object, Pool, RecyclingMethod};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_postgres::{NoTls, SimpleQueryMessage};

fn default_max_size() -> usize {
    16
}

/// Node URLs and pool sizing of a [`Cluster`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Connection URL of the master node.
    pub master: String,
    /// Connection URLs of the replica nodes.
    #[serde(default)]
    pub replicas: Vec<String>,
    /// Maximum connections per node pool.
    #[serde(default = "default_max_size")]
    pub max_size: usize,
    /// Database bound to routers that don't name one.
    #[serde(default)]
    pub database: Option<String>,
}

impl ClusterConfig {
    /// A master-only configuration.
    pub fn new(master: impl Into<String>) -> Self {
        Self {
            master: master.into(),
            replicas: Vec::new(),
            max_size: default_max_size(),
            database: None,
        }
    }

    /// First URL is the master, the rest are replicas.
    pub fn from_urls<I, S>(urls: I) -> SqlResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut urls = urls.into_iter().map(Into::into);
        let master = urls
            .next()
            .ok_or_else(|| SqlError::validation("cluster needs at least one node"))?;
        Ok(Self::new(master).replicas(urls))
    }

    /// Add one replica.
    pub fn replica(mut self, url: impl Into<String>) -> Self {
        self.replicas.push(url.into());
        self
    }

    /// Replace the replica list.
    pub fn replicas<I, S>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.replicas = urls.into_iter().map(Into::into).collect();
        self
    }

    /// Set the per-node pool size.
    pub fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Set the default database.
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }
}

fn create_node_pool(database_url: &str, max_size: usize) -> SqlResult<Pool> {
    let pg_config: tokio_postgres::Config = database_url
        .parse()
        .map_err(|e: tokio_postgres::Error| SqlError::Connection(e.to_string()))?;

    let manager_config = ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    };
    let mgr = Manager::from_config(pg_config, NoTls, manager_config);
    Pool::builder(mgr)
        .max_size(max_size)
        .build()
        .map_err(|e| SqlError::Connection(e.to_string()))
}

/// A master pool plus any number of replica pools.
pub struct Cluster {
    master: Pool,
    replicas: Vec<Pool>,
    next_replica: AtomicUsize,
    database: Option<String>,
}

impl std::fmt::Debug for Cluster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cluster")
            .field("replicas", &self.replicas.len())
            .field("database", &self.database)
            .finish_non_exhaustive()
    }
}

impl Cluster {
    /// Build the node pools. No connection is opened until first use.
    pub fn from_config(config: &ClusterConfig) -> SqlResult<Self> {
        let master = create_node_pool(&config.master, config.max_size)?;
        let replicas = config
            .replicas
            .iter()
            .map(|url| create_node_pool(url, config.max_size))
            .collect::<SqlResult<Vec<_>>>()?;
        tracing::debug!(
            target: "fluentsql.sql",
            replicas = replicas.len(),
            max_size = config.max_size,
            "cluster created"
        );
        Ok(Self {
            master,
            replicas,
            next_replica: AtomicUsize::new(0),
            database: config.database.clone(),
        })
    }

    pub fn has_replicas(&self) -> bool {
        !self.replicas.is_empty()
    }

    /// A router over this cluster.
    ///
    /// Replicas serve the router only when `from_replica` is set and at
    /// least one is configured. `database` overrides the configured default.
    pub fn router(self: &Arc<Self>, from_replica: bool, database: Option<&str>) -> Router<Self> {
        let group = if from_replica && self.has_replicas() {
            RoutingGroup::AllSlaves
        } else {
            RoutingGroup::Master
        };
        let router = Router::new(Arc::clone(self), group);
        match database.or(self.database.as_deref()) {
            Some(db) => router.with_database(db),
            None => router,
        }
    }

    /// Render `value` as a literal for this cluster's SQL dialect.
    pub fn escape(&self, value: &Value) -> String {
        self.dialect().escape(value)
    }

    fn pick(&self, group: RoutingGroup) -> &Pool {
        match group {
            RoutingGroup::AllSlaves if !self.replicas.is_empty() => {
                let n = self.next_replica.fetch_add(1, Ordering::Relaxed);
                &self.replicas[n % self.replicas.len()]
            }
            _ => &self.master,
        }
    }
}

impl ConnectionPool for Cluster {
    type Connection = PgConnection;

    async fn get_connection(&self, group: RoutingGroup) -> Result<PgConnection, DriverError> {
        let client = self.pick(group).get().await?;
        Ok(PgConnection(client))
    }

    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }
}

/// A pooled PostgreSQL client. Returned to its pool on release.
pub struct PgConnection(Object);

impl Connection for PgConnection {
    async fn query(&mut self, sql: &str) -> Result<QueryOutput, DriverError> {
        let messages = self.0.simple_query(sql).await?;
        Ok(collect_output(messages))
    }
}

fn collect_output(messages: Vec<SimpleQueryMessage>) -> QueryOutput {
    let mut rows = Vec::new();
    let mut columns: Option<Arc<[String]>> = None;
    let mut affected_rows = 0;

    for message in messages {
        match message {
            SimpleQueryMessage::Row(row) => {
                let names = columns
                    .get_or_insert_with(|| {
                        row.columns().iter().map(|c| c.name().to_string()).collect()
                    })
                    .clone();
                let values = (0..row.len())
                    .map(|i| row.get(i).map_or(Value::Null, Value::from))
                    .collect();
                rows.push(Row::new(names, values));
            }
            SimpleQueryMessage::CommandComplete(n) => affected_rows = n,
            _ => {}
        }
    }

    if rows.is_empty() {
        QueryOutput::Done {
            affected_rows,
            insert_id: None,
        }
    } else {
        QueryOutput::Rows(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_from_urls_splits_master_and_replicas() {
        let config = ClusterConfig::from_urls([
            "postgres://m/app",
            "postgres://r1/app",
            "postgres://r2/app",
        ])
        .unwrap();
        assert_eq!(config.master, "postgres://m/app");
        assert_eq!(config.replicas, vec!["postgres://r1/app", "postgres://r2/app"]);
        assert_eq!(config.max_size, 16);

        let err = ClusterConfig::from_urls(Vec::<String>::new()).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: ClusterConfig =
            serde_json::from_str(r#"{"master": "postgres://m/app"}"#).unwrap();
        assert_eq!(config, ClusterConfig::new("postgres://m/app"));
    }

    #[test]
    fn invalid_url_is_a_connection_error() {
        let err = Cluster::from_config(&ClusterConfig::new("postgres://localhost:notaport/app")).unwrap_err();
        assert!(err.is_connection());
    }

    #[test]
    fn replica_routing_needs_replicas() {
        let master_only =
            Arc::new(Cluster::from_config(&ClusterConfig::new("postgres://localhost/app")).unwrap());
        assert_eq!(master_only.router(true, None).group(), RoutingGroup::Master);

        let config = ClusterConfig::new("postgres://localhost/app")
            .replica("postgres://localhost/replica")
            .database("shop");
        let cluster = Arc::new(Cluster::from_config(&config).unwrap());
        let reader = cluster.router(true, None);
        assert_eq!(reader.group(), RoutingGroup::AllSlaves);
        assert_eq!(reader.database(), Some("shop"));
        assert_eq!(reader.dialect(), Dialect::Postgres);

        let writer = cluster.router(false, Some("audit"));
        assert_eq!(writer.group(), RoutingGroup::Master);
        assert_eq!(writer.database(), Some("audit"));
    }

    #[test]
    fn replicas_are_picked_round_robin() {
        let config = ClusterConfig::new("postgres://localhost/m")
            .replicas(["postgres://localhost/r1", "postgres://localhost/r2"]);
        let cluster = Cluster::from_config(&config).unwrap();
        let first = cluster.pick(RoutingGroup::AllSlaves) as *const Pool;
        let second = cluster.pick(RoutingGroup::AllSlaves) as *const Pool;
        let third = cluster.pick(RoutingGroup::AllSlaves) as *const Pool;
        assert_ne!(first, second);
        assert_eq!(first, third);
        assert_eq!(
            cluster.pick(RoutingGroup::Master) as *const Pool,
            &cluster.master as *const Pool
        );
    }

    #[test]
    fn cluster_escapes_for_postgres() {
        let cluster = Cluster::from_config(&ClusterConfig::new("postgres://localhost/app")).unwrap();
        assert_eq!(cluster.escape(&Value::from("it's")), "'it''s'");
        assert_eq!(cluster.escape(&Value::Bool(true)), "TRUE");
    }
}
