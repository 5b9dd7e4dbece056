//! Connection routing: acquisition, database selection, raw queries.

mod common;

use common::MockPool;
use fluentsql::{Dialect, QueryOutput, Row, RoutingGroup, SqlError};

#[tokio::test]
async fn bound_database_is_selected_on_every_connection() {
    let pool = MockPool::new();
    let router = pool.router(RoutingGroup::AllSlaves).with_database("shop");

    router.table("orders").unwrap().get_all().await.unwrap();
    router.table("orders").unwrap().count().await.unwrap();

    assert_eq!(
        pool.statements(),
        vec![
            "USE shop",
            "SELECT * FROM orders",
            "USE shop",
            "SELECT * FROM orders",
        ]
    );
    assert_eq!(pool.acquired(), 2);
    assert_eq!(pool.released(), 2);
}

#[tokio::test]
async fn postgres_database_selection() {
    let pool = MockPool::with_dialect(Dialect::Postgres);
    let router = pool.router(RoutingGroup::Master).with_database("shop");

    router.query("SELECT 1").await.unwrap();

    assert_eq!(pool.statements(), vec!["SET search_path TO shop", "SELECT 1"]);
}

#[tokio::test]
async fn empty_database_name_means_no_binding() {
    let pool = MockPool::new();
    let router = pool.router(RoutingGroup::Master).with_database("");

    assert_eq!(router.database(), None);
    router.query("SELECT 1").await.unwrap();
    assert_eq!(pool.statements(), vec!["SELECT 1"]);
}

#[tokio::test]
async fn failed_database_selection_releases_and_skips_the_statement() {
    let pool = MockPool::new();
    pool.fail("Unknown database 'gone'");
    let router = pool.router(RoutingGroup::Master).with_database("gone");

    let err = router.table("t").unwrap().get_all().await.unwrap_err();

    match &err {
        SqlError::DatabaseSelect { message, sql } => {
            assert!(message.contains("Unknown database"));
            assert_eq!(sql, "USE gone");
        }
        other => panic!("expected database select error, got {other:?}"),
    }
    assert_eq!(pool.statements(), vec!["USE gone"]);
    assert_eq!(pool.released(), 1);
}

#[tokio::test]
async fn acquisition_failure_is_a_connection_error() {
    let pool = MockPool::new();
    pool.refuse_connections();
    let router = pool.router(RoutingGroup::AllSlaves);

    let err = router.query("SELECT 1").await.unwrap_err();

    assert!(err.is_connection());
    assert!(err.message().contains("SLAVE*"));
    assert!(err.message().contains("pool exhausted"));
    assert!(pool.statements().is_empty());
    assert_eq!(pool.released(), 0);
}

#[tokio::test]
async fn routing_group_is_fixed_per_router() {
    let pool = MockPool::new();
    let reader = pool.router(RoutingGroup::AllSlaves);
    let writer = pool.router(RoutingGroup::Master);

    reader.table("t").unwrap().get_all().await.unwrap();
    writer.table("t").unwrap().remove().await.unwrap();
    reader.clone().query("SELECT 1").await.unwrap();

    assert_eq!(
        pool.groups(),
        vec![
            RoutingGroup::AllSlaves,
            RoutingGroup::Master,
            RoutingGroup::AllSlaves
        ]
    );
}

#[tokio::test]
async fn empty_table_name_fails_before_connecting() {
    let pool = MockPool::new();
    let router = pool.router(RoutingGroup::Master);

    let err = router.table("").unwrap_err();
    assert!(err.is_validation());
    let err = router.table("   ").unwrap_err();
    assert!(err.is_validation());

    assert!(pool.groups().is_empty());
}

#[tokio::test]
async fn raw_query_passthrough() {
    let pool = MockPool::new();
    pool.reply_done(4, None);
    let router = pool.router(RoutingGroup::Master);

    let output = router
        .query("UPDATE t SET n = n + 1 WHERE n < 4")
        .await
        .unwrap();
    assert_eq!(
        output,
        QueryOutput::Done {
            affected_rows: 4,
            insert_id: None
        }
    );

    let err = router.query("  ").await.unwrap_err();
    assert!(err.is_validation());
    assert_eq!(pool.acquired(), 1);
}

#[tokio::test]
async fn introspection_lists_first_column() {
    let pool = MockPool::new();
    pool.reply_rows(vec![
        Row::from_pairs([("Database", "information_schema")]),
        Row::from_pairs([("Database", "shop")]),
    ])
    .reply_rows(vec![Row::from_pairs([("Tables_in_shop", "orders")])]);
    let router = pool.router(RoutingGroup::Master);

    assert_eq!(
        router.db_list().await.unwrap(),
        vec!["information_schema", "shop"]
    );
    assert_eq!(router.table_list().await.unwrap(), vec!["orders"]);
    assert_eq!(
        pool.statements(),
        vec!["SHOW DATABASES", "SHOW TABLES"]
    );
}
