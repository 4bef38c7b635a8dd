//! Tests against a running MySQL server.
//!
//! Run with `cargo test -- --ignored` after pointing `SQLPEEK_HOST`, `SQLPEEK_USER`,
//! `SQLPEEK_PASSWORD` and `SQLPEEK_DATABASE` at a scratch database the account may
//! create tables in.

use mysql_async::prelude::*;
use mysql_async::{Conn, OptsBuilder};
use sqlpeek::config::{ConfigOverrides, ConnectionConfig};
use sqlpeek::record::{self, CellValue};
use sqlpeek::{DatabaseConnection, QueryError};

fn live_config() -> ConnectionConfig {
    ConnectionConfig::load(None, &ConfigOverrides::default()).unwrap()
}

async fn setup(config: &ConnectionConfig, statements: &[&str]) {
    let opts = OptsBuilder::default()
        .ip_or_hostname(config.host.clone())
        .tcp_port(config.port)
        .user(Some(config.user.clone()))
        .pass((!config.password.is_empty()).then(|| config.password.clone()))
        .db_name(Some(config.database.clone()));
    let mut conn = Conn::new(opts).await.unwrap();
    for statement in statements {
        conn.query_drop(*statement).await.unwrap();
    }
    conn.disconnect().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running MySQL server"]
async fn test_materialize_table_with_null() {
    let config = live_config();
    setup(
        &config,
        &[
            "DROP TABLE IF EXISTS sqlpeek_langs",
            "CREATE TABLE sqlpeek_langs (id INT, name TEXT)",
            "INSERT INTO sqlpeek_langs VALUES (1, 'Go'), (2, NULL)",
        ],
    )
    .await;

    let mut conn = DatabaseConnection::connect(&config).await.unwrap();
    let tables = conn.list_tables().await.unwrap();
    assert!(tables.contains(&"sqlpeek_langs".to_string()));

    let records = conn.materialize("sqlpeek_langs").await.unwrap();
    conn.disconnect().await.unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].get("id"), Some(&CellValue::Int(1)));
    assert_eq!(
        String::from_utf8(record::serialize(&records).unwrap()).unwrap(),
        r#"[{"id":1,"name":"Go"},{"id":2,"name":null}]"#
    );
}

#[tokio::test]
#[ignore = "requires a running MySQL server"]
async fn test_materialize_empty_table() {
    let config = live_config();
    setup(
        &config,
        &[
            "DROP TABLE IF EXISTS sqlpeek_empty",
            "CREATE TABLE sqlpeek_empty (id INT, note VARCHAR(20))",
        ],
    )
    .await;

    let mut conn = DatabaseConnection::connect(&config).await.unwrap();
    let records = conn.materialize("sqlpeek_empty").await.unwrap();
    conn.disconnect().await.unwrap();

    assert!(records.is_empty());
    assert_eq!(record::serialize(&records).unwrap(), b"[]");
}

#[tokio::test]
#[ignore = "requires a running MySQL server"]
async fn test_materialize_missing_table() {
    let config = live_config();

    let mut conn = DatabaseConnection::connect(&config).await.unwrap();
    let err = conn
        .materialize("sqlpeek_table_that_does_not_exist")
        .await
        .unwrap_err();

    match err {
        QueryError::Select { table, .. } => {
            assert_eq!(table, "sqlpeek_table_that_does_not_exist")
        }
        other => panic!("unexpected error: {other}"),
    }
}
