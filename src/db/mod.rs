use crate::config::ConnectionConfig;
use crate::error::{QueryError, Result};
use crate::record::{self, CellValue, ColumnDescriptor, Record};
use mysql_async::prelude::*;
use mysql_async::{Conn, OptsBuilder, Row, Value};
use tracing::{debug, info};

/// Tables dumped when none are named on the command line.
pub const DEFAULT_TABLES: [&str; 2] = ["ProgrammingLanguages", "Notes"];

pub struct DatabaseConnection {
    conn: Conn,
    database: String,
}

impl DatabaseConnection {
    pub async fn connect(config: &ConnectionConfig) -> Result<DatabaseConnection> {
        debug!(dsn = %config.redacted_dsn(), "connecting");

        let conn = Conn::new(connection_opts(config))
            .await
            .map_err(QueryError::Connect)?;

        info!(host = %config.host, port = config.port, "connected");
        Ok(DatabaseConnection {
            conn,
            database: config.database.clone(),
        })
    }

    /// Runs `SHOW TABLES` and returns the names in the order the server gives them.
    pub async fn list_tables(&mut self) -> Result<Vec<String>> {
        let rows: Vec<Row> = self
            .conn
            .query("SHOW TABLES")
            .await
            .map_err(QueryError::ListTables)?;

        let tables = rows
            .into_iter()
            .enumerate()
            .map(|(index, row)| table_name(index, row.unwrap()))
            .collect::<Result<Vec<_>>>()?;

        debug!(count = tables.len(), "listed tables");
        Ok(tables)
    }

    /// Reads every row of `table` into memory.
    ///
    /// The statement goes through the binary protocol so numeric columns keep
    /// their type; text and blob columns are decoded into strings, temporal
    /// columns are rendered by their declared type and precision.
    pub async fn materialize(&mut self, table: &str) -> Result<Vec<Record>> {
        let query = select_all_statement(&self.database, table);
        debug!(%query, "materializing table");

        let select_error = |source| QueryError::Select {
            table: table.to_string(),
            source,
        };

        let result = self
            .conn
            .exec_iter(query.as_str(), ())
            .await
            .map_err(select_error)?;

        let columns: Vec<ColumnDescriptor> = match result.columns() {
            Some(columns) => columns.iter().map(ColumnDescriptor::from_column).collect(),
            // An unread result is drained on the connection's next use.
            None => {
                return Err(QueryError::MissingColumns {
                    table: table.to_string(),
                });
            }
        };

        let rows: Vec<Row> = result.collect_and_drop().await.map_err(select_error)?;

        let records = record::materialize_rows(&columns, rows.into_iter().map(Row::unwrap))?;
        debug!(table, rows = records.len(), "materialized table");
        Ok(records)
    }

    pub async fn disconnect(self) -> Result<()> {
        self.conn.disconnect().await.map_err(QueryError::Disconnect)
    }
}

fn connection_opts(config: &ConnectionConfig) -> OptsBuilder {
    let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());

    OptsBuilder::default()
        .ip_or_hostname(config.host.clone())
        .tcp_port(config.port)
        .user(non_empty(&config.user))
        .pass(non_empty(&config.password))
        .db_name(non_empty(&config.database))
}

/// Wraps an identifier in backticks, doubling any backtick inside it.
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// `SELECT * FROM <database>.<table>`, unqualified when no database is set.
pub fn select_all_statement(database: &str, table: &str) -> String {
    if database.is_empty() {
        format!("SELECT * FROM {}", quote_identifier(table))
    } else {
        format!(
            "SELECT * FROM {}.{}",
            quote_identifier(database),
            quote_identifier(table)
        )
    }
}

fn table_name(row: usize, values: Vec<Value>) -> Result<String> {
    match values.into_iter().next().map(CellValue::from) {
        Some(CellValue::Text(name)) => Ok(name),
        other => Err(QueryError::TableName {
            row,
            value: format!("{:?}", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_config() -> ConnectionConfig {
        ConnectionConfig {
            host: "127.0.0.1".to_string(),
            // Nothing listens on the tcpmux port.
            port: 1,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let result = DatabaseConnection::connect(&unreachable_config()).await;

        assert!(result.is_err());
        let err = result.err().unwrap();
        assert!(matches!(err, QueryError::Connect(_)));
        assert!(err.to_string().contains("failed to connect to database:"));
    }

    #[test]
    fn test_select_all_statement_qualified() {
        assert_eq!(
            select_all_statement("langs", "Notes"),
            "SELECT * FROM `langs`.`Notes`"
        );
    }

    #[test]
    fn test_select_all_statement_without_database() {
        assert_eq!(
            select_all_statement("", "ProgrammingLanguages"),
            "SELECT * FROM `ProgrammingLanguages`"
        );
    }

    #[test]
    fn test_quote_identifier_escapes_backticks() {
        assert_eq!(quote_identifier("a`b"), "`a``b`");
        assert_eq!(
            select_all_statement("db", "x`; DROP TABLE y; --"),
            "SELECT * FROM `db`.`x``; DROP TABLE y; --`"
        );
    }

    #[test]
    fn test_table_name_from_row() {
        assert_eq!(
            table_name(0, vec![Value::Bytes(b"Notes".to_vec())]).unwrap(),
            "Notes"
        );
    }

    #[test]
    fn test_table_name_rejects_non_text() {
        let err = table_name(2, vec![Value::Int(7)]).unwrap_err();
        assert!(matches!(err, QueryError::TableName { row: 2, .. }));

        let err = table_name(0, vec![Value::NULL]).unwrap_err();
        assert!(matches!(err, QueryError::TableName { row: 0, .. }));

        let err = table_name(1, Vec::new()).unwrap_err();
        assert!(err.to_string().contains("row 1"));
    }

    #[test]
    fn test_connection_opts() {
        let config = ConnectionConfig {
            user: "app".to_string(),
            password: String::new(),
            host: "db.internal".to_string(),
            port: 3307,
            database: "langs".to_string(),
        };
        let opts = mysql_async::Opts::from(connection_opts(&config));

        assert_eq!(opts.ip_or_hostname(), "db.internal");
        assert_eq!(opts.tcp_port(), 3307);
        assert_eq!(opts.user(), Some("app"));
        assert_eq!(opts.pass(), None);
        assert_eq!(opts.db_name(), Some("langs"));
    }
}
