pub type Result<T> = std::result::Result<T, QueryError>;

/// Every way a database round trip (or encoding its result) can fail.
///
/// No variant is recoverable; callers propagate the first one they see.
#[derive(thiserror::Error, Debug)]
pub enum QueryError {
    #[error("failed to connect to database: {0}")]
    Connect(#[source] mysql_async::Error),

    #[error("failed to list tables: {0}")]
    ListTables(#[source] mysql_async::Error),

    #[error("table listing row {row} holds no table name: {value}")]
    TableName { row: usize, value: String },

    #[error("failed to query table `{table}`: {source}")]
    Select {
        table: String,
        #[source]
        source: mysql_async::Error,
    },

    #[error("query on table `{table}` returned no column metadata")]
    MissingColumns { table: String },

    #[error("row {row} has {found} values but the result has {expected} columns")]
    RowShape {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("failed to serialize records: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to close database connection: {0}")]
    Disconnect(#[source] mysql_async::Error),
}
