//! # relay-storage
//!
//! Thin parameterized-query wrapper around SQLite for code built on top of
//! the Relay server. Application code persists and queries domain records
//! keyed by integer id through this helper; nothing in the pub/sub path
//! touches it.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A statement that must touch exactly one row touched another count.
    #[error("expected 1 row affected, got {0}")]
    UnexpectedRowCount(u64),
}

/// A bindable query parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL.
    Null,
    /// Integer.
    Int(i64),
    /// Double-precision float.
    Real(f64),
    /// Text.
    Text(String),
    /// Raw bytes.
    Blob(Vec<u8>),
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Real(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Blob(v)
    }
}

/// Outcome of a statement that modifies rows.
#[derive(Debug, Clone, Copy)]
pub struct ExecResult {
    /// Number of rows the statement touched.
    pub rows_affected: u64,
    /// Rowid of the last inserted row.
    pub last_insert_id: i64,
}

/// A storage connection backed by a SQLite pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open or create the database at `path`.
    ///
    /// Uses WAL journaling and a busy timeout so concurrent application
    /// writers queue instead of failing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub async fn open(path: &Path) -> Result<Self, StorageError> {
        let database_url = format!("sqlite://{}?mode=rwc", path.display());

        let options = SqliteConnectOptions::from_str(&database_url)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(3)
            .connect_with(options)
            .await?;

        info!("Opened database at {}", path.display());
        Ok(Self { pool })
    }

    /// Open an in-memory database.
    ///
    /// Capped at one connection: each SQLite in-memory connection is its own
    /// database, so a larger pool would split the data.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub async fn open_in_memory() -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    /// Close the connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Get a reference to the connection pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run a parameterized query and return all rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<SqliteRow>, StorageError> {
        let rows = bind_params(sqlx::query(sql), params)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Run a parameterized query and return the first row, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn query_row(
        &self,
        sql: &str,
        params: &[Value],
    ) -> Result<Option<SqliteRow>, StorageError> {
        let row = bind_params(sqlx::query(sql), params)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Execute a parameterized statement.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement fails.
    pub async fn exec(&self, sql: &str, params: &[Value]) -> Result<ExecResult, StorageError> {
        let result = bind_params(sqlx::query(sql), params)
            .execute(&self.pool)
            .await?;
        Ok(ExecResult {
            rows_affected: result.rows_affected(),
            last_insert_id: result.last_insert_rowid(),
        })
    }

    /// Insert exactly one row and return its rowid.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement fails or did not insert exactly one
    /// row.
    pub async fn insert(&self, sql: &str, params: &[Value]) -> Result<i64, StorageError> {
        let result = self.exec(sql, params).await?;
        if result.rows_affected != 1 {
            return Err(StorageError::UnexpectedRowCount(result.rows_affected));
        }
        Ok(result.last_insert_id)
    }

    /// Update exactly one row.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement fails or did not touch exactly one
    /// row.
    pub async fn update(&self, sql: &str, params: &[Value]) -> Result<(), StorageError> {
        let result = self.exec(sql, params).await?;
        if result.rows_affected != 1 {
            return Err(StorageError::UnexpectedRowCount(result.rows_affected));
        }
        Ok(())
    }

    /// Delete exactly one row.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement fails or did not touch exactly one
    /// row.
    pub async fn delete(&self, sql: &str, params: &[Value]) -> Result<(), StorageError> {
        self.update(sql, params).await
    }

    /// Run a counting query (`SELECT COUNT(*) ...`).
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or returns no rows.
    pub async fn count(&self, sql: &str, params: &[Value]) -> Result<i64, StorageError> {
        let row = bind_params(sqlx::query(sql), params)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get(0)?)
    }

    /// Fetch one record from `table` by its integer id.
    ///
    /// `table` must come from trusted application code, never from user
    /// input: it is interpolated into the statement text.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn get(&self, table: &str, id: i64) -> Result<Option<SqliteRow>, StorageError> {
        let sql = format!("SELECT * FROM {} WHERE id = ?", table);
        self.query_row(&sql, &[Value::Int(id)]).await
    }
}

/// Bind a parameter slice onto a query in order.
fn bind_params<'q>(
    query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    params: &[Value],
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    params.iter().fold(query, |query, param| match param {
        Value::Null => query.bind(Option::<i64>::None),
        Value::Int(v) => query.bind(*v),
        Value::Real(v) => query.bind(*v),
        Value::Text(v) => query.bind(v.clone()),
        Value::Blob(v) => query.bind(v.clone()),
    })
}
