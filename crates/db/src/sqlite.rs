//! SQLite-backed book store.
//!
//! Updates are guarded by `WHERE id = ? AND version = ?`; a statement that
//! touches no row is resolved into `NotFound` or `Conflict` by re-reading
//! the stored version inside the same transaction.
//!
//! Write transactions open with `BEGIN IMMEDIATE`, so a second writer waits
//! on the busy timeout for the first to finish instead of failing when it
//! upgrades a read lock. File databases run in WAL mode.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use bookshelf_kernel::Migration;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePool, SqlitePoolOptions,
    SqliteRow, SqliteSynchronous,
};
use sqlx::{Executor, Row, Sqlite};
use time::OffsetDateTime;

use crate::error::{StoreError, StoreResult};
use crate::model::{Book, BookId};
use crate::store::{BookStore, BookTransaction};

pub use sqlx::Error as SqlxError;

const BOOK_COLUMNS: &str = "id, version, title, author, price, isbn, created_at, updated_at";

/// Schema owned by the store, applied through the module registry.
pub fn migrations() -> Vec<Migration> {
    vec![Migration {
        id: "001_books",
        up: r#"
            CREATE TABLE IF NOT EXISTS books (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                version     INTEGER NOT NULL DEFAULT 0,
                title       TEXT    NOT NULL CHECK (length(trim(title)) > 0),
                author      TEXT    NOT NULL CHECK (length(trim(author)) > 0),
                price       REAL    NOT NULL CHECK (price >= 0),
                isbn        TEXT,
                created_at  TEXT    NOT NULL,
                updated_at  TEXT    NOT NULL
            );
            "#,
    }]
}

#[derive(Debug, Clone)]
pub struct SqliteBookStore {
    pool: SqlitePool,
}

impl SqliteBookStore {
    /// Connect to `url`, creating the database file when missing.
    ///
    /// In-memory databases live and die with a connection, so they get a
    /// single connection that never expires.
    pub async fn connect(url: &str, max_connections: u32) -> StoreResult<Self> {
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");

        let mut options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(30));
        if !in_memory {
            options = options
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal);
        }

        let mut pool_options = SqlitePoolOptions::new().acquire_timeout(Duration::from_secs(30));
        pool_options = if in_memory {
            pool_options
                .max_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
        } else {
            pool_options.max_connections(max_connections.max(1))
        };

        let pool = pool_options.connect_with(options).await?;

        pool.execute(
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                module      TEXT NOT NULL,
                id          TEXT NOT NULL,
                applied_at  TEXT NOT NULL,
                PRIMARY KEY (module, id)
            );
            "#,
        )
        .await?;

        tracing::info!(url, in_memory, "connected to sqlite book store");

        Ok(Self { pool })
    }
}

fn book_from_row(row: &SqliteRow) -> Result<Book, sqlx::Error> {
    Ok(Book {
        id: Some(BookId(row.try_get("id")?)),
        version: row.try_get("version")?,
        title: row.try_get("title")?,
        author: row.try_get("author")?,
        price: row.try_get("price")?,
        isbn: row.try_get("isbn")?,
        created_at: Some(row.try_get("created_at")?),
        updated_at: Some(row.try_get("updated_at")?),
    })
}

fn to_sql_int(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[async_trait]
impl BookStore for SqliteBookStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn find_all(&self) -> StoreResult<Vec<Book>> {
        tracing::debug!(backend = "sqlite", "querying all books");
        let rows = sqlx::query(&format!("SELECT {BOOK_COLUMNS} FROM books ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .iter()
            .map(book_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn find_range(&self, offset: u64, limit: u64) -> StoreResult<Vec<Book>> {
        tracing::debug!(backend = "sqlite", offset, limit, "querying book range");
        let rows = sqlx::query(&format!(
            "SELECT {BOOK_COLUMNS} FROM books ORDER BY id LIMIT ? OFFSET ?"
        ))
        .bind(to_sql_int(limit))
        .bind(to_sql_int(offset))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .iter()
            .map(book_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn count(&self) -> StoreResult<u64> {
        let count: i64 = sqlx::query("SELECT COUNT(*) AS count FROM books")
            .fetch_one(&self.pool)
            .await?
            .try_get("count")?;
        Ok(count.max(0) as u64)
    }

    async fn find_by_id(&self, id: BookId) -> StoreResult<Option<Book>> {
        tracing::debug!(backend = "sqlite", book_id = %id, "finding book by id");
        let row = sqlx::query(&format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = ?"))
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(book_from_row).transpose()?)
    }

    async fn begin(&self) -> StoreResult<Box<dyn BookTransaction>> {
        Ok(Box::new(SqliteTransaction::begin(&self.pool).await?))
    }

    fn migrations(&self) -> Vec<Migration> {
        migrations()
    }

    async fn apply_migration(&self, module: &str, migration: &Migration) -> StoreResult<bool> {
        let mut tx = SqliteTransaction::begin(&self.pool).await?;
        let conn = tx.connection()?;

        let applied = sqlx::query("SELECT 1 FROM _migrations WHERE module = ? AND id = ?")
            .bind(module)
            .bind(migration.id)
            .fetch_optional(&mut *conn)
            .await?
            .is_some();
        if applied {
            return Ok(false);
        }

        (&mut *conn).execute(migration.up).await?;
        sqlx::query("INSERT INTO _migrations (module, id, applied_at) VALUES (?, ?, ?)")
            .bind(module)
            .bind(migration.id)
            .bind(OffsetDateTime::now_utc())
            .execute(&mut *conn)
            .await?;
        tx.finish().await?;

        tracing::info!(module, migration = migration.id, "applied migration");
        Ok(true)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// Write transaction on a dedicated pooled connection.
///
/// `conn` is `None` once the transaction has committed. Dropping an open
/// transaction rolls it back before the connection goes back to the pool.
struct SqliteTransaction {
    conn: Option<PoolConnection<Sqlite>>,
}

impl SqliteTransaction {
    async fn begin(pool: &SqlitePool) -> StoreResult<Self> {
        let mut conn = pool.acquire().await?;
        (&mut *conn).execute("BEGIN IMMEDIATE").await?;
        Ok(Self { conn: Some(conn) })
    }

    fn connection(&mut self) -> StoreResult<&mut SqliteConnection> {
        self.conn.as_deref_mut().ok_or(StoreError::Finished)
    }

    async fn finish(&mut self) -> StoreResult<()> {
        self.connection()?.execute("COMMIT").await?;
        self.conn = None;
        Ok(())
    }

    async fn stored_version(&mut self, id: BookId) -> StoreResult<Option<i64>> {
        let row = sqlx::query("SELECT version FROM books WHERE id = ?")
            .bind(id.get())
            .fetch_optional(self.connection()?)
            .await?;
        Ok(row.map(|row| row.try_get("version")).transpose()?)
    }
}

#[async_trait]
impl BookTransaction for SqliteTransaction {
    async fn find_by_id(&mut self, id: BookId) -> StoreResult<Option<Book>> {
        let row = sqlx::query(&format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = ?"))
            .bind(id.get())
            .fetch_optional(self.connection()?)
            .await?;
        Ok(row.as_ref().map(book_from_row).transpose()?)
    }

    async fn save(&mut self, book: Book) -> StoreResult<Book> {
        let now = OffsetDateTime::now_utc();

        let id = match book.id {
            None => {
                let result = sqlx::query(
                    r#"
                    INSERT INTO books (version, title, author, price, isbn, created_at, updated_at)
                    VALUES (0, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(&book.title)
                .bind(&book.author)
                .bind(book.price)
                .bind(&book.isbn)
                .bind(now)
                .bind(now)
                .execute(self.connection()?)
                .await?;
                BookId(result.last_insert_rowid())
            }
            Some(id) => {
                let result = sqlx::query(
                    r#"
                    UPDATE books
                    SET version = version + 1, title = ?, author = ?, price = ?, isbn = ?, updated_at = ?
                    WHERE id = ? AND version = ?
                    "#,
                )
                .bind(&book.title)
                .bind(&book.author)
                .bind(book.price)
                .bind(&book.isbn)
                .bind(now)
                .bind(id.get())
                .bind(book.version)
                .execute(self.connection()?)
                .await?;

                if result.rows_affected() == 0 {
                    return Err(match self.stored_version(id).await? {
                        None => StoreError::NotFound { id },
                        Some(actual) => StoreError::Conflict {
                            id,
                            expected: book.version,
                            actual,
                        },
                    });
                }
                id
            }
        };

        self.find_by_id(id)
            .await?
            .ok_or(StoreError::NotFound { id })
    }

    async fn delete(&mut self, id: BookId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id.get())
            .execute(self.connection()?)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound { id });
        }
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> StoreResult<()> {
        self.finish().await
    }
}

impl Drop for SqliteTransaction {
    fn drop(&mut self) {
        let Some(mut conn) = self.conn.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(err) = (&mut *conn).execute("ROLLBACK").await {
                        tracing::warn!(error = %err, "rollback failed; discarding connection");
                        drop(conn.detach());
                    }
                });
            }
            // Closing the connection discards the open transaction.
            Err(_) => drop(conn.detach()),
        }
    }
}
