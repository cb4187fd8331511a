//! In-process book store used for local runs and tests.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::{StoreError, StoreResult};
use crate::model::{Book, BookId};
use crate::store::{BookStore, BookTransaction};

#[derive(Debug, Default)]
struct Table {
    rows: BTreeMap<BookId, Book>,
    last_id: i64,
}

impl Table {
    fn find(&self, id: BookId) -> Option<Book> {
        self.rows.get(&id).cloned()
    }

    fn save(&mut self, mut book: Book) -> StoreResult<Book> {
        let now = OffsetDateTime::now_utc();

        let id = match book.id {
            None => {
                self.last_id += 1;
                let id = BookId(self.last_id);
                book.id = Some(id);
                book.version = 0;
                book.created_at = Some(now);
                book.updated_at = Some(now);
                id
            }
            Some(id) => {
                let stored = self.rows.get(&id).ok_or(StoreError::NotFound { id })?;
                if stored.version != book.version {
                    return Err(StoreError::Conflict {
                        id,
                        expected: book.version,
                        actual: stored.version,
                    });
                }
                book.version = stored.version + 1;
                book.created_at = stored.created_at;
                book.updated_at = Some(now);
                id
            }
        };

        self.rows.insert(id, book.clone());
        Ok(book)
    }

    fn delete(&mut self, id: BookId) -> StoreResult<()> {
        self.rows
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound { id })
    }
}

/// Book table held in memory behind an async mutex.
///
/// A transaction owns the mutex for its whole lifetime, so lookups and
/// writes inside it are atomic with respect to every other session. Writes
/// go straight to the table and are undone if the transaction is dropped
/// without committing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBookStore {
    table: Arc<Mutex<Table>>,
}

impl InMemoryBookStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookStore for InMemoryBookStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn find_all(&self) -> StoreResult<Vec<Book>> {
        tracing::debug!(backend = "memory", "querying all books");
        let table = self.table.lock().await;
        Ok(table.rows.values().cloned().collect())
    }

    async fn find_range(&self, offset: u64, limit: u64) -> StoreResult<Vec<Book>> {
        tracing::debug!(backend = "memory", offset, limit, "querying book range");
        let table = self.table.lock().await;
        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(table.rows.values().skip(offset).take(limit).cloned().collect())
    }

    async fn count(&self) -> StoreResult<u64> {
        let table = self.table.lock().await;
        Ok(table.rows.len() as u64)
    }

    async fn find_by_id(&self, id: BookId) -> StoreResult<Option<Book>> {
        tracing::debug!(backend = "memory", book_id = %id, "finding book by id");
        Ok(self.table.lock().await.find(id))
    }

    async fn begin(&self) -> StoreResult<Box<dyn BookTransaction>> {
        let guard = Arc::clone(&self.table).lock_owned().await;
        let last_id = guard.last_id;
        Ok(Box::new(InMemoryTransaction {
            guard,
            last_id,
            undo: Vec::new(),
        }))
    }
}

struct InMemoryTransaction {
    guard: OwnedMutexGuard<Table>,
    /// `last_id` when the transaction began.
    last_id: i64,
    /// Prior state of every row written, oldest first.
    undo: Vec<(BookId, Option<Book>)>,
}

#[async_trait]
impl BookTransaction for InMemoryTransaction {
    async fn find_by_id(&mut self, id: BookId) -> StoreResult<Option<Book>> {
        Ok(self.guard.find(id))
    }

    async fn save(&mut self, book: Book) -> StoreResult<Book> {
        let previous = book.id.and_then(|id| self.guard.find(id));
        let saved = self.guard.save(book)?;
        if let Some(id) = saved.id {
            self.undo.push((id, previous));
        }
        Ok(saved)
    }

    async fn delete(&mut self, id: BookId) -> StoreResult<()> {
        let previous = self.guard.find(id);
        self.guard.delete(id)?;
        self.undo.push((id, previous));
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> StoreResult<()> {
        self.undo.clear();
        self.last_id = self.guard.last_id;
        Ok(())
    }
}

impl Drop for InMemoryTransaction {
    fn drop(&mut self) {
        while let Some((id, previous)) = self.undo.pop() {
            match previous {
                Some(book) => {
                    self.guard.rows.insert(id, book);
                }
                None => {
                    self.guard.rows.remove(&id);
                }
            }
        }
        self.guard.last_id = self.last_id;
    }
}
