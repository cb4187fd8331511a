use async_trait::async_trait;
use bookshelf_kernel::Migration;

use crate::error::StoreResult;
use crate::model::{Book, BookId};

/// Durable owner of book records.
///
/// Reads run against committed state. Writes run inside a
/// [`BookTransaction`]; the single-write helpers `save` and `delete` open and
/// commit one on the caller's behalf.
#[async_trait]
pub trait BookStore: Send + Sync {
    /// Short backend label for logs.
    fn backend(&self) -> &'static str;

    /// Every book, ordered by id.
    async fn find_all(&self) -> StoreResult<Vec<Book>>;

    /// At most `limit` books starting at `offset`, in the same order as
    /// [`BookStore::find_all`].
    async fn find_range(&self, offset: u64, limit: u64) -> StoreResult<Vec<Book>>;

    async fn count(&self) -> StoreResult<u64>;

    async fn find_by_id(&self, id: BookId) -> StoreResult<Option<Book>>;

    /// Open a short-lived atomic transaction. Dropping it without calling
    /// [`BookTransaction::commit`] discards its writes.
    async fn begin(&self) -> StoreResult<Box<dyn BookTransaction>>;

    /// Insert or update one book in its own transaction.
    async fn save(&self, book: Book) -> StoreResult<Book> {
        let mut tx = self.begin().await?;
        let saved = tx.save(book).await?;
        tx.commit().await?;
        Ok(saved)
    }

    /// Remove one book in its own transaction.
    async fn delete(&self, id: BookId) -> StoreResult<()> {
        let mut tx = self.begin().await?;
        tx.delete(id).await?;
        tx.commit().await
    }

    /// Schema the backend needs before first use.
    fn migrations(&self) -> Vec<Migration> {
        vec![]
    }

    /// Apply a module migration once. Returns `true` when it ran now and
    /// `false` when it was already applied or the backend has no schema.
    async fn apply_migration(&self, _module: &str, _migration: &Migration) -> StoreResult<bool> {
        Ok(false)
    }

    /// Release pooled resources.
    async fn close(&self) {}
}

/// Unit of work over a [`BookStore`].
#[async_trait]
pub trait BookTransaction: Send {
    async fn find_by_id(&mut self, id: BookId) -> StoreResult<Option<Book>>;

    /// Without an id: insert, assign a fresh id, `version = 0`, stamp both
    /// timestamps. With an id: the stored version must equal `book.version`;
    /// the write bumps the version, refreshes `updated_at` and keeps the
    /// stored `created_at`.
    async fn save(&mut self, book: Book) -> StoreResult<Book>;

    /// Fails with `NotFound` when the id is not present.
    async fn delete(&mut self, id: BookId) -> StoreResult<()>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;
}
