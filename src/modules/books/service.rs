use std::sync::Arc;

use bookshelf_db::{BookId, BookStore, StoreError};
use thiserror::Error;

use super::mapper;
use super::models::BookDto;

#[derive(Error, Debug)]
pub enum BookError {
    #[error("Book not found with ID: {0}")]
    NotFound(BookId),

    #[error("book {id} was modified by another session (expected version {expected}, found {actual})")]
    Conflict {
        id: BookId,
        expected: i64,
        actual: i64,
    },

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for BookError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { id } => BookError::NotFound(id),
            StoreError::Conflict {
                id,
                expected,
                actual,
            } => BookError::Conflict {
                id,
                expected,
                actual,
            },
            other => BookError::Store(other),
        }
    }
}

pub type BookResult<T> = Result<T, BookError>;

/// Book use cases over a shared [`BookStore`].
///
/// Writes run lookup, merge and persist inside one store transaction.
#[derive(Clone)]
pub struct BookService {
    store: Arc<dyn BookStore>,
}

impl BookService {
    pub fn new(store: Arc<dyn BookStore>) -> Self {
        Self { store }
    }

    pub async fn get_all_books(&self) -> BookResult<Vec<BookDto>> {
        tracing::debug!("fetching all books");
        let books = self.store.find_all().await?;
        Ok(books.iter().map(mapper::to_dto).collect())
    }

    pub async fn get_books(&self, offset: u64, limit: u64) -> BookResult<Vec<BookDto>> {
        tracing::debug!(offset, limit, "fetching books page");
        let books = self.store.find_range(offset, limit).await?;
        Ok(books.iter().map(mapper::to_dto).collect())
    }

    pub async fn count_books(&self) -> BookResult<u64> {
        Ok(self.store.count().await?)
    }

    /// Load one book for editing.
    pub async fn get_book(&self, id: BookId) -> BookResult<BookDto> {
        self.store
            .find_by_id(id)
            .await?
            .map(|book| mapper::to_dto(&book))
            .ok_or(BookError::NotFound(id))
    }

    /// Create when `dto.id` is absent, otherwise update the stored book.
    pub async fn save_book(&self, dto: &BookDto) -> BookResult<BookDto> {
        tracing::info!(title = %dto.title, "saving book");
        let mut tx = self.store.begin().await?;

        let book = match dto.id {
            Some(id) => {
                tracing::debug!(book_id = %id, "updating existing book");
                let mut book = tx.find_by_id(id).await?.ok_or_else(|| {
                    tracing::error!(book_id = %id, "book not found");
                    BookError::NotFound(id)
                })?;
                mapper::update_entity_from_dto(dto, &mut book);
                // The store checks the version the caller last read.
                if let Some(version) = dto.version {
                    book.version = version;
                }
                book
            }
            None => {
                tracing::debug!("creating new book");
                mapper::to_entity(dto)
            }
        };

        let saved = tx.save(book).await?;
        tx.commit().await?;

        tracing::info!(
            book_id = ?saved.id,
            version = saved.version,
            "book saved successfully"
        );
        Ok(mapper::to_dto(&saved))
    }

    pub async fn delete_book(&self, id: BookId) -> BookResult<()> {
        tracing::info!(book_id = %id, "deleting book");
        let mut tx = self.store.begin().await?;

        if tx.find_by_id(id).await?.is_none() {
            tracing::error!(book_id = %id, "book not found");
            return Err(BookError::NotFound(id));
        }
        tx.delete(id).await?;
        tx.commit().await?;

        tracing::info!(book_id = %id, "book deleted successfully");
        Ok(())
    }
}
