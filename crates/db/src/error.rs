//! Error types raised by book store backends

use thiserror::Error;

use crate::model::BookId;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("book {id} does not exist")]
    NotFound { id: BookId },

    /// Optimistic-concurrency violation: the stored version moved on since
    /// the caller read the record.
    #[error("book {id} was modified concurrently (expected version {expected}, found {actual})")]
    Conflict {
        id: BookId,
        expected: i64,
        actual: i64,
    },

    #[error("transaction already finished")]
    Finished,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}
