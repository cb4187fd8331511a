//! User-facing messages and the translation of book errors into them.

use bookshelf_http::AppError;
use serde::Serialize;
use serde_json::json;

use super::models::ValidationErrors;
use super::service::BookError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warn,
    Error,
}

/// A (summary, detail) notice shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserMessage {
    pub severity: Severity,
    pub summary: String,
    pub detail: String,
}

impl UserMessage {
    pub fn new(severity: Severity, summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity,
            summary: summary.into(),
            detail: detail.into(),
        }
    }

    pub fn info(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(Severity::Info, summary, detail)
    }

    pub fn warn(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(Severity::Warn, summary, detail)
    }

    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(Severity::Error, summary, detail)
    }

    pub fn saved() -> Self {
        Self::info("Success", "Book Saved")
    }

    pub fn removed() -> Self {
        Self::warn("Deleted", "Book Removed")
    }
}

/// The message a failed save or delete shows.
pub fn classify(err: &BookError) -> UserMessage {
    match err {
        BookError::Conflict { .. } => UserMessage::error(
            "Conflict",
            "The record was modified by another user. Please reload and try again.",
        ),
        BookError::NotFound(_) => UserMessage::error("Error", err.to_string()),
        BookError::Store(_) => UserMessage::error("Error", "An unexpected error occurred."),
    }
}

impl From<BookError> for AppError {
    fn from(err: BookError) -> Self {
        let message = classify(&err);
        match err {
            BookError::Conflict {
                id,
                expected,
                actual,
            } => {
                tracing::error!(
                    book_id = %id,
                    expected,
                    actual,
                    "optimistic lock conflict detected"
                );
                AppError::conflict(vec![json!(message)], message.detail)
            }
            BookError::NotFound(id) => {
                tracing::warn!(book_id = %id, "book not found");
                AppError::not_found_with(vec![json!(message)], message.detail)
            }
            BookError::Store(source) => {
                AppError::Internal(anyhow::Error::new(source).context("book store failure"))
            }
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let details = errors
            .fields()
            .iter()
            .map(|error| json!(error))
            .collect();
        AppError::validation(details, "The submitted book is invalid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use bookshelf_db::{BookId, StoreError};

    #[test]
    fn conflict_asks_for_reload() {
        let err = BookError::Conflict {
            id: BookId(1),
            expected: 0,
            actual: 1,
        };

        let message = classify(&err);
        assert_eq!(message.severity, Severity::Error);
        assert_eq!(message.summary, "Conflict");
        assert!(message.detail.contains("reload"));

        assert_eq!(AppError::from(err).status(), StatusCode::CONFLICT);
    }

    #[test]
    fn not_found_carries_the_id() {
        let err = BookError::NotFound(BookId(7));

        assert_eq!(classify(&err).detail, "Book not found with ID: 7");
        assert_eq!(AppError::from(err).status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn store_failures_are_generic() {
        let err = BookError::Store(StoreError::Database(sqlx_pool_closed()));

        assert_eq!(classify(&err).detail, "An unexpected error occurred.");
        assert_eq!(
            AppError::from(err).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    fn sqlx_pool_closed() -> bookshelf_db::sqlite::SqlxError {
        bookshelf_db::sqlite::SqlxError::PoolClosed
    }

    #[test]
    fn severities_serialize_lowercase() {
        let value = serde_json::to_value(UserMessage::removed()).unwrap();
        assert_eq!(
            value,
            json!({"severity": "warn", "summary": "Deleted", "detail": "Book Removed"})
        );
    }
}
