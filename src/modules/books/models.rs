use bookshelf_db::BookId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const TITLE_MIN_CHARS: usize = 2;
const TITLE_MAX_CHARS: usize = 100;
const ISBN_DIGITS: usize = 13;

/// Boundary shape of a book exchanged with forms and the data grid.
///
/// `version` echoes the version the caller last read; it is absent for a
/// book that has not been saved yet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookDto {
    #[serde(default)]
    pub id: Option<BookId>,
    #[serde(default)]
    pub version: Option<i64>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub isbn: Option<String>,
}

/// One violated field constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

/// Every constraint a submitted form violates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} field(s) failed validation", .0.len())]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    pub fn fields(&self) -> &[FieldError] {
        &self.0
    }

    pub fn message_for(&self, field: &str) -> Option<&'static str> {
        self.0
            .iter()
            .find(|error| error.field == field)
            .map(|error| error.message)
    }
}

impl BookDto {
    /// Check the form constraints, collecting every violation.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = Vec::new();
        let mut reject = |field, message| errors.push(FieldError { field, message });

        if self.title.trim().is_empty() {
            reject("title", "Title is required");
        } else {
            let chars = self.title.chars().count();
            if !(TITLE_MIN_CHARS..=TITLE_MAX_CHARS).contains(&chars) {
                reject("title", "Title must be between 2 and 100 characters");
            }
        }

        if self.author.trim().is_empty() {
            reject("author", "Author is required");
        }

        match self.price {
            None => reject("price", "Price is required"),
            Some(price) if !price.is_finite() => reject("price", "Price must be a number"),
            Some(price) if price < 0.0 => reject("price", "Price cannot be negative"),
            Some(_) => {}
        }

        if let Some(isbn) = &self.isbn {
            if isbn.len() != ISBN_DIGITS || !isbn.bytes().all(|b| b.is_ascii_digit()) {
                reject("isbn", "ISBN must be exactly 13 digits");
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors(errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> BookDto {
        BookDto {
            id: None,
            version: None,
            title: "Test Book".to_string(),
            author: "Test Author".to_string(),
            price: Some(10.0),
            isbn: Some("1234567890123".to_string()),
        }
    }

    #[test]
    fn accepts_a_complete_form() {
        assert_eq!(valid().validate(), Ok(()));
        assert_eq!(
            BookDto {
                isbn: None,
                price: Some(0.0),
                ..valid()
            }
            .validate(),
            Ok(())
        );
    }

    #[test]
    fn reports_every_violated_field() {
        let errors = BookDto::default().validate().unwrap_err();

        assert_eq!(errors.message_for("title"), Some("Title is required"));
        assert_eq!(errors.message_for("author"), Some("Author is required"));
        assert_eq!(errors.message_for("price"), Some("Price is required"));
        assert_eq!(errors.message_for("isbn"), None);
        assert_eq!(errors.fields().len(), 3);
    }

    #[test]
    fn title_length_counts_characters() {
        let short = BookDto {
            title: "A".to_string(),
            ..valid()
        };
        let long = BookDto {
            title: "x".repeat(101),
            ..valid()
        };
        let accented = BookDto {
            title: "é".repeat(100),
            ..valid()
        };

        assert_eq!(
            short.validate().unwrap_err().message_for("title"),
            Some("Title must be between 2 and 100 characters")
        );
        assert!(long.validate().is_err());
        assert!(accented.validate().is_ok());
    }

    #[test]
    fn rejects_negative_or_non_finite_price() {
        let negative = BookDto {
            price: Some(-0.01),
            ..valid()
        };
        let nan = BookDto {
            price: Some(f64::NAN),
            ..valid()
        };

        assert_eq!(
            negative.validate().unwrap_err().message_for("price"),
            Some("Price cannot be negative")
        );
        assert!(nan.validate().is_err());
    }

    #[test]
    fn isbn_must_be_thirteen_digits() {
        for isbn in ["123456789012", "12345678901234", "123456789012X", ""] {
            let dto = BookDto {
                isbn: Some(isbn.to_string()),
                ..valid()
            };
            assert_eq!(
                dto.validate().unwrap_err().message_for("isbn"),
                Some("ISBN must be exactly 13 digits"),
                "isbn {isbn:?}"
            );
        }
    }

    #[test]
    fn deserializes_partial_json() {
        let dto: BookDto =
            serde_json::from_str(r#"{"id": 1, "version": 3, "title": "Updated"}"#).unwrap();

        assert_eq!(dto.id, Some(BookId(1)));
        assert_eq!(dto.version, Some(3));
        assert_eq!(dto.title, "Updated");
        assert_eq!(dto.price, None);
    }
}
