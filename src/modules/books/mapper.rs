//! Field-by-field conversion between the stored [`Book`] and [`BookDto`].

use bookshelf_db::Book;

use super::models::BookDto;

pub fn to_dto(book: &Book) -> BookDto {
    BookDto {
        id: book.id,
        version: Some(book.version),
        title: book.title.clone(),
        author: book.author.clone(),
        price: Some(book.price),
        isbn: book.isbn.clone(),
    }
}

/// Build a fresh entity; identity, version and timestamps are left for the
/// store to assign.
pub fn to_entity(dto: &BookDto) -> Book {
    Book {
        id: None,
        version: 0,
        title: dto.title.clone(),
        author: dto.author.clone(),
        // validated forms always carry a price
        price: dto.price.unwrap_or_default(),
        isbn: dto.isbn.clone(),
        created_at: None,
        updated_at: None,
    }
}

/// Copy the editable fields onto `entity`; store-managed fields stay put.
pub fn update_entity_from_dto(dto: &BookDto, entity: &mut Book) {
    entity.title.clone_from(&dto.title);
    entity.author.clone_from(&dto.author);
    entity.price = dto.price.unwrap_or_default();
    entity.isbn.clone_from(&dto.isbn);
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookshelf_db::BookId;
    use time::OffsetDateTime;

    fn stored_book() -> Book {
        let now = OffsetDateTime::now_utc();
        Book {
            id: Some(BookId(1)),
            version: 4,
            title: "Test Title".to_string(),
            author: "Test Author".to_string(),
            price: 19.99,
            isbn: Some("1234567890123".to_string()),
            created_at: Some(now),
            updated_at: Some(now),
        }
    }

    #[test]
    fn to_dto_maps_all_fields() {
        let book = stored_book();

        let dto = to_dto(&book);

        assert_eq!(dto.id, book.id);
        assert_eq!(dto.version, Some(4));
        assert_eq!(dto.title, book.title);
        assert_eq!(dto.author, book.author);
        assert_eq!(dto.price, Some(book.price));
        assert_eq!(dto.isbn, book.isbn);
    }

    #[test]
    fn to_entity_resets_identity() {
        let dto = to_dto(&stored_book());

        let book = to_entity(&dto);

        assert_eq!(book.id, None);
        assert_eq!(book.version, 0);
        assert_eq!(book.created_at, None);
        assert_eq!(book.updated_at, None);
        assert_eq!(book.title, dto.title);
        assert_eq!(book.author, dto.author);
        assert_eq!(Some(book.price), dto.price);
        assert_eq!(book.isbn, dto.isbn);
    }

    #[test]
    fn round_trip_keeps_editable_fields() {
        let dto = BookDto {
            id: Some(BookId(7)),
            version: Some(2),
            title: "New Book".to_string(),
            author: "Someone".to_string(),
            price: Some(5.5),
            isbn: None,
        };

        let back = to_dto(&to_entity(&dto));

        assert_eq!(back.id, None);
        assert_eq!(back.version, Some(0));
        assert_eq!(back.title, dto.title);
        assert_eq!(back.author, dto.author);
        assert_eq!(back.price, dto.price);
        assert_eq!(back.isbn, dto.isbn);
    }

    #[test]
    fn update_leaves_store_managed_fields_alone() {
        let mut book = stored_book();
        let before = book.clone();
        let dto = BookDto {
            id: Some(BookId(99)),
            version: Some(0),
            title: "Updated".to_string(),
            author: "Other Author".to_string(),
            price: Some(1.0),
            isbn: None,
        };

        update_entity_from_dto(&dto, &mut book);

        assert_eq!(book.title, "Updated");
        assert_eq!(book.author, "Other Author");
        assert_eq!(book.price, 1.0);
        assert_eq!(book.isbn, None);
        assert_eq!(book.id, before.id);
        assert_eq!(book.version, before.version);
        assert_eq!(book.created_at, before.created_at);
        assert_eq!(book.updated_at, before.updated_at);
    }
}
