//! Lazy data-grid model: page count and page contents are fetched
//! independently, on demand.
//!
//! Sort and filter criteria are accepted so grid clients can send them, but
//! they are not applied yet; every page comes back in store order.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Serialize;

use super::models::BookDto;
use super::service::{BookResult, BookService};

const FILTER_PREFIX: &str = "filter.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortMeta {
    pub field: String,
    pub order: SortOrder,
}

impl SortMeta {
    /// Parse `title:desc,author` into sort criteria; the order defaults to
    /// ascending and blank entries are skipped.
    pub fn parse_list(spec: &str) -> Vec<SortMeta> {
        spec.split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                let (field, order) = match entry.split_once(':') {
                    Some((field, order)) => (field.trim(), order.trim()),
                    None => (entry, ""),
                };
                let order = if order.eq_ignore_ascii_case("desc") {
                    SortOrder::Descending
                } else {
                    SortOrder::Ascending
                };
                SortMeta {
                    field: field.to_string(),
                    order,
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterMeta {
    pub field: String,
    pub value: String,
}

/// Filter criteria keyed by field.
pub type FilterMap = BTreeMap<String, FilterMeta>;

/// Collect `filter.<field>=<value>` query parameters.
pub fn filters_from_query(params: &HashMap<String, String>) -> FilterMap {
    params
        .iter()
        .filter_map(|(key, value)| {
            let field = key.strip_prefix(FILTER_PREFIX)?;
            if field.is_empty() {
                return None;
            }
            Some((
                field.to_string(),
                FilterMeta {
                    field: field.to_string(),
                    value: value.clone(),
                },
            ))
        })
        .collect()
}

/// Grid-facing view over [`BookService`] that remembers the last loaded page.
pub struct LazyBookModel {
    service: Arc<BookService>,
    page: Vec<BookDto>,
}

impl LazyBookModel {
    pub fn new(service: Arc<BookService>) -> Self {
        Self {
            service,
            page: Vec::new(),
        }
    }

    /// Total number of rows. Filters are not applied yet.
    pub async fn row_count(&self, filters: &FilterMap) -> BookResult<u64> {
        if !filters.is_empty() {
            tracing::debug!(filters = filters.len(), "filter criteria are not applied");
        }
        self.service.count_books().await
    }

    /// Fetch one page and make it the current page. Sort and filters are not
    /// applied yet.
    pub async fn load_page(
        &mut self,
        offset: u64,
        limit: u64,
        sort: &[SortMeta],
        filters: &FilterMap,
    ) -> BookResult<&[BookDto]> {
        if !sort.is_empty() || !filters.is_empty() {
            tracing::debug!(
                sort = sort.len(),
                filters = filters.len(),
                "sort and filter criteria are not applied"
            );
        }
        self.page = self.service.get_books(offset, limit).await?;
        Ok(self.page.as_slice())
    }

    /// Stable key of a row: its id, or `"null"` for an unsaved book.
    pub fn row_key(dto: &BookDto) -> String {
        dto.id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "null".to_string())
    }

    /// Find `key` on the current page only. Rows of other pages are not
    /// looked up.
    pub fn resolve_row(&self, key: &str) -> Option<&BookDto> {
        self.page.iter().find(|dto| Self::row_key(dto) == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookshelf_db::{BookId, InMemoryBookStore};

    async fn model_with_books(count: usize) -> LazyBookModel {
        let service = Arc::new(BookService::new(Arc::new(InMemoryBookStore::new())));
        for n in 0..count {
            service
                .save_book(&BookDto {
                    title: format!("Book {n}"),
                    author: "Test Author".to_string(),
                    price: Some(n as f64),
                    ..BookDto::default()
                })
                .await
                .unwrap();
        }
        LazyBookModel::new(service)
    }

    #[tokio::test]
    async fn counts_and_loads_pages() {
        let mut model = model_with_books(5).await;

        assert_eq!(model.row_count(&FilterMap::new()).await.unwrap(), 5);

        let page = model.load_page(2, 2, &[], &FilterMap::new()).await.unwrap();
        let titles: Vec<_> = page.iter().map(|dto| dto.title.as_str()).collect();
        assert_eq!(titles, vec!["Book 2", "Book 3"]);
    }

    #[tokio::test]
    async fn sort_and_filters_do_not_change_results() {
        let mut model = model_with_books(3).await;
        let sort = SortMeta::parse_list("title:desc");
        let mut params = HashMap::new();
        params.insert("filter.author".to_string(), "Nobody".to_string());
        let filters = filters_from_query(&params);

        assert_eq!(model.row_count(&filters).await.unwrap(), 3);
        let page = model.load_page(0, 10, &sort, &filters).await.unwrap();
        assert_eq!(page.len(), 3);
        assert_eq!(page[0].title, "Book 0");
    }

    #[tokio::test]
    async fn resolves_rows_on_the_current_page_only() {
        let mut model = model_with_books(4).await;
        model.load_page(0, 2, &[], &FilterMap::new()).await.unwrap();

        assert_eq!(model.resolve_row("2").unwrap().title, "Book 1");
        assert!(model.resolve_row("3").is_none());
        assert!(model.resolve_row("not-a-key").is_none());

        model.load_page(2, 2, &[], &FilterMap::new()).await.unwrap();
        assert!(model.resolve_row("2").is_none());
        assert_eq!(model.resolve_row("3").unwrap().title, "Book 2");
    }

    #[test]
    fn row_key_is_the_id() {
        let saved = BookDto {
            id: Some(BookId(12)),
            ..BookDto::default()
        };
        assert_eq!(LazyBookModel::row_key(&saved), "12");
        assert_eq!(LazyBookModel::row_key(&BookDto::default()), "null");
    }

    #[test]
    fn parses_sort_specs() {
        assert_eq!(
            SortMeta::parse_list("title:desc, author ,,price:ASC"),
            vec![
                SortMeta {
                    field: "title".to_string(),
                    order: SortOrder::Descending
                },
                SortMeta {
                    field: "author".to_string(),
                    order: SortOrder::Ascending
                },
                SortMeta {
                    field: "price".to_string(),
                    order: SortOrder::Ascending
                },
            ]
        );
        assert!(SortMeta::parse_list("").is_empty());
    }

    #[test]
    fn collects_prefixed_filters_only() {
        let mut params = HashMap::new();
        params.insert("filter.title".to_string(), "Rust".to_string());
        params.insert("filter.".to_string(), "ignored".to_string());
        params.insert("offset".to_string(), "10".to_string());

        let filters = filters_from_query(&params);

        assert_eq!(filters.len(), 1);
        assert_eq!(filters["title"].value, "Rust");
    }
}
