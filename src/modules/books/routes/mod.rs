//! HTTP handlers for the book grid and form.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use bookshelf_db::BookId;
use bookshelf_http::AppError;
use bookshelf_kernel::settings::PaginationSettings;
use serde::Serialize;

use super::messages::UserMessage;
use super::models::BookDto;
use super::pagination::{filters_from_query, LazyBookModel, SortMeta};
use super::service::BookService;

#[derive(Clone)]
pub struct BooksState {
    pub service: Arc<BookService>,
    pub pagination: PaginationSettings,
}

#[derive(Debug, Serialize)]
pub struct PageResponse {
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
    pub rows: Vec<BookDto>,
}

#[derive(Debug, Serialize)]
pub struct SavedResponse {
    pub book: BookDto,
    pub message: UserMessage,
}

#[derive(Debug, Serialize)]
pub struct RemovedResponse {
    pub message: UserMessage,
}

pub fn router(state: BooksState) -> Router {
    Router::new()
        .route("/", get(list_books).post(save_book))
        .route("/all", get(all_books))
        .route("/rows/{key}", get(resolve_row))
        .route("/{id}", delete(delete_book))
        .route("/health", get(health_check))
        .with_state(state)
}

/// Read `offset` and `limit` from the query, applying the configured page
/// size rules.
fn page_window(
    params: &HashMap<String, String>,
    pagination: &PaginationSettings,
) -> Result<(u64, u64), AppError> {
    let offset = match params.get("offset") {
        Some(raw) => raw
            .parse::<u64>()
            .map_err(|_| AppError::bad_request(format!("invalid offset '{raw}'")))?,
        None => 0,
    };
    let limit = match params.get("limit") {
        Some(raw) => raw
            .parse::<u64>()
            .map_err(|_| AppError::bad_request(format!("invalid limit '{raw}'")))?,
        None => pagination.default_page_size,
    };
    if limit == 0 {
        return Err(AppError::bad_request("limit must be greater than zero"));
    }
    Ok((offset, limit.min(pagination.max_page_size)))
}

fn sort_from_query(params: &HashMap<String, String>) -> Vec<SortMeta> {
    params
        .get("sort")
        .map(|raw| SortMeta::parse_list(raw))
        .unwrap_or_default()
}

async fn list_books(
    State(state): State<BooksState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<PageResponse>, AppError> {
    let (offset, limit) = page_window(&params, &state.pagination)?;
    let sort = sort_from_query(&params);
    let filters = filters_from_query(&params);

    let mut model = LazyBookModel::new(state.service.clone());
    let total = model.row_count(&filters).await?;
    let rows = model.load_page(offset, limit, &sort, &filters).await?.to_vec();

    Ok(Json(PageResponse {
        total,
        offset,
        limit,
        rows,
    }))
}

async fn all_books(State(state): State<BooksState>) -> Result<Json<Vec<BookDto>>, AppError> {
    Ok(Json(state.service.get_all_books().await?))
}

async fn resolve_row(
    State(state): State<BooksState>,
    Path(key): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<BookDto>, AppError> {
    let (offset, limit) = page_window(&params, &state.pagination)?;

    let mut model = LazyBookModel::new(state.service.clone());
    model
        .load_page(offset, limit, &[], &filters_from_query(&params))
        .await?;

    model
        .resolve_row(&key)
        .cloned()
        .map(Json)
        .ok_or_else(|| {
            AppError::not_found(format!("row '{key}' is not on the page at offset {offset}"))
        })
}

async fn save_book(
    State(state): State<BooksState>,
    Json(dto): Json<BookDto>,
) -> Result<(StatusCode, Json<SavedResponse>), AppError> {
    dto.validate()?;

    let creating = dto.id.is_none();
    let book = state.service.save_book(&dto).await?;
    let status = if creating {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((
        status,
        Json(SavedResponse {
            book,
            message: UserMessage::saved(),
        }),
    ))
}

async fn delete_book(
    State(state): State<BooksState>,
    Path(raw): Path<String>,
) -> Result<Json<RemovedResponse>, AppError> {
    let id: BookId = raw
        .parse()
        .map_err(|_| AppError::bad_request(format!("invalid book id '{raw}'")))?;
    state.service.delete_book(id).await?;
    Ok(Json(RemovedResponse {
        message: UserMessage::removed(),
    }))
}

async fn health_check() -> &'static str {
    "books module is healthy"
}
