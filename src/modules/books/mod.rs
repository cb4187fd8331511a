pub mod mapper;
pub mod messages;
pub mod models;
pub mod pagination;
pub mod routes;
pub mod service;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use bookshelf_kernel::settings::PaginationSettings;
use bookshelf_kernel::{InitCtx, Module};
use serde_json::json;

use routes::BooksState;
use service::BookService;

/// Book catalog: grid paging, the edit form and deletes.
///
/// The schema belongs to the store, so this module contributes no
/// migrations.
pub struct BooksModule {
    service: Arc<BookService>,
    pagination: PaginationSettings,
}

impl BooksModule {
    pub fn new(service: Arc<BookService>, pagination: PaginationSettings) -> Self {
        Self {
            service,
            pagination,
        }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            default_page_size = self.pagination.default_page_size,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(BooksState {
            service: self.service.clone(),
            pagination: self.pagination.clone(),
        })
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(openapi_fragment())
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let books = self.service.count_books().await?;
        tracing::info!(module = self.name(), books, "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

fn error_response(description: &str) -> serde_json::Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/ErrorResponse" }
            }
        }
    })
}

fn json_response(description: &str, schema: serde_json::Value) -> serde_json::Value {
    json!({
        "description": description,
        "content": { "application/json": { "schema": schema } }
    })
}

fn openapi_fragment() -> serde_json::Value {
    let window = json!([
        { "name": "offset", "in": "query", "schema": { "type": "integer", "minimum": 0 } },
        { "name": "limit", "in": "query", "schema": { "type": "integer", "minimum": 1 } },
        {
            "name": "sort",
            "in": "query",
            "description": "Comma separated `field[:asc|desc]` list; accepted but not applied",
            "schema": { "type": "string" }
        }
    ]);

    json!({
        "paths": {
            "/": {
                "get": {
                    "summary": "Load one page of the book grid",
                    "tags": ["Books"],
                    "parameters": window,
                    "responses": {
                        "200": json_response("Page of books", json!({ "$ref": "#/components/schemas/BookPage" })),
                        "400": error_response("Invalid page window"),
                        "500": error_response("Internal server error")
                    }
                },
                "post": {
                    "summary": "Create or update a book",
                    "tags": ["Books"],
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": {
                                "schema": { "$ref": "#/components/schemas/BookDto" }
                            }
                        }
                    },
                    "responses": {
                        "200": json_response("Book updated", json!({ "$ref": "#/components/schemas/SavedBook" })),
                        "201": json_response("Book created", json!({ "$ref": "#/components/schemas/SavedBook" })),
                        "404": error_response("Book to update does not exist"),
                        "409": error_response("Book was modified by another user"),
                        "422": error_response("Form validation failed"),
                        "500": error_response("Internal server error")
                    }
                }
            },
            "/all": {
                "get": {
                    "summary": "List every book",
                    "tags": ["Books"],
                    "responses": {
                        "200": json_response("All books", json!({
                            "type": "array",
                            "items": { "$ref": "#/components/schemas/BookDto" }
                        })),
                        "500": error_response("Internal server error")
                    }
                }
            },
            "/rows/{key}": {
                "get": {
                    "summary": "Resolve a row key on one page",
                    "tags": ["Books"],
                    "parameters": [
                        { "name": "key", "in": "path", "required": true, "schema": { "type": "string" } },
                        { "name": "offset", "in": "query", "schema": { "type": "integer", "minimum": 0 } },
                        { "name": "limit", "in": "query", "schema": { "type": "integer", "minimum": 1 } }
                    ],
                    "responses": {
                        "200": json_response("Row on the page", json!({ "$ref": "#/components/schemas/BookDto" })),
                        "404": error_response("Key is not on the page")
                    }
                }
            },
            "/{id}": {
                "delete": {
                    "summary": "Delete a book",
                    "tags": ["Books"],
                    "parameters": [
                        { "name": "id", "in": "path", "required": true, "schema": { "type": "integer" } }
                    ],
                    "responses": {
                        "200": json_response("Book removed", json!({
                            "type": "object",
                            "properties": { "message": { "$ref": "#/components/schemas/UserMessage" } }
                        })),
                        "400": error_response("Id is not a number"),
                        "404": error_response("Book does not exist"),
                        "500": error_response("Internal server error")
                    }
                }
            },
            "/health": {
                "get": {
                    "summary": "Books health check",
                    "tags": ["Books"],
                    "responses": {
                        "200": {
                            "description": "OK",
                            "content": { "text/plain": { "schema": { "type": "string" } } }
                        }
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "BookDto": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "integer", "nullable": true },
                        "version": {
                            "type": "integer",
                            "nullable": true,
                            "description": "Version the caller last read"
                        },
                        "title": { "type": "string", "minLength": 2, "maxLength": 100 },
                        "author": { "type": "string" },
                        "price": { "type": "number", "minimum": 0 },
                        "isbn": { "type": "string", "pattern": "^[0-9]{13}$", "nullable": true }
                    },
                    "required": ["title", "author", "price"]
                },
                "BookPage": {
                    "type": "object",
                    "properties": {
                        "total": { "type": "integer" },
                        "offset": { "type": "integer" },
                        "limit": { "type": "integer" },
                        "rows": { "type": "array", "items": { "$ref": "#/components/schemas/BookDto" } }
                    },
                    "required": ["total", "offset", "limit", "rows"]
                },
                "SavedBook": {
                    "type": "object",
                    "properties": {
                        "book": { "$ref": "#/components/schemas/BookDto" },
                        "message": { "$ref": "#/components/schemas/UserMessage" }
                    },
                    "required": ["book", "message"]
                },
                "UserMessage": {
                    "type": "object",
                    "properties": {
                        "severity": { "type": "string", "enum": ["info", "warn", "error"] },
                        "summary": { "type": "string" },
                        "detail": { "type": "string" }
                    },
                    "required": ["severity", "summary", "detail"]
                }
            }
        }
    })
}

/// Build the books module over a shared service.
pub fn create_module(service: Arc<BookService>, pagination: PaginationSettings) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(service, pagination))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookshelf_db::InMemoryBookStore;
    use bookshelf_kernel::settings::Settings;

    fn module() -> BooksModule {
        let service = BookService::new(Arc::new(InMemoryBookStore::new()));
        BooksModule::new(Arc::new(service), PaginationSettings::default())
    }

    #[test]
    fn documents_every_route() {
        let spec = module().openapi().unwrap();
        let paths = spec["paths"].as_object().unwrap();

        for path in ["/", "/all", "/rows/{key}", "/{id}", "/health"] {
            assert!(paths.contains_key(path), "missing {path}");
        }
        assert!(spec["components"]["schemas"]["BookDto"].is_object());
    }

    #[tokio::test]
    async fn lifecycle_runs_without_migrations() {
        let module = module();
        let settings = Settings::default();
        let ctx = InitCtx {
            settings: &settings,
        };

        assert!(module.migrations().is_empty());
        module.init(&ctx).await.unwrap();
        module.start(&ctx).await.unwrap();
        module.stop().await.unwrap();
    }
}
