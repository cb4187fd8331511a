//! Book persistence: the [`BookStore`] contract and its backends.

pub mod error;
pub mod memory;
pub mod model;
pub mod module;
pub mod sqlite;
pub mod store;

use std::sync::Arc;

use anyhow::Context;
use bookshelf_kernel::settings::{DatabaseBackend, DatabaseSettings};

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryBookStore;
pub use model::{Book, BookId};
pub use module::StoreModule;
pub use sqlite::SqliteBookStore;
pub use store::{BookStore, BookTransaction};

/// Open the configured book store.
pub async fn connect(settings: &DatabaseSettings) -> anyhow::Result<Arc<dyn BookStore>> {
    let store: Arc<dyn BookStore> = match settings.backend {
        DatabaseBackend::Memory => Arc::new(InMemoryBookStore::new()),
        DatabaseBackend::Sqlite => Arc::new(
            SqliteBookStore::connect(&settings.url, settings.max_connections)
                .await
                .with_context(|| format!("failed to open sqlite store at '{}'", settings.url))?,
        ),
    };

    tracing::info!(target: "bookshelf-db", backend = store.backend(), "book store ready");
    Ok(store)
}
