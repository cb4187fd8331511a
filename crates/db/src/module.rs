use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use bookshelf_kernel::{InitCtx, Migration, Module};

use crate::store::BookStore;

/// Core module owning the book store's lifecycle and schema.
pub struct StoreModule {
    store: Arc<dyn BookStore>,
}

impl StoreModule {
    pub fn new(store: Arc<dyn BookStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Module for StoreModule {
    fn name(&self) -> &'static str {
        "db"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            backend = self.store.backend(),
            configured = ?ctx.settings.database.backend,
            "store module initialized"
        );
        Ok(())
    }

    fn migrations(&self) -> Vec<Migration> {
        self.store.migrations()
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let books = self
            .store
            .count()
            .await
            .context("book store is not reachable")?;
        tracing::info!(module = self.name(), books, "store module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        self.store.close().await;
        tracing::info!(module = self.name(), "store module stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{InMemoryBookStore, SqliteBookStore};
    use bookshelf_kernel::settings::Settings;

    #[tokio::test]
    async fn only_sqlite_contributes_schema() {
        let memory = StoreModule::new(Arc::new(InMemoryBookStore::new()));
        assert!(memory.migrations().is_empty());

        let sqlite = SqliteBookStore::connect("sqlite::memory:", 1).await.unwrap();
        let module = StoreModule::new(Arc::new(sqlite));
        assert_eq!(module.migrations().len(), 1);
    }

    #[tokio::test]
    async fn start_checks_connectivity() {
        let module = StoreModule::new(Arc::new(InMemoryBookStore::new()));
        let settings = Settings::default();
        let ctx = InitCtx {
            settings: &settings,
        };

        module.init(&ctx).await.unwrap();
        module.start(&ctx).await.unwrap();
        module.stop().await.unwrap();
    }
}
