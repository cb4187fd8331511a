use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use bookshelf_db::{BookStore, StoreModule};
use bookshelf_kernel::settings::Settings;
use bookshelf_kernel::{InitCtx, ModuleRegistry};

use crate::modules;
use crate::modules::books::service::BookService;

/// A wired bookshelf instance: one store, one service and the registry of
/// modules built over them.
pub struct Application {
    settings: Settings,
    store: Arc<dyn BookStore>,
    service: Arc<BookService>,
    registry: ModuleRegistry,
}

impl Application {
    /// Open the configured store and register the core and custom modules.
    pub async fn build(settings: Settings) -> anyhow::Result<Self> {
        let store = bookshelf_db::connect(&settings.database).await?;
        let service = Arc::new(BookService::new(store.clone()));

        let mut registry = ModuleRegistry::new();
        registry.register_core(Arc::new(StoreModule::new(store.clone())));
        modules::register_all(&mut registry, service.clone(), settings.pagination.clone());

        tracing::info!(
            core = registry.core_module_count(),
            custom = registry.custom_module_count(),
            "modules registered"
        );

        Ok(Self {
            settings,
            store,
            service,
            registry,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn service(&self) -> &Arc<BookService> {
        &self.service
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn router(&self) -> Router {
        bookshelf_http::build_router(&self.registry, &self.settings)
    }

    /// Apply every pending module migration. Returns how many ran.
    pub async fn migrate(&self) -> anyhow::Result<usize> {
        let mut applied = 0;
        for (module, migration) in self.registry.collect_migrations() {
            let ran = self
                .store
                .apply_migration(&module, &migration)
                .await
                .with_context(|| format!("migration {module}/{} failed", migration.id))?;
            if ran {
                tracing::debug!(module = %module, migration = migration.id, "migration applied");
                applied += 1;
            }
        }
        tracing::info!(applied, "migrations complete");
        Ok(applied)
    }

    /// Init all modules, migrate, then start them.
    pub async fn start(&self) -> anyhow::Result<()> {
        let ctx = InitCtx {
            settings: &self.settings,
        };
        self.registry.init_core_modules(&ctx).await?;
        self.registry.init_custom_modules(&ctx).await?;
        self.migrate().await?;
        self.registry.start_core_modules(&ctx).await?;
        self.registry.start_custom_modules(&ctx).await?;
        Ok(())
    }

    /// Stop custom modules, then core modules.
    pub async fn stop(&self) -> anyhow::Result<()> {
        self.registry.stop_custom_modules().await?;
        self.registry.stop_core_modules().await
    }

    /// Start everything, serve HTTP until Ctrl-C, then stop.
    pub async fn serve(self) -> anyhow::Result<()> {
        self.start().await?;

        let served =
            bookshelf_http::start_server(&self.registry, &self.settings, shutdown_signal()).await;

        self.stop().await?;
        served
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown signal received"),
        Err(err) => tracing::error!(error = %err, "failed to listen for shutdown signal"),
    }
}
