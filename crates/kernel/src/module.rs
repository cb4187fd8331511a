use async_trait::async_trait;
use axum::Router;

/// Context handed to modules during initialization and start.
///
/// Long-lived handles such as the book store are injected when a module is
/// constructed, so the context only carries what every module shares.
pub struct InitCtx<'a> {
    pub settings: &'a crate::settings::Settings,
}

/// Schema migration contributed by a module.
#[derive(Debug, Clone)]
pub struct Migration {
    pub id: &'static str,
    pub up: &'static str,
}

/// Lifecycle contract implemented by every bookshelf module.
#[async_trait]
pub trait Module: Sync + Send {
    /// Unique name; also the mount point `/api/{name}`.
    fn name(&self) -> &'static str;

    /// Runs before any migration is applied.
    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
    }

    /// OpenAPI fragment with `paths` relative to the mount point and optional
    /// `components.schemas`.
    fn openapi(&self) -> Option<serde_json::Value> {
        None
    }

    /// Schema this module needs; ids must sort in application order.
    fn migrations(&self) -> Vec<Migration> {
        vec![]
    }

    /// Runs once every migration has been applied.
    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
