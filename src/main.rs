use anyhow::Context;
use bookshelf_app::Application;
use bookshelf_kernel::settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load bookshelf settings")?;
    bookshelf_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        env = ?settings.environment,
        backend = ?settings.database.backend,
        "bookshelf-app bootstrap starting"
    );

    let app = Application::build(settings).await?;
    app.serve().await
}
