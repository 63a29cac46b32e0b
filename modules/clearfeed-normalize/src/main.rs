use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use clearfeed_common::AppConfig;
use clearfeed_normalize::{BatchRunner, SourceRegistry};
use clearfeed_store::{migrate::migrate, PgStore};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("clearfeed_normalize=info".parse()?),
        )
        .init();

    let config = AppConfig::from_env()?;

    let store = PgStore::connect(&config.database_url).await?;
    migrate(store.pool()).await?;

    let registry = SourceRegistry::load_or_default(config.sources_path.as_deref())?;
    info!(sources = registry.len(), "Source registry loaded");

    let stats = BatchRunner::new(&store, &registry, config.page_size)
        .run()
        .await?;
    info!("Normalization batch complete. {stats}");

    Ok(())
}
