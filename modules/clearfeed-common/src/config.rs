use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Contains only secrets and env-specific values; the source registry
/// lives in its own JSON document loaded at run start.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Postgres connection string.
    pub database_url: String,

    /// Explicit override for the source registry path. When unset, the
    /// default `sources.json` is tried and a missing file degrades to an
    /// empty registry; when set, a missing file is a configuration error.
    pub sources_path: Option<String>,

    /// Maximum unprocessed records fetched per page.
    pub page_size: u32,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            database_url: std::env::var("DATABASE_URL")
                .context("DATABASE_URL environment variable is required")?,
            sources_path: std::env::var("SOURCES_PATH").ok(),
            page_size: std::env::var("PAGE_SIZE")
                .unwrap_or_else(|_| "200".to_string())
                .parse()
                .context("PAGE_SIZE must be a number")?,
        };

        config.log_redacted();
        Ok(config)
    }

    fn log_redacted(&self) {
        tracing::info!("Config loaded:");
        tracing::info!("  DATABASE_URL: <set, redacted>");
        tracing::info!(
            "  SOURCES_PATH: {}",
            self.sources_path.as_deref().unwrap_or("<default: sources.json>")
        );
        tracing::info!("  PAGE_SIZE: {}", self.page_size);
    }
}
