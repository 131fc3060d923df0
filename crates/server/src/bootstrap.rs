use std::sync::Arc;

use sachet_agent::{build_client, CustomerAnalyst};
use sachet_core::config::{AppConfig, ConfigError, LoadOptions};
use sachet_db::{connect_with_settings, migrations, DbPool, SqlCustomerRepository};
use thiserror::Error;
use tracing::info;

use crate::api::ApiState;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub api: ApiState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("llm client initialisation failed: {0}")]
    LlmClient(String),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        llm_provider = ?config.llm.provider,
        "starting application bootstrap"
    );

    // Template problems surface here rather than on the first analysis request.
    let template = config.analytics.prompt_template()?;
    let client = build_client(&config.llm)
        .map_err(|error| BootstrapError::LlmClient(format!("{error:#}")))?;

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let analyst = CustomerAnalyst::new(client, config.analytics.segment_rules())
        .with_template(template);
    let api = ApiState::new(
        Arc::new(SqlCustomerRepository::new(db_pool.clone())),
        Arc::new(analyst),
        config.analytics.summary_options(),
    );

    Ok(Application { config, db_pool, api })
}

#[cfg(test)]
mod tests {
    use sachet_core::config::{ConfigOverrides, LoadOptions};

    use crate::bootstrap::bootstrap;

    #[tokio::test]
    async fn bootstrap_fails_fast_on_non_sqlite_database_url() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("postgres://localhost/sachet".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        let message = result.err().map(|error| error.to_string()).unwrap_or_default();
        assert!(message.contains("database.url"), "unexpected error: {message}");
    }

    #[tokio::test]
    async fn bootstrap_migrates_customer_table_without_api_key() {
        let app = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:?cache=shared".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await
        .expect("bootstrap should succeed without llm credentials");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'customer'",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("schema query");
        assert_eq!(table_count, 1, "bootstrap should leave the customer table in place");

        app.db_pool.close().await;
    }
}
