use std::sync::Arc;

use tipbot_agent::CleverbotClient;
use tipbot_core::config::{AppConfig, ConfigError, LoadOptions};
use tipbot_core::messages::{MessageCatalog, MessageError};
use tipbot_db::{connect_with_config, migrations, DbPool, SqlSlackUserRepository};
use tipbot_slack::CommandInterpreter;
use tipbot_tipping::{ChangeTipClient, TipError};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub interpreter: Arc<CommandInterpreter>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("tipping client setup failed: {0}")]
    Tipping(#[source] TipError),
    #[error("chat client setup failed: {0:#}")]
    Chat(anyhow::Error),
    #[error(transparent)]
    Messages(#[from] MessageError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool =
        connect_with_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
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

    let tips = ChangeTipClient::new(&config.changetip).map_err(BootstrapError::Tipping)?;
    let chat = CleverbotClient::new(&config.chat).map_err(BootstrapError::Chat)?;
    let messages = MessageCatalog::new(config.messages.info_url.clone())?;

    let interpreter = CommandInterpreter::new(
        Arc::new(SqlSlackUserRepository::new(db_pool.clone())),
        Arc::new(tips),
        Arc::new(chat),
        Arc::new(messages),
        config.chat.username.clone(),
    );
    info!(
        event_name = "system.bootstrap.interpreter_ready",
        correlation_id = "bootstrap",
        changetip_base_url = %config.changetip.base_url,
        chat_base_url = %config.chat.base_url,
        "slash command interpreter wired"
    );

    Ok(Application { config, db_pool, interpreter: Arc::new(interpreter) })
}

#[cfg(test)]
mod tests {
    use tipbot_core::config::{ConfigOverrides, LoadOptions};

    use crate::bootstrap::bootstrap;

    fn overrides(database_url: &str) -> ConfigOverrides {
        ConfigOverrides {
            database_url: Some(database_url.to_string()),
            changetip_api_key: Some("ct-test".to_string()),
            chat_api_key: Some("cb-test".to_string()),
            ..ConfigOverrides::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_without_changetip_key() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                changetip_api_key: Some(String::new()),
                ..overrides("sqlite::memory:")
            },
            ..LoadOptions::default()
        })
        .await;

        let message = result.err().expect("bootstrap should fail").to_string();
        assert!(message.contains("changetip.api_key"), "unexpected error: {message}");
    }

    #[tokio::test]
    async fn bootstrap_applies_migrations_and_wires_interpreter() {
        let directory = tempfile::tempdir().expect("tempdir");
        let database_url = format!("sqlite://{}", directory.path().join("tipbot.db").display());

        let app = bootstrap(LoadOptions { overrides: overrides(&database_url), ..LoadOptions::default() })
            .await
            .expect("bootstrap should succeed with valid overrides");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'slack_user'",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("count tables");
        assert_eq!(table_count, 1);
        assert_eq!(app.config.chat.username, "changetip-cleverbot");

        app.db_pool.close().await;
    }
}
