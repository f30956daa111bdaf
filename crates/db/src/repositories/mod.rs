use async_trait::async_trait;
use thiserror::Error;

use tipbot_core::domain::user::SlackUser;
use tipbot_core::errors::ApplicationError;

pub mod memory;
pub mod slack_user;

pub use memory::InMemorySlackUserRepository;
pub use slack_user::SqlSlackUserRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        Self::Persistence(value.to_string())
    }
}

/// Directory of Slack users known to the bot.
#[async_trait]
pub trait SlackUserRepository: Send + Sync {
    /// Returns the record for `(team_id, user_id)`, creating it with `name` when absent.
    /// The flag is `true` only for the call that inserted the row.
    async fn get_or_create(
        &self,
        name: &str,
        team_id: &str,
        user_id: &str,
    ) -> Result<(SlackUser, bool), RepositoryError>;

    async fn find_by_team_and_user(
        &self,
        team_id: &str,
        user_id: &str,
    ) -> Result<Option<SlackUser>, RepositoryError>;

    async fn list_for_team(&self, team_id: &str) -> Result<Vec<SlackUser>, RepositoryError>;
}
