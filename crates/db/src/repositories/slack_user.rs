use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use tipbot_core::domain::user::{SlackUser, SlackUserId, TeamId};

use super::{RepositoryError, SlackUserRepository};
use crate::DbPool;

pub struct SqlSlackUserRepository {
    pool: DbPool,
}

impl SqlSlackUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl SlackUserRepository for SqlSlackUserRepository {
    async fn get_or_create(
        &self,
        name: &str,
        team_id: &str,
        user_id: &str,
    ) -> Result<(SlackUser, bool), RepositoryError> {
        let inserted = sqlx::query(
            "INSERT INTO slack_user (team_id, user_id, name, created_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT (team_id, user_id) DO NOTHING",
        )
        .bind(team_id)
        .bind(user_id)
        .bind(name)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        let user = self.find_by_team_and_user(team_id, user_id).await?.ok_or_else(|| {
            RepositoryError::Decode(format!(
                "slack user {team_id}/{user_id} missing immediately after insert"
            ))
        })?;

        Ok((user, inserted.rows_affected() == 1))
    }

    async fn find_by_team_and_user(
        &self,
        team_id: &str,
        user_id: &str,
    ) -> Result<Option<SlackUser>, RepositoryError> {
        let row = sqlx::query(
            "SELECT team_id, user_id, name, created_at
             FROM slack_user
             WHERE team_id = ? AND user_id = ?",
        )
        .bind(team_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| user_from_row(&row)).transpose()
    }

    async fn list_for_team(&self, team_id: &str) -> Result<Vec<SlackUser>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT team_id, user_id, name, created_at
             FROM slack_user
             WHERE team_id = ?
             ORDER BY name, user_id",
        )
        .bind(team_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(user_from_row).collect()
    }
}

fn user_from_row(row: &SqliteRow) -> Result<SlackUser, RepositoryError> {
    let created_at: String = row.try_get("created_at")?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|error| {
            RepositoryError::Decode(format!("invalid slack_user.created_at `{created_at}`: {error}"))
        })?
        .with_timezone(&Utc);

    Ok(SlackUser {
        team_id: TeamId(row.try_get("team_id")?),
        user_id: SlackUserId(row.try_get("user_id")?),
        name: row.try_get("name")?,
        created_at,
    })
}
