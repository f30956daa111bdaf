use std::collections::HashMap;

use tokio::sync::RwLock;

use tipbot_core::domain::user::SlackUser;

use super::{RepositoryError, SlackUserRepository};

#[derive(Default)]
pub struct InMemorySlackUserRepository {
    users: RwLock<HashMap<(String, String), SlackUser>>,
}

impl InMemorySlackUserRepository {
    /// Seeds a known user, as if they had already talked to the bot.
    pub async fn insert(&self, user: SlackUser) {
        let mut users = self.users.write().await;
        users.insert((user.team_id.0.clone(), user.user_id.0.clone()), user);
    }
}

#[async_trait::async_trait]
impl SlackUserRepository for InMemorySlackUserRepository {
    async fn get_or_create(
        &self,
        name: &str,
        team_id: &str,
        user_id: &str,
    ) -> Result<(SlackUser, bool), RepositoryError> {
        let mut users = self.users.write().await;
        let key = (team_id.to_string(), user_id.to_string());
        if let Some(existing) = users.get(&key) {
            return Ok((existing.clone(), false));
        }

        let user = SlackUser::new(name, team_id, user_id);
        users.insert(key, user.clone());
        Ok((user, true))
    }

    async fn find_by_team_and_user(
        &self,
        team_id: &str,
        user_id: &str,
    ) -> Result<Option<SlackUser>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users.get(&(team_id.to_string(), user_id.to_string())).cloned())
    }

    async fn list_for_team(&self, team_id: &str) -> Result<Vec<SlackUser>, RepositoryError> {
        let users = self.users.read().await;
        let mut matching: Vec<SlackUser> =
            users.values().filter(|user| user.team_id.0 == team_id).cloned().collect();
        matching.sort_by(|left, right| {
            left.name.cmp(&right.name).then_with(|| left.user_id.0.cmp(&right.user_id.0))
        });
        Ok(matching)
    }
}
