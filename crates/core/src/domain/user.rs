use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::tip::tip_address;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TeamId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlackUserId(pub String);

/// A Slack user the bot has seen at least once.
///
/// Records are keyed by `(team_id, user_id)`; the display name is captured on first contact
/// and never updated afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackUser {
    pub team_id: TeamId,
    pub user_id: SlackUserId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl SlackUser {
    pub fn new(
        name: impl Into<String>,
        team_id: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            team_id: TeamId(team_id.into()),
            user_id: SlackUserId(user_id.into()),
            name: name.into(),
            created_at: Utc::now(),
        }
    }

    pub fn address(&self, team_domain: &str) -> String {
        tip_address(&self.name, team_domain)
    }
}
