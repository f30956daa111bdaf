use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tipbot_agent::ChatClient;
use tipbot_core::domain::tip::{select_meta, tip_address, TipOutcome, TipRequest, TipResponse};
use tipbot_core::errors::ApplicationError;
use tipbot_core::messages::MessageCatalog;
use tipbot_db::SlackUserRepository;
use tipbot_tipping::TipService;
use tracing::{debug, info};

use crate::mention::find_mention;

const DEBUG_MARKER: &str = "+debug";
const HELP_MARKER: &str = "help";
const BOT_NAME: &str = "changetip";

/// Form fields of one slash-command delivery. Missing fields read as empty strings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct CommandFields(BTreeMap<String, String>);

impl CommandFields {
    pub fn new(fields: BTreeMap<String, String>) -> Self {
        Self(fields)
    }

    pub fn get(&self, key: &str) -> &str {
        self.0.get(key).map(String::as_str).unwrap_or_default()
    }

    /// True when the field is present with a non-empty value.
    pub fn is_set(&self, key: &str) -> bool {
        !self.get(key).is_empty()
    }

    pub fn raw(&self) -> &BTreeMap<String, String> {
        &self.0
    }
}

impl<K, V> FromIterator<(K, V)> for CommandFields
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(key, value)| (key.into(), value.into())).collect())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CommandReply {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl CommandReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), username: None }
    }

    pub fn as_user(text: impl Into<String>, username: impl Into<String>) -> Self {
        Self { text: text.into(), username: Some(username.into()) }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandRoute {
    Greeting,
    Help,
    Chat,
    UnknownReceiver,
    Noop,
    Tip,
}

impl CommandRoute {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::Help => "help",
            Self::Chat => "chat",
            Self::UnknownReceiver => "unknown_receiver",
            Self::Noop => "noop",
            Self::Tip => "tip",
        }
    }
}

pub struct CommandInterpreter {
    users: Arc<dyn SlackUserRepository>,
    tips: Arc<dyn TipService>,
    chat: Arc<dyn ChatClient>,
    messages: Arc<MessageCatalog>,
    chat_username: String,
}

impl CommandInterpreter {
    pub fn new(
        users: Arc<dyn SlackUserRepository>,
        tips: Arc<dyn TipService>,
        chat: Arc<dyn ChatClient>,
        messages: Arc<MessageCatalog>,
        chat_username: impl Into<String>,
    ) -> Self {
        Self { users, tips, chat, messages, chat_username: chat_username.into() }
    }

    /// Routes one delivery. The first matching branch produces the reply:
    /// greeting for first contact, then help/chat when no one is mentioned, then the
    /// unknown-receiver notice, the noop acknowledgement, and finally the tip result.
    pub async fn interpret(
        &self,
        fields: &CommandFields,
        correlation_id: &str,
    ) -> Result<CommandReply, ApplicationError> {
        let user_name = fields.get("user_name");
        let team_id = fields.get("team_id");
        let user_id = fields.get("user_id");
        let text = fields.get("text");

        let (sender, created) = self.users.get_or_create(user_name, team_id, user_id).await?;
        if created {
            routed(CommandRoute::Greeting, correlation_id, fields);
            return Ok(CommandReply::text(self.messages.greeting(user_name)?));
        }

        let Some(mention) = find_mention(text) else {
            if text.contains(HELP_MARKER) {
                routed(CommandRoute::Help, correlation_id, fields);
                return Ok(CommandReply::text(self.messages.help(user_name)?));
            }

            let answer = self.chat.ask(&text.replace(BOT_NAME, "")).await.map_err(|error| {
                ApplicationError::Integration(format!("chat service failed: {error:#}"))
            })?;
            routed(CommandRoute::Chat, correlation_id, fields);
            return Ok(CommandReply::as_user(answer, self.chat_username.clone()));
        };

        let receiver =
            self.users.find_by_team_and_user(&sender.team_id.0, mention.user_id).await?;
        let Some(receiver) = receiver else {
            routed(CommandRoute::UnknownReceiver, correlation_id, fields);
            return Ok(CommandReply::text(self.messages.unknown_receiver(user_name)?));
        };

        let team_domain = fields.get("team_domain");
        let request = TipRequest {
            sender: tip_address(user_name, team_domain),
            receiver: receiver.address(team_domain),
            message: text.replace(mention.token, &format!("@{}", receiver.name)),
            context_uid: self.tips.unique_id(fields.raw()),
            meta: select_meta(fields.raw()),
        };

        if fields.is_set("noop") {
            routed(CommandRoute::Noop, correlation_id, fields);
            return Ok(CommandReply::text(self.messages.noop()?));
        }

        let response = self.tips.send_tip(&request).await?;
        debug!(
            event_name = "slack.command.tip_response",
            correlation_id = %correlation_id,
            context_uid = %request.context_uid,
            outcome = ?response.outcome(),
            "tipping service responded"
        );

        let mut out = self.tip_result_text(&response)?;
        if text.contains(DEBUG_MARKER) {
            out.push_str(&format!("\n```\n{}\n```", response.pretty()));
        }

        routed(CommandRoute::Tip, correlation_id, fields);
        Ok(CommandReply::text(out))
    }

    fn tip_result_text(&self, response: &TipResponse) -> Result<String, ApplicationError> {
        let text = match response.outcome() {
            TipOutcome::InvalidSender => self.messages.get_started()?,
            TipOutcome::Duplicate => self.messages.duplicate()?,
            TipOutcome::Rejected { message } => message,
            TipOutcome::OutForDelivery { amount_display, receiver } => {
                self.messages.out_for_delivery(&amount_display, &receiver)?
            }
            TipOutcome::Finished { amount_display, receiver } => {
                self.messages.finished(&amount_display, &receiver)?
            }
            TipOutcome::Unrecognized => String::new(),
        };
        Ok(text)
    }
}

fn routed(route: CommandRoute, correlation_id: &str, fields: &CommandFields) {
    info!(
        event_name = "slack.command.routed",
        correlation_id = %correlation_id,
        team_id = %fields.get("team_id"),
        user_id = %fields.get("user_id"),
        route = route.as_str(),
        "slash command routed"
    );
}
