//! Reply templates sent back to Slack.
//!
//! The catalog is compiled once at startup and is read-only afterwards. Every template
//! declares its placeholders by name; `info_url` is injected into every render.

use tera::{Context, Tera};
use thiserror::Error;

pub const DEFAULT_INFO_URL: &str = "https://www.changetip.com/tip-online/slack";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageKey {
    Help,
    Duplicate,
    Greeting,
    GetStarted,
    UnknownReceiver,
    OutForDelivery,
    Finished,
    Noop,
}

impl MessageKey {
    pub const ALL: [MessageKey; 8] = [
        Self::Help,
        Self::Duplicate,
        Self::Greeting,
        Self::GetStarted,
        Self::UnknownReceiver,
        Self::OutForDelivery,
        Self::Finished,
        Self::Noop,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Help => "help",
            Self::Duplicate => "duplicate",
            Self::Greeting => "greeting",
            Self::GetStarted => "get_started",
            Self::UnknownReceiver => "unknown_receiver",
            Self::OutForDelivery => "out_for_delivery",
            Self::Finished => "finished",
            Self::Noop => "noop",
        }
    }

    fn template(self) -> &'static str {
        match self {
            Self::Help => {
                "Hi {{ user_name }}. Here's some help.\n\
                 To send a tip, mention *a person* and *an amount* like this:\n\
                 `changetip: give @buddy $1`.\n\
                 You can also use a moniker for the amount, like `a beer` or `2 coffees`.\n\
                 Any questions? E-mail support@changetip.com\n"
            }
            Self::Duplicate => "That looks like a duplicate tip.",
            Self::Greeting => "Nice to meet you, {{ user_name }}! {% include \"get_started\" %}",
            Self::GetStarted => {
                "To send your first tip, login with your slack account on ChangeTip: {{ info_url }}"
            }
            Self::UnknownReceiver => {
                "@{{ user_name }}, I don't know who that person is yet. \
                 They should say *hi* to me before I give them money."
            }
            Self::OutForDelivery => {
                "The tip for {{ amount_display }} is out for delivery. \
                 {{ receiver }} needs to collect by connecting their ChangeTip account to slack at \
                 {{ info_url }}"
            }
            Self::Finished => {
                "The tip has been delivered, {{ amount_display }} has been added to \
                 {{ receiver }}'s ChangeTip wallet."
            }
            Self::Noop => "Hi!",
        }
    }
}

#[derive(Debug, Error)]
pub enum MessageError {
    #[error("message catalog failed to compile: {0}")]
    Compile(#[source] tera::Error),
    #[error("message `{key}` failed to render: {source}")]
    Render {
        key: &'static str,
        #[source]
        source: tera::Error,
    },
}

pub struct MessageCatalog {
    tera: Tera,
    info_url: String,
}

impl MessageCatalog {
    pub fn new(info_url: impl Into<String>) -> Result<Self, MessageError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(MessageKey::ALL.iter().map(|key| (key.as_str(), key.template())))
            .map_err(MessageError::Compile)?;

        Ok(Self { tera, info_url: info_url.into() })
    }

    pub fn info_url(&self) -> &str {
        &self.info_url
    }

    pub fn render(&self, key: MessageKey, values: &[(&str, &str)]) -> Result<String, MessageError> {
        let mut context = Context::new();
        context.insert("info_url", &self.info_url);
        for (name, value) in values {
            context.insert(*name, value);
        }

        self.tera
            .render(key.as_str(), &context)
            .map_err(|source| MessageError::Render { key: key.as_str(), source })
    }

    pub fn greeting(&self, user_name: &str) -> Result<String, MessageError> {
        self.render(MessageKey::Greeting, &[("user_name", user_name)])
    }

    pub fn help(&self, user_name: &str) -> Result<String, MessageError> {
        self.render(MessageKey::Help, &[("user_name", user_name)])
    }

    pub fn get_started(&self) -> Result<String, MessageError> {
        self.render(MessageKey::GetStarted, &[])
    }

    pub fn duplicate(&self) -> Result<String, MessageError> {
        self.render(MessageKey::Duplicate, &[])
    }

    pub fn unknown_receiver(&self, user_name: &str) -> Result<String, MessageError> {
        self.render(MessageKey::UnknownReceiver, &[("user_name", user_name)])
    }

    pub fn out_for_delivery(
        &self,
        amount_display: &str,
        receiver: &str,
    ) -> Result<String, MessageError> {
        self.render(
            MessageKey::OutForDelivery,
            &[("amount_display", amount_display), ("receiver", receiver)],
        )
    }

    pub fn finished(&self, amount_display: &str, receiver: &str) -> Result<String, MessageError> {
        self.render(
            MessageKey::Finished,
            &[("amount_display", amount_display), ("receiver", receiver)],
        )
    }

    pub fn noop(&self) -> Result<String, MessageError> {
        self.render(MessageKey::Noop, &[])
    }
}
