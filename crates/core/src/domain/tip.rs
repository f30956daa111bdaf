use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

/// Inbound slash-command fields forwarded to the tipping service as request metadata.
pub const META_FIELDS: [&str; 7] =
    ["token", "team_id", "channel_id", "channel_name", "user_id", "user_name", "command"];

const ACCEPTED_STATES: [&str; 2] = ["ok", "accepted"];

pub fn tip_address(name: &str, team_domain: &str) -> String {
    format!("{name}@{team_domain}")
}

/// Picks the forwarded metadata out of the raw inbound fields. Absent fields are skipped.
pub fn select_meta(fields: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    META_FIELDS
        .iter()
        .filter_map(|key| fields.get(*key).map(|value| ((*key).to_string(), value.clone())))
        .collect()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TipRequest {
    pub sender: String,
    pub receiver: String,
    pub message: String,
    pub context_uid: String,
    pub meta: BTreeMap<String, String>,
}

/// Raw reply from the tipping service.
///
/// The service answers with a loosely shaped JSON object, so the payload is kept verbatim
/// (it is echoed back for `+debug` requests) and fields are read on demand.
#[derive(Clone, Debug, PartialEq)]
pub struct TipResponse {
    raw: Value,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TipOutcome {
    InvalidSender,
    Duplicate,
    Rejected { message: String },
    OutForDelivery { amount_display: String, receiver: String },
    Finished { amount_display: String, receiver: String },
    Unrecognized,
}

impl TipResponse {
    pub fn from_value(raw: Value) -> Self {
        Self { raw }
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn error_code(&self) -> Option<&str> {
        self.raw.get("error_code").and_then(Value::as_str)
    }

    pub fn error_message(&self) -> Option<&str> {
        self.raw.get("error_message").and_then(Value::as_str).filter(|message| !message.is_empty())
    }

    pub fn state(&self) -> Option<&str> {
        self.raw.get("state").and_then(Value::as_str)
    }

    fn tip_field(&self, key: &str) -> Option<&str> {
        self.raw.get("tip").and_then(|tip| tip.get(key)).and_then(Value::as_str)
    }

    pub fn outcome(&self) -> TipOutcome {
        match self.error_code() {
            Some("invalid_sender") => return TipOutcome::InvalidSender,
            Some("duplicate_context_uid") => return TipOutcome::Duplicate,
            _ => {}
        }

        if let Some(message) = self.error_message() {
            return TipOutcome::Rejected { message: message.to_string() };
        }

        if !self.state().is_some_and(|state| ACCEPTED_STATES.contains(&state)) {
            return TipOutcome::Unrecognized;
        }

        // A delivery reply without both slots filled renders nothing.
        let (Some(amount_display), Some(receiver)) =
            (self.tip_field("amount_display"), self.tip_field("receiver"))
        else {
            return TipOutcome::Unrecognized;
        };
        let (amount_display, receiver) = (amount_display.to_string(), receiver.to_string());
        match self.tip_field("status") {
            Some("out for delivery") => TipOutcome::OutForDelivery { amount_display, receiver },
            Some("finished") => TipOutcome::Finished { amount_display, receiver },
            _ => TipOutcome::Unrecognized,
        }
    }

    /// Two-space indented JSON dump of the raw payload.
    pub fn pretty(&self) -> String {
        serde_json::to_string_pretty(&self.raw).unwrap_or_else(|_| self.raw.to_string())
    }
}
