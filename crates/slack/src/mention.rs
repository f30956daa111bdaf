use std::sync::OnceLock;

use regex::Regex;

static MENTION_PATTERN: OnceLock<Regex> = OnceLock::new();

fn mention_pattern() -> &'static Regex {
    MENTION_PATTERN
        .get_or_init(|| Regex::new(r"<@(U[A-Z0-9]+)>").expect("mention pattern is valid"))
}

/// A raw user mention as Slack encodes it in message text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Mention<'a> {
    /// The full `<@U123>` token.
    pub token: &'a str,
    pub user_id: &'a str,
}

/// First user mention in `text`, if any.
pub fn find_mention(text: &str) -> Option<Mention<'_>> {
    let captures = mention_pattern().captures(text)?;
    let token = captures.get(0)?.as_str();
    let user_id = captures.get(1)?.as_str();
    Some(Mention { token, user_id })
}
