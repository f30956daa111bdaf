use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use tipbot_core::config::{AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let entries = [
        entry("database.url", config.database.url.clone(), &["TIPBOT_DATABASE_URL"]),
        entry(
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["TIPBOT_DATABASE_MAX_CONNECTIONS"],
        ),
        entry(
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["TIPBOT_DATABASE_TIMEOUT_SECS"],
        ),
        entry(
            "server.bind_address",
            config.server.bind_address.clone(),
            &["TIPBOT_SERVER_BIND_ADDRESS"],
        ),
        entry("server.port", config.server.port.to_string(), &["TIPBOT_SERVER_PORT"]),
        entry(
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs.to_string(),
            &["TIPBOT_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        ),
        entry(
            "changetip.api_key",
            redact_key(&config.changetip.api_key),
            &["TIPBOT_CHANGETIP_API_KEY"],
        ),
        entry(
            "changetip.base_url",
            config.changetip.base_url.clone(),
            &["TIPBOT_CHANGETIP_BASE_URL"],
        ),
        entry("changetip.channel", config.changetip.channel.clone(), &["TIPBOT_CHANGETIP_CHANNEL"]),
        entry(
            "changetip.timeout_secs",
            config.changetip.timeout_secs.to_string(),
            &["TIPBOT_CHANGETIP_TIMEOUT_SECS"],
        ),
        entry("chat.api_key", redact_key(&config.chat.api_key), &["TIPBOT_CHAT_API_KEY"]),
        entry("chat.base_url", config.chat.base_url.clone(), &["TIPBOT_CHAT_BASE_URL"]),
        entry("chat.username", config.chat.username.clone(), &["TIPBOT_CHAT_USERNAME"]),
        entry(
            "chat.timeout_secs",
            config.chat.timeout_secs.to_string(),
            &["TIPBOT_CHAT_TIMEOUT_SECS"],
        ),
        entry("messages.info_url", config.messages.info_url.clone(), &["TIPBOT_MESSAGES_INFO_URL"]),
        entry(
            "logging.level",
            config.logging.level.clone(),
            &["TIPBOT_LOGGING_LEVEL", "TIPBOT_LOG_LEVEL"],
        ),
        entry(
            "logging.format",
            format!("{:?}", config.logging.format),
            &["TIPBOT_LOGGING_FORMAT", "TIPBOT_LOG_FORMAT"],
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for entry in entries {
        let source = field_source(
            entry.key_path,
            entry.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(entry.key_path, &entry.value, source));
    }

    lines.join("\n")
}

struct Entry {
    key_path: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

fn entry(key_path: &'static str, value: String, env_keys: &'static [&'static str]) -> Entry {
    Entry { key_path, value, env_keys }
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("tipbot.toml"), PathBuf::from("config/tipbot.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Keeps the last four characters of long keys so operators can tell keys apart.
fn redact_key(key: &SecretString) -> String {
    let trimmed = key.expose_secret().trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    let chars: Vec<char> = trimmed.chars().collect();
    if chars.len() < 12 {
        return "<redacted>".to_string();
    }

    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("***{tail}")
}
