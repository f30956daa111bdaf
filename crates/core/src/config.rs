use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::messages::DEFAULT_INFO_URL;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub changetip: ChangeTipConfig,
    pub chat: ChatConfig,
    pub messages: MessagesConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ChangeTipConfig {
    pub api_key: SecretString,
    pub base_url: String,
    pub channel: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ChatConfig {
    pub api_key: SecretString,
    pub base_url: String,
    pub username: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct MessagesConfig {
    pub info_url: String,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub server_port: Option<u16>,
    pub changetip_api_key: Option<String>,
    pub changetip_base_url: Option<String>,
    pub chat_api_key: Option<String>,
    pub chat_base_url: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://tipbot.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8000,
                graceful_shutdown_secs: 15,
            },
            changetip: ChangeTipConfig {
                api_key: String::new().into(),
                base_url: "https://api.changetip.com".to_string(),
                channel: "slack".to_string(),
                timeout_secs: 30,
            },
            chat: ChatConfig {
                api_key: String::new().into(),
                base_url: "https://www.cleverbot.com".to_string(),
                username: "changetip-cleverbot".to_string(),
                timeout_secs: 30,
            },
            messages: MessagesConfig { info_url: DEFAULT_INFO_URL.to_string() },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    /// Resolves configuration with precedence overrides > env > file > defaults, then
    /// validates the result.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("tipbot.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(changetip) = patch.changetip {
            if let Some(changetip_api_key_value) = changetip.api_key {
                self.changetip.api_key = secret_value(changetip_api_key_value);
            }
            if let Some(base_url) = changetip.base_url {
                self.changetip.base_url = base_url;
            }
            if let Some(channel) = changetip.channel {
                self.changetip.channel = channel;
            }
            if let Some(timeout_secs) = changetip.timeout_secs {
                self.changetip.timeout_secs = timeout_secs;
            }
        }

        if let Some(chat) = patch.chat {
            if let Some(chat_api_key_value) = chat.api_key {
                self.chat.api_key = secret_value(chat_api_key_value);
            }
            if let Some(base_url) = chat.base_url {
                self.chat.base_url = base_url;
            }
            if let Some(username) = chat.username {
                self.chat.username = username;
            }
            if let Some(timeout_secs) = chat.timeout_secs {
                self.chat.timeout_secs = timeout_secs;
            }
        }

        if let Some(messages) = patch.messages {
            if let Some(info_url) = messages.info_url {
                self.messages.info_url = info_url;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("TIPBOT_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("TIPBOT_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_u32("TIPBOT_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("TIPBOT_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("TIPBOT_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("TIPBOT_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("TIPBOT_SERVER_PORT") {
            self.server.port = parse_u16("TIPBOT_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("TIPBOT_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("TIPBOT_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        if let Some(value) = read_env("TIPBOT_CHANGETIP_API_KEY") {
            self.changetip.api_key = secret_value(value);
        }
        if let Some(value) = read_env("TIPBOT_CHANGETIP_BASE_URL") {
            self.changetip.base_url = value;
        }
        if let Some(value) = read_env("TIPBOT_CHANGETIP_CHANNEL") {
            self.changetip.channel = value;
        }
        if let Some(value) = read_env("TIPBOT_CHANGETIP_TIMEOUT_SECS") {
            self.changetip.timeout_secs = parse_u64("TIPBOT_CHANGETIP_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("TIPBOT_CHAT_API_KEY") {
            self.chat.api_key = secret_value(value);
        }
        if let Some(value) = read_env("TIPBOT_CHAT_BASE_URL") {
            self.chat.base_url = value;
        }
        if let Some(value) = read_env("TIPBOT_CHAT_USERNAME") {
            self.chat.username = value;
        }
        if let Some(value) = read_env("TIPBOT_CHAT_TIMEOUT_SECS") {
            self.chat.timeout_secs = parse_u64("TIPBOT_CHAT_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("TIPBOT_MESSAGES_INFO_URL") {
            self.messages.info_url = value;
        }

        let log_level = read_env("TIPBOT_LOGGING_LEVEL").or_else(|| read_env("TIPBOT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("TIPBOT_LOGGING_FORMAT").or_else(|| read_env("TIPBOT_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(port) = overrides.server_port {
            self.server.port = port;
        }
        if let Some(changetip_api_key) = overrides.changetip_api_key {
            self.changetip.api_key = secret_value(changetip_api_key);
        }
        if let Some(base_url) = overrides.changetip_base_url {
            self.changetip.base_url = base_url;
        }
        if let Some(chat_api_key) = overrides.chat_api_key {
            self.chat.api_key = secret_value(chat_api_key);
        }
        if let Some(base_url) = overrides.chat_base_url {
            self.chat.base_url = base_url;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_server(&self.server)?;
        validate_changetip(&self.changetip)?;
        validate_chat(&self.chat)?;
        validate_messages(&self.messages)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("tipbot.toml"), PathBuf::from("config/tipbot.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_changetip(changetip: &ChangeTipConfig) -> Result<(), ConfigError> {
    if changetip.api_key.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(
            "changetip.api_key is required. Get it from https://www.changetip.com/api > Bots"
                .to_string(),
        ));
    }

    validate_http_url("changetip.base_url", &changetip.base_url)?;

    if changetip.channel.trim().is_empty() {
        return Err(ConfigError::Validation("changetip.channel must not be empty".to_string()));
    }

    validate_timeout("changetip.timeout_secs", changetip.timeout_secs)
}

fn validate_chat(chat: &ChatConfig) -> Result<(), ConfigError> {
    if chat.api_key.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(
            "chat.api_key is required. Get it from https://www.cleverbot.com/api".to_string(),
        ));
    }

    validate_http_url("chat.base_url", &chat.base_url)?;

    if chat.username.trim().is_empty() {
        return Err(ConfigError::Validation("chat.username must not be empty".to_string()));
    }

    validate_timeout("chat.timeout_secs", chat.timeout_secs)
}

fn validate_messages(messages: &MessagesConfig) -> Result<(), ConfigError> {
    validate_http_url("messages.info_url", &messages.info_url)
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn validate_http_url(key: &str, value: &str) -> Result<(), ConfigError> {
    if !value.starts_with("http://") && !value.starts_with("https://") {
        return Err(ConfigError::Validation(format!("{key} must start with http:// or https://")));
    }
    Ok(())
}

fn validate_timeout(key: &str, timeout_secs: u64) -> Result<(), ConfigError> {
    if timeout_secs == 0 || timeout_secs > 300 {
        return Err(ConfigError::Validation(format!("{key} must be in range 1..=300")));
    }
    Ok(())
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    server: Option<ServerPatch>,
    changetip: Option<ChangeTipPatch>,
    chat: Option<ChatPatch>,
    messages: Option<MessagesPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ChangeTipPatch {
    api_key: Option<String>,
    base_url: Option<String>,
    channel: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ChatPatch {
    api_key: Option<String>,
    base_url: Option<String>,
    username: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct MessagesPatch {
    info_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    fn set_required_keys() {
        env::set_var("TIPBOT_CHANGETIP_API_KEY", "ct-test-key");
        env::set_var("TIPBOT_CHAT_API_KEY", "cb-test-key");
    }

    const REQUIRED_KEYS: [&str; 2] = ["TIPBOT_CHANGETIP_API_KEY", "TIPBOT_CHAT_API_KEY"];

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_CHANGETIP_KEY", "ct-from-env");
        env::set_var("TEST_CHAT_KEY", "cb-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("tipbot.toml");
            fs::write(
                &path,
                r#"
[changetip]
api_key = "${TEST_CHANGETIP_KEY}"

[chat]
api_key = "${TEST_CHAT_KEY}"
username = "tipbot-chatter"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.changetip.api_key.expose_secret() == "ct-from-env",
                "changetip key should be loaded from environment",
            )?;
            ensure(
                config.chat.api_key.expose_secret() == "cb-from-env",
                "chat key should be loaded from environment",
            )?;
            ensure(config.chat.username == "tipbot-chatter", "chat username should come from file")?;
            Ok(())
        })();

        clear_vars(&["TEST_CHANGETIP_KEY", "TEST_CHAT_KEY"]);
        result
    }

    #[test]
    fn unterminated_interpolation_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = dir.path().join("tipbot.toml");
        fs::write(&path, "[changetip]\napi_key = \"${OPEN\"\n").map_err(|err| err.to_string())?;

        let error =
            match AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
            {
                Ok(_) => return Err("expected interpolation failure".to_string()),
                Err(error) => error,
            };
        ensure(
            matches!(error, ConfigError::UnterminatedInterpolation),
            "error should report the unterminated expression",
        )
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        set_required_keys();
        env::set_var("TIPBOT_LOG_LEVEL", "warn");
        env::set_var("TIPBOT_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&REQUIRED_KEYS);
        clear_vars(&["TIPBOT_LOG_LEVEL", "TIPBOT_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TIPBOT_DATABASE_URL", "sqlite://from-env.db");
        env::set_var("TIPBOT_CHANGETIP_API_KEY", "ct-from-env");
        env::set_var("TIPBOT_SERVER_PORT", "9100");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("tipbot.toml");
            fs::write(
                &path,
                r#"
[database]
url = "sqlite://from-file.db"

[server]
port = 9000

[changetip]
api_key = "ct-from-file"
channel = "slack-staging"

[chat]
api_key = "cb-from-file"

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    database_url: Some("sqlite://from-override.db".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://from-override.db",
                "override database url should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(config.server.port == 9100, "env port should win over file")?;
            ensure(
                config.changetip.api_key.expose_secret() == "ct-from-env",
                "env changetip key should win over file and defaults",
            )?;
            ensure(
                config.chat.api_key.expose_secret() == "cb-from-file",
                "file chat key should win over defaults",
            )?;
            ensure(config.changetip.channel == "slack-staging", "file channel should be applied")?;
            ensure(
                config.changetip.base_url == "https://api.changetip.com",
                "unset values keep their defaults",
            )?;
            Ok(())
        })();

        clear_vars(&["TIPBOT_DATABASE_URL", "TIPBOT_CHANGETIP_API_KEY", "TIPBOT_SERVER_PORT"]);
        result
    }

    #[test]
    fn validation_fails_fast_without_changetip_key() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TIPBOT_CHAT_API_KEY", "cb-test-key");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("changetip.api_key")
            );
            ensure(has_message, "validation failure should mention changetip.api_key")
        })();

        clear_vars(&["TIPBOT_CHAT_API_KEY"]);
        result
    }

    #[test]
    fn invalid_numeric_env_override_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        set_required_keys();
        env::set_var("TIPBOT_SERVER_PORT", "not-a-port");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => return Err("expected env override failure".to_string()),
                Err(error) => error,
            };
            ensure(
                matches!(
                    error,
                    ConfigError::InvalidEnvOverride { ref key, .. } if key == "TIPBOT_SERVER_PORT"
                ),
                "error should name the offending variable",
            )
        })();

        clear_vars(&REQUIRED_KEYS);
        clear_vars(&["TIPBOT_SERVER_PORT"]);
        result
    }

    #[test]
    fn info_url_must_be_http() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        set_required_keys();
        env::set_var("TIPBOT_MESSAGES_INFO_URL", "changetip.com/slack");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => return Err("expected validation failure".to_string()),
                Err(error) => error,
            };
            ensure(
                matches!(
                    error,
                    ConfigError::Validation(ref message) if message.contains("messages.info_url")
                ),
                "validation failure should mention messages.info_url",
            )
        })();

        clear_vars(&REQUIRED_KEYS);
        clear_vars(&["TIPBOT_MESSAGES_INFO_URL"]);
        result
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TIPBOT_CHANGETIP_API_KEY", "ct-secret-value");
        env::set_var("TIPBOT_CHAT_API_KEY", "cb-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(
                !debug.contains("ct-secret-value"),
                "debug output should not contain the changetip key",
            )?;
            ensure(!debug.contains("cb-secret-value"), "debug output should not contain chat key")?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )?;
            Ok(())
        })();

        clear_vars(&REQUIRED_KEYS);
        result
    }
}
