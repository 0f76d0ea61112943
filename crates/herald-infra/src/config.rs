//! Configuration loader for Herald.
//!
//! Sources, later ones winning:
//! 1. `.env` in the working directory (exported into the process environment)
//! 2. `{data_dir}/config.toml`
//! 3. `HERALD_*` environment variables
//!
//! A missing `config.toml` yields defaults; a malformed one is an error so a
//! typo never silently drops credentials.

use std::path::{Path, PathBuf};

use herald_types::config::{HeraldConfig, split_list};
use herald_types::error::ConfigError;
use herald_types::secret::Redacted;

/// Name of the config file inside the data directory.
pub const CONFIG_FILE: &str = "config.toml";

/// Environment variable that overrides the data directory.
pub const DATA_DIR_ENV: &str = "HERALD_DATA_DIR";

/// Template written by `herald init`.
pub const CONFIG_TEMPLATE: &str = r#"# Herald configuration.
# Every value can be overridden by a HERALD_* environment variable or a .env file.

[gateway]
client_id = ""
client_secret = ""
app_key = ""
token_url = "https://id.cisco.com/oauth2/default/v1/token"
api_url = "https://chat-ai.cisco.com/openai/deployments/gpt-4o-mini/chat/completions"
temperature = 0.7
# max_tokens = 1024
token_safety_margin_secs = 300

[smtp]
host = "smtp.gmail.com"
port = 587
username = ""
password = ""
from = ""

[webex]
access_token = ""
room_id = ""
mentions = []

[delivery]
email_recipients = []

[engine]
# call_timeout_secs = 60
evict_terminal = false
"#;

/// Resolve the data directory: `HERALD_DATA_DIR`, else `~/.herald`.
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".herald");
    }

    PathBuf::from(".herald")
}

pub fn config_path(data_dir: &Path) -> PathBuf {
    data_dir.join(CONFIG_FILE)
}

/// Export `.env` from the working directory, if present. Returns its path.
pub fn load_dotenv() -> Option<PathBuf> {
    match dotenvy::dotenv() {
        Ok(path) => {
            tracing::debug!("Loaded environment from {}", path.display());
            Some(path)
        }
        Err(err) if err.not_found() => None,
        Err(err) => {
            tracing::warn!("Ignoring unreadable .env file: {err}");
            None
        }
    }
}

/// Load configuration from `{data_dir}/config.toml` plus the process
/// environment.
pub async fn load_config(data_dir: &Path) -> Result<HeraldConfig, ConfigError> {
    load_config_with(data_dir, |key| std::env::var(key).ok()).await
}

/// Like [`load_config`], reading overrides through `lookup`.
pub async fn load_config_with(
    data_dir: &Path,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<HeraldConfig, ConfigError> {
    let mut config = read_config_file(&config_path(data_dir)).await?;
    apply_env_overrides(&mut config, lookup)?;
    Ok(config)
}

async fn read_config_file(path: &Path) -> Result<HeraldConfig, ConfigError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", path.display());
            return Ok(HeraldConfig::default());
        }
        Err(err) => {
            return Err(ConfigError::Read {
                path: path.display().to_string(),
                reason: err.to_string(),
            });
        }
    };

    toml::from_str::<HeraldConfig>(&content).map_err(|err| ConfigError::Parse {
        path: path.display().to_string(),
        reason: err.to_string(),
    })
}

/// Apply `HERALD_*` overrides. Unset or empty variables are ignored.
pub fn apply_env_overrides(
    config: &mut HeraldConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = get("HERALD_GATEWAY_CLIENT_ID") {
        config.gateway.client_id = v;
    }
    if let Some(v) = get("HERALD_GATEWAY_CLIENT_SECRET") {
        config.gateway.client_secret = Some(Redacted::new(v));
    }
    if let Some(v) = get("HERALD_GATEWAY_APP_KEY") {
        config.gateway.app_key = v;
    }
    if let Some(v) = get("HERALD_GATEWAY_TOKEN_URL") {
        config.gateway.token_url = v;
    }
    if let Some(v) = get("HERALD_GATEWAY_API_URL") {
        config.gateway.api_url = v;
    }
    if let Some(v) = get("HERALD_LLM_TEMPERATURE") {
        config.gateway.temperature = parse_value("HERALD_LLM_TEMPERATURE", &v)?;
    }
    if let Some(v) = get("HERALD_LLM_MAX_TOKENS") {
        config.gateway.max_tokens = Some(parse_value("HERALD_LLM_MAX_TOKENS", &v)?);
    }

    if let Some(v) = get("HERALD_SMTP_HOST") {
        config.smtp.host = v;
    }
    if let Some(v) = get("HERALD_SMTP_PORT") {
        config.smtp.port = parse_value("HERALD_SMTP_PORT", &v)?;
    }
    if let Some(v) = get("HERALD_SMTP_USERNAME") {
        config.smtp.username = v;
    }
    if let Some(v) = get("HERALD_SMTP_PASSWORD") {
        config.smtp.password = Some(Redacted::new(v));
    }
    if let Some(v) = get("HERALD_EMAIL_FROM") {
        config.smtp.from = v;
    }
    if let Some(v) = get("HERALD_EMAIL_TO") {
        config.delivery.email_recipients = split_list(&v);
    }

    if let Some(v) = get("HERALD_WEBEX_ACCESS_TOKEN") {
        config.webex.access_token = Some(Redacted::new(v));
    }
    if let Some(v) = get("HERALD_WEBEX_ROOM_ID") {
        config.webex.room_id = v;
    }
    if let Some(v) = get("HERALD_WEBEX_MENTIONS") {
        config.webex.mentions = split_list(&v);
    }

    if let Some(v) = get("HERALD_CALL_TIMEOUT_SECS") {
        config.engine.call_timeout_secs = Some(parse_value("HERALD_CALL_TIMEOUT_SECS", &v)?);
    }

    Ok(())
}

fn parse_value<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

/// Write [`CONFIG_TEMPLATE`] to `{data_dir}/config.toml`, creating the
/// directory. Returns the path written.
pub async fn write_template(data_dir: &Path) -> Result<PathBuf, ConfigError> {
    let path = config_path(data_dir);
    let write_err = |err: std::io::Error| ConfigError::Write {
        path: path.display().to_string(),
        reason: err.to_string(),
    };

    tokio::fs::create_dir_all(data_dir).await.map_err(write_err)?;
    tokio::fs::write(&path, CONFIG_TEMPLATE)
        .await
        .map_err(write_err)?;
    Ok(path)
}
