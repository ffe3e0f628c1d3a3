use std::env;
use std::fs;
use std::path::Path;

use opshub_core::config::{resolve_config_path, AppConfig, LoadOptions};
use secrecy::{ExposeSecret, SecretString};
use toml::Value;

struct Field {
    key: &'static str,
    env_keys: &'static [&'static str],
    value: String,
}

impl Field {
    fn new(key: &'static str, env_keys: &'static [&'static str], value: impl Into<String>) -> Self {
        Self { key, env_keys, value: value.into() }
    }
}

pub fn run() -> String {
    run_with(LoadOptions::default())
}

pub fn run_with(options: LoadOptions) -> String {
    let config_file_path = resolve_config_path(options.config_path.as_deref());
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines =
        vec!["effective config (source precedence: overrides > env > file > default):".to_string()];
    for field in fields(&config) {
        let source = field_source(&field, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(format!("- {} = {} (source: {source})", field.key, field.value));
    }

    let enabled: Vec<&str> =
        config.integrations().into_iter().filter(|(_, on)| *on).map(|(name, _)| name).collect();
    lines.push(format!(
        "integrations enabled: {}",
        if enabled.is_empty() { "<none>".to_string() } else { enabled.join(", ") }
    ));

    lines.join("\n")
}

fn fields(config: &AppConfig) -> Vec<Field> {
    vec![
        Field::new("server.bind_address", &["OPSHUB_SERVER_BIND_ADDRESS"], &config.server.bind_address),
        Field::new("server.port", &["OPSHUB_SERVER_PORT"], config.server.port.to_string()),
        Field::new(
            "server.public_base_url",
            &["OPSHUB_SERVER_PUBLIC_BASE_URL"],
            optional(config.server.public_base_url.as_deref()),
        ),
        Field::new(
            "server.upstream_timeout_secs",
            &["OPSHUB_SERVER_UPSTREAM_TIMEOUT_SECS"],
            config.server.upstream_timeout_secs.to_string(),
        ),
        Field::new(
            "slack.bot_token",
            &["OPSHUB_SLACK_BOT_TOKEN"],
            redact_token(config.slack.bot_token.expose_secret()),
        ),
        Field::new(
            "slack.signing_secret",
            &["OPSHUB_SLACK_SIGNING_SECRET"],
            secret(Some(&config.slack.signing_secret)),
        ),
        Field::new("slack.api_base_url", &["OPSHUB_SLACK_API_BASE_URL"], &config.slack.api_base_url),
        Field::new("agent.model", &["OPSHUB_AGENT_MODEL"], &config.agent.model),
        Field::new("writer.api_key", &["OPSHUB_WRITER_API_KEY"], secret(config.writer.api_key.as_ref())),
        Field::new("writer.base_url", &["OPSHUB_WRITER_BASE_URL"], &config.writer.base_url),
        Field::new(
            "salesforce.instance_url",
            &["OPSHUB_SALESFORCE_INSTANCE_URL"],
            optional(config.salesforce.instance_url.as_deref()),
        ),
        Field::new(
            "salesforce.username",
            &["OPSHUB_SALESFORCE_USERNAME"],
            optional(config.salesforce.username.as_deref()),
        ),
        Field::new(
            "salesforce.access_token",
            &["OPSHUB_SALESFORCE_ACCESS_TOKEN"],
            secret(config.salesforce.access_token.as_ref()),
        ),
        Field::new(
            "wordpress.api_url",
            &["OPSHUB_WORDPRESS_API_URL"],
            optional(config.wordpress.api_url.as_deref()),
        ),
        Field::new(
            "airtable.table_name",
            &["OPSHUB_AIRTABLE_TABLE_NAME"],
            optional(config.airtable.table_name.as_deref()),
        ),
        Field::new(
            "logging.level",
            &["OPSHUB_LOGGING_LEVEL", "OPSHUB_LOG_LEVEL"],
            &config.logging.level,
        ),
        Field::new(
            "logging.format",
            &["OPSHUB_LOGGING_FORMAT", "OPSHUB_LOG_FORMAT"],
            format!("{:?}", config.logging.format),
        ),
    ]
}

fn optional(value: Option<&str>) -> String {
    value.unwrap_or("<unset>").to_string()
}

fn secret(value: Option<&SecretString>) -> String {
    match value {
        Some(value) if !value.expose_secret().trim().is_empty() => "<redacted>".to_string(),
        _ => "<unset>".to_string(),
    }
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(field: &Field, config_file_doc: Option<&Value>, config_file_path: Option<&Path>) -> String {
    if let Some(env_key) = field.env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, field.key) {
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

/// Keeps the token's kind prefix (`xoxb`, `xapp`) and hides the rest.
pub fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}
