use std::sync::Arc;

use opshub_clients::{build_http_client, ClientError};
use opshub_core::config::{AppConfig, ConfigError, LoadOptions};
use opshub_slack::api::{SlackApi, SlackWebClient};
use thiserror::Error;
use tracing::info;

use crate::state::{AppState, Integrations};

pub struct Application {
    pub config: AppConfig,
    pub state: AppState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("http client could not be built: {0}")]
    HttpClient(#[source] reqwest::Error),
    #[error("integration setup failed: {0}")]
    Integration(#[from] ClientError),
}

pub fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    bootstrap_with_config(AppConfig::load(options)?)
}

/// Wires vendor clients, the agent and the Slack Web API for an already
/// loaded config. Nothing here touches the network.
pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let http = build_http_client(config.server.upstream_timeout_secs).map_err(BootstrapError::HttpClient)?;
    let integrations = Integrations::from_config(http.clone(), &config)?;
    let enabled: Vec<&str> =
        config.integrations().into_iter().filter(|(_, enabled)| *enabled).map(|(name, _)| name).collect();
    info!(
        event_name = "system.bootstrap.integrations_ready",
        correlation_id = "bootstrap",
        enabled = ?enabled,
        agent = integrations.agent.is_some(),
        "integrations initialized"
    );

    let slack_api: Arc<dyn SlackApi> = Arc::new(SlackWebClient::new(
        http,
        config.slack.api_base_url.clone(),
        config.slack.bot_token.clone(),
    ));
    let state = AppState::new(config.clone(), integrations, slack_api);

    Ok(Application { config, state })
}
