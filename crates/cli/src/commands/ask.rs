use std::sync::Arc;

use opshub_agent::{
    crm_tools::crm_tool_registry, runtime::NoopObserver, AgentError, AgentRuntime, ChatReply,
};
use opshub_clients::{build_http_client, ClientError, CrmRepository, SalesforceClient, WriterClient};
use opshub_core::config::{AppConfig, LoadOptions};
use serde_json::json;

use super::{exit_code, CommandResult};

const COMMAND: &str = "ask";

enum AskFailure {
    NotConfigured(String),
    Setup(String),
    Turn(AgentError),
}

pub fn run(message: &str) -> CommandResult {
    run_with(LoadOptions::default(), message)
}

pub fn run_with(options: LoadOptions, message: &str) -> CommandResult {
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "config_validation",
                error.to_string(),
                exit_code::CONFIG_INVALID,
            )
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "runtime",
                format!("failed to initialize async runtime: {error}"),
                exit_code::RUNTIME_FAILURE,
            )
        }
    };

    match runtime.block_on(ask(&config, message)) {
        Ok(reply) => CommandResult::success_with(
            COMMAND,
            reply.text,
            Some(json!({
                "account_id": reply.account_id.map(|id| id.to_string()),
                "tool": reply.tool,
            })),
        ),
        Err(AskFailure::NotConfigured(detail)) => {
            CommandResult::failure(COMMAND, "not_configured", detail, exit_code::NOT_CONFIGURED)
        }
        Err(AskFailure::Setup(detail)) => {
            CommandResult::failure(COMMAND, "setup", detail, exit_code::RUNTIME_FAILURE)
        }
        Err(AskFailure::Turn(error @ AgentError::Rejected { .. })) => {
            CommandResult::failure(COMMAND, "rejected", error.user_message(), exit_code::RUNTIME_FAILURE)
        }
        Err(AskFailure::Turn(error)) => CommandResult::failure(
            COMMAND,
            "agent_turn",
            format!("{} ({error})", error.user_message()),
            exit_code::RUNTIME_FAILURE,
        ),
    }
}

async fn ask(config: &AppConfig, message: &str) -> Result<ChatReply, AskFailure> {
    let http = build_http_client(config.server.upstream_timeout_secs)
        .map_err(|error| AskFailure::Setup(format!("failed to build http client: {error}")))?;

    let writer = WriterClient::new(http.clone(), &config.writer).map_err(|error| match error {
        ClientError::NotConfigured { .. } => {
            AskFailure::NotConfigured("writer.api_key is required to ask the assistant".to_string())
        }
        other => AskFailure::Setup(other.to_string()),
    })?;

    let crm: Option<Arc<dyn CrmRepository>> =
        match SalesforceClient::new(http, config.salesforce.clone()) {
            Ok(client) => Some(Arc::new(client)),
            Err(ClientError::NotConfigured { .. }) => None,
            Err(other) => return Err(AskFailure::Setup(other.to_string())),
        };
    let tools = crm.map(crm_tool_registry).unwrap_or_default();

    let agent = AgentRuntime::new(Arc::new(writer), tools, &config.agent);
    agent.handle_message(message, &NoopObserver).await.map_err(AskFailure::Turn)
}
