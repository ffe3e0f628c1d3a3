use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::info;

use opshub_agent::{crm_tools::crm_tool_registry, llm::LlmClient, AgentRuntime};
use opshub_clients::{
    AirtableClient, ClientError, CrmRepository, FireflyClient, GongClient, SalesforceClient,
    TavilyClient, TrendsClient, WordPressClient, WriterClient,
};
use opshub_core::config::AppConfig;
use opshub_slack::{api::SlackApi, events::EventDispatcher, signature::SignatureVerifier};

use crate::{assistant, error::ApiError};

/// Vendor clients. `None` means the integration is not configured and its
/// routes answer 503.
#[derive(Clone, Default)]
pub struct Integrations {
    pub crm: Option<Arc<dyn CrmRepository>>,
    pub wordpress: Option<Arc<WordPressClient>>,
    pub tavily: Option<Arc<TavilyClient>>,
    pub trends: Option<Arc<TrendsClient>>,
    pub writer: Option<Arc<WriterClient>>,
    pub firefly: Option<Arc<FireflyClient>>,
    pub airtable: Option<Arc<AirtableClient>>,
    pub gong: Option<Arc<GongClient>>,
    pub agent: Option<Arc<AgentRuntime>>,
}

impl Integrations {
    pub fn from_config(http: reqwest::Client, config: &AppConfig) -> Result<Self, ClientError> {
        let writer = optional(WriterClient::new(http.clone(), &config.writer))?.map(Arc::new);
        let integrations = Self {
            crm: optional(SalesforceClient::new(http.clone(), config.salesforce.clone()))?
                .map(|client| Arc::new(client) as Arc<dyn CrmRepository>),
            wordpress: optional(WordPressClient::new(http.clone(), &config.wordpress))?.map(Arc::new),
            tavily: optional(TavilyClient::new(http.clone(), &config.tavily))?.map(Arc::new),
            trends: optional(TrendsClient::new(http.clone(), &config.serpapi))?.map(Arc::new),
            writer: writer.clone(),
            firefly: optional(FireflyClient::new(http.clone(), &config.firefly))?.map(Arc::new),
            airtable: optional(AirtableClient::new(http.clone(), &config.airtable))?.map(Arc::new),
            gong: optional(GongClient::new(http, &config.gong))?.map(Arc::new),
            agent: None,
        };

        Ok(match writer {
            Some(writer) => integrations.with_agent(writer, config),
            None => integrations,
        })
    }

    /// Attaches an agent whose tools are this set's CRM functions (none
    /// when Salesforce is not configured).
    pub fn with_agent(mut self, llm: Arc<dyn LlmClient>, config: &AppConfig) -> Self {
        let tools = self.crm.clone().map(crm_tool_registry).unwrap_or_default();
        self.agent = Some(Arc::new(AgentRuntime::new(llm, tools, &config.agent)));
        self
    }
}

fn optional<T>(built: Result<T, ClientError>) -> Result<Option<T>, ClientError> {
    match built {
        Ok(client) => Ok(Some(client)),
        Err(ClientError::NotConfigured { service }) => {
            info!(
                event_name = "system.bootstrap.integration_disabled",
                correlation_id = "bootstrap",
                service,
                "integration not configured"
            );
            Ok(None)
        }
        Err(error) => Err(error),
    }
}

pub fn require<'a, T: ?Sized>(
    client: &'a Option<Arc<T>>,
    service: &'static str,
) -> Result<&'a T, ApiError> {
    client.as_deref().ok_or_else(|| ApiError::not_configured(service))
}

pub struct SlackState {
    pub api: Arc<dyn SlackApi>,
    pub verifier: SignatureVerifier,
    pub dispatcher: EventDispatcher,
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub integrations: Integrations,
    pub slack: Arc<SlackState>,
    pub base_url: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(config: AppConfig, integrations: Integrations, slack_api: Arc<dyn SlackApi>) -> Self {
        let step_delay = Duration::from_millis(config.slack.progress_step_delay_ms);
        let dispatcher = assistant::dispatcher(slack_api.clone(), &integrations, step_delay);
        let verifier = SignatureVerifier::new(
            config.slack.signing_secret.clone(),
            config.slack.signature_tolerance_secs,
        );

        Self {
            base_url: Arc::new(RwLock::new(config.server.public_base_url.clone())),
            config: Arc::new(config),
            integrations,
            slack: Arc::new(SlackState { api: slack_api, verifier, dispatcher }),
        }
    }
}
