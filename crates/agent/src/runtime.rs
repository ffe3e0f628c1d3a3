use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use opshub_core::config::AgentConfig;
use opshub_core::domain::chat::{
    ChatCompletion, ChatMessage, ChatRequest, ToolChoice, ToolChoiceMode,
};
use opshub_core::domain::crm::AccountId;

use crate::{
    conversation::{initial_messages, normalize_message, tool_result_content},
    crm_tools::ACCOUNT_ID_ARG,
    guardrails::{GuardrailDecision, GuardrailPolicy},
    llm::LlmClient,
    tools::{ToolInputError, ToolRegistry},
};

pub const FALLBACK_REPLY: &str =
    "I wasn't able to put together an answer for that. Try rephrasing or include the account ID.";

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("message rejected ({reason_code})")]
    Rejected { reason_code: &'static str, user_message: String },
    #[error("language model call failed: {0}")]
    Llm(String),
    #[error("model requested unknown tool `{0}`")]
    UnknownTool(String),
    #[error("invalid arguments for `{tool}`: {detail}")]
    InvalidArguments { tool: String, detail: String },
    #[error("tool `{tool}` failed: {detail}")]
    ToolFailed { tool: String, detail: String },
}

impl AgentError {
    /// Text safe to show in chat.
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected { user_message, .. } => user_message.clone(),
            Self::Llm(_) => "The language model is unavailable right now. Please try again shortly.".to_owned(),
            Self::UnknownTool(_) | Self::InvalidArguments { .. } | Self::ToolFailed { .. } => {
                "I couldn't complete that lookup.".to_owned()
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ToolInvocation {
    pub call_id: String,
    pub tool: String,
    pub arguments: Value,
    pub output: Value,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TurnOutcome {
    /// The completion returned to the caller: the first one when no tool was
    /// requested, otherwise the one produced after the tool result.
    pub completion: ChatCompletion,
    pub invocation: Option<ToolInvocation>,
}

impl TurnOutcome {
    /// Account the turn was about, when the executed tool took one.
    pub fn account_id(&self) -> Option<AccountId> {
        self.invocation
            .as_ref()
            .and_then(|invocation| invocation.arguments.get(ACCOUNT_ID_ARG))
            .and_then(Value::as_str)
            .and_then(|raw| AccountId::parse(raw).ok())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChatReply {
    pub text: String,
    pub account_id: Option<AccountId>,
    pub tool: Option<String>,
}

#[async_trait]
pub trait TurnObserver: Send + Sync {
    async fn tool_selected(&self, tool: &str);
}

pub struct NoopObserver;

#[async_trait]
impl TurnObserver for NoopObserver {
    async fn tool_selected(&self, _tool: &str) {}
}

pub struct AgentRuntime {
    llm: Arc<dyn LlmClient>,
    tools: ToolRegistry,
    guardrails: GuardrailPolicy,
    model: String,
    system_prompt: Option<String>,
}

impl AgentRuntime {
    pub fn new(llm: Arc<dyn LlmClient>, tools: ToolRegistry, config: &AgentConfig) -> Self {
        Self {
            llm,
            tools,
            guardrails: GuardrailPolicy::new(config.max_input_chars),
            model: config.model.clone(),
            system_prompt: config.system_prompt.clone(),
        }
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub async fn complete(&self, request: ChatRequest) -> Result<TurnOutcome, AgentError> {
        self.complete_observed(request, &NoopObserver).await
    }

    /// Initial call, at most one tool execution, then one final call. Tool
    /// calls in the final completion are returned but never executed.
    ///
    /// When the request brings its own `tools`, a call to a function the
    /// registry does not own is handed back to the caller unexecuted.
    pub async fn complete_observed(
        &self,
        mut request: ChatRequest,
        observer: &dyn TurnObserver,
    ) -> Result<TurnOutcome, AgentError> {
        let caller_tools = request.tools.is_some();
        if !caller_tools && !self.tools.is_empty() {
            request.tools = Some(self.tools.definitions());
            request.tool_choice = Some(ToolChoice::auto());
        }

        let first = self.call_model(&request).await?;
        let Some(call) = first.first_tool_call().cloned() else {
            return Ok(TurnOutcome { completion: first, invocation: None });
        };

        let tool_name = call.function.name.clone();
        let Some(tool) = self.tools.get(&tool_name) else {
            if caller_tools {
                info!(
                    event_name = "agent.tool.passed_through",
                    tool = %tool_name,
                    call_id = %call.id,
                    "returning caller-defined tool call unexecuted"
                );
                return Ok(TurnOutcome { completion: first, invocation: None });
            }
            return Err(AgentError::UnknownTool(tool_name));
        };
        let arguments = parse_arguments(&tool_name, &call.function.arguments)?;

        info!(
            event_name = "agent.tool.selected",
            tool = %tool_name,
            call_id = %call.id,
            "model selected tool"
        );
        observer.tool_selected(&tool_name).await;

        let output = tool.execute(arguments.clone()).await.map_err(|error| {
            warn!(event_name = "agent.tool.failed", tool = %tool_name, error = %error, "tool execution failed");
            match error.downcast_ref::<ToolInputError>() {
                Some(input_error) => {
                    AgentError::InvalidArguments { tool: tool_name.clone(), detail: input_error.to_string() }
                }
                None => AgentError::ToolFailed { tool: tool_name.clone(), detail: format!("{error:#}") },
            }
        })?;

        // Every tool_call_id in the resubmitted assistant message needs a tool
        // reply, so only the executed call is kept.
        if let Some(message) = first.first_message() {
            let mut message = message.clone();
            message.tool_calls = vec![call.clone()];
            request.messages.push(message);
        }
        request.messages.push(ChatMessage::tool(&call.id, &tool_name, tool_result_content(&output)));
        if request.tools.is_some() {
            request.tool_choice = Some(ToolChoice::Mode(ToolChoiceMode::None));
        }

        let completion = self.call_model(&request).await?;
        if completion.first_tool_call().is_some() {
            warn!(
                event_name = "agent.tool.ignored",
                tool = %tool_name,
                "final completion requested another tool; not executed"
            );
        }

        Ok(TurnOutcome {
            completion,
            invocation: Some(ToolInvocation { call_id: call.id, tool: tool_name, arguments, output }),
        })
    }

    /// One chat turn: guardrails, the bounded loop, and a fallback sentence
    /// when the model produced no text.
    pub async fn handle_message(
        &self,
        text: &str,
        observer: &dyn TurnObserver,
    ) -> Result<ChatReply, AgentError> {
        let normalized = normalize_message(text);
        if let GuardrailDecision::Deny { reason_code, user_message } =
            self.guardrails.evaluate(&normalized)
        {
            info!(event_name = "agent.guardrail.denied", reason_code, "message rejected by guardrails");
            return Err(AgentError::Rejected { reason_code, user_message });
        }

        let request = ChatRequest::new(
            self.model.clone(),
            initial_messages(self.system_prompt.as_deref(), &normalized),
        );
        let outcome = self.complete_observed(request, observer).await?;

        Ok(ChatReply {
            text: outcome.completion.first_text().unwrap_or(FALLBACK_REPLY).to_owned(),
            account_id: outcome.account_id(),
            tool: outcome.invocation.map(|invocation| invocation.tool),
        })
    }

    async fn call_model(&self, request: &ChatRequest) -> Result<ChatCompletion, AgentError> {
        self.llm.chat(request).await.map_err(|error| {
            warn!(event_name = "agent.llm.failed", model = %request.model, error = %error, "model call failed");
            AgentError::Llm(format!("{error:#}"))
        })
    }
}

fn parse_arguments(tool: &str, raw: &str) -> Result<Value, AgentError> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    let arguments: Value = serde_json::from_str(raw).map_err(|error| AgentError::InvalidArguments {
        tool: tool.to_owned(),
        detail: error.to_string(),
    })?;
    if !arguments.is_object() {
        return Err(AgentError::InvalidArguments {
            tool: tool.to_owned(),
            detail: "arguments must be a JSON object".to_owned(),
        });
    }
    Ok(arguments)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use serde_json::{Map, Value};

    use opshub_clients::{ClientError, CrmRepository, InMemoryCrm};
    use opshub_core::config::AppConfig;
    use opshub_core::domain::chat::{
        ChatMessage, ChatRequest, ChatRole, FunctionCall, ToolCall, ToolChoice, ToolChoiceMode,
        ToolDefinition,
    };
    use opshub_core::domain::crm::{
        AccountId, AccountMatch, Case, Contact, CreatedRecord, NewNote, NewTask, Opportunity, Task,
    };

    use super::{AgentError, AgentRuntime, NoopObserver, TurnObserver, FALLBACK_REPLY};
    use crate::crm_tools::crm_tool_registry;
    use crate::llm::{text_completion, tool_call_completion, ScriptedLlm};

    async fn runtime(llm: Arc<ScriptedLlm>) -> AgentRuntime {
        let crm = Arc::new(InMemoryCrm::default());
        let acme = AccountId::parse("001000000000001AAA").expect("valid id");
        crm.insert_account(&acme, "Acme Corp", Some("Manufacturing")).await;
        AgentRuntime::new(llm, crm_tool_registry(crm), &AppConfig::default().agent)
    }

    #[derive(Default)]
    struct RecordingObserver {
        tools: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TurnObserver for RecordingObserver {
        async fn tool_selected(&self, tool: &str) {
            self.tools.lock().await.push(tool.to_owned());
        }
    }

    #[tokio::test]
    async fn plain_answer_makes_a_single_model_call() {
        let llm = Arc::new(ScriptedLlm::new(vec![text_completion("Hello there")]));
        let agent = runtime(llm.clone()).await;

        let outcome = agent
            .complete(ChatRequest::new("palmyra-x-004", vec![ChatMessage::user("hi")]))
            .await
            .expect("completes");

        assert_eq!(outcome.completion.first_text(), Some("Hello there"));
        assert!(outcome.invocation.is_none());
        let requests = llm.requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].tools.as_ref().map(Vec::len), Some(6));
        assert_eq!(requests[0].tool_choice, Some(ToolChoice::auto()));
    }

    #[tokio::test]
    async fn tool_result_is_fed_back_for_the_final_answer() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            tool_call_completion("call_1", "get_account_data", r#"{"account_id": "001000000000001AAA"}"#),
            text_completion("Acme Corp is a manufacturing account."),
        ]));
        let agent = runtime(llm.clone()).await;
        let observer = RecordingObserver::default();

        let reply = agent.handle_message("<@U1> tell me about Acme", &observer).await.expect("replies");

        assert_eq!(reply.text, "Acme Corp is a manufacturing account.");
        assert_eq!(reply.tool.as_deref(), Some("get_account_data"));
        assert_eq!(reply.account_id.as_ref().map(AccountId::as_str), Some("001000000000001AAA"));
        assert_eq!(*observer.tools.lock().await, vec!["get_account_data".to_owned()]);

        let requests = llm.requests().await;
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].messages[1].content.as_deref(), Some("tell me about Acme"));
        let followup = &requests[1].messages;
        assert_eq!(followup.len(), 4);
        assert_eq!(followup[2].role, ChatRole::Assistant);
        assert_eq!(followup[3].role, ChatRole::Tool);
        assert_eq!(followup[3].tool_call_id.as_deref(), Some("call_1"));
        assert!(followup[3]
            .content
            .as_deref()
            .is_some_and(|content| content.starts_with("Account Data from Salesforce")));
        assert_eq!(requests[1].tool_choice, Some(ToolChoice::Mode(ToolChoiceMode::None)));
    }

    #[tokio::test]
    async fn second_tool_call_is_never_executed() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            tool_call_completion("call_1", "search_accounts", r#"{"search_term": "acme"}"#),
            tool_call_completion("call_2", "get_contacts", r#"{"account_id": "001000000000001AAA"}"#),
        ]));
        let agent = runtime(llm.clone()).await;
        let observer = RecordingObserver::default();

        let reply = agent.handle_message("find acme", &observer).await.expect("replies");

        assert_eq!(reply.text, FALLBACK_REPLY);
        assert_eq!(reply.account_id, None);
        assert_eq!(*observer.tools.lock().await, vec!["search_accounts".to_owned()]);
        assert_eq!(llm.requests().await.len(), 2);
    }

    #[tokio::test]
    async fn only_the_executed_call_is_resubmitted() {
        let mut first =
            tool_call_completion("call_1", "get_contacts", r#"{"account_id": "001000000000001AAA"}"#);
        first.choices[0].message.tool_calls.push(ToolCall {
            id: "call_2".to_owned(),
            kind: "function".to_owned(),
            function: FunctionCall {
                name: "get_cases".to_owned(),
                arguments: r#"{"account_id": "001000000000001AAA"}"#.to_owned(),
            },
        });
        let llm = Arc::new(ScriptedLlm::new(vec![first, text_completion("Acme has no contacts yet.")]));
        let agent = runtime(llm.clone()).await;

        let reply = agent.handle_message("who works at acme?", &NoopObserver).await.expect("replies");
        assert_eq!(reply.tool.as_deref(), Some("get_contacts"));

        let requests = llm.requests().await;
        let followup = &requests[1].messages;
        let requested: Vec<&str> = followup
            .iter()
            .flat_map(|message| message.tool_calls.iter().map(|call| call.id.as_str()))
            .collect();
        let answered: Vec<&str> =
            followup.iter().filter_map(|message| message.tool_call_id.as_deref()).collect();
        assert_eq!(requested, vec!["call_1"]);
        assert_eq!(requested, answered);
    }

    #[tokio::test]
    async fn caller_defined_tool_call_is_returned_unexecuted() {
        let llm = Arc::new(ScriptedLlm::new(vec![tool_call_completion(
            "call_1",
            "get_weather",
            r#"{"city": "Lisbon"}"#,
        )]));
        let agent = runtime(llm.clone()).await;
        let mut request = ChatRequest::new("palmyra-x-004", vec![ChatMessage::user("weather?")]);
        request.tools = Some(vec![ToolDefinition::function(
            "get_weather",
            "Current weather for a city",
            serde_json::json!({"type": "object", "properties": {"city": {"type": "string"}}}),
        )]);

        let outcome = agent.complete(request).await.expect("passes through");

        assert!(outcome.invocation.is_none());
        assert_eq!(
            outcome.completion.first_tool_call().map(|call| call.function.name.as_str()),
            Some("get_weather")
        );
        let requests = llm.requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].tools.as_ref().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn caller_tools_still_run_registry_functions() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            tool_call_completion("call_1", "search_accounts", r#"{"search_term": "acme"}"#),
            text_completion("Found Acme Corp."),
        ]));
        let agent = runtime(llm.clone()).await;
        let mut request = ChatRequest::new("palmyra-x-004", vec![ChatMessage::user("find acme")]);
        request.tools = Some(agent.tools().definitions());

        let outcome = agent.complete(request).await.expect("completes");

        assert_eq!(outcome.invocation.map(|invocation| invocation.tool).as_deref(), Some("search_accounts"));
        assert_eq!(outcome.completion.first_text(), Some("Found Acme Corp."));
        assert_eq!(llm.requests().await.len(), 2);
    }

    #[tokio::test]
    async fn unknown_tool_is_an_error() {
        let llm = Arc::new(ScriptedLlm::new(vec![tool_call_completion("call_1", "delete_account", "{}")]));
        let agent = runtime(llm).await;

        let error = agent
            .complete(ChatRequest::new("palmyra-x-004", vec![ChatMessage::user("hi")]))
            .await
            .expect_err("unknown tool");
        assert!(matches!(error, AgentError::UnknownTool(ref name) if name == "delete_account"));
    }

    #[tokio::test]
    async fn unparsable_and_invalid_arguments_are_reported() {
        let llm = Arc::new(ScriptedLlm::new(vec![tool_call_completion("call_1", "get_cases", "{not json")]));
        let error = runtime(llm).await.handle_message("cases?", &NoopObserver).await.expect_err("bad json");
        assert!(matches!(error, AgentError::InvalidArguments { ref tool, .. } if tool == "get_cases"));

        let llm = Arc::new(ScriptedLlm::new(vec![tool_call_completion(
            "call_1",
            "get_cases",
            r#"{"account_id": "acme"}"#,
        )]));
        let error = runtime(llm).await.handle_message("cases?", &NoopObserver).await.expect_err("bad id");
        assert!(matches!(error, AgentError::InvalidArguments { .. }));
    }

    #[tokio::test]
    async fn failing_tool_is_reported_as_tool_failure() {
        let llm = Arc::new(ScriptedLlm::new(vec![tool_call_completion(
            "call_1",
            "search_accounts",
            r#"{"search_term": "acme"}"#,
        )]));
        let agent = AgentRuntime::new(
            llm,
            crm_tool_registry(Arc::new(FailingCrm)),
            &AppConfig::default().agent,
        );

        let error = agent.handle_message("find acme", &NoopObserver).await.expect_err("tool fails");
        assert!(matches!(error, AgentError::ToolFailed { ref tool, .. } if tool == "search_accounts"));
        assert_eq!(error.user_message(), "I couldn't complete that lookup.");
    }

    #[tokio::test]
    async fn guardrails_reject_before_calling_the_model() {
        let llm = Arc::new(ScriptedLlm::new(vec![]));
        let agent = runtime(llm.clone()).await;

        let error = agent.handle_message("<@U024BE7LH>", &NoopObserver).await.expect_err("rejected");
        assert!(matches!(error, AgentError::Rejected { reason_code: "empty_message", .. }));
        assert!(llm.requests().await.is_empty());
    }

    #[tokio::test]
    async fn model_failure_is_an_llm_error() {
        let agent = runtime(Arc::new(ScriptedLlm::new(vec![]))).await;

        let error = agent.handle_message("hello", &NoopObserver).await.expect_err("no response");
        assert!(matches!(error, AgentError::Llm(_)));
    }

    struct FailingCrm;

    #[async_trait]
    impl CrmRepository for FailingCrm {
        async fn search_accounts(&self, _term: &str) -> Result<Vec<AccountMatch>, ClientError> {
            Err(ClientError::Status { service: "salesforce", status: 500, body: "INTERNAL".to_owned() })
        }

        async fn get_account(&self, _id: &AccountId) -> Result<Option<Map<String, Value>>, ClientError> {
            Ok(None)
        }

        async fn contacts_for_account(&self, _id: &AccountId) -> Result<Vec<Contact>, ClientError> {
            Ok(Vec::new())
        }

        async fn opportunities_for_account(&self, _id: &AccountId) -> Result<Vec<Opportunity>, ClientError> {
            Ok(Vec::new())
        }

        async fn cases_for_account(&self, _id: &AccountId) -> Result<Vec<Case>, ClientError> {
            Ok(Vec::new())
        }

        async fn tasks_for_account(&self, _id: &AccountId) -> Result<Vec<Task>, ClientError> {
            Ok(Vec::new())
        }

        async fn create_task(&self, _task: NewTask) -> Result<CreatedRecord, ClientError> {
            Err(ClientError::InvalidInput("read only".to_owned()))
        }

        async fn add_note(&self, _note: NewNote) -> Result<CreatedRecord, ClientError> {
            Err(ClientError::InvalidInput("read only".to_owned()))
        }
    }
}
