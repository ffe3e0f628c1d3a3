use std::collections::VecDeque;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::sync::Mutex;

use opshub_clients::WriterClient;
use opshub_core::domain::chat::{
    ChatChoice, ChatCompletion, ChatMessage, ChatRequest, ChatRole, FunctionCall, ToolCall,
};

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatCompletion>;
}

#[async_trait]
impl LlmClient for WriterClient {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatCompletion> {
        Ok(WriterClient::chat(self, request).await?)
    }
}

/// Replays canned completions in order and records every request.
#[derive(Default)]
pub struct ScriptedLlm {
    responses: Mutex<VecDeque<ChatCompletion>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedLlm {
    pub fn new(responses: Vec<ChatCompletion>) -> Self {
        Self { responses: Mutex::new(responses.into()), requests: Mutex::default() }
    }

    pub async fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatCompletion> {
        self.requests.lock().await.push(request.clone());
        self.responses.lock().await.pop_front().ok_or_else(|| anyhow!("scripted model has no response left"))
    }
}

pub fn text_completion(text: &str) -> ChatCompletion {
    completion(ChatMessage::assistant(text))
}

pub fn tool_call_completion(call_id: &str, tool_name: &str, arguments: &str) -> ChatCompletion {
    completion(ChatMessage {
        role: ChatRole::Assistant,
        content: None,
        tool_calls: vec![ToolCall {
            id: call_id.to_owned(),
            kind: "function".to_owned(),
            function: FunctionCall { name: tool_name.to_owned(), arguments: arguments.to_owned() },
        }],
        tool_call_id: None,
        name: None,
    })
}

fn completion(message: ChatMessage) -> ChatCompletion {
    let finish_reason = if message.tool_calls.is_empty() { "stop" } else { "tool_calls" };
    ChatCompletion {
        id: "scripted".to_owned(),
        choices: vec![ChatChoice { index: 0, message, finish_reason: Some(finish_reason.to_owned()) }],
        created: 0,
        model: "scripted".to_owned(),
        usage: None,
    }
}
