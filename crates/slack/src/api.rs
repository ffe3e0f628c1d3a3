use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::blocks::{MessageTemplate, View};

#[derive(Debug, Error)]
pub enum SlackApiError {
    #[error("slack `{method}` request failed: {source}")]
    Transport {
        method: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("slack `{method}` returned HTTP {status}")]
    Status { method: &'static str, status: u16 },
    #[error("slack `{method}` returned error `{error}`")]
    Api { method: &'static str, error: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PostedMessage {
    pub channel: String,
    pub ts: String,
}

#[async_trait]
pub trait SlackApi: Send + Sync {
    async fn post_message(
        &self,
        channel: &str,
        message: &MessageTemplate,
    ) -> Result<PostedMessage, SlackApiError>;

    async fn update_message(
        &self,
        channel: &str,
        ts: &str,
        message: &MessageTemplate,
    ) -> Result<(), SlackApiError>;

    async fn open_view(&self, trigger_id: &str, view: &View) -> Result<(), SlackApiError>;
}

#[derive(Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    ts: Option<String>,
}

/// Slack Web API over HTTPS with the bot token.
pub struct SlackWebClient {
    http: Client,
    base_url: String,
    bot_token: SecretString,
}

impl SlackWebClient {
    pub fn new(http: Client, base_url: impl Into<String>, bot_token: SecretString) -> Self {
        Self { http, base_url: base_url.into().trim_end_matches('/').to_owned(), bot_token }
    }

    async fn call(&self, method: &'static str, body: Value) -> Result<ApiResponse, SlackApiError> {
        let response = self
            .http
            .post(format!("{}/{method}", self.base_url))
            .bearer_auth(self.bot_token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|source| SlackApiError::Transport { method, source })?;

        let status = response.status();
        if !status.is_success() {
            warn!(event_name = "egress.slack.http_error", method, status = status.as_u16(), "slack api call failed");
            return Err(SlackApiError::Status { method, status: status.as_u16() });
        }

        let parsed: ApiResponse =
            response.json().await.map_err(|source| SlackApiError::Transport { method, source })?;
        if !parsed.ok {
            let error = parsed.error.unwrap_or_else(|| "unknown_error".to_owned());
            warn!(event_name = "egress.slack.api_error", method, error = %error, "slack api call rejected");
            return Err(SlackApiError::Api { method, error });
        }

        debug!(event_name = "egress.slack.ok", method, "slack api call succeeded");
        Ok(parsed)
    }
}

#[async_trait]
impl SlackApi for SlackWebClient {
    async fn post_message(
        &self,
        channel: &str,
        message: &MessageTemplate,
    ) -> Result<PostedMessage, SlackApiError> {
        let response = self
            .call(
                "chat.postMessage",
                json!({ "channel": channel, "text": message.fallback_text, "blocks": message.blocks }),
            )
            .await?;

        Ok(PostedMessage {
            channel: response.channel.unwrap_or_else(|| channel.to_owned()),
            ts: response.ts.ok_or_else(|| SlackApiError::Api {
                method: "chat.postMessage",
                error: "missing_ts".to_owned(),
            })?,
        })
    }

    async fn update_message(
        &self,
        channel: &str,
        ts: &str,
        message: &MessageTemplate,
    ) -> Result<(), SlackApiError> {
        self.call(
            "chat.update",
            json!({
                "channel": channel,
                "ts": ts,
                "text": message.fallback_text,
                "blocks": message.blocks
            }),
        )
        .await?;
        Ok(())
    }

    async fn open_view(&self, trigger_id: &str, view: &View) -> Result<(), SlackApiError> {
        self.call("views.open", json!({ "trigger_id": trigger_id, "view": view })).await?;
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlackCall {
    Post { channel: String, message: MessageTemplate },
    Update { channel: String, ts: String, message: MessageTemplate },
    OpenView { trigger_id: String, view: View },
}

/// In-memory `SlackApi` that records every call. Posted messages get
/// sequential timestamps.
#[derive(Default)]
pub struct RecordingSlackApi {
    calls: RwLock<Vec<SlackCall>>,
    next_ts: AtomicU64,
    failing_method: Option<&'static str>,
}

impl RecordingSlackApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call to `method` fails with a Slack API error.
    pub fn failing(method: &'static str) -> Self {
        Self { failing_method: Some(method), ..Self::default() }
    }

    pub async fn calls(&self) -> Vec<SlackCall> {
        self.calls.read().await.clone()
    }

    fn check(&self, method: &'static str) -> Result<(), SlackApiError> {
        if self.failing_method == Some(method) {
            return Err(SlackApiError::Api { method, error: "channel_not_found".to_owned() });
        }
        Ok(())
    }
}

#[async_trait]
impl SlackApi for RecordingSlackApi {
    async fn post_message(
        &self,
        channel: &str,
        message: &MessageTemplate,
    ) -> Result<PostedMessage, SlackApiError> {
        self.check("chat.postMessage")?;
        let sequence = self.next_ts.fetch_add(1, Ordering::Relaxed) + 1;
        self.calls
            .write()
            .await
            .push(SlackCall::Post { channel: channel.to_owned(), message: message.clone() });
        Ok(PostedMessage { channel: channel.to_owned(), ts: format!("1700000000.{sequence:06}") })
    }

    async fn update_message(
        &self,
        channel: &str,
        ts: &str,
        message: &MessageTemplate,
    ) -> Result<(), SlackApiError> {
        self.check("chat.update")?;
        self.calls.write().await.push(SlackCall::Update {
            channel: channel.to_owned(),
            ts: ts.to_owned(),
            message: message.clone(),
        });
        Ok(())
    }

    async fn open_view(&self, trigger_id: &str, view: &View) -> Result<(), SlackApiError> {
        self.check("views.open")?;
        self.calls
            .write()
            .await
            .push(SlackCall::OpenView { trigger_id: trigger_id.to_owned(), view: view.clone() });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;

    use super::{RecordingSlackApi, SlackApi, SlackApiError, SlackCall, SlackWebClient};
    use crate::blocks::{plain_message, task_modal};

    fn client(server: &MockServer) -> SlackWebClient {
        SlackWebClient::new(reqwest::Client::new(), server.url("/api"), "xoxb-test".to_owned().into())
    }

    #[tokio::test]
    async fn post_message_sends_fallback_text_and_blocks() {
        let server = MockServer::start_async().await;
        let post = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/chat.postMessage")
                    .header("authorization", "Bearer xoxb-test")
                    .json_body_partial(r#"{"channel": "C1", "text": "Working on it"}"#);
                then.status(200).json_body(json!({"ok": true, "channel": "C1", "ts": "1503435956.000247"}));
            })
            .await;

        let posted =
            client(&server).post_message("C1", &plain_message("Working on it")).await.expect("posted");
        post.assert_async().await;
        assert_eq!(posted.ts, "1503435956.000247");
    }

    #[tokio::test]
    async fn ok_false_is_an_api_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/chat.update");
                then.status(200).json_body(json!({"ok": false, "error": "message_not_found"}));
            })
            .await;

        let error = client(&server)
            .update_message("C1", "1.0", &plain_message("done"))
            .await
            .expect_err("rejected");
        assert!(matches!(
            error,
            SlackApiError::Api { method: "chat.update", ref error } if error == "message_not_found"
        ));
    }

    #[tokio::test]
    async fn open_view_posts_trigger_and_modal() {
        let server = MockServer::start_async().await;
        let open = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/views.open")
                    .json_body_partial(r#"{"trigger_id": "trigger-1", "view": {"type": "modal"}}"#);
                then.status(200).json_body(json!({"ok": true, "view": {"id": "V1"}}));
            })
            .await;

        client(&server).open_view("trigger-1", &task_modal("001000000000001AAA")).await.expect("opened");
        open.assert_async().await;
    }

    #[tokio::test]
    async fn recording_api_keeps_calls_in_order() {
        let api = RecordingSlackApi::new();
        let first = api.post_message("C1", &plain_message("one")).await.expect("posted");
        let second = api.post_message("C1", &plain_message("two")).await.expect("posted");
        api.update_message("C1", &first.ts, &plain_message("one, edited")).await.expect("updated");

        assert_ne!(first.ts, second.ts);
        let calls = api.calls().await;
        assert_eq!(calls.len(), 3);
        assert!(matches!(&calls[2], SlackCall::Update { ts, .. } if *ts == first.ts));

        let failing = RecordingSlackApi::failing("views.open");
        assert!(failing.open_view("t", &task_modal("001000000000001AAA")).await.is_err());
        assert!(failing.calls().await.is_empty());
    }
}
