use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use opshub_core::config::WriterConfig;
use opshub_core::domain::chat::{ChatCompletion, ChatRequest};

use crate::error::ClientError;
use crate::http::{join_url, send_json};

const SERVICE: &str = "writer";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationInput {
    pub id: String,
    pub value: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedContent {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub suggestion: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphQuestion {
    pub graph_ids: Vec<String>,
    pub question: String,
    #[serde(default)]
    pub stream: bool,
    #[serde(default)]
    pub subqueries: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphAnswer {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<Value>,
}

#[derive(Deserialize)]
struct CreatedResource {
    id: String,
}

/// Writer platform client: chat completions, no-code applications, files
/// and knowledge graphs.
pub struct WriterClient {
    http: Client,
    base_url: String,
    api_key: SecretString,
}

impl WriterClient {
    pub fn new(http: Client, config: &WriterConfig) -> Result<Self, ClientError> {
        let Some(api_key) = config.api_key.clone() else {
            return Err(ClientError::NotConfigured { service: SERVICE });
        };
        Ok(Self { http, base_url: config.base_url.clone(), api_key })
    }

    fn url(&self, path: &str) -> String {
        join_url(&self.base_url, &format!("v1/{path}"))
    }

    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatCompletion, ClientError> {
        debug!(
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.as_ref().map_or(0, Vec::len),
            "writer chat request"
        );
        send_json(
            SERVICE,
            "chat",
            self.http.post(self.url("chat")).bearer_auth(self.api_key.expose_secret()).json(request),
        )
        .await
    }

    pub async fn generate_content(
        &self,
        application_id: &str,
        inputs: &[ApplicationInput],
    ) -> Result<GeneratedContent, ClientError> {
        if application_id.trim().is_empty() {
            return Err(ClientError::InvalidInput("application_id must not be empty".to_owned()));
        }
        send_json(
            SERVICE,
            &format!("application {application_id}"),
            self.http
                .post(self.url(&format!("applications/{application_id}")))
                .bearer_auth(self.api_key.expose_secret())
                .json(&json!({ "inputs": inputs })),
        )
        .await
    }

    /// Uploads raw file content and returns the Writer file id.
    pub async fn upload_file(&self, filename: &str, content: Vec<u8>) -> Result<String, ClientError> {
        let filename = sanitize_filename(filename)?;
        let created: CreatedResource = send_json(
            SERVICE,
            "files",
            self.http
                .post(self.url("files"))
                .bearer_auth(self.api_key.expose_secret())
                .header(CONTENT_TYPE, content_type_for(&filename))
                .header(CONTENT_DISPOSITION, format!("attachment; filename={filename}"))
                .body(content),
        )
        .await?;
        Ok(created.id)
    }

    pub async fn create_graph(&self, name: &str) -> Result<String, ClientError> {
        if name.trim().is_empty() {
            return Err(ClientError::InvalidInput("graph name must not be empty".to_owned()));
        }
        let created: CreatedResource = send_json(
            SERVICE,
            "graphs",
            self.http
                .post(self.url("graphs"))
                .bearer_auth(self.api_key.expose_secret())
                .json(&json!({ "name": name })),
        )
        .await?;
        Ok(created.id)
    }

    pub async fn add_file_to_graph(&self, graph_id: &str, file_id: &str) -> Result<String, ClientError> {
        let added: CreatedResource = send_json(
            SERVICE,
            &format!("graph {graph_id}"),
            self.http
                .post(self.url(&format!("graphs/{graph_id}/file")))
                .bearer_auth(self.api_key.expose_secret())
                .json(&json!({ "file_id": file_id })),
        )
        .await?;
        Ok(added.id)
    }

    pub async fn question_graph(&self, question: &GraphQuestion) -> Result<GraphAnswer, ClientError> {
        if question.graph_ids.is_empty() {
            return Err(ClientError::InvalidInput("at least one graph id is required".to_owned()));
        }
        send_json(
            SERVICE,
            "graph question",
            self.http
                .post(self.url("graphs/question"))
                .bearer_auth(self.api_key.expose_secret())
                .json(question),
        )
        .await
    }
}

fn content_type_for(filename: &str) -> &'static str {
    if filename.to_ascii_lowercase().ends_with(".pdf") {
        "application/pdf"
    } else {
        "text/plain"
    }
}

/// Keeps the final path component only; the name ends up in a header.
fn sanitize_filename(raw: &str) -> Result<String, ClientError> {
    let name = raw.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    let clean: String = name.chars().filter(|ch| !ch.is_control() && *ch != '"' && *ch != ';').collect();
    if clean.is_empty() || clean == "." || clean == ".." {
        return Err(ClientError::InvalidInput(format!("invalid file name `{raw}`")));
    }
    Ok(clean)
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;

    use opshub_core::config::AppConfig;
    use opshub_core::domain::chat::{ChatMessage, ChatRequest};

    use super::{content_type_for, sanitize_filename, ApplicationInput, GraphQuestion, WriterClient};
    use crate::http::build_http_client;

    fn client(server: &MockServer) -> WriterClient {
        let mut config = AppConfig::default().writer;
        config.base_url = server.base_url();
        config.api_key = Some("writer-key".to_owned().into());
        WriterClient::new(build_http_client(5).expect("http client"), &config).expect("configured")
    }

    #[test]
    fn filenames_are_reduced_to_a_safe_basename() {
        assert_eq!(sanitize_filename("../../etc/passwd").expect("name"), "passwd");
        assert_eq!(sanitize_filename("C:\\reports\\q3.pdf").expect("name"), "q3.pdf");
        assert!(sanitize_filename("uploads/").is_err());
        assert_eq!(content_type_for("Q3.PDF"), "application/pdf");
        assert_eq!(content_type_for("notes.md"), "text/plain");
    }

    #[tokio::test]
    async fn chat_posts_request_with_bearer_key() {
        let server = MockServer::start_async().await;
        let chat = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/chat")
                    .header("authorization", "Bearer writer-key")
                    .json_body_partial(r#"{"model": "palmyra-x-004"}"#);
                then.status(200).json_body(json!({
                    "id": "chat-1",
                    "created": 1,
                    "model": "palmyra-x-004",
                    "choices": [{"index": 0, "message": {"role": "assistant", "content": "Hello"}}]
                }));
            })
            .await;

        let request = ChatRequest::new("palmyra-x-004", vec![ChatMessage::user("Hi")]);
        let completion = client(&server).chat(&request).await.expect("completion");

        chat.assert_async().await;
        assert_eq!(completion.first_text(), Some("Hello"));
    }

    #[tokio::test]
    async fn upload_sets_type_and_disposition() {
        let server = MockServer::start_async().await;
        let upload = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/files")
                    .header("content-type", "application/pdf")
                    .header("content-disposition", "attachment; filename=brief.pdf")
                    .body("%PDF-1.7");
                then.status(200).json_body(json!({"id": "file-1", "name": "brief.pdf"}));
            })
            .await;

        let file_id =
            client(&server).upload_file("brief.pdf", b"%PDF-1.7".to_vec()).await.expect("uploaded");
        upload.assert_async().await;
        assert_eq!(file_id, "file-1");
    }

    #[tokio::test]
    async fn application_and_graph_calls_map_their_payloads() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/applications/app-1").json_body(json!({
                    "inputs": [{"id": "topic", "value": ["pricing"]}]
                }));
                then.status(200).json_body(json!({"title": "Pricing", "suggestion": "Draft"}));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/graphs").json_body(json!({"name": "Playbooks"}));
                then.status(200).json_body(json!({"id": "graph-1"}));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/graphs/graph-1/file").json_body(json!({"file_id": "file-1"}));
                then.status(200).json_body(json!({"id": "file-1"}));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/graphs/question").json_body(json!({
                    "graph_ids": ["graph-1"],
                    "question": "What is our refund policy?",
                    "stream": false,
                    "subqueries": false
                }));
                then.status(200).json_body(json!({
                    "question": "What is our refund policy?",
                    "answer": "30 days.",
                    "sources": [{"file_id": "file-1"}]
                }));
            })
            .await;

        let writer = client(&server);
        let generated = writer
            .generate_content(
                "app-1",
                &[ApplicationInput { id: "topic".to_owned(), value: vec!["pricing".to_owned()] }],
            )
            .await
            .expect("generated");
        assert_eq!(generated.suggestion, "Draft");

        let graph_id = writer.create_graph("Playbooks").await.expect("graph");
        let file_id = writer.add_file_to_graph(&graph_id, "file-1").await.expect("file added");
        assert_eq!((graph_id.as_str(), file_id.as_str()), ("graph-1", "file-1"));

        let answer = writer
            .question_graph(&GraphQuestion {
                graph_ids: vec!["graph-1".to_owned()],
                question: "What is our refund policy?".to_owned(),
                stream: false,
                subqueries: false,
            })
            .await
            .expect("answer");
        assert_eq!(answer.answer, "30 days.");
        assert_eq!(answer.sources.len(), 1);
    }
}
