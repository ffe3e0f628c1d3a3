//! `/api/v1/writer`: chat completions through the agent loop, no-code
//! application runs, file uploads and knowledge-graph questions.

use axum::{
    body::Bytes,
    extract::{Query, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use opshub_clients::{
    writer::{ApplicationInput, GeneratedContent, GraphAnswer, GraphQuestion},
    WriterClient,
};
use opshub_core::domain::chat::{ChatCompletion, ChatRequest};

use crate::{
    error::ApiError,
    state::{require, AppState},
};

const SERVICE: &str = "writer";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/writer/chat/completion", post(chat_completion))
        .route("/api/v1/writer/text-generation", post(text_generation))
        .route("/api/v1/writer/upload-file", post(upload_file))
        .route("/api/v1/writer/create-graph", post(create_graph))
        .route("/api/v1/writer/add-file-to-graph", post(add_file_to_graph))
        .route("/api/v1/writer/question-graph", post(question_graph))
}

fn writer(state: &AppState) -> Result<&WriterClient, ApiError> {
    require(&state.integrations.writer, SERVICE)
}

async fn chat_completion(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatCompletion>, ApiError> {
    let agent = require(&state.integrations.agent, SERVICE)?;
    let outcome = agent.complete(request).await?;
    if let Some(invocation) = &outcome.invocation {
        info!(
            event_name = "writer.chat.tool_invoked",
            tool = %invocation.tool,
            call_id = %invocation.call_id,
            "chat completion ran a tool"
        );
    }
    Ok(Json(outcome.completion))
}

#[derive(Debug, Deserialize)]
struct TextGenerationRequest {
    application_id: String,
    #[serde(default)]
    inputs: Vec<ApplicationInput>,
}

async fn text_generation(
    State(state): State<AppState>,
    Json(request): Json<TextGenerationRequest>,
) -> Result<Json<GeneratedContent>, ApiError> {
    let generated = writer(&state)?.generate_content(&request.application_id, &request.inputs).await?;
    Ok(Json(generated))
}

#[derive(Debug, Deserialize)]
struct UploadQuery {
    filename: String,
}

#[derive(Debug, Serialize)]
struct FileResponse {
    file_id: String,
}

async fn upload_file(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Result<Json<FileResponse>, ApiError> {
    if body.is_empty() {
        return Err(ApiError::bad_request("file content must not be empty"));
    }
    let file_id = writer(&state)?.upload_file(&query.filename, body.to_vec()).await?;
    Ok(Json(FileResponse { file_id }))
}

#[derive(Debug, Deserialize)]
struct CreateGraphQuery {
    name: String,
}

#[derive(Debug, Serialize)]
struct GraphResponse {
    graph_id: String,
}

async fn create_graph(
    State(state): State<AppState>,
    Query(query): Query<CreateGraphQuery>,
) -> Result<Json<GraphResponse>, ApiError> {
    let graph_id = writer(&state)?.create_graph(&query.name).await?;
    Ok(Json(GraphResponse { graph_id }))
}

#[derive(Debug, Deserialize)]
struct AddFileQuery {
    graph_id: String,
    file_id: String,
}

async fn add_file_to_graph(
    State(state): State<AppState>,
    Query(query): Query<AddFileQuery>,
) -> Result<Json<FileResponse>, ApiError> {
    let file_id = writer(&state)?.add_file_to_graph(&query.graph_id, &query.file_id).await?;
    Ok(Json(FileResponse { file_id }))
}

#[derive(Debug, Deserialize)]
struct QuestionRequest {
    graph_ids: Vec<String>,
    question: String,
}

async fn question_graph(
    State(state): State<AppState>,
    Json(request): Json<QuestionRequest>,
) -> Result<Json<GraphAnswer>, ApiError> {
    let question = GraphQuestion {
        graph_ids: request.graph_ids,
        question: request.question,
        stream: false,
        subqueries: false,
    };
    Ok(Json(writer(&state)?.question_graph(&question).await?))
}
