//! `/api/v1/salesforce`: account summaries, related lists and the two CRM
//! writes, backed by whatever `CrmRepository` the state carries.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use opshub_clients::{account_snapshot, CrmRepository};
use opshub_core::domain::crm::{AccountId, AccountMatch, CreatedRecord, NewNote, NewTask};

use crate::{
    error::ApiError,
    state::{require, AppState},
};

const SERVICE: &str = "salesforce";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/salesforce/account/{account_id}", get(account_data))
        .route("/api/v1/salesforce/search/accounts", get(search_accounts))
        .route("/api/v1/salesforce/account/{account_id}/contacts", get(contacts))
        .route("/api/v1/salesforce/account/{account_id}/opportunities", get(opportunities))
        .route("/api/v1/salesforce/account/{account_id}/cases", get(cases))
        .route("/api/v1/salesforce/account/{account_id}/tasks", get(tasks).post(create_task))
        .route("/api/v1/salesforce/account/{account_id}/notes", post(add_note))
}

fn crm(state: &AppState) -> Result<&dyn CrmRepository, ApiError> {
    require(&state.integrations.crm, SERVICE)
}

#[derive(Debug, Serialize)]
struct AccountDataResponse {
    account_id: String,
    account_data: String,
}

async fn account_data(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<AccountDataResponse>, ApiError> {
    let account_id = AccountId::parse(&raw_id)?;
    let snapshot = account_snapshot(crm(&state)?, &account_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("No data found for account ID {account_id}")))?;

    Ok(Json(AccountDataResponse {
        account_id: account_id.to_string(),
        account_data: snapshot.render_summary(),
    }))
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search_term: String,
}

#[derive(Debug, Serialize)]
struct SearchResponse {
    search_term: String,
    accounts: Vec<AccountMatch>,
}

async fn search_accounts(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, ApiError> {
    let search_term = query.search_term.trim().to_owned();
    if search_term.is_empty() {
        return Err(ApiError::bad_request("search_term is required"));
    }

    let accounts = crm(&state)?.search_accounts(&search_term).await?;
    if accounts.is_empty() {
        return Err(ApiError::not_found(format!("No accounts found for search term: {search_term}")));
    }
    Ok(Json(SearchResponse { search_term, accounts }))
}

/// `{account_id, <kind>: [...]}`, or 404 when the list is empty.
fn related_list<T: Serialize>(
    kind: &str,
    account_id: &AccountId,
    records: Vec<T>,
) -> Result<Json<Value>, ApiError> {
    if records.is_empty() {
        return Err(ApiError::not_found(format!("No {kind} found for account ID {account_id}")));
    }

    let records = serde_json::to_value(records)
        .map_err(|error| ApiError::from(opshub_clients::ClientError::decode(SERVICE, error)))?;
    let mut body = Map::new();
    body.insert("account_id".to_owned(), Value::String(account_id.to_string()));
    body.insert(kind.to_owned(), records);
    Ok(Json(Value::Object(body)))
}

async fn contacts(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let account_id = AccountId::parse(&raw_id)?;
    related_list("contacts", &account_id, crm(&state)?.contacts_for_account(&account_id).await?)
}

async fn opportunities(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let account_id = AccountId::parse(&raw_id)?;
    related_list(
        "opportunities",
        &account_id,
        crm(&state)?.opportunities_for_account(&account_id).await?,
    )
}

async fn cases(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let account_id = AccountId::parse(&raw_id)?;
    related_list("cases", &account_id, crm(&state)?.cases_for_account(&account_id).await?)
}

async fn tasks(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let account_id = AccountId::parse(&raw_id)?;
    related_list("tasks", &account_id, crm(&state)?.tasks_for_account(&account_id).await?)
}

#[derive(Debug, Deserialize)]
struct CreateTaskRequest {
    subject: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    activity_date: Option<String>,
}

async fn create_task(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    Json(request): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<CreatedRecord>), ApiError> {
    let account_id = AccountId::parse(&raw_id)?;
    let mut task = NewTask::new(account_id, request.subject)
        .with_activity_date(request.activity_date.as_deref())?;
    if let Some(status) = request.status.filter(|status| !status.trim().is_empty()) {
        task.status = status;
    }
    task.validate()?;

    let created = crm(&state)?.create_task(task).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[derive(Debug, Deserialize)]
struct AddNoteRequest {
    title: String,
    #[serde(default)]
    body: String,
}

async fn add_note(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    Json(request): Json<AddNoteRequest>,
) -> Result<(StatusCode, Json<CreatedRecord>), ApiError> {
    let note = NewNote { account_id: AccountId::parse(&raw_id)?, title: request.title, body: request.body };
    note.validate()?;

    let created = crm(&state)?.add_note(note).await?;
    Ok((StatusCode::CREATED, Json(created)))
}
