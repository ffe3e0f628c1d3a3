use axum::{
    extract::{Path, State},
    routing::{get, patch},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use opshub_clients::{AirtableClient, AirtableRecord};

use crate::{
    error::ApiError,
    state::{require, AppState},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/airtable/records", get(list_records).post(create_record))
        .route("/api/v1/airtable/records/{record_id}", patch(update_record).delete(delete_record))
}

fn airtable(state: &AppState) -> Result<&AirtableClient, ApiError> {
    require(&state.integrations.airtable, "airtable")
}

#[derive(Debug, Deserialize)]
struct RecordFields {
    fields: Map<String, Value>,
}

impl RecordFields {
    fn non_empty(self) -> Result<Map<String, Value>, ApiError> {
        if self.fields.is_empty() {
            return Err(ApiError::bad_request("fields must not be empty"));
        }
        Ok(self.fields)
    }
}

#[derive(Debug, Serialize)]
struct RecordsResponse {
    records: Vec<AirtableRecord>,
}

#[derive(Debug, Serialize)]
struct RecordResponse {
    record: AirtableRecord,
}

#[derive(Debug, Serialize)]
struct DeletedResponse {
    deleted: bool,
    id: String,
}

async fn list_records(State(state): State<AppState>) -> Result<Json<RecordsResponse>, ApiError> {
    let records = airtable(&state)?.list_records().await?;
    Ok(Json(RecordsResponse { records }))
}

async fn create_record(
    State(state): State<AppState>,
    Json(body): Json<RecordFields>,
) -> Result<Json<RecordResponse>, ApiError> {
    let record = airtable(&state)?.create_record(body.non_empty()?).await?;
    Ok(Json(RecordResponse { record }))
}

async fn update_record(
    State(state): State<AppState>,
    Path(record_id): Path<String>,
    Json(body): Json<RecordFields>,
) -> Result<Json<RecordResponse>, ApiError> {
    let record = airtable(&state)?.update_record(&record_id, body.non_empty()?).await?;
    Ok(Json(RecordResponse { record }))
}

async fn delete_record(
    State(state): State<AppState>,
    Path(record_id): Path<String>,
) -> Result<Json<DeletedResponse>, ApiError> {
    airtable(&state)?.delete_record(&record_id).await?;
    Ok(Json(DeletedResponse { deleted: true, id: record_id }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
    };
    use httpmock::prelude::*;
    use serde_json::json;

    use opshub_clients::{build_http_client, AirtableClient};
    use opshub_core::config::AppConfig;

    use crate::state::{AppState, Integrations};
    use crate::test_support::{get, json_request, send, state_with};

    fn airtable_state(server: &MockServer) -> AppState {
        let mut config = AppConfig::default();
        config.airtable.api_key = Some("pat-test".to_owned().into());
        config.airtable.base_id = Some("appBase".to_owned());
        config.airtable.table_name = Some("Campaigns".to_owned());
        config.airtable.base_url = server.url("/v0");
        let client =
            AirtableClient::new(build_http_client(5).expect("http"), &config.airtable).expect("configured");
        state_with(config, Integrations { airtable: Some(Arc::new(client)), ..Integrations::default() })
    }

    #[tokio::test]
    async fn records_are_listed_under_a_key() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v0/appBase/Campaigns");
                then.status(200).json_body(json!({"records": [{"id": "rec1", "fields": {"Name": "Q3"}}]}));
            })
            .await;

        let (status, body) = send(airtable_state(&server), get("/api/v1/airtable/records")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"records": [{"id": "rec1", "fields": {"Name": "Q3"}}]}));
    }

    #[tokio::test]
    async fn created_record_is_wrapped() {
        let server = MockServer::start_async().await;
        let create = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v0/appBase/Campaigns")
                    .json_body(json!({"fields": {"Name": "Launch"}}));
                then.status(200).json_body(json!({"id": "rec9", "fields": {"Name": "Launch"}}));
            })
            .await;

        let (status, body) = send(
            airtable_state(&server),
            json_request(Method::POST, "/api/v1/airtable/records", json!({"fields": {"Name": "Launch"}})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["record"]["id"], "rec9");
        create.assert_async().await;
    }

    #[tokio::test]
    async fn empty_update_is_rejected() {
        let server = MockServer::start_async().await;

        let (status, body) = send(
            airtable_state(&server),
            json_request(Method::PATCH, "/api/v1/airtable/records/rec9", json!({"fields": {}})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "fields must not be empty");
    }

    #[tokio::test]
    async fn delete_reports_the_id_and_missing_records_are_404() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(DELETE).path("/v0/appBase/Campaigns/rec9");
                then.status(200).json_body(json!({"id": "rec9", "deleted": true}));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(DELETE).path("/v0/appBase/Campaigns/recMissing");
                then.status(404).json_body(json!({"error": "NOT_FOUND"}));
            })
            .await;
        let state = airtable_state(&server);

        let delete = |id: &str| {
            Request::builder()
                .method(Method::DELETE)
                .uri(format!("/api/v1/airtable/records/{id}"))
                .body(Body::empty())
                .expect("request")
        };
        let (status, body) = send(state.clone(), delete("rec9")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"deleted": true, "id": "rec9"}));

        let (status, _) = send(state, delete("recMissing")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
