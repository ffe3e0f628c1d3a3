use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde_json::Value;

use opshub_clients::{TrendsDataType, TrendsQuery};

use crate::{
    error::ApiError,
    state::{require, AppState},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/google-trends/interest-over-time", get(interest_over_time))
        .route("/api/v1/google-trends/related-topics", get(related_topics))
        .route("/api/v1/google-trends/related-queries", get(related_queries))
}

async fn fetch(
    state: &AppState,
    data_type: TrendsDataType,
    query: &TrendsQuery,
) -> Result<Json<Value>, ApiError> {
    let trends = require(&state.integrations.trends, "google_trends")?;
    Ok(Json(trends.fetch(data_type, query).await?))
}

async fn interest_over_time(
    State(state): State<AppState>,
    Query(query): Query<TrendsQuery>,
) -> Result<Json<Value>, ApiError> {
    fetch(&state, TrendsDataType::InterestOverTime, &query).await
}

async fn related_topics(
    State(state): State<AppState>,
    Query(query): Query<TrendsQuery>,
) -> Result<Json<Value>, ApiError> {
    fetch(&state, TrendsDataType::RelatedTopics, &query).await
}

async fn related_queries(
    State(state): State<AppState>,
    Query(query): Query<TrendsQuery>,
) -> Result<Json<Value>, ApiError> {
    fetch(&state, TrendsDataType::RelatedQueries, &query).await
}
