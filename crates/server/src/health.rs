use std::collections::BTreeMap;

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::state::AppState;

pub const SERVICE_NAME: &str = "opshub-server";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    /// Whether each integration has complete credentials. Nothing is called.
    pub integrations: BTreeMap<&'static str, bool>,
    pub checked_at: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/healthcheck", get(health))
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: SERVICE_NAME,
        integrations: state.config.integrations().into_iter().collect(),
        checked_at: Utc::now().to_rfc3339(),
    })
}
