use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use opshub_clients::CallTranscript;

use crate::{
    error::ApiError,
    state::{require, AppState},
};

pub fn router() -> Router<AppState> {
    Router::new().route("/api/v1/gong/calls/{call_id}/transcript", get(call_transcript))
}

async fn call_transcript(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
) -> Result<Json<CallTranscript>, ApiError> {
    let gong = require(&state.integrations.gong, "gong")?;
    Ok(Json(gong.call_transcript(&call_id).await?))
}
