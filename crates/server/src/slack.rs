//! Slack webhooks. Both endpoints verify the request signature against the
//! raw body, acknowledge right away and hand the envelope to the
//! dispatcher on a spawned task; Slack retries after three seconds.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use opshub_slack::{
    events::{EventContext, HandlerResult, SlackEnvelope},
    payload::{parse_events_body, parse_interaction_body, EventsApiBody},
    signature::{SIGNATURE_HEADER, TIMESTAMP_HEADER},
};

use crate::{
    error::ApiError,
    state::{AppState, SlackState},
};

pub const RETRY_HEADER: &str = "x-slack-retry-num";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/slack/events", post(events))
        .route("/api/v1/slack/interactions", post(interactions))
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn verify(slack: &SlackState, headers: &HeaderMap, body: &[u8]) -> Result<(), ApiError> {
    slack
        .verifier
        .verify(
            header(headers, TIMESTAMP_HEADER),
            header(headers, SIGNATURE_HEADER),
            body,
            chrono::Utc::now().timestamp(),
        )
        .map_err(|error| {
            warn!(event_name = "ingress.slack.signature_rejected", error = %error, "rejected slack request");
            ApiError::new(StatusCode::UNAUTHORIZED, "invalid request signature")
        })
}

async fn events(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Result<Response, ApiError> {
    verify(&state.slack, &headers, &body)?;

    let envelope = match parse_events_body(&body) {
        Ok(EventsApiBody::UrlVerification { challenge }) => {
            info!(event_name = "ingress.slack.url_verification", "answered url verification");
            return Ok(Json(json!({ "challenge": challenge })).into_response());
        }
        Ok(EventsApiBody::Callback(envelope)) => envelope,
        Err(error) => return Err(ApiError::bad_request(error.to_string())),
    };

    if let Some(retry) = header(&headers, RETRY_HEADER) {
        info!(
            event_name = "ingress.slack.retry_skipped",
            envelope_id = %envelope.envelope_id,
            retry,
            "skipping slack retry"
        );
        return Ok(StatusCode::OK.into_response());
    }

    spawn_dispatch(state.slack.clone(), envelope);
    Ok(StatusCode::OK.into_response())
}

async fn interactions(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    verify(&state.slack, &headers, &body)?;
    let envelope = parse_interaction_body(&body).map_err(|error| ApiError::bad_request(error.to_string()))?;
    spawn_dispatch(state.slack.clone(), envelope);
    Ok(StatusCode::OK)
}

fn spawn_dispatch(slack: Arc<SlackState>, envelope: SlackEnvelope) {
    tokio::spawn(async move { dispatch(&slack, &envelope).await });
}

async fn dispatch(slack: &SlackState, envelope: &SlackEnvelope) {
    let correlation_id = Uuid::new_v4().to_string();
    info!(
        event_name = "ingress.slack.envelope_received",
        envelope_id = %envelope.envelope_id,
        event_type = ?envelope.event.event_type(),
        correlation_id = %correlation_id,
        "received slack envelope"
    );

    let ctx = EventContext { correlation_id: correlation_id.clone() };
    match slack.dispatcher.dispatch(envelope, &ctx).await {
        Ok(HandlerResult::Responded(message)) => {
            let Some(channel) = envelope.event.reply_channel() else {
                debug!(correlation_id = %correlation_id, "response has no channel to post to");
                return;
            };
            if let Err(error) = slack.api.post_message(channel, &message).await {
                warn!(
                    event_name = "egress.slack.post_failed",
                    correlation_id = %correlation_id,
                    error = %error,
                    "failed to post slack response"
                );
            }
        }
        Ok(result) => {
            debug!(correlation_id = %correlation_id, result = ?result, "slack envelope handled");
        }
        Err(error) => {
            warn!(
                event_name = "ingress.slack.dispatch_failed",
                envelope_id = %envelope.envelope_id,
                correlation_id = %correlation_id,
                error = %error,
                "event dispatch failed"
            );
        }
    }
}
