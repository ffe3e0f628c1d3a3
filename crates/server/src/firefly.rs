use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::warn;

use opshub_clients::firefly::first_image_url;

use crate::{
    error::ApiError,
    state::{require, AppState},
};

pub fn router() -> Router<AppState> {
    Router::new().route("/api/v1/firefly/generate-image", post(generate_image))
}

#[derive(Debug, Deserialize)]
struct ImageRequest {
    prompt: String,
}

#[derive(Debug, Serialize)]
struct ImageResponse {
    image_url: String,
}

async fn generate_image(
    State(state): State<AppState>,
    Json(request): Json<ImageRequest>,
) -> Result<Json<ImageResponse>, ApiError> {
    let firefly = require(&state.integrations.firefly, "firefly")?;
    let response = firefly.generate_image(&request.prompt).await?;

    let Some(image_url) = first_image_url(&response) else {
        warn!(
            event_name = "firefly.image.missing_url",
            outputs = response.get("outputs").and_then(serde_json::Value::as_array).map_or(0, Vec::len),
            "generation response carried no image url"
        );
        return Err(ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Failed to retrieve image URL"));
    };
    Ok(Json(ImageResponse { image_url }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::{Method, StatusCode};
    use httpmock::prelude::*;
    use serde_json::{json, Value};

    use opshub_clients::{build_http_client, FireflyClient};
    use opshub_core::config::AppConfig;

    use crate::state::{AppState, Integrations};
    use crate::test_support::{json_request, send, state_with};

    async fn firefly_state(server: &MockServer, generation: Value) -> AppState {
        server
            .mock_async(|when, then| {
                when.method(POST).path("/ims/token/v3");
                then.status(200).json_body(json!({"access_token": "ims-token"}));
            })
            .await;
        server
            .mock_async(move |when, then| {
                when.method(POST).path("/v3/images/generate");
                then.status(200).json_body(generation);
            })
            .await;

        let mut config = AppConfig::default();
        config.firefly.client_id = Some("ff-client".to_owned());
        config.firefly.client_secret = Some("ff-secret".to_owned().into());
        config.firefly.token_url = server.url("/ims/token/v3");
        config.firefly.api_url = server.base_url();
        let client =
            FireflyClient::new(build_http_client(5).expect("http"), &config.firefly).expect("configured");
        state_with(config, Integrations { firefly: Some(Arc::new(client)), ..Integrations::default() })
    }

    fn generate(prompt: &str) -> axum::http::Request<axum::body::Body> {
        json_request(Method::POST, "/api/v1/firefly/generate-image", json!({ "prompt": prompt }))
    }

    #[tokio::test]
    async fn first_output_url_is_returned() {
        let server = MockServer::start_async().await;
        let state = firefly_state(
            &server,
            json!({"outputs": [{"image": {"url": "https://cdn.test/a.png"}}, {"image": {"url": "https://cdn.test/b.png"}}]}),
        )
        .await;

        let (status, body) = send(state, generate("a lighthouse at dawn")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"image_url": "https://cdn.test/a.png"}));
    }

    #[tokio::test]
    async fn response_without_outputs_is_a_500() {
        let server = MockServer::start_async().await;
        let state = firefly_state(&server, json!({"outputs": []})).await;

        let (status, body) = send(state, generate("a lighthouse at dawn")).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to retrieve image URL");
    }

    #[tokio::test]
    async fn unconfigured_firefly_is_503() {
        let (status, _) = send(state_with(AppConfig::default(), Integrations::default()), generate("x")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
