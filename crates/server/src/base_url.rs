use axum::{
    extract::State,
    http::{header::HOST, HeaderMap},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tracing::info;

use crate::{error::ApiError, state::AppState};

const FORWARDED_PROTO: &str = "x-forwarded-proto";

pub fn router() -> Router<AppState> {
    Router::new().route("/api/v1/base-url", get(current).post(capture))
}

#[derive(Debug, Serialize)]
struct BaseUrlResponse {
    base_url: Option<String>,
}

#[derive(Debug, Serialize)]
struct CapturedBaseUrl {
    message: &'static str,
    base_url: String,
}

const CAPTURED_MESSAGE: &str = "Base URL updated successfully.";

async fn current(State(state): State<AppState>) -> Json<BaseUrlResponse> {
    Json(BaseUrlResponse { base_url: state.base_url.read().await.clone() })
}

/// `{proto}://{host}` as seen by the caller; a proxy's forwarded scheme
/// wins over plain http.
fn derive_base_url(headers: &HeaderMap) -> Result<String, ApiError> {
    let host = headers
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|host| !host.is_empty())
        .ok_or_else(|| ApiError::bad_request("request has no Host header"))?;
    let proto = headers
        .get(FORWARDED_PROTO)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|proto| !proto.is_empty())
        .unwrap_or("http");
    Ok(format!("{proto}://{host}"))
}

async fn capture(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<CapturedBaseUrl>, ApiError> {
    let base_url = derive_base_url(&headers)?;
    info!(event_name = "system.base_url.captured", base_url = %base_url, "stored public base url");
    *state.base_url.write().await = Some(base_url.clone());
    Ok(Json(CapturedBaseUrl { message: CAPTURED_MESSAGE, base_url }))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header::HOST, HeaderMap, HeaderValue, Method, Request, StatusCode},
    };
    use serde_json::json;

    use opshub_core::config::AppConfig;

    use super::derive_base_url;
    use crate::state::Integrations;
    use crate::test_support::{get, send, state_with};

    #[test]
    fn forwarded_proto_takes_the_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(HOST, HeaderValue::from_static("hub.example.com"));
        assert_eq!(derive_base_url(&headers).expect("url"), "http://hub.example.com");

        headers.insert("x-forwarded-proto", HeaderValue::from_static("https, http"));
        assert_eq!(derive_base_url(&headers).expect("url"), "https://hub.example.com");

        assert!(derive_base_url(&HeaderMap::new()).is_err());
    }

    #[tokio::test]
    async fn captured_url_is_served_afterwards() {
        let state = state_with(AppConfig::default(), Integrations::default());

        let (_, before) = send(state.clone(), get("/api/v1/base-url")).await;
        assert_eq!(before, json!({"base_url": null}));

        let capture = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/base-url")
            .header(HOST, "abc123.ngrok.app")
            .header("x-forwarded-proto", "https")
            .body(Body::empty())
            .expect("request");
        let (status, body) = send(state.clone(), capture).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"message": "Base URL updated successfully.", "base_url": "https://abc123.ngrok.app"})
        );

        let (_, after) = send(state, get("/api/v1/base-url")).await;
        assert_eq!(after, json!({"base_url": "https://abc123.ngrok.app"}));
    }

    #[tokio::test]
    async fn configured_public_url_is_the_starting_value() {
        let mut config = AppConfig::default();
        config.server.public_base_url = Some("https://hub.example.com".to_owned());

        let (_, body) = send(state_with(config, Integrations::default()), get("/api/v1/base-url")).await;

        assert_eq!(body, json!({"base_url": "https://hub.example.com"}));
    }
}
