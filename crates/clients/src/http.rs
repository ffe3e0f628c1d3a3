use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::ClientError;

const USER_AGENT: &str = concat!("opshub/", env!("CARGO_PKG_VERSION"));
const MAX_ERROR_BODY_CHARS: usize = 512;

pub fn build_http_client(timeout_secs: u64) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .user_agent(USER_AGENT)
        .build()
}

pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Maps non-2xx responses onto [`ClientError`]. `resource` names what was
/// asked for so a 404 can be reported with its identifier.
pub(crate) async fn check_status(
    service: &'static str,
    resource: &str,
    response: Response,
) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body: String =
        response.text().await.unwrap_or_default().chars().take(MAX_ERROR_BODY_CHARS).collect();
    warn!(
        event_name = "upstream.request.failed",
        service,
        resource,
        status = status.as_u16(),
        "upstream call returned an error status"
    );

    Err(match status {
        StatusCode::NOT_FOUND => ClientError::NotFound { service, resource: resource.to_owned() },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ClientError::Authentication { service, detail: body }
        }
        other => ClientError::Status { service, status: other.as_u16(), body },
    })
}

pub(crate) async fn send(
    service: &'static str,
    resource: &str,
    request: RequestBuilder,
) -> Result<Response, ClientError> {
    let response = request.send().await.map_err(ClientError::transport(service))?;
    check_status(service, resource, response).await
}

pub(crate) async fn send_json<T: DeserializeOwned>(
    service: &'static str,
    resource: &str,
    request: RequestBuilder,
) -> Result<T, ClientError> {
    let response = send(service, resource, request).await?;
    response.json::<T>().await.map_err(|error| ClientError::decode(service, error))
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;

    use super::{build_http_client, join_url, send_json};
    use crate::error::ClientError;

    #[test]
    fn join_url_normalizes_slashes() {
        assert_eq!(join_url("https://api.example.com/", "/v1/chat"), "https://api.example.com/v1/chat");
        assert_eq!(join_url("https://api.example.com", "v1/chat"), "https://api.example.com/v1/chat");
    }

    #[tokio::test]
    async fn vendor_statuses_map_to_client_errors() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/missing");
                then.status(404).body("nope");
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/denied");
                then.status(401).body("bad token");
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/broken");
                then.status(503).body("maintenance");
            })
            .await;

        let client = build_http_client(5).expect("client builds");

        let missing = send_json::<serde_json::Value>(
            "vendor",
            "record 42",
            client.get(server.url("/missing")),
        )
        .await;
        assert!(matches!(missing, Err(ClientError::NotFound { ref resource, .. }) if resource == "record 42"));

        let denied =
            send_json::<serde_json::Value>("vendor", "denied", client.get(server.url("/denied")))
                .await;
        assert!(matches!(denied, Err(ClientError::Authentication { ref detail, .. }) if detail == "bad token"));

        let broken =
            send_json::<serde_json::Value>("vendor", "broken", client.get(server.url("/broken")))
                .await;
        assert!(matches!(broken, Err(ClientError::Status { status: 503, .. })));
    }

    #[tokio::test]
    async fn undecodable_body_is_a_decode_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/garbled");
                then.status(200).body("not json");
            })
            .await;

        let client = build_http_client(5).expect("client builds");
        let result =
            send_json::<serde_json::Value>("vendor", "garbled", client.get(server.url("/garbled")))
                .await;
        assert!(matches!(result, Err(ClientError::Decode { service: "vendor", .. })));
    }
}
