use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::{
    error::ApiError,
    state::{require, AppState},
};

pub fn router() -> Router<AppState> {
    Router::new().route("/api/v1/tavily/search-news/{account_name}", get(search_news))
}

#[derive(Debug, Serialize)]
struct NewsResponse {
    account_name: String,
    news_results: String,
}

async fn search_news(
    State(state): State<AppState>,
    Path(account_name): Path<String>,
) -> Result<Json<NewsResponse>, ApiError> {
    let tavily = require(&state.integrations.tavily, "tavily")?;
    let news_results = tavily
        .latest_news(&account_name)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("No news found for account: {account_name}")))?;

    Ok(Json(NewsResponse { account_name, news_results }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::StatusCode;
    use httpmock::prelude::*;
    use serde_json::json;

    use opshub_clients::{build_http_client, TavilyClient};
    use opshub_core::config::AppConfig;

    use crate::state::{AppState, Integrations};
    use crate::test_support::{get, send, state_with};

    fn tavily_state(server: &MockServer) -> AppState {
        let mut config = AppConfig::default();
        config.tavily.api_key = Some("tvly-test".to_owned().into());
        config.tavily.base_url = server.base_url();
        let client = TavilyClient::new(build_http_client(5).expect("http"), &config.tavily).expect("configured");
        state_with(config, Integrations { tavily: Some(Arc::new(client)), ..Integrations::default() })
    }

    #[tokio::test]
    async fn news_digest_is_returned_for_the_account() {
        let server = MockServer::start_async().await;
        let search = server
            .mock_async(|when, then| {
                when.method(POST).path("/search").json_body_partial(
                    r#"{"query": "Find all the latest news related to Generative AI strategy for Acme Corp"}"#,
                );
                then.status(200).json_body(json!({"results": [{
                    "title": "Acme bets on AI",
                    "url": "https://news.test/acme",
                    "content": "Acme announced...",
                    "score": 0.91
                }]}));
            })
            .await;

        let (status, body) = send(tavily_state(&server), get("/api/v1/tavily/search-news/Acme%20Corp")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["account_name"], "Acme Corp");
        assert!(body["news_results"].as_str().is_some_and(|text| text.contains("Title: Acme bets on AI")));
        search.assert_async().await;
    }

    #[tokio::test]
    async fn no_results_is_404() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/search");
                then.status(200).json_body(json!({"results": []}));
            })
            .await;

        let (status, body) = send(tavily_state(&server), get("/api/v1/tavily/search-news/Globex")).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "No news found for account: Globex");
    }
}
