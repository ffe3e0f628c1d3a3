use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::json;

use opshub_core::config::TavilyConfig;

use crate::error::ClientError;
use crate::http::{join_url, send_json};

const SERVICE: &str = "tavily";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewsResult {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub score: Option<f64>,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<NewsResult>,
}

pub struct TavilyClient {
    http: Client,
    base_url: String,
    api_key: SecretString,
}

impl TavilyClient {
    pub fn new(http: Client, config: &TavilyConfig) -> Result<Self, ClientError> {
        let Some(api_key) = config.api_key.clone() else {
            return Err(ClientError::NotConfigured { service: SERVICE });
        };
        Ok(Self { http, base_url: config.base_url.clone(), api_key })
    }

    pub async fn search(&self, query: &str) -> Result<Vec<NewsResult>, ClientError> {
        let response: SearchResponse = send_json(
            SERVICE,
            "search",
            self.http
                .post(join_url(&self.base_url, "search"))
                .bearer_auth(self.api_key.expose_secret())
                .json(&json!({"query": query, "topic": "news"})),
        )
        .await?;
        Ok(response.results)
    }

    /// Formatted news digest for an account, or `None` when nothing matched.
    pub async fn latest_news(&self, account_name: &str) -> Result<Option<String>, ClientError> {
        let account_name = account_name.trim();
        if account_name.is_empty() {
            return Err(ClientError::InvalidInput("account name must not be empty".to_owned()));
        }

        let results = self.search(&news_query(account_name)).await?;
        Ok((!results.is_empty()).then(|| format_news(&results)))
    }
}

pub fn news_query(account_name: &str) -> String {
    format!("Find all the latest news related to Generative AI strategy for {account_name}")
}

pub fn format_news(results: &[NewsResult]) -> String {
    results
        .iter()
        .map(|result| {
            let score = result.score.map(|score| score.to_string()).unwrap_or_else(|| "n/a".to_owned());
            format!(
                "Title: {}\nURL: {}\nContent: {}\nScore: {score}\n",
                result.title, result.url, result.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n---\n")
}
