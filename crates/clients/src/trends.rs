use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Map, Value};

use opshub_core::config::SerpApiConfig;

use crate::error::ClientError;
use crate::http::{join_url, send_json};

const SERVICE: &str = "serpapi";
pub const DEFAULT_DATE_RANGE: &str = "today 12-m";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrendsDataType {
    InterestOverTime,
    RelatedTopics,
    RelatedQueries,
}

impl TrendsDataType {
    pub fn as_api_value(self) -> &'static str {
        match self {
            Self::InterestOverTime => "TIMESERIES",
            Self::RelatedTopics => "RELATED_TOPICS",
            Self::RelatedQueries => "RELATED_QUERIES",
        }
    }

    fn response_key(self) -> &'static str {
        match self {
            Self::InterestOverTime => "interest_over_time",
            Self::RelatedTopics => "related_topics",
            Self::RelatedQueries => "related_queries",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct TrendsQuery {
    pub query: String,
    #[serde(default = "default_date_range")]
    pub date_range: String,
    /// Empty means worldwide.
    #[serde(default)]
    pub geo: String,
}

fn default_date_range() -> String {
    DEFAULT_DATE_RANGE.to_owned()
}

/// SerpAPI's Google Trends engine.
pub struct TrendsClient {
    http: Client,
    base_url: String,
    api_key: SecretString,
}

impl TrendsClient {
    pub fn new(http: Client, config: &SerpApiConfig) -> Result<Self, ClientError> {
        let Some(api_key) = config.api_key.clone() else {
            return Err(ClientError::NotConfigured { service: SERVICE });
        };
        Ok(Self { http, base_url: config.base_url.clone(), api_key })
    }

    /// Returns the section of the response matching `data_type`, or an empty
    /// object when SerpAPI has no data for the query.
    pub async fn fetch(
        &self,
        data_type: TrendsDataType,
        query: &TrendsQuery,
    ) -> Result<Value, ClientError> {
        if query.query.trim().is_empty() {
            return Err(ClientError::InvalidInput("query must not be empty".to_owned()));
        }

        let mut response: Map<String, Value> = send_json(
            SERVICE,
            "google trends",
            self.http.get(join_url(&self.base_url, "search.json")).query(&[
                ("engine", "google_trends"),
                ("q", query.query.as_str()),
                ("data_type", data_type.as_api_value()),
                ("date", query.date_range.as_str()),
                ("geo", query.geo.as_str()),
                ("api_key", self.api_key.expose_secret()),
            ]),
        )
        .await?;

        Ok(response.remove(data_type.response_key()).unwrap_or_else(|| Value::Object(Map::new())))
    }
}
