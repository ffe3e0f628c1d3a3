use reqwest::{Client, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use opshub_core::config::AirtableConfig;

use crate::error::ClientError;
use crate::http::{send, send_json};

const SERVICE: &str = "airtable";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AirtableRecord {
    pub id: String,
    #[serde(rename = "createdTime", default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<String>,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

#[derive(Deserialize)]
struct RecordPage {
    #[serde(default)]
    records: Vec<AirtableRecord>,
    #[serde(default)]
    offset: Option<String>,
}

/// Records of a single Airtable table.
pub struct AirtableClient {
    http: Client,
    base_url: String,
    api_key: SecretString,
    base_id: String,
    table_name: String,
}

impl AirtableClient {
    pub fn new(http: Client, config: &AirtableConfig) -> Result<Self, ClientError> {
        let (Some(api_key), Some(base_id), Some(table_name)) =
            (&config.api_key, &config.base_id, &config.table_name)
        else {
            return Err(ClientError::NotConfigured { service: SERVICE });
        };
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            api_key: api_key.clone(),
            base_id: base_id.clone(),
            table_name: table_name.clone(),
        })
    }

    /// Table names routinely contain spaces, so segments are pushed through
    /// the URL encoder rather than formatted in.
    fn table_url(&self, record_id: Option<&str>) -> Result<Url, ClientError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|error| ClientError::InvalidInput(format!("airtable base url: {error}")))?;
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                ClientError::InvalidInput("airtable base url cannot take a path".to_owned())
            })?;
            segments.pop_if_empty().push(&self.base_id).push(&self.table_name);
            if let Some(record_id) = record_id {
                segments.push(record_id);
            }
        }
        Ok(url)
    }

    pub async fn list_records(&self) -> Result<Vec<AirtableRecord>, ClientError> {
        let url = self.table_url(None)?;
        let mut records = Vec::new();
        let mut offset: Option<String> = None;

        loop {
            let mut request = self.http.get(url.clone()).bearer_auth(self.api_key.expose_secret());
            if let Some(offset) = &offset {
                request = request.query(&[("offset", offset)]);
            }
            let mut page: RecordPage = send_json(SERVICE, &self.table_name, request).await?;
            records.append(&mut page.records);

            match page.offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        Ok(records)
    }

    pub async fn create_record(&self, fields: Map<String, Value>) -> Result<AirtableRecord, ClientError> {
        send_json(
            SERVICE,
            &self.table_name,
            self.http
                .post(self.table_url(None)?)
                .bearer_auth(self.api_key.expose_secret())
                .json(&json!({ "fields": fields })),
        )
        .await
    }

    pub async fn update_record(
        &self,
        record_id: &str,
        fields: Map<String, Value>,
    ) -> Result<AirtableRecord, ClientError> {
        send_json(
            SERVICE,
            &format!("record {record_id}"),
            self.http
                .patch(self.table_url(Some(record_id))?)
                .bearer_auth(self.api_key.expose_secret())
                .json(&json!({ "fields": fields })),
        )
        .await
    }

    pub async fn delete_record(&self, record_id: &str) -> Result<(), ClientError> {
        send(
            SERVICE,
            &format!("record {record_id}"),
            self.http.delete(self.table_url(Some(record_id))?).bearer_auth(self.api_key.expose_secret()),
        )
        .await?;
        Ok(())
    }
}
