use std::collections::HashMap;

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::{Map, Value};

use opshub_core::config::GongConfig;

use crate::error::ClientError;
use crate::http::{join_url, send_json};

const SERVICE: &str = "gong";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CallTranscript {
    pub call_data: Value,
    pub formatted_transcript: String,
}

pub struct GongClient {
    http: Client,
    base_url: String,
    access_key: String,
    secret_key: SecretString,
}

impl GongClient {
    pub fn new(http: Client, config: &GongConfig) -> Result<Self, ClientError> {
        let (Some(access_key), Some(secret_key)) = (&config.access_key, &config.secret_key) else {
            return Err(ClientError::NotConfigured { service: SERVICE });
        };
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            access_key: access_key.clone(),
            secret_key: secret_key.clone(),
        })
    }

    pub async fn call_transcript(&self, call_id: &str) -> Result<CallTranscript, ClientError> {
        let call_id = call_id.trim();
        if call_id.is_empty() || !call_id.chars().all(|ch| ch.is_ascii_alphanumeric()) {
            return Err(ClientError::InvalidInput(format!("invalid Gong call id `{call_id}`")));
        }

        let resource = format!("call {call_id}");
        let mut response: Map<String, Value> = send_json(
            SERVICE,
            &resource,
            self.http
                .get(join_url(&self.base_url, &format!("calls/{call_id}")))
                .basic_auth(&self.access_key, Some(self.secret_key.expose_secret())),
        )
        .await?;

        let call_data = response
            .remove("call")
            .filter(|call| call.as_object().is_some_and(|fields| !fields.is_empty()))
            .ok_or(ClientError::NotFound { service: SERVICE, resource })?;

        Ok(CallTranscript { formatted_transcript: format_transcript(&call_data), call_data })
    }
}

/// `Transcript` header, then `<start> | <speaker>` and the spoken text for
/// each entry. Speakers are resolved through the call's `parties`.
pub fn format_transcript(call: &Value) -> String {
    let speakers: HashMap<&str, &str> = call
        .get("parties")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|party| {
            let id = party.get("id").and_then(Value::as_str)?;
            let name = party.get("name").and_then(Value::as_str).unwrap_or("Unknown");
            Some((id, name))
        })
        .collect();

    let mut transcript = String::from("Transcript\n");
    for entry in call.get("transcript").and_then(Value::as_array).into_iter().flatten() {
        let start = entry.get("startTime").and_then(Value::as_f64).unwrap_or(0.0);
        let speaker = entry
            .get("speakerId")
            .and_then(Value::as_str)
            .and_then(|id| speakers.get(id).copied())
            .unwrap_or("Unknown");
        let text = entry.get("text").and_then(Value::as_str).unwrap_or_default();
        transcript.push_str(&format!("{start:.2} | {speaker}\n{text}\n"));
    }

    transcript.trim().to_owned()
}
