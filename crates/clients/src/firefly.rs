use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};

use opshub_core::config::FireflyConfig;

use crate::error::ClientError;
use crate::http::{join_url, send_json};

const SERVICE: &str = "firefly";
const IMS_SCOPE: &str =
    "openid,AdobeID,session,additional_info,read_organizations,firefly_api,ff_apis";

#[derive(Deserialize)]
struct ImsToken {
    access_token: String,
}

/// Adobe Firefly image generation. Each call exchanges client credentials
/// for a fresh IMS token first.
pub struct FireflyClient {
    http: Client,
    client_id: String,
    client_secret: SecretString,
    token_url: String,
    api_url: String,
}

impl FireflyClient {
    pub fn new(http: Client, config: &FireflyConfig) -> Result<Self, ClientError> {
        let (Some(client_id), Some(client_secret)) = (&config.client_id, &config.client_secret)
        else {
            return Err(ClientError::NotConfigured { service: SERVICE });
        };
        Ok(Self {
            http,
            client_id: client_id.clone(),
            client_secret: client_secret.clone(),
            token_url: config.token_url.clone(),
            api_url: config.api_url.clone(),
        })
    }

    async fn access_token(&self) -> Result<SecretString, ClientError> {
        let token: ImsToken = send_json(
            SERVICE,
            "ims token",
            self.http.post(&self.token_url).form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.expose_secret()),
                ("scope", IMS_SCOPE),
            ]),
        )
        .await?;
        Ok(token.access_token.into())
    }

    /// Raw generation response; see [`first_image_url`].
    pub async fn generate_image(&self, prompt: &str) -> Result<Value, ClientError> {
        if prompt.trim().is_empty() {
            return Err(ClientError::InvalidInput("prompt must not be empty".to_owned()));
        }

        let token = self.access_token().await?;
        send_json(
            SERVICE,
            "image generation",
            self.http
                .post(join_url(&self.api_url, "v3/images/generate"))
                .header("x-api-key", &self.client_id)
                .bearer_auth(token.expose_secret())
                .json(&json!({ "prompt": prompt })),
        )
        .await
    }
}

pub fn first_image_url(response: &Value) -> Option<String> {
    response
        .pointer("/outputs/0/image/url")
        .and_then(Value::as_str)
        .filter(|url| !url.is_empty())
        .map(str::to_owned)
}
