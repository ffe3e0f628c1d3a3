use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::sync::OnceCell;
use tracing::info;

use opshub_core::config::SalesforceConfig;
use opshub_core::domain::crm::{
    AccountId, AccountMatch, Case, Contact, CreatedRecord, NewNote, NewTask, Opportunity, Task,
};

use crate::crm::CrmRepository;
use crate::error::ClientError;
use crate::http::{join_url, send_json};

const SERVICE: &str = "salesforce";
const SOSL_RESERVED: &[char] =
    &['?', '&', '|', '!', '{', '}', '[', ']', '(', ')', '^', '~', '*', ':', '\\', '"', '\'', '+', '-'];

struct Session {
    instance_url: String,
    access_token: SecretString,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    instance_url: String,
}

#[derive(Deserialize)]
struct QueryPage<T> {
    #[serde(default = "Vec::new")]
    records: Vec<T>,
    #[serde(rename = "nextRecordsUrl", default)]
    next_records_url: Option<String>,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(rename = "searchRecords", default)]
    search_records: Vec<AccountMatch>,
}

/// Salesforce REST client. The session is established on first use and
/// reused for the lifetime of the client; it is never refreshed.
pub struct SalesforceClient {
    http: Client,
    config: SalesforceConfig,
    session: OnceCell<Session>,
}

impl SalesforceClient {
    pub fn new(http: Client, config: SalesforceConfig) -> Result<Self, ClientError> {
        if !config.is_configured() {
            return Err(ClientError::NotConfigured { service: SERVICE });
        }
        Ok(Self { http, config, session: OnceCell::new() })
    }

    async fn session(&self) -> Result<&Session, ClientError> {
        self.session.get_or_try_init(|| self.establish_session()).await
    }

    async fn establish_session(&self) -> Result<Session, ClientError> {
        if let (Some(access_token), Some(instance_url)) =
            (&self.config.access_token, &self.config.instance_url)
        {
            return Ok(Session {
                instance_url: instance_url.clone(),
                access_token: access_token.clone(),
            });
        }

        let (Some(client_id), Some(client_secret), Some(username), Some(password)) = (
            self.config.client_id.as_deref(),
            self.config.client_secret.as_ref(),
            self.config.username.as_deref(),
            self.config.password.as_ref(),
        ) else {
            return Err(ClientError::NotConfigured { service: SERVICE });
        };

        let mut password = password.expose_secret().to_owned();
        if let Some(security_token) = &self.config.security_token {
            password.push_str(security_token.expose_secret());
        }

        let token_url = join_url(&self.config.login_url, "services/oauth2/token");
        let token: TokenResponse = send_json(
            SERVICE,
            "oauth token",
            self.http.post(token_url).form(&[
                ("grant_type", "password"),
                ("client_id", client_id),
                ("client_secret", client_secret.expose_secret()),
                ("username", username),
                ("password", password.as_str()),
            ]),
        )
        .await?;

        if token.access_token.is_empty() {
            return Err(ClientError::Authentication {
                service: SERVICE,
                detail: "token endpoint returned an empty access token".to_owned(),
            });
        }

        info!(
            event_name = "salesforce.session.established",
            instance_url = %token.instance_url,
            "salesforce session established"
        );
        Ok(Session { instance_url: token.instance_url, access_token: token.access_token.into() })
    }

    fn data_url(&self, session: &Session, path: &str) -> String {
        join_url(
            &session.instance_url,
            &format!("services/data/v{}/{}", self.config.api_version, path),
        )
    }

    /// Runs a SOQL query and follows `nextRecordsUrl` until every page is read.
    async fn query<T: DeserializeOwned>(
        &self,
        soql: &str,
        resource: &str,
    ) -> Result<Vec<T>, ClientError> {
        let session = self.session().await?;
        let token = session.access_token.expose_secret();

        let mut page: QueryPage<T> = send_json(
            SERVICE,
            resource,
            self.http.get(self.data_url(session, "query")).query(&[("q", soql)]).bearer_auth(token),
        )
        .await?;

        let mut records = Vec::new();
        loop {
            records.append(&mut page.records);
            let Some(next) = page.next_records_url.take() else {
                break;
            };
            page = send_json(
                SERVICE,
                resource,
                self.http.get(join_url(&session.instance_url, &next)).bearer_auth(token),
            )
            .await?;
        }

        Ok(records)
    }

    async fn create_sobject(
        &self,
        sobject: &str,
        body: Value,
        resource: &str,
    ) -> Result<CreatedRecord, ClientError> {
        let session = self.session().await?;
        let url = self.data_url(session, &format!("sobjects/{sobject}"));
        send_json(
            SERVICE,
            resource,
            self.http.post(url).bearer_auth(session.access_token.expose_secret()).json(&body),
        )
        .await
    }
}

pub fn escape_sosl(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for ch in term.chars() {
        if SOSL_RESERVED.contains(&ch) {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[async_trait]
impl CrmRepository for SalesforceClient {
    async fn search_accounts(&self, term: &str) -> Result<Vec<AccountMatch>, ClientError> {
        let term = term.trim();
        if term.is_empty() {
            return Err(ClientError::InvalidInput("search term must not be empty".to_owned()));
        }

        let sosl = format!(
            "FIND {{{}}} IN ALL FIELDS RETURNING Account(Id, Name, Industry)",
            escape_sosl(term)
        );
        let session = self.session().await?;
        let response: SearchResponse = send_json(
            SERVICE,
            "account search",
            self.http
                .get(self.data_url(session, "search"))
                .query(&[("q", sosl.as_str())])
                .bearer_auth(session.access_token.expose_secret()),
        )
        .await?;
        Ok(response.search_records)
    }

    async fn get_account(&self, id: &AccountId) -> Result<Option<Map<String, Value>>, ClientError> {
        let session = self.session().await?;
        let url = self.data_url(session, &format!("sobjects/Account/{id}"));
        let result = send_json::<Map<String, Value>>(
            SERVICE,
            &format!("account {id}"),
            self.http.get(url).bearer_auth(session.access_token.expose_secret()),
        )
        .await;

        match result {
            Ok(details) => Ok(Some(details)),
            Err(error) if error.is_not_found() => Ok(None),
            Err(error) => Err(error),
        }
    }

    async fn contacts_for_account(&self, id: &AccountId) -> Result<Vec<Contact>, ClientError> {
        self.query(
            &format!("SELECT Id, Name, Email FROM Contact WHERE AccountId = '{id}'"),
            &format!("contacts for account {id}"),
        )
        .await
    }

    async fn opportunities_for_account(
        &self,
        id: &AccountId,
    ) -> Result<Vec<Opportunity>, ClientError> {
        self.query(
            &format!(
                "SELECT Id, Name, StageName, Amount FROM Opportunity WHERE AccountId = '{id}'"
            ),
            &format!("opportunities for account {id}"),
        )
        .await
    }

    async fn cases_for_account(&self, id: &AccountId) -> Result<Vec<Case>, ClientError> {
        self.query(
            &format!("SELECT Id, Subject, Status FROM Case WHERE AccountId = '{id}'"),
            &format!("cases for account {id}"),
        )
        .await
    }

    async fn tasks_for_account(&self, id: &AccountId) -> Result<Vec<Task>, ClientError> {
        self.query(
            &format!("SELECT Id, Subject, Status, ActivityDate FROM Task WHERE WhatId = '{id}'"),
            &format!("tasks for account {id}"),
        )
        .await
    }

    async fn create_task(&self, task: NewTask) -> Result<CreatedRecord, ClientError> {
        task.validate()?;
        let mut body = json!({
            "Subject": task.subject,
            "Status": task.status,
            "WhatId": task.account_id.as_str(),
        });
        if let Some(date) = task.activity_date {
            body["ActivityDate"] = json!(date.format("%Y-%m-%d").to_string());
        }
        self.create_sobject("Task", body, &format!("task for account {}", task.account_id)).await
    }

    async fn add_note(&self, note: NewNote) -> Result<CreatedRecord, ClientError> {
        note.validate()?;
        let body = json!({
            "Title": note.title,
            "Body": note.body,
            "ParentId": note.account_id.as_str(),
        });
        self.create_sobject("Note", body, &format!("note for account {}", note.account_id)).await
    }
}
