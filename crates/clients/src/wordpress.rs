use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use opshub_core::config::WordPressConfig;
use opshub_core::domain::cms::{ArticleQuery, ArticleUpdate, NewArticle};

use crate::error::ClientError;
use crate::http::{join_url, send_json};

const SERVICE: &str = "wordpress";

/// WordPress REST client authenticated with an application password.
pub struct WordPressClient {
    http: Client,
    api_url: String,
    username: String,
    app_password: SecretString,
}

impl WordPressClient {
    pub fn new(http: Client, config: &WordPressConfig) -> Result<Self, ClientError> {
        let (Some(api_url), Some(username), Some(app_password)) =
            (&config.api_url, &config.username, &config.app_password)
        else {
            return Err(ClientError::NotConfigured { service: SERVICE });
        };

        Ok(Self {
            http,
            api_url: api_url.clone(),
            username: username.clone(),
            app_password: normalize_app_password(app_password.expose_secret()).into(),
        })
    }

    fn posts_url(&self, suffix: &str) -> String {
        join_url(&self.api_url, &format!("posts{suffix}"))
    }

    pub async fn create_article(&self, article: &NewArticle) -> Result<Value, ClientError> {
        article.validate()?;
        send_json(
            SERVICE,
            "posts",
            self.http
                .post(self.posts_url(""))
                .basic_auth(&self.username, Some(self.app_password.expose_secret()))
                .json(article),
        )
        .await
    }

    pub async fn get_article(&self, post_id: u64) -> Result<Value, ClientError> {
        send_json(
            SERVICE,
            &format!("post {post_id}"),
            self.http
                .get(self.posts_url(&format!("/{post_id}")))
                .basic_auth(&self.username, Some(self.app_password.expose_secret())),
        )
        .await
    }

    pub async fn list_articles(&self, query: &ArticleQuery) -> Result<Value, ClientError> {
        let mut params = vec![("page", query.page.to_string()), ("per_page", query.per_page.to_string())];
        if let Some(search) = query.search.as_deref().filter(|term| !term.trim().is_empty()) {
            params.push(("search", search.to_owned()));
        }

        send_json(
            SERVICE,
            "posts",
            self.http
                .get(self.posts_url(""))
                .query(&params)
                .basic_auth(&self.username, Some(self.app_password.expose_secret())),
        )
        .await
    }

    /// WordPress accepts partial updates as a POST to the post resource.
    pub async fn update_article(
        &self,
        post_id: u64,
        update: ArticleUpdate,
    ) -> Result<Value, ClientError> {
        let update = update.normalized()?;
        send_json(
            SERVICE,
            &format!("post {post_id}"),
            self.http
                .post(self.posts_url(&format!("/{post_id}")))
                .basic_auth(&self.username, Some(self.app_password.expose_secret()))
                .json(&update),
        )
        .await
    }
}

/// Application passwords are displayed with spaces and are often pasted
/// with surrounding quotes; neither is part of the credential.
fn normalize_app_password(raw: &str) -> String {
    raw.chars().filter(|ch| !matches!(ch, '"' | '\'' | ' ')).collect()
}
