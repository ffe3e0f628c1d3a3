use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Body of a WordPress `POST /posts` call. Defaults publish immediately
/// with comments and pings open.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewArticle {
    pub title: String,
    pub content: String,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<u64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<u64>>,
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub featured_media: Option<u64>,
    #[serde(default = "default_open")]
    pub comment_status: String,
    #[serde(default = "default_open")]
    pub ping_status: String,
}

impl NewArticle {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.title.trim().is_empty() {
            return Err(DomainError::InvariantViolation("article title is required".to_owned()));
        }
        if self.content.trim().is_empty() {
            return Err(DomainError::InvariantViolation("article content is required".to_owned()));
        }
        Ok(())
    }
}

fn default_status() -> String {
    "publish".to_owned()
}

fn default_format() -> String {
    "standard".to_owned()
}

fn default_open() -> String {
    "open".to_owned()
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
}

impl ArticleUpdate {
    /// Drops blank fields; an update with nothing left to send is rejected.
    pub fn normalized(self) -> Result<Self, DomainError> {
        let keep = |value: Option<String>| value.filter(|text| !text.trim().is_empty());
        let update = Self {
            title: keep(self.title),
            content: keep(self.content),
            status: keep(self.status),
            excerpt: keep(self.excerpt),
        };

        if update == Self::default() {
            return Err(DomainError::InvariantViolation(
                "article update must change at least one of title, content, status, excerpt"
                    .to_owned(),
            ));
        }
        Ok(update)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl Default for ArticleQuery {
    fn default() -> Self {
        Self { page: default_page(), per_page: default_per_page(), search: None }
    }
}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    10
}
