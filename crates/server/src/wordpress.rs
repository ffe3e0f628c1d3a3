use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;

use opshub_clients::{ClientError, WordPressClient};
use opshub_core::domain::cms::{ArticleQuery, ArticleUpdate, NewArticle};

use crate::{
    error::ApiError,
    state::{require, AppState},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/wordpress/articles", post(create_article).get(list_articles))
        .route("/api/v1/wordpress/articles/{post_id}", get(get_article).patch(update_article))
}

fn wordpress(state: &AppState) -> Result<&WordPressClient, ApiError> {
    require(&state.integrations.wordpress, "wordpress")
}

fn article_error(post_id: u64) -> impl FnOnce(ClientError) -> ApiError {
    move |error| match error {
        ClientError::NotFound { .. } => ApiError::not_found(format!("Article not found: {post_id}")),
        other => other.into(),
    }
}

async fn create_article(
    State(state): State<AppState>,
    Json(article): Json<NewArticle>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let created = wordpress(&state)?.create_article(&article).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_article(
    State(state): State<AppState>,
    Path(post_id): Path<u64>,
) -> Result<Json<Value>, ApiError> {
    let article = wordpress(&state)?.get_article(post_id).await.map_err(article_error(post_id))?;
    Ok(Json(article))
}

async fn list_articles(
    State(state): State<AppState>,
    Query(query): Query<ArticleQuery>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(wordpress(&state)?.list_articles(&query).await?))
}

async fn update_article(
    State(state): State<AppState>,
    Path(post_id): Path<u64>,
    Json(update): Json<ArticleUpdate>,
) -> Result<Json<Value>, ApiError> {
    let article = wordpress(&state)?
        .update_article(post_id, update)
        .await
        .map_err(article_error(post_id))?;
    Ok(Json(article))
}
