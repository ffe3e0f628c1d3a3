use axum::Router;
use tower_http::trace::TraceLayer;

use crate::{
    airtable, base_url, firefly, gong, health, news, salesforce, slack, state::AppState, trends,
    wordpress, writer,
};

pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(salesforce::router())
        .merge(wordpress::router())
        .merge(news::router())
        .merge(trends::router())
        .merge(writer::router())
        .merge(firefly::router())
        .merge(airtable::router())
        .merge(gong::router())
        .merge(slack::router())
        .merge(base_url::router())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
