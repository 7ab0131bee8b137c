//! Tag endpoints

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};

use crate::http::error::ApiError;
use crate::http::server::AppState;
use crate::models::Tag;

/// GET /tags - every tag, referenced or not
async fn list_tags(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Tag>>, ApiError> {
    let tags = state.service.list_tags().await?;
    Ok(Json(tags))
}

/// Tag routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/tags", get(list_tags))
}
