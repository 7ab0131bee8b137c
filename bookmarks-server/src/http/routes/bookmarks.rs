//! Bookmark endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::http::error::ApiError;
use crate::http::extractors::{BookmarkId, Paging};
use crate::http::server::AppState;
use crate::models::{BookmarkRequest, BookmarkResponse, Page, ValidationError};

/// Search query parameters (paging is extracted separately)
#[derive(Deserialize)]
struct SearchParams {
    keyword: Option<String>,
}

/// GET /bookmarks - list bookmarks with pagination
async fn list_bookmarks(
    State(state): State<Arc<AppState>>,
    Paging(page): Paging,
) -> Result<Json<Page<BookmarkResponse>>, ApiError> {
    let result = state.service.find_all(page).await?;
    Ok(Json(result))
}

/// GET /bookmarks/{id} - get a single bookmark
async fn get_bookmark(
    State(state): State<Arc<AppState>>,
    BookmarkId(id): BookmarkId,
) -> Result<Json<BookmarkResponse>, ApiError> {
    let bookmark = state.service.find_by_id(id).await?;
    Ok(Json(bookmark))
}

/// POST /bookmarks - create a bookmark
async fn create_bookmark(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BookmarkRequest>,
) -> Result<(StatusCode, Json<BookmarkResponse>), ApiError> {
    let bookmark = state.service.create(req).await?;
    Ok((StatusCode::CREATED, Json(bookmark)))
}

/// PUT /bookmarks/{id} - replace a bookmark
async fn update_bookmark(
    State(state): State<Arc<AppState>>,
    BookmarkId(id): BookmarkId,
    Json(req): Json<BookmarkRequest>,
) -> Result<Json<BookmarkResponse>, ApiError> {
    let bookmark = state.service.update(id, req).await?;
    Ok(Json(bookmark))
}

/// DELETE /bookmarks/{id}
async fn delete_bookmark(
    State(state): State<Arc<AppState>>,
    BookmarkId(id): BookmarkId,
) -> Result<StatusCode, ApiError> {
    state.service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /bookmarks/search?keyword=... - case-insensitive substring search
async fn search_bookmarks(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
    Paging(page): Paging,
) -> Result<Json<Page<BookmarkResponse>>, ApiError> {
    let keyword = params
        .keyword
        .ok_or(ValidationError::Missing { field: "keyword" })?;
    let result = state.service.search(&keyword, page).await?;
    Ok(Json(result))
}

/// GET /bookmarks/tag/{tag_name} - bookmarks carrying a tag
async fn bookmarks_by_tag(
    State(state): State<Arc<AppState>>,
    Path(tag_name): Path<String>,
    Paging(page): Paging,
) -> Result<Json<Page<BookmarkResponse>>, ApiError> {
    let result = state.service.find_by_tag(&tag_name, page).await?;
    Ok(Json(result))
}

/// Bookmark routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/bookmarks", get(list_bookmarks).post(create_bookmark))
        .route("/bookmarks/search", get(search_bookmarks))
        .route("/bookmarks/tag/{tag_name}", get(bookmarks_by_tag))
        .route(
            "/bookmarks/{id}",
            get(get_bookmark)
                .put(update_bookmark)
                .delete(delete_bookmark),
        )
}
