//! Bookmark service
//!
//! Orchestrates store calls, turns missing ids into `NotFound`, and maps
//! entities to response shapes. Each operation is one store call, so each
//! write is one transaction.

use std::sync::Arc;

use crate::db::{BookmarkStore, DbError};
use crate::models::{
    BookmarkDraft, BookmarkRequest, BookmarkResponse, Page, PageRequest, Tag,
};

fn not_found(id: i64) -> DbError {
    DbError::NotFound {
        resource: "bookmark",
        id: id.to_string(),
    }
}

#[derive(Clone)]
pub struct BookmarkService {
    store: Arc<dyn BookmarkStore>,
}

impl BookmarkService {
    pub fn new(store: Arc<dyn BookmarkStore>) -> Self {
        Self { store }
    }

    pub async fn find_all(&self, page: PageRequest) -> Result<Page<BookmarkResponse>, DbError> {
        let bookmarks = self.store.list(&page).await?;
        Ok(bookmarks.map(BookmarkResponse::from))
    }

    pub async fn find_by_id(&self, id: i64) -> Result<BookmarkResponse, DbError> {
        self.store
            .get(id)
            .await?
            .map(BookmarkResponse::from)
            .ok_or_else(|| not_found(id))
    }

    pub async fn create(&self, req: BookmarkRequest) -> Result<BookmarkResponse, DbError> {
        let draft = BookmarkDraft::from(req);
        let bookmark = self.store.insert(&draft).await?;
        tracing::info!(id = bookmark.id, tags = bookmark.tags.len(), "bookmark created");
        Ok(BookmarkResponse::from(bookmark))
    }

    /// Full replace: url, title, description and tags all take the request's
    /// values, absent ones included.
    pub async fn update(&self, id: i64, req: BookmarkRequest) -> Result<BookmarkResponse, DbError> {
        let draft = BookmarkDraft::from(req);
        let bookmark = self
            .store
            .update(id, &draft)
            .await?
            .ok_or_else(|| not_found(id))?;
        tracing::info!(id, tags = bookmark.tags.len(), "bookmark updated");
        Ok(BookmarkResponse::from(bookmark))
    }

    pub async fn delete(&self, id: i64) -> Result<(), DbError> {
        if !self.store.delete(id).await? {
            return Err(not_found(id));
        }
        tracing::info!(id, "bookmark deleted");
        Ok(())
    }

    pub async fn search(
        &self,
        keyword: &str,
        page: PageRequest,
    ) -> Result<Page<BookmarkResponse>, DbError> {
        tracing::debug!(keyword, page = page.page, "searching bookmarks");
        let bookmarks = self.store.search(keyword, &page).await?;
        Ok(bookmarks.map(BookmarkResponse::from))
    }

    pub async fn find_by_tag(
        &self,
        tag_name: &str,
        page: PageRequest,
    ) -> Result<Page<BookmarkResponse>, DbError> {
        tracing::debug!(tag = tag_name, page = page.page, "listing bookmarks by tag");
        let bookmarks = self.store.find_by_tag(tag_name, &page).await?;
        Ok(bookmarks.map(BookmarkResponse::from))
    }

    pub async fn list_tags(&self) -> Result<Vec<Tag>, DbError> {
        self.store.list_tags().await
    }
}
