//! Storage trait shared by the Postgres and in-memory backends

use async_trait::async_trait;

use crate::models::{Bookmark, BookmarkDraft, Page, PageRequest, Tag, TagNames};

/// Database error type
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Row rejected by a column or uniqueness constraint
    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("not found: {resource} '{id}'")]
    NotFound { resource: &'static str, id: String },
}

/// Persistence gateway for bookmarks, tags and the `bookmark_tags` join table.
///
/// Every write is atomic: either all bookmark, tag and join-table changes of
/// one call are visible afterwards, or none are.
#[async_trait]
pub trait BookmarkStore: Send + Sync + 'static {
    /// One page of bookmarks in the requested order.
    async fn list(&self, page: &PageRequest) -> Result<Page<Bookmark>, DbError>;

    async fn get(&self, id: i64) -> Result<Option<Bookmark>, DbError>;

    /// Insert a bookmark, reconciling its tags in the same transaction.
    async fn insert(&self, draft: &BookmarkDraft) -> Result<Bookmark, DbError>;

    /// Overwrite every column and replace the tag set.
    /// Returns `None` without touching anything when `id` does not exist.
    async fn update(&self, id: i64, draft: &BookmarkDraft) -> Result<Option<Bookmark>, DbError>;

    /// Remove a bookmark and its join rows. Tags are kept.
    /// Returns `true` if the bookmark existed.
    async fn delete(&self, id: i64) -> Result<bool, DbError>;

    /// Case-insensitive substring match on title, description or url.
    async fn search(&self, keyword: &str, page: &PageRequest) -> Result<Page<Bookmark>, DbError>;

    /// Bookmarks carrying a tag with exactly this name, each at most once.
    async fn find_by_tag(&self, tag_name: &str, page: &PageRequest)
        -> Result<Page<Bookmark>, DbError>;

    async fn find_tag(&self, name: &str) -> Result<Option<Tag>, DbError>;

    /// Find-or-create a tag for every name. Empty input yields no tags.
    async fn resolve_tags(&self, names: &TagNames) -> Result<Vec<Tag>, DbError>;

    /// All tags ordered by id.
    async fn list_tags(&self) -> Result<Vec<Tag>, DbError>;
}
