//! In-process bookmark store
//!
//! Mirrors the relational layout (bookmarks, tags, join pairs) and the
//! column constraints of the Postgres schema. Each write holds the write
//! lock for its whole duration and validates before mutating, so a
//! rejected write leaves no trace.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::store::{BookmarkStore, DbError};
use crate::models::{
    Bookmark, BookmarkDraft, Direction, Page, PageRequest, SortField, Tag, TagNames,
    DESCRIPTION_MAX_LEN,
};

#[derive(Debug, Clone)]
struct BookmarkRecord {
    url: String,
    title: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Tables {
    last_bookmark_id: i64,
    last_tag_id: i64,
    bookmarks: BTreeMap<i64, BookmarkRecord>,
    tags: BTreeMap<i64, String>,
    tag_ids: HashMap<String, i64>,
    /// (bookmark_id, tag_id)
    bookmark_tags: BTreeSet<(i64, i64)>,
}

impl Tables {
    fn materialize(&self, id: i64, record: &BookmarkRecord) -> Bookmark {
        let mut tags: Vec<Tag> = self
            .bookmark_tags
            .range((id, i64::MIN)..=(id, i64::MAX))
            .filter_map(|&(_, tag_id)| {
                self.tags.get(&tag_id).map(|name| Tag {
                    id: tag_id,
                    name: name.clone(),
                })
            })
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));

        Bookmark {
            id,
            url: record.url.clone(),
            title: record.title.clone(),
            description: record.description.clone(),
            tags,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }

    fn upsert_tags(&mut self, names: &TagNames) -> Vec<Tag> {
        names
            .iter()
            .map(|name| {
                let id = match self.tag_ids.get(name) {
                    Some(&id) => id,
                    None => {
                        self.last_tag_id += 1;
                        let id = self.last_tag_id;
                        self.tags.insert(id, name.to_owned());
                        self.tag_ids.insert(name.to_owned(), id);
                        id
                    }
                };
                Tag {
                    id,
                    name: name.to_owned(),
                }
            })
            .collect()
    }

    fn replace_links(&mut self, bookmark_id: i64, tags: &[Tag]) {
        self.bookmark_tags
            .retain(|&(linked_id, _)| linked_id != bookmark_id);
        self.bookmark_tags
            .extend(tags.iter().map(|t| (bookmark_id, t.id)));
    }

    fn page<F>(&self, page: &PageRequest, mut keep: F) -> Page<Bookmark>
    where
        F: FnMut(i64, &BookmarkRecord) -> bool,
    {
        let mut matched: Vec<(i64, &BookmarkRecord)> = self
            .bookmarks
            .iter()
            .filter(|&(&id, record)| keep(id, record))
            .map(|(&id, record)| (id, record))
            .collect();

        matched.sort_by(|a, b| compare(page, a, b));

        let total = i64::try_from(matched.len()).unwrap_or(i64::MAX);
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let content = matched
            .into_iter()
            .skip(offset)
            .take(page.limit() as usize)
            .map(|(id, record)| self.materialize(id, record))
            .collect();

        Page::new(content, page, total)
    }
}

fn compare(page: &PageRequest, a: &(i64, &BookmarkRecord), b: &(i64, &BookmarkRecord)) -> Ordering {
    let (a_id, a) = a;
    let (b_id, b) = b;
    let primary = match page.sort.field {
        SortField::Id => a_id.cmp(b_id),
        SortField::Url => a.url.cmp(&b.url),
        SortField::Title => a.title.cmp(&b.title),
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
    };
    let primary = match page.sort.direction {
        Direction::Asc => primary,
        Direction::Desc => primary.reverse(),
    };
    primary.then_with(|| a_id.cmp(b_id))
}

/// Apply the NOT NULL and length constraints of the `bookmarks` table.
fn checked_columns(draft: &BookmarkDraft) -> Result<(String, String, Option<String>), DbError> {
    let url = draft
        .url
        .clone()
        .ok_or_else(|| DbError::Constraint("null value in column \"url\"".into()))?;
    let title = draft
        .title
        .clone()
        .ok_or_else(|| DbError::Constraint("null value in column \"title\"".into()))?;

    if let Some(description) = &draft.description {
        if description.chars().count() > DESCRIPTION_MAX_LEN {
            return Err(DbError::Constraint(format!(
                "value too long for column \"description\" (max {})",
                DESCRIPTION_MAX_LEN
            )));
        }
    }

    Ok((url, title, draft.description.clone()))
}

fn contains_ignore_case(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

/// Bookmark store kept in memory; contents are lost on drop
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookmarkStore for MemoryStore {
    async fn list(&self, page: &PageRequest) -> Result<Page<Bookmark>, DbError> {
        let tables = self.tables.read().await;
        Ok(tables.page(page, |_, _| true))
    }

    async fn get(&self, id: i64) -> Result<Option<Bookmark>, DbError> {
        let tables = self.tables.read().await;
        Ok(tables
            .bookmarks
            .get(&id)
            .map(|record| tables.materialize(id, record)))
    }

    async fn insert(&self, draft: &BookmarkDraft) -> Result<Bookmark, DbError> {
        let (url, title, description) = checked_columns(draft)?;
        let mut tables = self.tables.write().await;

        let tags = tables.upsert_tags(&draft.tag_names);
        tables.last_bookmark_id += 1;
        let id = tables.last_bookmark_id;
        let now = Utc::now();
        let record = BookmarkRecord {
            url,
            title,
            description,
            created_at: now,
            updated_at: now,
        };
        tables.bookmarks.insert(id, record.clone());
        tables.replace_links(id, &tags);

        Ok(tables.materialize(id, &record))
    }

    async fn update(&self, id: i64, draft: &BookmarkDraft) -> Result<Option<Bookmark>, DbError> {
        let mut tables = self.tables.write().await;
        if !tables.bookmarks.contains_key(&id) {
            return Ok(None);
        }
        let (url, title, description) = checked_columns(draft)?;

        let tags = tables.upsert_tags(&draft.tag_names);
        let record = match tables.bookmarks.get_mut(&id) {
            Some(record) => {
                record.url = url;
                record.title = title;
                record.description = description;
                record.updated_at = Utc::now().max(record.created_at);
                record.clone()
            }
            None => return Ok(None),
        };
        tables.replace_links(id, &tags);

        Ok(Some(tables.materialize(id, &record)))
    }

    async fn delete(&self, id: i64) -> Result<bool, DbError> {
        let mut tables = self.tables.write().await;
        if tables.bookmarks.remove(&id).is_none() {
            return Ok(false);
        }
        tables.replace_links(id, &[]);
        Ok(true)
    }

    async fn search(&self, keyword: &str, page: &PageRequest) -> Result<Page<Bookmark>, DbError> {
        let needle = keyword.to_lowercase();
        let tables = self.tables.read().await;

        Ok(tables.page(page, |_, record| {
            contains_ignore_case(&record.title, &needle)
                || contains_ignore_case(&record.url, &needle)
                || record
                    .description
                    .as_deref()
                    .is_some_and(|d| contains_ignore_case(d, &needle))
        }))
    }

    async fn find_by_tag(
        &self,
        tag_name: &str,
        page: &PageRequest,
    ) -> Result<Page<Bookmark>, DbError> {
        let tables = self.tables.read().await;
        let Some(&tag_id) = tables.tag_ids.get(tag_name) else {
            return Ok(Page::empty(page));
        };

        Ok(tables.page(page, |id, _| tables.bookmark_tags.contains(&(id, tag_id))))
    }

    async fn find_tag(&self, name: &str) -> Result<Option<Tag>, DbError> {
        let tables = self.tables.read().await;
        Ok(tables.tag_ids.get(name).map(|&id| Tag {
            id,
            name: name.to_owned(),
        }))
    }

    async fn resolve_tags(&self, names: &TagNames) -> Result<Vec<Tag>, DbError> {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        let mut tables = self.tables.write().await;
        Ok(tables.upsert_tags(names))
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, DbError> {
        let tables = self.tables.read().await;
        Ok(tables
            .tags
            .iter()
            .map(|(&id, name)| Tag {
                id,
                name: name.clone(),
            })
            .collect())
    }
}
