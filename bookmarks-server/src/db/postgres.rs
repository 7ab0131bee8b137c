//! Postgres-backed bookmark store
//!
//! - Page reads aggregate tags with a LEFT JOIN (no N+1)
//! - Tag find-or-create relies on the UNIQUE(name) constraint via ON CONFLICT
//! - Every write runs in one transaction; an early return drops the
//!   transaction and rolls it back
//! - Text ordering uses the "C" collation so it matches byte order
//!   regardless of the database locale

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, PgPool};

use super::store::{BookmarkStore, DbError};
use crate::models::{Bookmark, BookmarkDraft, Page, PageRequest, Sort, SortField, Tag, TagNames};

const SELECT_BOOKMARKS: &str = r#"
    SELECT
        b.id,
        b.url,
        b.title,
        b.description,
        b.created_at,
        b.updated_at,
        COALESCE(ARRAY_AGG(t.id ORDER BY t.name COLLATE "C") FILTER (WHERE t.id IS NOT NULL), '{}') AS tag_ids,
        COALESCE(ARRAY_AGG(t.name ORDER BY t.name COLLATE "C") FILTER (WHERE t.id IS NOT NULL), '{}') AS tag_names
    FROM bookmarks b
    LEFT JOIN bookmark_tags bt ON bt.bookmark_id = b.id
    LEFT JOIN tags t ON t.id = bt.tag_id
"#;

const KEYWORD_FILTER: &str = r#"
    WHERE (b.title ILIKE $1 ESCAPE '\'
        OR b.description ILIKE $1 ESCAPE '\'
        OR b.url ILIKE $1 ESCAPE '\')
"#;

const TAG_FILTER: &str = r#"
    WHERE EXISTS (
        SELECT 1
        FROM bookmark_tags fbt
        JOIN tags ft ON ft.id = fbt.tag_id
        WHERE fbt.bookmark_id = b.id AND ft.name = $1
    )
"#;

const RETURNING_COLUMNS: &str = "id, url, title, description, created_at, updated_at";

/// Bookmark row with aggregated tags
#[derive(Debug, FromRow)]
struct BookmarkRow {
    id: i64,
    url: String,
    title: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    tag_ids: Vec<i64>,
    tag_names: Vec<String>,
}

impl From<BookmarkRow> for Bookmark {
    fn from(r: BookmarkRow) -> Self {
        let tags = r
            .tag_ids
            .into_iter()
            .zip(r.tag_names)
            .map(|(id, name)| Tag { id, name })
            .collect();

        Self {
            id: r.id,
            url: r.url,
            title: r.title,
            description: r.description,
            tags,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// Bare `bookmarks` columns as returned by INSERT/UPDATE
#[derive(Debug, FromRow)]
struct BookmarkColumns {
    id: i64,
    url: String,
    title: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BookmarkColumns {
    fn with_tags(self, tags: Vec<Tag>) -> Bookmark {
        Bookmark {
            id: self.id,
            url: self.url,
            title: self.title,
            description: self.description,
            tags,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

enum Filter<'a> {
    All,
    /// Already-escaped ILIKE pattern
    Keyword(String),
    TagName(&'a str),
}

impl Filter<'_> {
    fn clause(&self) -> &'static str {
        match self {
            Self::All => "",
            Self::Keyword(_) => KEYWORD_FILTER,
            Self::TagName(_) => TAG_FILTER,
        }
    }

    fn value(&self) -> Option<&str> {
        match self {
            Self::All => None,
            Self::Keyword(pattern) => Some(pattern.as_str()),
            Self::TagName(name) => Some(*name),
        }
    }
}

/// Wrap a keyword as a literal substring ILIKE pattern.
pub(crate) fn like_pattern(keyword: &str) -> String {
    let mut pattern = String::with_capacity(keyword.len() + 2);
    pattern.push('%');
    for c in keyword.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn page_sql(filter: &str, sort: Sort, first_param: usize) -> String {
    let collate = match sort.field {
        SortField::Url | SortField::Title => r#" COLLATE "C""#,
        SortField::Id | SortField::CreatedAt | SortField::UpdatedAt => "",
    };
    format!(
        "{SELECT_BOOKMARKS} {filter} GROUP BY b.id ORDER BY b.{column}{collate} {direction}, b.id ASC LIMIT ${limit} OFFSET ${offset}",
        column = sort.field.column(),
        direction = sort.direction.as_sql(),
        limit = first_param,
        offset = first_param + 1,
    )
}

/// Find-or-create every name in one statement.
///
/// Concurrent callers inserting the same new name serialize on the unique
/// index and both get the surviving row back. Names arrive sorted, so row
/// locks are always taken in the same order.
async fn upsert_tags(conn: &mut PgConnection, names: &TagNames) -> Result<Vec<Tag>, sqlx::Error> {
    if names.is_empty() {
        return Ok(Vec::new());
    }

    let mut tags: Vec<Tag> = sqlx::query_as(
        r#"
        INSERT INTO tags (name)
        SELECT * FROM UNNEST($1::text[])
        ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
        RETURNING id, name
        "#,
    )
    .bind(names.to_vec())
    .fetch_all(&mut *conn)
    .await?;

    tags.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(tags)
}

async fn attach_tags(conn: &mut PgConnection, bookmark_id: i64, tags: &[Tag]) -> Result<(), sqlx::Error> {
    if tags.is_empty() {
        return Ok(());
    }

    let tag_ids: Vec<i64> = tags.iter().map(|t| t.id).collect();
    sqlx::query(
        r#"
        INSERT INTO bookmark_tags (bookmark_id, tag_id)
        SELECT $1, UNNEST($2::bigint[])
        "#,
    )
    .bind(bookmark_id)
    .bind(tag_ids)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Bookmark store over a Postgres pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_page(&self, filter: Filter<'_>, page: &PageRequest) -> Result<Page<Bookmark>, DbError> {
        let count_sql = format!("SELECT COUNT(*) FROM bookmarks b {}", filter.clause());
        let limit = i64::from(page.limit());
        let offset = i64::try_from(page.offset()).unwrap_or(i64::MAX);

        let (total, rows): (i64, Vec<BookmarkRow>) = match filter.value() {
            Some(value) => {
                let sql = page_sql(filter.clause(), page.sort, 2);
                let total: i64 = sqlx::query_scalar(&count_sql)
                    .bind(value)
                    .fetch_one(&self.pool)
                    .await?;
                let rows: Vec<BookmarkRow> = sqlx::query_as(&sql)
                    .bind(value)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(&self.pool)
                    .await?;
                (total, rows)
            }
            None => {
                let sql = page_sql(filter.clause(), page.sort, 1);
                let total: i64 = sqlx::query_scalar(&count_sql).fetch_one(&self.pool).await?;
                let rows: Vec<BookmarkRow> = sqlx::query_as(&sql)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(&self.pool)
                    .await?;
                (total, rows)
            }
        };

        Ok(Page::new(
            rows.into_iter().map(Bookmark::from).collect(),
            page,
            total,
        ))
    }
}

#[async_trait]
impl BookmarkStore for PgStore {
    async fn list(&self, page: &PageRequest) -> Result<Page<Bookmark>, DbError> {
        self.fetch_page(Filter::All, page).await
    }

    async fn get(&self, id: i64) -> Result<Option<Bookmark>, DbError> {
        let sql = format!("{SELECT_BOOKMARKS} WHERE b.id = $1 GROUP BY b.id");
        let row: Option<BookmarkRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Bookmark::from))
    }

    async fn insert(&self, draft: &BookmarkDraft) -> Result<Bookmark, DbError> {
        let mut tx = self.pool.begin().await?;

        let tags = upsert_tags(&mut tx, &draft.tag_names).await?;

        let columns: BookmarkColumns = sqlx::query_as(&format!(
            "INSERT INTO bookmarks (url, title, description) VALUES ($1, $2, $3) RETURNING {RETURNING_COLUMNS}"
        ))
        .bind(draft.url.as_deref())
        .bind(draft.title.as_deref())
        .bind(draft.description.as_deref())
        .fetch_one(&mut *tx)
        .await?;

        attach_tags(&mut tx, columns.id, &tags).await?;

        tx.commit().await?;
        Ok(columns.with_tags(tags))
    }

    async fn update(&self, id: i64, draft: &BookmarkDraft) -> Result<Option<Bookmark>, DbError> {
        let mut tx = self.pool.begin().await?;

        // Touch the row first so an unknown id creates no tags
        let columns: Option<BookmarkColumns> = sqlx::query_as(&format!(
            r#"
            UPDATE bookmarks
            SET url = $2, title = $3, description = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING {RETURNING_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(draft.url.as_deref())
        .bind(draft.title.as_deref())
        .bind(draft.description.as_deref())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(columns) = columns else {
            return Ok(None);
        };

        let tags = upsert_tags(&mut tx, &draft.tag_names).await?;

        sqlx::query("DELETE FROM bookmark_tags WHERE bookmark_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        attach_tags(&mut tx, id, &tags).await?;

        tx.commit().await?;
        Ok(Some(columns.with_tags(tags)))
    }

    async fn delete(&self, id: i64) -> Result<bool, DbError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM bookmark_tags WHERE bookmark_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let deleted = sqlx::query("DELETE FROM bookmarks WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        Ok(deleted > 0)
    }

    async fn search(&self, keyword: &str, page: &PageRequest) -> Result<Page<Bookmark>, DbError> {
        self.fetch_page(Filter::Keyword(like_pattern(keyword)), page).await
    }

    async fn find_by_tag(
        &self,
        tag_name: &str,
        page: &PageRequest,
    ) -> Result<Page<Bookmark>, DbError> {
        self.fetch_page(Filter::TagName(tag_name), page).await
    }

    async fn find_tag(&self, name: &str) -> Result<Option<Tag>, DbError> {
        let tag: Option<Tag> = sqlx::query_as("SELECT id, name FROM tags WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(tag)
    }

    async fn resolve_tags(&self, names: &TagNames) -> Result<Vec<Tag>, DbError> {
        let mut tx = self.pool.begin().await?;
        let tags = upsert_tags(&mut tx, names).await?;
        tx.commit().await?;
        Ok(tags)
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, DbError> {
        let tags: Vec<Tag> = sqlx::query_as("SELECT id, name FROM tags ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(tags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_pool, migrations};
    use crate::models::Direction;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("rust"), "%rust%");
        assert_eq!(like_pattern("100%"), "%100\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
        assert_eq!(like_pattern("c:\\"), "%c:\\\\%");
        assert_eq!(like_pattern(""), "%%");
    }

    #[test]
    fn page_sql_uses_sort_column_and_params() {
        let sort = Sort {
            field: SortField::CreatedAt,
            direction: Direction::Desc,
        };
        let sql = page_sql(TAG_FILTER, sort, 2);
        assert!(sql.contains("ORDER BY b.created_at DESC, b.id ASC"));
        assert!(sql.contains("LIMIT $2 OFFSET $3"));

        let sql = page_sql("", Sort::default(), 1);
        assert!(sql.contains("ORDER BY b.id ASC"));
        assert!(sql.contains("LIMIT $1 OFFSET $2"));
    }

    #[test]
    fn page_sql_orders_text_columns_bytewise() {
        let sort = Sort {
            field: SortField::Title,
            direction: Direction::Desc,
        };
        let sql = page_sql("", sort, 1);
        assert!(sql.contains(r#"ORDER BY b.title COLLATE "C" DESC, b.id ASC"#));
        assert!(sql.contains(r#"ARRAY_AGG(t.name ORDER BY t.name COLLATE "C")"#));
    }

    // Integration tests - run with DATABASE_URL set
    // cargo test -p bookmarks-server -- --ignored

    async fn store() -> PgStore {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = create_pool(&url).await.expect("pool creation failed");
        migrations::run(&pool).await.expect("migrations failed");
        PgStore::new(pool)
    }

    fn unique(prefix: &str) -> String {
        format!("{}-{}", prefix, Utc::now().timestamp_nanos_opt().unwrap_or_default())
    }

    fn draft(title: &str, tags: &[&str]) -> BookmarkDraft {
        BookmarkDraft {
            url: Some("https://example.com".into()),
            title: Some(title.into()),
            description: None,
            tag_names: TagNames::new(tags.iter().copied()),
        }
    }

    fn titles(page: &Page<Bookmark>) -> Vec<&str> {
        page.content.iter().map(|b| b.title.as_str()).collect()
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn shared_tag_single_row() {
        let store = store().await;
        let tag = unique("shared");

        let a = store.insert(&draft("a", &[tag.as_str()])).await.unwrap();
        let b = store.insert(&draft("b", &[tag.as_str()])).await.unwrap();

        assert_eq!(a.tags[0].id, b.tags[0].id);

        let page = store.find_by_tag(&tag, &PageRequest::default()).await.unwrap();
        assert_eq!(page.total_elements, 2);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn concurrent_reconciliation_converges() {
        let store = store().await;
        let names = TagNames::new([unique("race")]);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                let names = names.clone();
                tokio::spawn(async move { store.resolve_tags(&names).await })
            })
            .collect();

        let mut ids = Vec::new();
        for handle in handles {
            let tags = handle.await.expect("task panicked").expect("resolve failed");
            ids.push(tags[0].id);
        }
        ids.dedup();
        assert_eq!(ids.len(), 1);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn null_title_rolls_back_tags() {
        let store = store().await;
        let tag = unique("orphan");
        let mut bad = draft("x", &[tag.as_str()]);
        bad.title = None;

        assert!(store.insert(&bad).await.is_err());
        assert!(store.find_tag(&tag).await.unwrap().is_none());
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn update_unknown_id_is_noop() {
        let store = store().await;
        let tag = unique("never");

        let result = store.update(i64::MAX, &draft("x", &[tag.as_str()])).await.unwrap();
        assert!(result.is_none());
        assert!(store.find_tag(&tag).await.unwrap().is_none());
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn delete_keeps_tags() {
        let store = store().await;
        let tag = unique("keep");
        let created = store.insert(&draft("x", &[tag.as_str()])).await.unwrap();

        assert!(store.delete(created.id).await.unwrap());
        assert!(store.get(created.id).await.unwrap().is_none());
        assert!(store.find_tag(&tag).await.unwrap().is_some());
        assert!(!store.delete(created.id).await.unwrap());
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn mixed_case_tags_keep_one_order() {
        let store = store().await;
        let suffix = unique("mix");
        let names: Vec<String> = ["b", "B", "a", "Z"]
            .iter()
            .map(|prefix| format!("{prefix}-{suffix}"))
            .collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();

        let created = store.insert(&draft("mixed", &refs)).await.unwrap();
        let expected: Vec<String> = ["B", "Z", "a", "b"]
            .iter()
            .map(|prefix| format!("{prefix}-{suffix}"))
            .collect();
        assert_eq!(created.tag_names(), expected);

        let found = store.get(created.id).await.unwrap().unwrap();
        assert_eq!(found.tags, created.tags);

        let updated = store.update(created.id, &draft("mixed", &refs)).await.unwrap().unwrap();
        assert_eq!(updated.tags, found.tags);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn search_matches_title_description_and_url_ignoring_case() {
        let store = store().await;
        let marker = unique("needle");

        let in_title = store
            .insert(&draft(&format!("About {}", marker.to_uppercase()), &[]))
            .await
            .unwrap();
        let mut by_description = draft("plain", &[]);
        by_description.description = Some(format!("mentions {marker}"));
        let in_description = store.insert(&by_description).await.unwrap();
        let mut by_url = draft("plain", &[]);
        by_url.url = Some(format!("https://{marker}.example"));
        let in_url = store.insert(&by_url).await.unwrap();
        store.insert(&draft("unrelated", &[])).await.unwrap();

        let page = store
            .search(&marker.to_uppercase(), &PageRequest::default())
            .await
            .unwrap();
        let ids: Vec<i64> = page.content.iter().map(|b| b.id).collect();
        assert_eq!(page.total_elements, 3);
        assert_eq!(ids, vec![in_title.id, in_description.id, in_url.id]);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn search_treats_wildcards_literally() {
        let store = store().await;
        let marker = unique("wild");

        let literal = store.insert(&draft(&format!("{marker}%_x"), &[])).await.unwrap();
        // Would match "%_x" if the wildcards were live
        store.insert(&draft(&format!("{marker}abx"), &[])).await.unwrap();

        let page = store
            .search(&format!("{marker}%_x"), &PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total_elements, 1);
        assert_eq!(page.content[0].id, literal.id);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn find_by_tag_is_exact() {
        let store = store().await;
        let tag = unique("Exact");
        let lower = tag.to_lowercase();

        let tagged = store.insert(&draft("tagged", &[tag.as_str()])).await.unwrap();
        store.insert(&draft("lowercase", &[lower.as_str()])).await.unwrap();

        let page = store.find_by_tag(&tag, &PageRequest::default()).await.unwrap();
        assert_eq!(page.total_elements, 1);
        assert_eq!(page.content[0].id, tagged.id);

        let missing = store
            .find_by_tag(&unique("missing"), &PageRequest::default())
            .await
            .unwrap();
        assert!(missing.content.is_empty());
        assert_eq!(missing.total_elements, 0);
        assert_eq!(missing.total_pages, 0);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn update_replaces_links_and_keeps_old_tags() {
        let store = store().await;
        let old = unique("old");
        let fresh = unique("fresh");

        let created = store.insert(&draft("x", &[old.as_str()])).await.unwrap();
        let updated = store
            .update(created.id, &draft("y", &[fresh.as_str()]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.tag_names(), vec![fresh.clone()]);
        assert_eq!(updated.title, "y");

        let found = store.get(created.id).await.unwrap().unwrap();
        assert_eq!(found.tags, updated.tags);

        assert!(store.find_tag(&old).await.unwrap().is_some());
        let page = store.find_by_tag(&old, &PageRequest::default()).await.unwrap();
        assert_eq!(page.total_elements, 0);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn sorts_by_title_descending() {
        let store = store().await;
        let marker = unique("sort");
        for suffix in ["a", "B", "c"] {
            store.insert(&draft(&format!("{marker} {suffix}"), &[])).await.unwrap();
        }
        let sort = Sort {
            field: SortField::Title,
            direction: Direction::Desc,
        };

        let page = store
            .search(&marker, &PageRequest::new(0, 10).with_sort(sort))
            .await
            .unwrap();
        let expected = ["c", "a", "B"].map(|suffix| format!("{marker} {suffix}"));
        assert_eq!(titles(&page), expected.iter().map(String::as_str).collect::<Vec<_>>());

        let listed = store
            .list(&PageRequest::new(0, 100).with_sort(sort))
            .await
            .unwrap();
        assert!(titles(&listed).windows(2).all(|w| w[0] >= w[1]));
    }
}
