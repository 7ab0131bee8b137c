//! Schema creation for bookmarks, tags and their join table

use sqlx::PgPool;

/// Run all migrations. Safe to call on every startup.
pub async fn run(pool: &PgPool) -> Result<(), sqlx::Error> {
    tracing::info!("Running bookmark migrations...");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS bookmarks (
            id BIGSERIAL PRIMARY KEY,
            url TEXT NOT NULL,
            title TEXT NOT NULL,
            description VARCHAR(1000),
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Uniqueness of name is what makes concurrent find-or-create safe
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tags (
            id BIGSERIAL PRIMARY KEY,
            name TEXT NOT NULL UNIQUE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS bookmark_tags (
            bookmark_id BIGINT NOT NULL REFERENCES bookmarks(id) ON DELETE CASCADE,
            tag_id BIGINT NOT NULL REFERENCES tags(id),
            PRIMARY KEY (bookmark_id, tag_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    create_indexes(pool).await?;

    tracing::info!("Bookmark migrations complete");
    Ok(())
}

async fn create_indexes(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_bookmark_tags_tag ON bookmark_tags(tag_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_bookmarks_created ON bookmarks(created_at)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_bookmarks_updated ON bookmarks(updated_at)")
        .execute(pool)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_pool;

    #[tokio::test]
    #[ignore = "requires database"]
    async fn migrations_are_idempotent() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = create_pool(&url).await.expect("pool creation failed");

        run(&pool).await.expect("first run failed");
        run(&pool).await.expect("second run failed");

        let tables: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM information_schema.tables
            WHERE table_name IN ('bookmarks', 'tags', 'bookmark_tags')
            "#,
        )
        .fetch_one(&pool)
        .await
        .expect("query failed");

        assert_eq!(tables.0, 3);
    }
}
