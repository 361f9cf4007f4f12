//! Database operations for `blog_posts`, `tags` and `blog_post_tag_map`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `tags` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TagRow {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

/// A tag attached to a post, as returned by [`list_tags_for_posts`].
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostTagRow {
    pub post_id: i64,
    pub id: i64,
    pub name: String,
    pub slug: String,
}

/// A row from the `blog_posts` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BlogPostRow {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub summary: Option<String>,
    pub content: String,
    pub cover_image_url: Option<String>,
    pub is_published: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewBlogPost<'a> {
    pub slug: &'a str,
    pub title: &'a str,
    pub summary: Option<&'a str>,
    pub content: &'a str,
    pub cover_image_url: Option<&'a str>,
    pub is_published: bool,
}

// Option<Option<T>>: outer None = "not in request", Some(None) = "clear".
#[allow(clippy::option_option)]
#[derive(Debug, Clone, Default)]
pub struct UpdateBlogPost<'a> {
    pub title: Option<&'a str>,
    pub summary: Option<Option<&'a str>>,
    pub content: Option<&'a str>,
    pub cover_image_url: Option<Option<&'a str>>,
    pub is_published: Option<bool>,
}

// ---------------------------------------------------------------------------
// Tags
// ---------------------------------------------------------------------------

/// Returns all tags ordered by name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_tags(pool: &PgPool) -> Result<Vec<TagRow>, DbError> {
    let rows = sqlx::query_as::<_, TagRow>("SELECT id, name, slug FROM tags ORDER BY name, id")
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Creates a tag.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (including a duplicate slug).
pub async fn create_tag(pool: &PgPool, name: &str, slug: &str) -> Result<TagRow, DbError> {
    let row = sqlx::query_as::<_, TagRow>(
        "INSERT INTO tags (name, slug) VALUES ($1, $2) RETURNING id, name, slug",
    )
    .bind(name)
    .bind(slug)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Deletes a tag and detaches it from every post. Returns `false` for an unknown id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn delete_tag(pool: &PgPool, id: i64) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM tags WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Returns the tags of the given posts.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_tags_for_posts(
    pool: &PgPool,
    post_ids: &[i64],
) -> Result<Vec<PostTagRow>, DbError> {
    let rows = sqlx::query_as::<_, PostTagRow>(
        "SELECT m.post_id, t.id, t.name, t.slug \
         FROM blog_post_tag_map m \
         JOIN tags t ON t.id = m.tag_id \
         WHERE m.post_id = ANY($1) \
         ORDER BY m.post_id, t.name",
    )
    .bind(post_ids)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Replaces a post's tag set.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a statement fails (e.g. an unknown tag id).
pub async fn set_post_tags(pool: &PgPool, post_id: i64, tag_ids: &[i64]) -> Result<(), DbError> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM blog_post_tag_map WHERE post_id = $1")
        .bind(post_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        "INSERT INTO blog_post_tag_map (post_id, tag_id) \
         SELECT $1, t FROM unnest($2::BIGINT[]) AS t \
         ON CONFLICT DO NOTHING",
    )
    .bind(post_id)
    .bind(tag_ids)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Posts
// ---------------------------------------------------------------------------

/// Returns published posts, newest first, optionally restricted to one tag slug.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_published_posts(
    pool: &PgPool,
    tag_slug: Option<&str>,
    limit: i64,
) -> Result<Vec<BlogPostRow>, DbError> {
    let rows = sqlx::query_as::<_, BlogPostRow>(
        "SELECT p.id, p.slug, p.title, p.summary, p.content, p.cover_image_url, \
                p.is_published, p.published_at, p.created_at, p.updated_at \
         FROM blog_posts p \
         WHERE p.is_published \
           AND ($1::TEXT IS NULL OR EXISTS ( \
                 SELECT 1 FROM blog_post_tag_map m \
                 JOIN tags t ON t.id = m.tag_id \
                 WHERE m.post_id = p.id AND t.slug = $1)) \
         ORDER BY p.published_at DESC NULLS LAST, p.id DESC \
         LIMIT $2",
    )
    .bind(tag_slug)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Returns a published post by slug.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_published_post_by_slug(
    pool: &PgPool,
    slug: &str,
) -> Result<Option<BlogPostRow>, DbError> {
    let row = sqlx::query_as::<_, BlogPostRow>(
        "SELECT id, slug, title, summary, content, cover_image_url, \
                is_published, published_at, created_at, updated_at \
         FROM blog_posts \
         WHERE slug = $1 AND is_published",
    )
    .bind(slug)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Creates a post. `published_at` is stamped when it is created published.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (including a duplicate slug).
pub async fn create_blog_post(pool: &PgPool, post: &NewBlogPost<'_>) -> Result<BlogPostRow, DbError> {
    let row = sqlx::query_as::<_, BlogPostRow>(
        "INSERT INTO blog_posts \
           (slug, title, summary, content, cover_image_url, is_published, published_at) \
         VALUES ($1, $2, $3, $4, $5, $6, CASE WHEN $6::BOOL THEN NOW() END) \
         RETURNING id, slug, title, summary, content, cover_image_url, \
                   is_published, published_at, created_at, updated_at",
    )
    .bind(post.slug)
    .bind(post.title)
    .bind(post.summary)
    .bind(post.content)
    .bind(post.cover_image_url)
    .bind(post.is_published)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Applies a sparse update to a post. Returns `None` for an unknown id.
///
/// The first transition to published stamps `published_at`; unpublishing keeps it.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn update_blog_post(
    pool: &PgPool,
    id: i64,
    update: &UpdateBlogPost<'_>,
) -> Result<Option<BlogPostRow>, DbError> {
    let row = sqlx::query_as::<_, BlogPostRow>(
        "UPDATE blog_posts \
         SET title           = COALESCE($2, title), \
             summary         = CASE WHEN $3::BOOL THEN $4 ELSE summary END, \
             content         = COALESCE($5, content), \
             cover_image_url = CASE WHEN $6::BOOL THEN $7 ELSE cover_image_url END, \
             is_published    = COALESCE($8, is_published), \
             published_at    = CASE WHEN COALESCE($8, is_published) AND published_at IS NULL \
                                    THEN NOW() ELSE published_at END, \
             updated_at      = NOW() \
         WHERE id = $1 \
         RETURNING id, slug, title, summary, content, cover_image_url, \
                   is_published, published_at, created_at, updated_at",
    )
    .bind(id)
    .bind(update.title)
    .bind(update.summary.is_some())
    .bind(update.summary.flatten())
    .bind(update.content)
    .bind(update.cover_image_url.is_some())
    .bind(update.cover_image_url.flatten())
    .bind(update.is_published)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Deletes a post. Returns `false` for an unknown id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn delete_blog_post(pool: &PgPool, id: i64) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM blog_posts WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
