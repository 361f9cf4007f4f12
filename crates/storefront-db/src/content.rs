//! Database operations for the `announcements` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `announcements` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AnnouncementRow {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub is_active: bool,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAnnouncement<'a> {
    pub title: &'a str,
    pub body: &'a str,
    pub is_active: bool,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

// Option<Option<T>>: outer None = "not in request", Some(None) = "clear".
#[allow(clippy::option_option)]
#[derive(Debug, Clone, Default)]
pub struct UpdateAnnouncement<'a> {
    pub title: Option<&'a str>,
    pub body: Option<&'a str>,
    pub is_active: Option<bool>,
    pub starts_at: Option<Option<DateTime<Utc>>>,
    pub ends_at: Option<Option<DateTime<Utc>>>,
}

/// Returns announcements that are active and inside their display window at `now`.
///
/// A missing `starts_at` / `ends_at` leaves that side of the window open.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_active_announcements(
    pool: &PgPool,
    now: DateTime<Utc>,
) -> Result<Vec<AnnouncementRow>, DbError> {
    let rows = sqlx::query_as::<_, AnnouncementRow>(
        "SELECT id, title, body, is_active, starts_at, ends_at, created_at \
         FROM announcements \
         WHERE is_active \
           AND (starts_at IS NULL OR starts_at <= $1) \
           AND (ends_at IS NULL OR ends_at > $1) \
         ORDER BY COALESCE(starts_at, created_at) DESC, id DESC",
    )
    .bind(now)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Creates an announcement.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (e.g. `starts_at >= ends_at`).
pub async fn create_announcement(
    pool: &PgPool,
    announcement: &NewAnnouncement<'_>,
) -> Result<AnnouncementRow, DbError> {
    let row = sqlx::query_as::<_, AnnouncementRow>(
        "INSERT INTO announcements (title, body, is_active, starts_at, ends_at) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING id, title, body, is_active, starts_at, ends_at, created_at",
    )
    .bind(announcement.title)
    .bind(announcement.body)
    .bind(announcement.is_active)
    .bind(announcement.starts_at)
    .bind(announcement.ends_at)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Applies a sparse update to an announcement. Returns `None` for an unknown id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn update_announcement(
    pool: &PgPool,
    id: i64,
    update: &UpdateAnnouncement<'_>,
) -> Result<Option<AnnouncementRow>, DbError> {
    let row = sqlx::query_as::<_, AnnouncementRow>(
        "UPDATE announcements \
         SET title     = COALESCE($2, title), \
             body      = COALESCE($3, body), \
             is_active = COALESCE($4, is_active), \
             starts_at = CASE WHEN $5::BOOL THEN $6 ELSE starts_at END, \
             ends_at   = CASE WHEN $7::BOOL THEN $8 ELSE ends_at END \
         WHERE id = $1 \
         RETURNING id, title, body, is_active, starts_at, ends_at, created_at",
    )
    .bind(id)
    .bind(update.title)
    .bind(update.body)
    .bind(update.is_active)
    .bind(update.starts_at.is_some())
    .bind(update.starts_at.flatten())
    .bind(update.ends_at.is_some())
    .bind(update.ends_at.flatten())
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Deletes an announcement. Returns `false` for an unknown id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn delete_announcement(pool: &PgPool, id: i64) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM announcements WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
