//! Database operations for email templates and the settings tables.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::PgPool;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `email_templates` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EmailTemplateRow {
    pub key: String,
    pub subject: String,
    pub body: String,
    pub updated_at: DateTime<Utc>,
}

/// The single row of `shipping_settings`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ShippingSettingsRow {
    pub flat_fee: Decimal,
    pub free_shipping_threshold: Option<Decimal>,
    pub notes: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// A row from the `banner_settings` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BannerRow {
    pub id: i64,
    pub image_url: String,
    pub link_url: Option<String>,
    pub sort_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// A row from the `system_settings` key/value table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SystemSettingRow {
    pub key: String,
    pub value: Value,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Email templates
// ---------------------------------------------------------------------------

/// Returns a template by key.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_email_template(
    pool: &PgPool,
    key: &str,
) -> Result<Option<EmailTemplateRow>, DbError> {
    let row = sqlx::query_as::<_, EmailTemplateRow>(
        "SELECT key, subject, body, updated_at FROM email_templates WHERE key = $1",
    )
    .bind(key)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Returns all templates ordered by key.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_email_templates(pool: &PgPool) -> Result<Vec<EmailTemplateRow>, DbError> {
    let rows = sqlx::query_as::<_, EmailTemplateRow>(
        "SELECT key, subject, body, updated_at FROM email_templates ORDER BY key",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Inserts or replaces a template.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn upsert_email_template(
    pool: &PgPool,
    key: &str,
    subject: &str,
    body: &str,
) -> Result<EmailTemplateRow, DbError> {
    let row = sqlx::query_as::<_, EmailTemplateRow>(
        "INSERT INTO email_templates (key, subject, body) \
         VALUES ($1, $2, $3) \
         ON CONFLICT (key) DO UPDATE \
           SET subject = EXCLUDED.subject, body = EXCLUDED.body, updated_at = NOW() \
         RETURNING key, subject, body, updated_at",
    )
    .bind(key)
    .bind(subject)
    .bind(body)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

// ---------------------------------------------------------------------------
// Shipping
// ---------------------------------------------------------------------------

/// Returns the shipping settings row seeded by the initial migration.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the row was removed, or [`DbError::Sqlx`]
/// if the query fails.
pub async fn get_shipping_settings(pool: &PgPool) -> Result<ShippingSettingsRow, DbError> {
    let row = sqlx::query_as::<_, ShippingSettingsRow>(
        "SELECT flat_fee, free_shipping_threshold, notes, updated_at \
         FROM shipping_settings WHERE id = 1",
    )
    .fetch_optional(pool)
    .await?;
    row.ok_or(DbError::NotFound)
}

/// Replaces the shipping settings.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn update_shipping_settings(
    pool: &PgPool,
    flat_fee: Decimal,
    free_shipping_threshold: Option<Decimal>,
    notes: Option<&str>,
) -> Result<ShippingSettingsRow, DbError> {
    let row = sqlx::query_as::<_, ShippingSettingsRow>(
        "INSERT INTO shipping_settings (id, flat_fee, free_shipping_threshold, notes) \
         VALUES (1, $1, $2, $3) \
         ON CONFLICT (id) DO UPDATE \
           SET flat_fee = EXCLUDED.flat_fee, \
               free_shipping_threshold = EXCLUDED.free_shipping_threshold, \
               notes = EXCLUDED.notes, \
               updated_at = NOW() \
         RETURNING flat_fee, free_shipping_threshold, notes, updated_at",
    )
    .bind(flat_fee)
    .bind(free_shipping_threshold)
    .bind(notes)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

// ---------------------------------------------------------------------------
// Banners
// ---------------------------------------------------------------------------

/// Returns active banners in display order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_active_banners(pool: &PgPool) -> Result<Vec<BannerRow>, DbError> {
    let rows = sqlx::query_as::<_, BannerRow>(
        "SELECT id, image_url, link_url, sort_order, is_active, created_at \
         FROM banner_settings \
         WHERE is_active \
         ORDER BY sort_order, id",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Creates a banner.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_banner(
    pool: &PgPool,
    image_url: &str,
    link_url: Option<&str>,
    sort_order: i32,
    is_active: bool,
) -> Result<BannerRow, DbError> {
    let row = sqlx::query_as::<_, BannerRow>(
        "INSERT INTO banner_settings (image_url, link_url, sort_order, is_active) \
         VALUES ($1, $2, $3, $4) \
         RETURNING id, image_url, link_url, sort_order, is_active, created_at",
    )
    .bind(image_url)
    .bind(link_url)
    .bind(sort_order)
    .bind(is_active)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Deletes a banner. Returns `false` for an unknown id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn delete_banner(pool: &PgPool, id: i64) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM banner_settings WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

// ---------------------------------------------------------------------------
// System settings
// ---------------------------------------------------------------------------

/// Returns all system settings ordered by key.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_system_settings(pool: &PgPool) -> Result<Vec<SystemSettingRow>, DbError> {
    let rows = sqlx::query_as::<_, SystemSettingRow>(
        "SELECT key, value, updated_at FROM system_settings ORDER BY key",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Inserts or replaces a system setting.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn upsert_system_setting(
    pool: &PgPool,
    key: &str,
    value: &Value,
) -> Result<SystemSettingRow, DbError> {
    let row = sqlx::query_as::<_, SystemSettingRow>(
        "INSERT INTO system_settings (key, value) \
         VALUES ($1, $2) \
         ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW() \
         RETURNING key, value, updated_at",
    )
    .bind(key)
    .bind(value)
    .fetch_one(pool)
    .await?;
    Ok(row)
}
