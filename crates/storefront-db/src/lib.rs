use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{env, time::Duration};
use thiserror::Error;

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_MIN_CONNECTIONS: u32 = 1;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;

// Path relative to crates/storefront-db/Cargo.toml; resolves to <workspace-root>/migrations/
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: DEFAULT_MIN_CONNECTIONS,
            acquire_timeout_secs: DEFAULT_ACQUIRE_TIMEOUT_SECS,
        }
    }
}

impl PoolConfig {
    #[must_use]
    pub fn from_app_config(config: &storefront_core::AppConfig) -> Self {
        Self {
            max_connections: config.db_max_connections,
            min_connections: config.db_min_connections,
            acquire_timeout_secs: config.db_acquire_timeout_secs,
        }
    }

    #[must_use]
    pub fn from_env() -> Self {
        Self {
            max_connections: read_u32("STOREFRONT_DB_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS),
            min_connections: read_u32("STOREFRONT_DB_MIN_CONNECTIONS", DEFAULT_MIN_CONNECTIONS),
            acquire_timeout_secs: read_u64(
                "STOREFRONT_DB_ACQUIRE_TIMEOUT_SECS",
                DEFAULT_ACQUIRE_TIMEOUT_SECS,
            ),
        }
    }
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("DATABASE_URL is not set")]
    MissingDatabaseUrl,
    #[error("record not found")]
    NotFound,
    #[error("{entity} {id} is not in status {expected}")]
    StaleStatus {
        entity: &'static str,
        id: String,
        expected: &'static str,
    },
    #[error("wallet balance is lower than the order total")]
    InsufficientBalance,
    #[error("invalid {column} value in database: {source}")]
    InvalidColumn {
        column: &'static str,
        #[source]
        source: storefront_core::ParseEnumError,
    },
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Connect to a Postgres pool using explicit URL and config.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the connection cannot be established.
pub async fn connect_pool(database_url: &str, config: PoolConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(database_url)
        .await
}

/// Connect to a Postgres pool, reading `DATABASE_URL` and pool settings from env.
///
/// # Errors
///
/// Returns [`DbError::MissingDatabaseUrl`] if `DATABASE_URL` is unset, or
/// [`DbError::Sqlx`] if the connection cannot be established.
pub async fn connect_pool_from_env() -> Result<PgPool, DbError> {
    let database_url = env::var("DATABASE_URL").map_err(|_| DbError::MissingDatabaseUrl)?;
    let config = PoolConfig::from_env();
    connect_pool(&database_url, config)
        .await
        .map_err(DbError::from)
}

/// Run all pending migrations against the pool.
///
/// Returns the number of migrations that were applied.
///
/// # Errors
///
/// Returns [`sqlx::migrate::MigrateError`] if any migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<usize, sqlx::migrate::MigrateError> {
    // The _sqlx_migrations table does not exist on a fresh database; treat that as zero.
    let applied_before: i64 =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = true")
            .fetch_one(pool)
            .await
            .unwrap_or(0);

    MIGRATOR.run(pool).await?;

    let applied_after: i64 =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = true")
            .fetch_one(pool)
            .await
            .unwrap_or(0);

    let delta = (applied_after - applied_before).max(0);
    Ok(usize::try_from(delta).unwrap_or(0))
}

/// Run a `SELECT 1` health check against the pool.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub async fn health_check(pool: &PgPool) -> Result<(), DbError> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await?;
    Ok(())
}

fn read_u32(var: &str, default: u32) -> u32 {
    env::var(var)
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(default)
}

fn read_u64(var: &str, default: u64) -> u64 {
    env::var(var)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

/// Parse a text column into one of the core enums, tagging failures with the column name.
pub(crate) fn parse_column<T>(column: &'static str, raw: &str) -> Result<T, DbError>
where
    T: std::str::FromStr<Err = storefront_core::ParseEnumError>,
{
    raw.parse::<T>()
        .map_err(|source| DbError::InvalidColumn { column, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_config_has_sane_defaults() {
        let config = PoolConfig::default();

        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert_eq!(config.min_connections, DEFAULT_MIN_CONNECTIONS);
        assert_eq!(config.acquire_timeout_secs, DEFAULT_ACQUIRE_TIMEOUT_SECS);
    }

    #[test]
    fn parse_column_reports_column_name() {
        let err = parse_column::<storefront_core::Tier>("profiles.tier", "vip").unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid profiles.tier value in database: unknown tier 'vip'"
        );
    }
}

pub mod blog;
pub mod catalog;
pub mod content;
pub mod orders;
pub mod profiles;
pub mod settings;
pub mod wallet;

pub use blog::{
    create_blog_post, create_tag, delete_blog_post, delete_tag, get_published_post_by_slug,
    list_published_posts, list_tags, list_tags_for_posts, set_post_tags, update_blog_post,
    BlogPostRow, NewBlogPost, PostTagRow, TagRow, UpdateBlogPost,
};
pub use catalog::{
    add_product_image, create_category, create_product, delete_category, delete_product,
    delete_product_image, get_category, get_product, list_categories, list_category_memberships,
    list_product_category_ids, list_product_images, list_products, list_products_by_ids,
    set_category_parents, set_product_categories, update_category, update_product, CategoryRow,
    NewProduct, ProductImageRow, ProductListFilters, ProductRow, UpdateProduct,
};
pub use content::{
    create_announcement, delete_announcement, list_active_announcements, update_announcement,
    AnnouncementRow, NewAnnouncement, UpdateAnnouncement,
};
pub use orders::{
    list_items_for_orders, list_orders_for_profile, list_recent_orders, place_order,
    set_order_item_status, NewOrderLine, OrderItemRow, OrderRow, OrderItemStatusChange,
};
pub use profiles::{
    create_profile, decide_upgrade, get_profile, grant_admin_by_email, list_profiles,
    request_upgrade, set_login_enabled, set_tier, update_profile_contact, ProfileFilters,
    ProfileRow,
};
pub use settings::{
    create_banner, delete_banner, get_email_template, get_shipping_settings, list_active_banners,
    list_email_templates, list_system_settings, update_shipping_settings, upsert_email_template,
    upsert_system_setting, BannerRow, EmailTemplateRow, ShippingSettingsRow, SystemSettingRow,
};
pub use wallet::{
    approve_topup, create_topup, list_topups, list_topups_for_profile, reject_topup, TopupRow,
};
