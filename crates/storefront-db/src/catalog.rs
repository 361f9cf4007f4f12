//! Database operations for products, product images and categories.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use storefront_core::{CategoryMembership, ProductStatus};

use crate::{parse_column, DbError};

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `products` table plus its first image.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub retail_price: Decimal,
    pub wholesale_price: Option<Decimal>,
    pub status: String,
    pub wholesale_only: bool,
    pub primary_image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductRow {
    /// # Errors
    ///
    /// Returns [`DbError::InvalidColumn`] if the stored value is not a known status.
    pub fn status(&self) -> Result<ProductStatus, DbError> {
        parse_column("products.status", &self.status)
    }
}

/// A row from the `product_images` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductImageRow {
    pub id: i64,
    pub product_id: i64,
    pub url: String,
    /// Image CDN identifier, used by whoever removes the hosted file.
    pub public_id: Option<String>,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
}

/// A row from the `categories` table with its parents from `category_relations`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CategoryRow {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub level: i16,
    pub sort_order: i32,
    pub parent_ids: Vec<i64>,
}

#[derive(Debug, sqlx::FromRow)]
struct MembershipRow {
    product_id: i64,
    category_id: i64,
    product_status: String,
    category_level: i16,
}

impl From<MembershipRow> for CategoryMembership {
    fn from(row: MembershipRow) -> Self {
        Self {
            product_id: row.product_id,
            category_id: row.category_id,
            product_status: row.product_status,
            category_level: row.category_level,
        }
    }
}

/// Input filters for product listing.
#[derive(Debug, Clone, Default)]
pub struct ProductListFilters {
    pub category_id: Option<i64>,
    /// Include products flagged `wholesale_only`.
    pub include_wholesale_only: bool,
    /// Include draft and archived products (admin views).
    pub include_unpublished: bool,
    pub limit: i64,
}

#[derive(Debug, Clone)]
pub struct NewProduct<'a> {
    pub name: &'a str,
    pub slug: &'a str,
    pub description: Option<&'a str>,
    pub retail_price: Decimal,
    pub wholesale_price: Option<Decimal>,
    pub status: ProductStatus,
    pub wholesale_only: bool,
}

/// Sparse product update: `None` keeps the current value.
// Option<Option<T>>: outer None = "not in request", Some(None) = "clear".
#[allow(clippy::option_option)]
#[derive(Debug, Clone, Default)]
pub struct UpdateProduct<'a> {
    pub name: Option<&'a str>,
    pub description: Option<Option<&'a str>>,
    pub retail_price: Option<Decimal>,
    pub wholesale_price: Option<Option<Decimal>>,
    pub status: Option<ProductStatus>,
    pub wholesale_only: Option<bool>,
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

/// Lists products, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_products(
    pool: &PgPool,
    filters: ProductListFilters,
) -> Result<Vec<ProductRow>, DbError> {
    let rows = sqlx::query_as::<_, ProductRow>(
        "SELECT p.id, p.name, p.slug, p.description, p.retail_price, p.wholesale_price, \
                p.status, p.wholesale_only, \
                (SELECT pi.url FROM product_images pi WHERE pi.product_id = p.id \
                 ORDER BY pi.sort_order, pi.id LIMIT 1) AS primary_image_url, \
                p.created_at, p.updated_at \
         FROM products p \
         WHERE ($1::BOOL OR p.status = 'published') \
           AND ($2::BOOL OR NOT p.wholesale_only) \
           AND ($3::BIGINT IS NULL OR EXISTS ( \
                 SELECT 1 FROM product_category_map m \
                 WHERE m.product_id = p.id AND m.category_id = $3)) \
         ORDER BY p.updated_at DESC, p.id DESC \
         LIMIT $4",
    )
    .bind(filters.include_unpublished)
    .bind(filters.include_wholesale_only)
    .bind(filters.category_id)
    .bind(filters.limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns a product by id regardless of status; callers decide visibility.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_product(pool: &PgPool, id: i64) -> Result<Option<ProductRow>, DbError> {
    let row = sqlx::query_as::<_, ProductRow>(
        "SELECT p.id, p.name, p.slug, p.description, p.retail_price, p.wholesale_price, \
                p.status, p.wholesale_only, \
                (SELECT pi.url FROM product_images pi WHERE pi.product_id = p.id \
                 ORDER BY pi.sort_order, pi.id LIMIT 1) AS primary_image_url, \
                p.created_at, p.updated_at \
         FROM products p \
         WHERE p.id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Returns the products with the given ids, in id order. Missing ids are skipped.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_products_by_ids(pool: &PgPool, ids: &[i64]) -> Result<Vec<ProductRow>, DbError> {
    let rows = sqlx::query_as::<_, ProductRow>(
        "SELECT p.id, p.name, p.slug, p.description, p.retail_price, p.wholesale_price, \
                p.status, p.wholesale_only, NULL::TEXT AS primary_image_url, \
                p.created_at, p.updated_at \
         FROM products p \
         WHERE p.id = ANY($1) \
         ORDER BY p.id",
    )
    .bind(ids)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Creates a product and returns the inserted row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (including a duplicate slug).
pub async fn create_product(pool: &PgPool, product: &NewProduct<'_>) -> Result<ProductRow, DbError> {
    let row = sqlx::query_as::<_, ProductRow>(
        "INSERT INTO products \
           (name, slug, description, retail_price, wholesale_price, status, wholesale_only) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         RETURNING id, name, slug, description, retail_price, wholesale_price, status, \
                   wholesale_only, NULL::TEXT AS primary_image_url, created_at, updated_at",
    )
    .bind(product.name)
    .bind(product.slug)
    .bind(product.description)
    .bind(product.retail_price)
    .bind(product.wholesale_price)
    .bind(product.status.as_str())
    .bind(product.wholesale_only)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Applies a sparse update to a product. Returns `None` for an unknown id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn update_product(
    pool: &PgPool,
    id: i64,
    update: &UpdateProduct<'_>,
) -> Result<Option<ProductRow>, DbError> {
    let row = sqlx::query_as::<_, ProductRow>(
        "UPDATE products \
         SET name            = COALESCE($2, name), \
             description     = CASE WHEN $3::BOOL THEN $4 ELSE description END, \
             retail_price    = COALESCE($5, retail_price), \
             wholesale_price = CASE WHEN $6::BOOL THEN $7 ELSE wholesale_price END, \
             status          = COALESCE($8, status), \
             wholesale_only  = COALESCE($9, wholesale_only), \
             updated_at      = NOW() \
         WHERE id = $1 \
         RETURNING id, name, slug, description, retail_price, wholesale_price, status, \
                   wholesale_only, \
                   (SELECT pi.url FROM product_images pi WHERE pi.product_id = products.id \
                    ORDER BY pi.sort_order, pi.id LIMIT 1) AS primary_image_url, \
                   created_at, updated_at",
    )
    .bind(id)
    .bind(update.name)
    .bind(update.description.is_some())
    .bind(update.description.flatten())
    .bind(update.retail_price)
    .bind(update.wholesale_price.is_some())
    .bind(update.wholesale_price.flatten())
    .bind(update.status.map(ProductStatus::as_str))
    .bind(update.wholesale_only)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Deletes a product with its images and category links. Returns `false` for an unknown id.
///
/// Order items keep their copied name and price; their `product_id` becomes NULL.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn delete_product(pool: &PgPool, id: i64) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Replaces the product's category set.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a statement fails (e.g. an unknown category id
/// violates the foreign key).
pub async fn set_product_categories(
    pool: &PgPool,
    product_id: i64,
    category_ids: &[i64],
) -> Result<(), DbError> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM product_category_map WHERE product_id = $1")
        .bind(product_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        "INSERT INTO product_category_map (product_id, category_id) \
         SELECT $1, c FROM unnest($2::BIGINT[]) AS c \
         ON CONFLICT DO NOTHING",
    )
    .bind(product_id)
    .bind(category_ids)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

/// Returns the category ids linked to a product.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_product_category_ids(pool: &PgPool, product_id: i64) -> Result<Vec<i64>, DbError> {
    let ids = sqlx::query_scalar::<_, i64>(
        "SELECT category_id FROM product_category_map \
         WHERE product_id = $1 \
         ORDER BY category_id",
    )
    .bind(product_id)
    .fetch_all(pool)
    .await?;

    Ok(ids)
}

// ---------------------------------------------------------------------------
// Product images
// ---------------------------------------------------------------------------

/// Returns a product's images in display order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_product_images(
    pool: &PgPool,
    product_id: i64,
) -> Result<Vec<ProductImageRow>, DbError> {
    let rows = sqlx::query_as::<_, ProductImageRow>(
        "SELECT id, product_id, url, public_id, sort_order, created_at \
         FROM product_images \
         WHERE product_id = $1 \
         ORDER BY sort_order, id",
    )
    .bind(product_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Registers an already-hosted image for a product.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (e.g. unknown product).
pub async fn add_product_image(
    pool: &PgPool,
    product_id: i64,
    url: &str,
    public_id: Option<&str>,
    sort_order: i32,
) -> Result<ProductImageRow, DbError> {
    let row = sqlx::query_as::<_, ProductImageRow>(
        "INSERT INTO product_images (product_id, url, public_id, sort_order) \
         VALUES ($1, $2, $3, $4) \
         RETURNING id, product_id, url, public_id, sort_order, created_at",
    )
    .bind(product_id)
    .bind(url)
    .bind(public_id)
    .bind(sort_order)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Removes an image row and returns it, or `None` for an unknown id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn delete_product_image(
    pool: &PgPool,
    id: i64,
) -> Result<Option<ProductImageRow>, DbError> {
    let row = sqlx::query_as::<_, ProductImageRow>(
        "DELETE FROM product_images WHERE id = $1 \
         RETURNING id, product_id, url, public_id, sort_order, created_at",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

/// Returns all categories ordered by level, then sort order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_categories(pool: &PgPool) -> Result<Vec<CategoryRow>, DbError> {
    let rows = sqlx::query_as::<_, CategoryRow>(
        "SELECT c.id, c.name, c.slug, c.level, c.sort_order, \
                COALESCE(array_agg(r.parent_id ORDER BY r.parent_id) \
                         FILTER (WHERE r.parent_id IS NOT NULL), '{}') AS parent_ids \
         FROM categories c \
         LEFT JOIN category_relations r ON r.child_id = c.id \
         GROUP BY c.id \
         ORDER BY c.level, c.sort_order, c.id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns one category with its parent ids, or `None` if it does not exist.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_category(pool: &PgPool, id: i64) -> Result<Option<CategoryRow>, DbError> {
    let row = sqlx::query_as::<_, CategoryRow>(
        "SELECT c.id, c.name, c.slug, c.level, c.sort_order, \
                COALESCE(array_agg(r.parent_id ORDER BY r.parent_id) \
                         FILTER (WHERE r.parent_id IS NOT NULL), '{}') AS parent_ids \
         FROM categories c \
         LEFT JOIN category_relations r ON r.child_id = c.id \
         WHERE c.id = $1 \
         GROUP BY c.id",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Creates a category with no parents.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (duplicate slug, level outside 1-3).
pub async fn create_category(
    pool: &PgPool,
    name: &str,
    slug: &str,
    level: i16,
    sort_order: i32,
) -> Result<CategoryRow, DbError> {
    let row = sqlx::query_as::<_, CategoryRow>(
        "INSERT INTO categories (name, slug, level, sort_order) \
         VALUES ($1, $2, $3, $4) \
         RETURNING id, name, slug, level, sort_order, '{}'::BIGINT[] AS parent_ids",
    )
    .bind(name)
    .bind(slug)
    .bind(level)
    .bind(sort_order)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Applies a sparse update to a category. Returns `None` for an unknown id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn update_category(
    pool: &PgPool,
    id: i64,
    name: Option<&str>,
    level: Option<i16>,
    sort_order: Option<i32>,
) -> Result<Option<CategoryRow>, DbError> {
    let row = sqlx::query_as::<_, CategoryRow>(
        "UPDATE categories \
         SET name       = COALESCE($2, name), \
             level      = COALESCE($3, level), \
             sort_order = COALESCE($4, sort_order) \
         WHERE id = $1 \
         RETURNING id, name, slug, level, sort_order, \
                   COALESCE((SELECT array_agg(r.parent_id ORDER BY r.parent_id) \
                             FROM category_relations r WHERE r.child_id = categories.id), \
                            '{}') AS parent_ids",
    )
    .bind(id)
    .bind(name)
    .bind(level)
    .bind(sort_order)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Deletes a category and its relations and product links. Returns `false` for an unknown id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn delete_category(pool: &PgPool, id: i64) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM categories WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Replaces the category's parent set.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a statement fails (unknown parent id, or a
/// category listed as its own parent).
pub async fn set_category_parents(
    pool: &PgPool,
    id: i64,
    parent_ids: &[i64],
) -> Result<(), DbError> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM category_relations WHERE child_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        "INSERT INTO category_relations (parent_id, child_id) \
         SELECT p, $1 FROM unnest($2::BIGINT[]) AS p \
         ON CONFLICT DO NOTHING",
    )
    .bind(id)
    .bind(parent_ids)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

/// Returns one row per (published product, category) link, with the category level.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_category_memberships(pool: &PgPool) -> Result<Vec<CategoryMembership>, DbError> {
    let rows = sqlx::query_as::<_, MembershipRow>(
        "SELECT m.product_id, m.category_id, p.status AS product_status, \
                c.level AS category_level \
         FROM product_category_map m \
         JOIN products p ON p.id = m.product_id \
         JOIN categories c ON c.id = m.category_id \
         WHERE p.status = 'published'",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(CategoryMembership::from).collect())
}
