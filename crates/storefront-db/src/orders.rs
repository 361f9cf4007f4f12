//! Database operations for `orders` and `order_items`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use storefront_core::OrderItemStatus;
use uuid::Uuid;

use crate::{parse_column, DbError};

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `orders` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderRow {
    pub id: i64,
    pub profile_id: Uuid,
    pub total: Decimal,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A row from the `order_items` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderItemRow {
    pub id: i64,
    pub order_id: i64,
    pub product_id: Option<i64>,
    pub product_name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub status: String,
    pub status_updated_at: DateTime<Utc>,
}

impl OrderItemRow {
    /// # Errors
    ///
    /// Returns [`DbError::InvalidColumn`] if the stored value is not a known status.
    pub fn status(&self) -> Result<OrderItemStatus, DbError> {
        parse_column("order_items.status", &self.status)
    }
}

/// Result of an item status change: the updated item, the status it had
/// before, and the owner of the order it belongs to.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderItemStatusChange {
    #[sqlx(flatten)]
    pub item: OrderItemRow,
    pub previous_status: String,
    pub profile_id: Uuid,
}

impl OrderItemStatusChange {
    /// # Errors
    ///
    /// Returns [`DbError::InvalidColumn`] if the stored value is not a known status.
    pub fn previous_status(&self) -> Result<OrderItemStatus, DbError> {
        parse_column("order_items.status", &self.previous_status)
    }
}

/// One priced line of an order about to be placed.
#[derive(Debug, Clone)]
pub struct NewOrderLine {
    pub product_id: i64,
    pub product_name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Places an order paid from the member's wallet.
///
/// Debits `total` from `profiles.wallet_balance`, inserts the order and its
/// lines, all in one transaction.
///
/// # Errors
///
/// Returns [`DbError::InsufficientBalance`] if the wallet cannot cover
/// `total`, or [`DbError::Sqlx`] if a statement fails.
pub async fn place_order(
    pool: &PgPool,
    profile_id: Uuid,
    lines: &[NewOrderLine],
    total: Decimal,
    note: Option<&str>,
) -> Result<(OrderRow, Vec<OrderItemRow>), DbError> {
    let mut tx = pool.begin().await?;

    let debited = sqlx::query(
        "UPDATE profiles \
         SET wallet_balance = wallet_balance - $2, updated_at = NOW() \
         WHERE id = $1 AND wallet_balance >= $2",
    )
    .bind(profile_id)
    .bind(total)
    .execute(&mut *tx)
    .await?;

    if debited.rows_affected() == 0 {
        return Err(DbError::InsufficientBalance);
    }

    let order = sqlx::query_as::<_, OrderRow>(
        "INSERT INTO orders (profile_id, total, note) \
         VALUES ($1, $2, $3) \
         RETURNING id, profile_id, total, note, created_at",
    )
    .bind(profile_id)
    .bind(total)
    .bind(note)
    .fetch_one(&mut *tx)
    .await?;

    let mut items = Vec::with_capacity(lines.len());
    for line in lines {
        let item = sqlx::query_as::<_, OrderItemRow>(
            "INSERT INTO order_items (order_id, product_id, product_name, unit_price, quantity) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, order_id, product_id, product_name, unit_price, quantity, \
                       status, status_updated_at",
        )
        .bind(order.id)
        .bind(line.product_id)
        .bind(&line.product_name)
        .bind(line.unit_price)
        .bind(line.quantity)
        .fetch_one(&mut *tx)
        .await?;
        items.push(item);
    }

    tx.commit().await?;
    Ok((order, items))
}

/// Sets an order item's status, returning the change, or `None` for an unknown id.
///
/// Any status may be replaced by any other. `status_updated_at` is only
/// stamped when the value actually changes.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn set_order_item_status(
    pool: &PgPool,
    id: i64,
    status: OrderItemStatus,
) -> Result<Option<OrderItemStatusChange>, DbError> {
    // The CTE reads the pre-update row from the same snapshot as the UPDATE.
    let row = sqlx::query_as::<_, OrderItemStatusChange>(
        "WITH prev AS ( \
             SELECT oi.id, oi.status, o.profile_id \
             FROM order_items oi \
             JOIN orders o ON o.id = oi.order_id \
             WHERE oi.id = $1 \
             FOR UPDATE OF oi \
         ) \
         UPDATE order_items oi \
         SET status = $2, \
             status_updated_at = CASE WHEN oi.status = $2 THEN oi.status_updated_at ELSE NOW() END \
         FROM prev \
         WHERE oi.id = prev.id \
         RETURNING oi.id, oi.order_id, oi.product_id, oi.product_name, oi.unit_price, \
                   oi.quantity, oi.status, oi.status_updated_at, \
                   prev.status AS previous_status, prev.profile_id",
    )
    .bind(id)
    .bind(status.as_str())
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Returns a member's orders, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_orders_for_profile(
    pool: &PgPool,
    profile_id: Uuid,
    limit: i64,
) -> Result<Vec<OrderRow>, DbError> {
    let rows = sqlx::query_as::<_, OrderRow>(
        "SELECT id, profile_id, total, note, created_at \
         FROM orders \
         WHERE profile_id = $1 \
         ORDER BY created_at DESC, id DESC \
         LIMIT $2",
    )
    .bind(profile_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns the most recent orders across all members.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_recent_orders(pool: &PgPool, limit: i64) -> Result<Vec<OrderRow>, DbError> {
    let rows = sqlx::query_as::<_, OrderRow>(
        "SELECT id, profile_id, total, note, created_at \
         FROM orders \
         ORDER BY created_at DESC, id DESC \
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns the items of the given orders, grouped by order id then item id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_items_for_orders(
    pool: &PgPool,
    order_ids: &[i64],
) -> Result<Vec<OrderItemRow>, DbError> {
    let rows = sqlx::query_as::<_, OrderItemRow>(
        "SELECT id, order_id, product_id, product_name, unit_price, quantity, \
                status, status_updated_at \
         FROM order_items \
         WHERE order_id = ANY($1) \
         ORDER BY order_id, id",
    )
    .bind(order_ids)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
