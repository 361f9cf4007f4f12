//! Database operations for `wallet_topup_requests` and wallet balances.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use storefront_core::TopupStatus;
use uuid::Uuid;

use crate::{parse_column, DbError};

/// A row from the `wallet_topup_requests` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TopupRow {
    pub id: i64,
    pub profile_id: Uuid,
    pub amount: Decimal,
    pub method: String,
    pub reference: Option<String>,
    pub status: String,
    pub admin_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
}

impl TopupRow {
    /// # Errors
    ///
    /// Returns [`DbError::InvalidColumn`] if the stored value is not a known status.
    pub fn status(&self) -> Result<TopupStatus, DbError> {
        parse_column("wallet_topup_requests.status", &self.status)
    }
}

/// Creates a `PENDING` top-up request for a member.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (e.g. a non-positive amount
/// violates the table's CHECK constraint).
pub async fn create_topup(
    pool: &PgPool,
    profile_id: Uuid,
    amount: Decimal,
    method: &str,
    reference: Option<&str>,
) -> Result<TopupRow, DbError> {
    let row = sqlx::query_as::<_, TopupRow>(
        "INSERT INTO wallet_topup_requests (profile_id, amount, method, reference) \
         VALUES ($1, $2, $3, $4) \
         RETURNING id, profile_id, amount, method, reference, status, admin_note, \
                   created_at, decided_at",
    )
    .bind(profile_id)
    .bind(amount)
    .bind(method)
    .bind(reference)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Returns a member's top-up requests, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_topups_for_profile(
    pool: &PgPool,
    profile_id: Uuid,
    limit: i64,
) -> Result<Vec<TopupRow>, DbError> {
    let rows = sqlx::query_as::<_, TopupRow>(
        "SELECT id, profile_id, amount, method, reference, status, admin_note, \
                created_at, decided_at \
         FROM wallet_topup_requests \
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

/// Returns top-up requests across all members, oldest first, optionally by status.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_topups(
    pool: &PgPool,
    status: Option<TopupStatus>,
    limit: i64,
) -> Result<Vec<TopupRow>, DbError> {
    let rows = sqlx::query_as::<_, TopupRow>(
        "SELECT id, profile_id, amount, method, reference, status, admin_note, \
                created_at, decided_at \
         FROM wallet_topup_requests \
         WHERE ($1::TEXT IS NULL OR status = $1) \
         ORDER BY created_at ASC, id ASC \
         LIMIT $2",
    )
    .bind(status.map(TopupStatus::as_str))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Approves a `PENDING` top-up and credits the member's wallet.
///
/// The status change and the balance credit commit together. Returns the
/// updated request and the member's new balance.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] for an unknown id, [`DbError::StaleStatus`]
/// if the request was already decided, or [`DbError::Sqlx`] if a statement fails.
pub async fn approve_topup(
    pool: &PgPool,
    id: i64,
    admin_note: Option<&str>,
) -> Result<(TopupRow, Decimal), DbError> {
    let mut tx = pool.begin().await?;

    let topup = sqlx::query_as::<_, TopupRow>(
        "UPDATE wallet_topup_requests \
         SET status = 'APPROVED', admin_note = $2, decided_at = NOW() \
         WHERE id = $1 AND status = 'PENDING' \
         RETURNING id, profile_id, amount, method, reference, status, admin_note, \
                   created_at, decided_at",
    )
    .bind(id)
    .bind(admin_note)
    .fetch_optional(&mut *tx)
    .await?;
    let Some(topup) = topup else {
        drop(tx);
        return Err(undecidable_topup(pool, id).await);
    };

    let balance: Decimal = sqlx::query_scalar(
        "UPDATE profiles \
         SET wallet_balance = wallet_balance + $2, updated_at = NOW() \
         WHERE id = $1 \
         RETURNING wallet_balance",
    )
    .bind(topup.profile_id)
    .bind(topup.amount)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok((topup, balance))
}

/// Rejects a `PENDING` top-up. The wallet is not touched.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] for an unknown id, [`DbError::StaleStatus`]
/// if the request was already decided, or [`DbError::Sqlx`] if the query fails.
pub async fn reject_topup(
    pool: &PgPool,
    id: i64,
    admin_note: Option<&str>,
) -> Result<TopupRow, DbError> {
    let row = sqlx::query_as::<_, TopupRow>(
        "UPDATE wallet_topup_requests \
         SET status = 'REJECTED', admin_note = $2, decided_at = NOW() \
         WHERE id = $1 AND status = 'PENDING' \
         RETURNING id, profile_id, amount, method, reference, status, admin_note, \
                   created_at, decided_at",
    )
    .bind(id)
    .bind(admin_note)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok(row),
        None => Err(undecidable_topup(pool, id).await),
    }
}

/// Explains why a decision matched no `PENDING` row: missing, or already decided.
async fn undecidable_topup(pool: &PgPool, id: i64) -> DbError {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM wallet_topup_requests WHERE id = $1)",
    )
    .bind(id)
    .fetch_one(pool)
    .await;

    match exists {
        Ok(true) => DbError::StaleStatus {
            entity: "top-up request",
            id: id.to_string(),
            expected: "PENDING",
        },
        Ok(false) => DbError::NotFound,
        Err(e) => DbError::Sqlx(e),
    }
}
