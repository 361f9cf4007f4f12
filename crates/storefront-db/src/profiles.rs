//! Database operations for the `profiles` table.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use storefront_core::{Role, Tier, UpgradeStatus};
use uuid::Uuid;

use crate::{parse_column, DbError};

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `profiles` table. `id` is the auth provider's user id.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProfileRow {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub company_name: Option<String>,
    pub role: String,
    pub tier: String,
    pub login_enabled: bool,
    pub wholesale_upgrade_status: Option<String>,
    pub upgrade_requested_at: Option<DateTime<Utc>>,
    pub upgrade_decided_at: Option<DateTime<Utc>>,
    pub wallet_balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProfileRow {
    /// # Errors
    ///
    /// Returns [`DbError::InvalidColumn`] if the stored value is not a known tier.
    pub fn tier(&self) -> Result<Tier, DbError> {
        parse_column("profiles.tier", &self.tier)
    }

    /// # Errors
    ///
    /// Returns [`DbError::InvalidColumn`] if the stored value is not a known status.
    pub fn upgrade_status(&self) -> Result<Option<UpgradeStatus>, DbError> {
        self.wholesale_upgrade_status
            .as_deref()
            .map(|raw| parse_column("profiles.wholesale_upgrade_status", raw))
            .transpose()
    }

    /// # Errors
    ///
    /// Returns [`DbError::InvalidColumn`] if the stored value is not a known role.
    pub fn role(&self) -> Result<Role, DbError> {
        parse_column("profiles.role", &self.role)
    }

    /// Name used in greetings: display name, falling back to the email address.
    #[must_use]
    pub fn greeting_name(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.email)
    }
}

/// Input filters for the admin member listing.
#[derive(Debug, Clone, Default)]
pub struct ProfileFilters<'a> {
    pub tier: Option<&'a str>,
    pub upgrade_status: Option<&'a str>,
    pub limit: i64,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Returns a profile by id, or `None` if the user has not registered.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_profile(pool: &PgPool, id: Uuid) -> Result<Option<ProfileRow>, DbError> {
    let row = sqlx::query_as::<_, ProfileRow>(
        "SELECT id, email, display_name, phone, company_name, role, tier, login_enabled, \
                wholesale_upgrade_status, upgrade_requested_at, upgrade_decided_at, \
                wallet_balance, created_at, updated_at \
         FROM profiles \
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Creates a retail profile for a newly registered user.
///
/// Idempotent on `id`: when the profile already exists it is returned unchanged
/// and the flag is `false`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails (including a unique violation
/// when another profile already uses `email`).
pub async fn create_profile(
    pool: &PgPool,
    id: Uuid,
    email: &str,
    display_name: Option<&str>,
    phone: Option<&str>,
    company_name: Option<&str>,
) -> Result<(ProfileRow, bool), DbError> {
    let inserted = sqlx::query_as::<_, ProfileRow>(
        "INSERT INTO profiles (id, email, display_name, phone, company_name, role, tier) \
         VALUES ($1, $2, $3, $4, $5, 'member', 'retail') \
         ON CONFLICT (id) DO NOTHING \
         RETURNING id, email, display_name, phone, company_name, role, tier, login_enabled, \
                   wholesale_upgrade_status, upgrade_requested_at, upgrade_decided_at, \
                   wallet_balance, created_at, updated_at",
    )
    .bind(id)
    .bind(email)
    .bind(display_name)
    .bind(phone)
    .bind(company_name)
    .fetch_optional(pool)
    .await?;

    if let Some(row) = inserted {
        return Ok((row, true));
    }

    let existing = get_profile(pool, id).await?.ok_or(DbError::NotFound)?;
    Ok((existing, false))
}

/// Updates the member-editable contact fields.
///
/// `None` keeps the current value, `Some(None)` clears it, `Some(Some(v))` sets it.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the profile does not exist, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn update_profile_contact(
    pool: &PgPool,
    id: Uuid,
    display_name: Option<Option<&str>>,
    phone: Option<Option<&str>>,
    company_name: Option<Option<&str>>,
) -> Result<ProfileRow, DbError> {
    let row = sqlx::query_as::<_, ProfileRow>(
        "UPDATE profiles \
         SET display_name = CASE WHEN $2::BOOL THEN $3 ELSE display_name END, \
             phone        = CASE WHEN $4::BOOL THEN $5 ELSE phone END, \
             company_name = CASE WHEN $6::BOOL THEN $7 ELSE company_name END, \
             updated_at   = NOW() \
         WHERE id = $1 \
         RETURNING id, email, display_name, phone, company_name, role, tier, login_enabled, \
                   wholesale_upgrade_status, upgrade_requested_at, upgrade_decided_at, \
                   wallet_balance, created_at, updated_at",
    )
    .bind(id)
    .bind(display_name.is_some())
    .bind(display_name.flatten())
    .bind(phone.is_some())
    .bind(phone.flatten())
    .bind(company_name.is_some())
    .bind(company_name.flatten())
    .fetch_optional(pool)
    .await?;

    row.ok_or(DbError::NotFound)
}

/// Moves a retail member's upgrade request to `PENDING` and stamps `upgrade_requested_at`.
///
/// The `WHERE` clause repeats the eligibility rule so two concurrent requests
/// cannot both succeed.
///
/// # Errors
///
/// Returns [`DbError::StaleStatus`] if the profile is no longer eligible, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn request_upgrade(pool: &PgPool, id: Uuid) -> Result<ProfileRow, DbError> {
    let row = sqlx::query_as::<_, ProfileRow>(
        "UPDATE profiles \
         SET wholesale_upgrade_status = 'PENDING', \
             upgrade_requested_at     = NOW(), \
             upgrade_decided_at       = NULL, \
             updated_at               = NOW() \
         WHERE id = $1 \
           AND tier = 'retail' \
           AND wholesale_upgrade_status IS DISTINCT FROM 'PENDING' \
         RETURNING id, email, display_name, phone, company_name, role, tier, login_enabled, \
                   wholesale_upgrade_status, upgrade_requested_at, upgrade_decided_at, \
                   wallet_balance, created_at, updated_at",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.ok_or_else(|| DbError::StaleStatus {
        entity: "profile",
        id: id.to_string(),
        expected: "retail without a pending request",
    })
}

/// Records an admin decision on a `PENDING` upgrade request.
///
/// Approval also sets `tier = 'wholesale'`. Both outcomes stamp `upgrade_decided_at`.
///
/// # Errors
///
/// Returns [`DbError::StaleStatus`] if the request is not `PENDING`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn decide_upgrade(
    pool: &PgPool,
    id: Uuid,
    decision: UpgradeStatus,
) -> Result<ProfileRow, DbError> {
    let row = sqlx::query_as::<_, ProfileRow>(
        "UPDATE profiles \
         SET wholesale_upgrade_status = $2, \
             upgrade_decided_at       = NOW(), \
             tier                     = CASE WHEN $2::TEXT = 'APPROVED' THEN 'wholesale' ELSE tier END, \
             updated_at               = NOW() \
         WHERE id = $1 AND wholesale_upgrade_status = 'PENDING' \
         RETURNING id, email, display_name, phone, company_name, role, tier, login_enabled, \
                   wholesale_upgrade_status, upgrade_requested_at, upgrade_decided_at, \
                   wallet_balance, created_at, updated_at",
    )
    .bind(id)
    .bind(decision.as_str())
    .fetch_optional(pool)
    .await?;

    row.ok_or_else(|| DbError::StaleStatus {
        entity: "profile",
        id: id.to_string(),
        expected: "PENDING",
    })
}

/// Sets a member's tier directly (admin override).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn set_tier(pool: &PgPool, id: Uuid, tier: Tier) -> Result<Option<ProfileRow>, DbError> {
    let row = sqlx::query_as::<_, ProfileRow>(
        "UPDATE profiles \
         SET tier = $2, updated_at = NOW() \
         WHERE id = $1 \
         RETURNING id, email, display_name, phone, company_name, role, tier, login_enabled, \
                   wholesale_upgrade_status, upgrade_requested_at, upgrade_decided_at, \
                   wallet_balance, created_at, updated_at",
    )
    .bind(id)
    .bind(tier.as_str())
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Enables or disables a member's login.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn set_login_enabled(
    pool: &PgPool,
    id: Uuid,
    enabled: bool,
) -> Result<Option<ProfileRow>, DbError> {
    let row = sqlx::query_as::<_, ProfileRow>(
        "UPDATE profiles \
         SET login_enabled = $2, updated_at = NOW() \
         WHERE id = $1 \
         RETURNING id, email, display_name, phone, company_name, role, tier, login_enabled, \
                   wholesale_upgrade_status, upgrade_requested_at, upgrade_decided_at, \
                   wallet_balance, created_at, updated_at",
    )
    .bind(id)
    .bind(enabled)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Lists profiles for the admin console, oldest pending upgrade requests first
/// when filtering by status, otherwise newest members first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_profiles(
    pool: &PgPool,
    filters: ProfileFilters<'_>,
) -> Result<Vec<ProfileRow>, DbError> {
    let rows = sqlx::query_as::<_, ProfileRow>(
        "SELECT id, email, display_name, phone, company_name, role, tier, login_enabled, \
                wholesale_upgrade_status, upgrade_requested_at, upgrade_decided_at, \
                wallet_balance, created_at, updated_at \
         FROM profiles \
         WHERE ($1::TEXT IS NULL OR tier = $1) \
           AND ($2::TEXT IS NULL OR wholesale_upgrade_status = $2) \
         ORDER BY \
           CASE WHEN $2::TEXT IS NULL THEN NULL ELSE upgrade_requested_at END ASC NULLS LAST, \
           created_at DESC \
         LIMIT $3",
    )
    .bind(filters.tier)
    .bind(filters.upgrade_status)
    .bind(filters.limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Grants the admin role to the profile registered with `email`.
///
/// Returns `false` when no profile uses that email.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn grant_admin_by_email(pool: &PgPool, email: &str) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE profiles \
         SET role = 'admin', updated_at = NOW() \
         WHERE lower(email) = lower($1)",
    )
    .bind(email)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
