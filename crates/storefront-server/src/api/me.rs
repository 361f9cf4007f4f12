//! The caller's own profile: registration, contact details and the wholesale
//! upgrade request.

use axum::{extract::State, http::StatusCode, Extension, Json};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use storefront_core::check_upgrade_request;
use storefront_db::ProfileRow;
use uuid::Uuid;

use crate::middleware::{Caller, RequestId};

use super::extract::{ApiJson, Member};
use super::{double_option, map_db_error, map_transition_error, ApiError, ApiResponse, AppState};

const MAX_CONTACT_LEN: usize = 200;

#[derive(Debug, Serialize)]
pub(super) struct ProfileItem {
    id: Uuid,
    email: String,
    display_name: Option<String>,
    phone: Option<String>,
    company_name: Option<String>,
    role: String,
    tier: String,
    login_enabled: bool,
    wholesale_upgrade_status: Option<String>,
    upgrade_requested_at: Option<DateTime<Utc>>,
    upgrade_decided_at: Option<DateTime<Utc>>,
    wallet_balance: Decimal,
    created_at: DateTime<Utc>,
}

impl From<ProfileRow> for ProfileItem {
    fn from(row: ProfileRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            display_name: row.display_name,
            phone: row.phone,
            company_name: row.company_name,
            role: row.role,
            tier: row.tier,
            login_enabled: row.login_enabled,
            wholesale_upgrade_status: row.wholesale_upgrade_status,
            upgrade_requested_at: row.upgrade_requested_at,
            upgrade_decided_at: row.upgrade_decided_at,
            wallet_balance: row.wallet_balance,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct RegisterRequest {
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub company_name: Option<String>,
}

#[allow(clippy::option_option)]
#[derive(Debug, Deserialize)]
pub(super) struct UpdateMeRequest {
    #[serde(default, deserialize_with = "double_option")]
    pub display_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub company_name: Option<Option<String>>,
}

/// Blank optional text counts as "not provided".
fn optional_text(
    request_id: &str,
    field: &str,
    value: Option<&str>,
) -> Result<Option<String>, ApiError> {
    let Some(trimmed) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    if trimmed.chars().count() > MAX_CONTACT_LEN {
        return Err(ApiError::new(
            request_id,
            "validation_error",
            format!("{field} must be at most {MAX_CONTACT_LEN} characters"),
        ));
    }
    Ok(Some(trimmed.to_owned()))
}

/// POST /api/v1/me: create the caller's profile on first sign-in.
///
/// Idempotent: an already registered caller gets their profile back with 200.
pub(super) async fn register(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(caller): Extension<Caller>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ProfileItem>>), ApiError> {
    let rid = &req_id.0;
    let Some(user) = caller.0 else {
        return Err(ApiError::new(rid, "unauthorized", "bearer token required"));
    };
    let Some(email) = user.email.as_deref().filter(|e| !e.trim().is_empty()) else {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "account has no email address",
        ));
    };

    let display_name = optional_text(rid, "display_name", body.display_name.as_deref())?;
    let phone = optional_text(rid, "phone", body.phone.as_deref())?;
    let company_name = optional_text(rid, "company_name", body.company_name.as_deref())?;

    let (row, created) = storefront_db::create_profile(
        &state.pool,
        user.id,
        email,
        display_name.as_deref(),
        phone.as_deref(),
        company_name.as_deref(),
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    if created {
        tracing::info!(profile_id = %row.id, "registered new member profile");
    }
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(ApiResponse::new(req_id.0, row.into()))))
}

pub(super) async fn get_me(
    Extension(req_id): Extension<RequestId>,
    Member(profile): Member,
) -> Json<ApiResponse<ProfileItem>> {
    Json(ApiResponse::new(req_id.0, profile.into()))
}

pub(super) async fn update_me(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Member(profile): Member,
    ApiJson(body): ApiJson<UpdateMeRequest>,
) -> Result<Json<ApiResponse<ProfileItem>>, ApiError> {
    let rid = &req_id.0;

    // Some(None) and Some(Some("")) both clear the field.
    let display_name = body
        .display_name
        .map(|v| optional_text(rid, "display_name", v.as_deref()))
        .transpose()?;
    let phone = body
        .phone
        .map(|v| optional_text(rid, "phone", v.as_deref()))
        .transpose()?;
    let company_name = body
        .company_name
        .map(|v| optional_text(rid, "company_name", v.as_deref()))
        .transpose()?;

    let row = storefront_db::update_profile_contact(
        &state.pool,
        profile.id,
        display_name.as_ref().map(|v| v.as_deref()),
        phone.as_ref().map(|v| v.as_deref()),
        company_name.as_ref().map(|v| v.as_deref()),
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse::new(req_id.0, row.into())))
}

/// POST /api/v1/me/upgrade-request: ask to be promoted to wholesale.
pub(super) async fn request_upgrade(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Member(profile): Member,
) -> Result<Json<ApiResponse<ProfileItem>>, ApiError> {
    let rid = &req_id.0;
    let tier = profile.tier().map_err(|e| map_db_error(rid.clone(), &e))?;
    let status = profile
        .upgrade_status()
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    check_upgrade_request(tier, status).map_err(|e| map_transition_error(rid.clone(), &e))?;

    let row = storefront_db::request_upgrade(&state.pool, profile.id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    tracing::info!(profile_id = %row.id, "wholesale upgrade requested");
    Ok(Json(ApiResponse::new(req_id.0, row.into())))
}
