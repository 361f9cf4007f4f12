//! Member administration: listing, tier and login changes, and decisions on
//! wholesale upgrade requests.

use std::str::FromStr;

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;
use storefront_core::{check_upgrade_decision, Tier, UpgradeStatus};
use uuid::Uuid;

use crate::middleware::RequestId;
use crate::notify::{self, TemplateKey};

use super::super::extract::{Admin, ApiJson};
use super::super::me::ProfileItem;
use super::super::{
    map_db_error, map_transition_error, normalize_limit, ApiError, ApiResponse, AppState,
};

#[derive(Debug, Deserialize)]
pub(in crate::api) struct MemberQuery {
    pub tier: Option<String>,
    pub upgrade_status: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(in crate::api) struct SetTierRequest {
    pub tier: Tier,
}

#[derive(Debug, Deserialize)]
pub(in crate::api) struct SetLoginRequest {
    pub login_enabled: bool,
}

fn member_not_found(request_id: &str, id: Uuid) -> ApiError {
    ApiError::new(request_id, "not_found", format!("member {id} not found"))
}

pub(in crate::api) async fn list_members(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    _admin: Admin,
    Query(query): Query<MemberQuery>,
) -> Result<Json<ApiResponse<Vec<ProfileItem>>>, ApiError> {
    let rid = &req_id.0;

    // Parse to reject typos; the query binds the canonical spelling.
    let tier = query
        .tier
        .as_deref()
        .map(Tier::from_str)
        .transpose()
        .map_err(|e| ApiError::new(rid, "validation_error", e.to_string()))?;
    let upgrade_status = query
        .upgrade_status
        .as_deref()
        .map(UpgradeStatus::from_str)
        .transpose()
        .map_err(|e| ApiError::new(rid, "validation_error", e.to_string()))?;

    let rows = storefront_db::list_profiles(
        &state.pool,
        storefront_db::ProfileFilters {
            tier: tier.map(Tier::as_str),
            upgrade_status: upgrade_status.map(UpgradeStatus::as_str),
            limit: normalize_limit(query.limit),
        },
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse::new(
        req_id.0,
        rows.into_iter().map(ProfileItem::from).collect(),
    )))
}

pub(in crate::api) async fn set_tier(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Admin(admin): Admin,
    Path(id): Path<Uuid>,
    ApiJson(body): ApiJson<SetTierRequest>,
) -> Result<Json<ApiResponse<ProfileItem>>, ApiError> {
    let rid = &req_id.0;
    let row = storefront_db::set_tier(&state.pool, id, body.tier)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .ok_or_else(|| member_not_found(rid, id))?;

    tracing::info!(profile_id = %id, admin_id = %admin.id, tier = %body.tier, "member tier changed");
    Ok(Json(ApiResponse::new(req_id.0, row.into())))
}

pub(in crate::api) async fn set_login(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Admin(admin): Admin,
    Path(id): Path<Uuid>,
    ApiJson(body): ApiJson<SetLoginRequest>,
) -> Result<Json<ApiResponse<ProfileItem>>, ApiError> {
    let rid = &req_id.0;
    let row = storefront_db::set_login_enabled(&state.pool, id, body.login_enabled)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .ok_or_else(|| member_not_found(rid, id))?;

    tracing::info!(
        profile_id = %id,
        admin_id = %admin.id,
        login_enabled = body.login_enabled,
        "member login gate changed"
    );
    Ok(Json(ApiResponse::new(req_id.0, row.into())))
}

pub(in crate::api) async fn approve_upgrade(
    state: State<AppState>,
    req_id: Extension<RequestId>,
    admin: Admin,
    id: Path<Uuid>,
) -> Result<Json<ApiResponse<ProfileItem>>, ApiError> {
    decide(state, req_id, admin, id, UpgradeStatus::Approved).await
}

pub(in crate::api) async fn reject_upgrade(
    state: State<AppState>,
    req_id: Extension<RequestId>,
    admin: Admin,
    id: Path<Uuid>,
) -> Result<Json<ApiResponse<ProfileItem>>, ApiError> {
    decide(state, req_id, admin, id, UpgradeStatus::Rejected).await
}

async fn decide(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Admin(admin): Admin,
    Path(id): Path<Uuid>,
    decision: UpgradeStatus,
) -> Result<Json<ApiResponse<ProfileItem>>, ApiError> {
    let rid = &req_id.0;
    let profile = storefront_db::get_profile(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .ok_or_else(|| member_not_found(rid, id))?;
    let current = profile
        .upgrade_status()
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    check_upgrade_decision(current).map_err(|e| map_transition_error(rid.clone(), &e))?;

    let row = storefront_db::decide_upgrade(&state.pool, id, decision)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    tracing::info!(profile_id = %id, admin_id = %admin.id, decision = %decision, "upgrade request decided");

    let key = if decision == UpgradeStatus::Approved {
        TemplateKey::UpgradeApproved
    } else {
        TemplateKey::UpgradeRejected
    };
    let decided_at = row
        .upgrade_decided_at
        .map(|t| t.format("%Y-%m-%d").to_string())
        .unwrap_or_default();
    let vars = notify::vars([
        ("display_name", row.greeting_name().to_owned()),
        ("decided_at", decided_at),
    ]);
    notify::send(&state, key, &row.email, &vars).await;

    Ok(Json(ApiResponse::new(req_id.0, row.into())))
}
