//! Wallet balance and top-up requests, for members and for the admins who
//! decide them.

use std::str::FromStr;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use storefront_core::TopupStatus;
use storefront_db::TopupRow;
use uuid::Uuid;

use crate::middleware::RequestId;
use crate::notify::{self, TemplateKey};

use super::extract::{Admin, ApiJson, Member};
use super::{map_db_error, normalize_limit, required_text, ApiError, ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub(super) struct WalletItem {
    balance: Decimal,
}

#[derive(Debug, Serialize)]
pub(super) struct TopupItem {
    id: i64,
    profile_id: Uuid,
    amount: Decimal,
    method: String,
    reference: Option<String>,
    status: String,
    admin_note: Option<String>,
    created_at: DateTime<Utc>,
    decided_at: Option<DateTime<Utc>>,
}

impl From<TopupRow> for TopupItem {
    fn from(row: TopupRow) -> Self {
        Self {
            id: row.id,
            profile_id: row.profile_id,
            amount: row.amount,
            method: row.method,
            reference: row.reference,
            status: row.status,
            admin_note: row.admin_note,
            created_at: row.created_at,
            decided_at: row.decided_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct ApprovedTopup {
    #[serde(flatten)]
    topup: TopupItem,
    balance: Decimal,
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateTopupRequest {
    pub amount: Decimal,
    pub method: String,
    pub reference: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct DecisionRequest {
    pub admin_note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct TopupQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

pub(super) async fn get_wallet(
    Extension(req_id): Extension<RequestId>,
    Member(profile): Member,
) -> Json<ApiResponse<WalletItem>> {
    Json(ApiResponse::new(
        req_id.0,
        WalletItem {
            balance: profile.wallet_balance,
        },
    ))
}

pub(super) async fn list_my_topups(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Member(profile): Member,
    Query(query): Query<TopupQuery>,
) -> Result<Json<ApiResponse<Vec<TopupItem>>>, ApiError> {
    let rows =
        storefront_db::list_topups_for_profile(&state.pool, profile.id, normalize_limit(query.limit))
            .await
            .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(
        req_id.0,
        rows.into_iter().map(TopupItem::from).collect(),
    )))
}

pub(super) async fn create_topup(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Member(profile): Member,
    ApiJson(body): ApiJson<CreateTopupRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TopupItem>>), ApiError> {
    let rid = &req_id.0;
    if body.amount <= Decimal::ZERO {
        return Err(ApiError::new(rid, "validation_error", "amount must be positive"));
    }
    if body.amount.scale() > 2 {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "amount must have at most 2 decimal places",
        ));
    }
    let method = required_text(rid, "method", &body.method, 50)?;
    let reference = body
        .reference
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty());

    let row = storefront_db::create_topup(&state.pool, profile.id, body.amount, &method, reference)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    tracing::info!(topup_id = row.id, profile_id = %profile.id, amount = %row.amount, "top-up requested");
    Ok((StatusCode::CREATED, Json(ApiResponse::new(req_id.0, row.into()))))
}

pub(super) async fn list_topups(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    _admin: Admin,
    Query(query): Query<TopupQuery>,
) -> Result<Json<ApiResponse<Vec<TopupItem>>>, ApiError> {
    let rid = &req_id.0;
    let status = query
        .status
        .as_deref()
        .map(TopupStatus::from_str)
        .transpose()
        .map_err(|e| ApiError::new(rid, "validation_error", e.to_string()))?;

    let rows = storefront_db::list_topups(&state.pool, status, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse::new(
        req_id.0,
        rows.into_iter().map(TopupItem::from).collect(),
    )))
}

/// POST /api/v1/admin/topups/{id}/approve: credit the wallet and notify the member.
///
/// The body is optional; without one no admin note is recorded.
pub(super) async fn approve_topup(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Admin(admin): Admin,
    Path(id): Path<i64>,
    body: Option<ApiJson<DecisionRequest>>,
) -> Result<Json<ApiResponse<ApprovedTopup>>, ApiError> {
    let rid = &req_id.0;
    let body = body.map(|ApiJson(b)| b).unwrap_or_default();
    let (topup, balance) = storefront_db::approve_topup(&state.pool, id, body.admin_note.as_deref())
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    tracing::info!(topup_id = id, admin_id = %admin.id, amount = %topup.amount, "top-up approved");

    match storefront_db::get_profile(&state.pool, topup.profile_id).await {
        Ok(Some(member)) => {
            let vars = notify::vars([
                ("display_name", member.greeting_name().to_owned()),
                ("amount", topup.amount.to_string()),
                ("balance", balance.to_string()),
            ]);
            notify::send(&state, TemplateKey::TopupApproved, &member.email, &vars).await;
        }
        Ok(None) => tracing::warn!(topup_id = id, "top-up notice skipped: member missing"),
        Err(e) => tracing::warn!(error = %e, "top-up notice skipped: profile lookup failed"),
    }

    Ok(Json(ApiResponse::new(
        req_id.0,
        ApprovedTopup {
            topup: topup.into(),
            balance,
        },
    )))
}

pub(super) async fn reject_topup(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Admin(admin): Admin,
    Path(id): Path<i64>,
    body: Option<ApiJson<DecisionRequest>>,
) -> Result<Json<ApiResponse<TopupItem>>, ApiError> {
    let rid = &req_id.0;
    let body = body.map(|ApiJson(b)| b).unwrap_or_default();
    let row = storefront_db::reject_topup(&state.pool, id, body.admin_note.as_deref())
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    tracing::info!(topup_id = id, admin_id = %admin.id, "top-up rejected");
    Ok(Json(ApiResponse::new(req_id.0, row.into())))
}
