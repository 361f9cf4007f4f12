//! Content administration: announcements, email templates, shipping terms,
//! banners and free-form system settings.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use storefront_db::{EmailTemplateRow, NewAnnouncement, SystemSettingRow, UpdateAnnouncement};

use crate::middleware::RequestId;

use super::super::content::{AnnouncementItem, BannerItem, ShippingItem};
use super::super::extract::{Admin, ApiJson};
use super::super::{
    double_option, map_db_error, required_text, ApiError, ApiResponse, AppState,
};
use super::Deleted;

const MAX_KEY_LEN: usize = 100;

#[derive(Debug, Serialize)]
pub(in crate::api) struct EmailTemplateItem {
    key: String,
    subject: String,
    body: String,
    updated_at: DateTime<Utc>,
}

impl From<EmailTemplateRow> for EmailTemplateItem {
    fn from(row: EmailTemplateRow) -> Self {
        Self {
            key: row.key,
            subject: row.subject,
            body: row.body,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct SystemSettingItem {
    key: String,
    value: Value,
    updated_at: DateTime<Utc>,
}

impl From<SystemSettingRow> for SystemSettingItem {
    fn from(row: SystemSettingRow) -> Self {
        Self {
            key: row.key,
            value: row.value,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(in crate::api) struct CreateAnnouncementRequest {
    pub title: String,
    pub body: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

fn default_active() -> bool {
    true
}

#[allow(clippy::option_option)]
#[derive(Debug, Deserialize)]
pub(in crate::api) struct UpdateAnnouncementRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    pub is_active: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub starts_at: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "double_option")]
    pub ends_at: Option<Option<DateTime<Utc>>>,
}

#[derive(Debug, Deserialize)]
pub(in crate::api) struct TemplateRequest {
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub(in crate::api) struct ShippingRequest {
    pub flat_fee: Decimal,
    pub free_shipping_threshold: Option<Decimal>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(in crate::api) struct CreateBannerRequest {
    pub image_url: String,
    pub link_url: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

#[derive(Debug, Deserialize)]
pub(in crate::api) struct SettingRequest {
    pub value: Value,
}

fn check_window(
    request_id: &str,
    starts_at: Option<DateTime<Utc>>,
    ends_at: Option<DateTime<Utc>>,
) -> Result<(), ApiError> {
    match (starts_at, ends_at) {
        (Some(start), Some(end)) if start >= end => Err(ApiError::new(
            request_id,
            "validation_error",
            "starts_at must be before ends_at",
        )),
        _ => Ok(()),
    }
}

fn check_key(request_id: &str, key: &str) -> Result<(), ApiError> {
    let valid = !key.is_empty()
        && key.len() <= MAX_KEY_LEN
        && key
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '.');
    if valid {
        Ok(())
    } else {
        Err(ApiError::new(
            request_id,
            "validation_error",
            "key must be lowercase letters, digits, '_' or '.'",
        ))
    }
}

pub(in crate::api) async fn create_announcement(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    _admin: Admin,
    ApiJson(body): ApiJson<CreateAnnouncementRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AnnouncementItem>>), ApiError> {
    let rid = &req_id.0;
    let title = required_text(rid, "title", &body.title, 200)?;
    let text = required_text(rid, "body", &body.body, 5000)?;
    check_window(rid, body.starts_at, body.ends_at)?;

    let row = storefront_db::create_announcement(
        &state.pool,
        &NewAnnouncement {
            title: &title,
            body: &text,
            is_active: body.is_active,
            starts_at: body.starts_at,
            ends_at: body.ends_at,
        },
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok((StatusCode::CREATED, Json(ApiResponse::new(req_id.0, row.into()))))
}

pub(in crate::api) async fn update_announcement(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    _admin: Admin,
    Path(id): Path<i64>,
    ApiJson(body): ApiJson<UpdateAnnouncementRequest>,
) -> Result<Json<ApiResponse<AnnouncementItem>>, ApiError> {
    let rid = &req_id.0;
    let title = body
        .title
        .as_deref()
        .map(|t| required_text(rid, "title", t, 200))
        .transpose()?;
    let text = body
        .body
        .as_deref()
        .map(|b| required_text(rid, "body", b, 5000))
        .transpose()?;
    // Only a window sent whole can be checked here; the table constraint covers the rest.
    if let (Some(starts_at), Some(ends_at)) = (body.starts_at, body.ends_at) {
        check_window(rid, starts_at, ends_at)?;
    }

    let update = UpdateAnnouncement {
        title: title.as_deref(),
        body: text.as_deref(),
        is_active: body.is_active,
        starts_at: body.starts_at,
        ends_at: body.ends_at,
    };
    let row = storefront_db::update_announcement(&state.pool, id, &update)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .ok_or_else(|| ApiError::new(rid, "not_found", format!("announcement {id} not found")))?;

    Ok(Json(ApiResponse::new(req_id.0, row.into())))
}

pub(in crate::api) async fn delete_announcement(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    _admin: Admin,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Deleted>>, ApiError> {
    let rid = &req_id.0;
    let deleted = storefront_db::delete_announcement(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    if !deleted {
        return Err(ApiError::new(rid, "not_found", format!("announcement {id} not found")));
    }
    Ok(Json(ApiResponse::new(req_id.0, Deleted { id, deleted })))
}

pub(in crate::api) async fn list_email_templates(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    _admin: Admin,
) -> Result<Json<ApiResponse<Vec<EmailTemplateItem>>>, ApiError> {
    let rows = storefront_db::list_email_templates(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(
        req_id.0,
        rows.into_iter().map(EmailTemplateItem::from).collect(),
    )))
}

/// PUT /api/v1/admin/email-templates/{key}: create or replace a template.
pub(in crate::api) async fn upsert_email_template(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Admin(admin): Admin,
    Path(key): Path<String>,
    ApiJson(body): ApiJson<TemplateRequest>,
) -> Result<Json<ApiResponse<EmailTemplateItem>>, ApiError> {
    let rid = &req_id.0;
    check_key(rid, &key)?;
    let subject = required_text(rid, "subject", &body.subject, 300)?;
    if body.body.trim().is_empty() {
        return Err(ApiError::new(rid, "validation_error", "body must not be empty"));
    }

    let row = storefront_db::upsert_email_template(&state.pool, &key, &subject, &body.body)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    tracing::info!(template = %key, admin_id = %admin.id, "email template saved");
    Ok(Json(ApiResponse::new(req_id.0, row.into())))
}

pub(in crate::api) async fn update_shipping(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    _admin: Admin,
    ApiJson(body): ApiJson<ShippingRequest>,
) -> Result<Json<ApiResponse<ShippingItem>>, ApiError> {
    let rid = &req_id.0;
    let negative = body.flat_fee < Decimal::ZERO
        || body
            .free_shipping_threshold
            .is_some_and(|t| t < Decimal::ZERO);
    if negative {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "shipping amounts must not be negative",
        ));
    }
    let notes = body
        .notes
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());

    let row = storefront_db::update_shipping_settings(
        &state.pool,
        body.flat_fee,
        body.free_shipping_threshold,
        notes,
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse::new(req_id.0, row.into())))
}

pub(in crate::api) async fn create_banner(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    _admin: Admin,
    ApiJson(body): ApiJson<CreateBannerRequest>,
) -> Result<(StatusCode, Json<ApiResponse<BannerItem>>), ApiError> {
    let rid = &req_id.0;
    let image_url = required_text(rid, "image_url", &body.image_url, 2048)?;
    let link_url = body
        .link_url
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty());

    let row = storefront_db::create_banner(
        &state.pool,
        &image_url,
        link_url,
        body.sort_order,
        body.is_active,
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok((StatusCode::CREATED, Json(ApiResponse::new(req_id.0, row.into()))))
}

pub(in crate::api) async fn delete_banner(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    _admin: Admin,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Deleted>>, ApiError> {
    let rid = &req_id.0;
    let deleted = storefront_db::delete_banner(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    if !deleted {
        return Err(ApiError::new(rid, "not_found", format!("banner {id} not found")));
    }
    Ok(Json(ApiResponse::new(req_id.0, Deleted { id, deleted })))
}

pub(in crate::api) async fn list_system_settings(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    _admin: Admin,
) -> Result<Json<ApiResponse<Vec<SystemSettingItem>>>, ApiError> {
    let rows = storefront_db::list_system_settings(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(
        req_id.0,
        rows.into_iter().map(SystemSettingItem::from).collect(),
    )))
}

pub(in crate::api) async fn upsert_system_setting(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Admin(admin): Admin,
    Path(key): Path<String>,
    ApiJson(body): ApiJson<SettingRequest>,
) -> Result<Json<ApiResponse<SystemSettingItem>>, ApiError> {
    let rid = &req_id.0;
    check_key(rid, &key)?;

    let row = storefront_db::upsert_system_setting(&state.pool, &key, &body.value)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    tracing::info!(setting = %key, admin_id = %admin.id, "system setting saved");
    Ok(Json(ApiResponse::new(req_id.0, row.into())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn window_must_start_before_it_ends() {
        let early = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
        assert!(check_window("r", Some(early), Some(late)).is_ok());
        assert!(check_window("r", Some(late), Some(early)).is_err());
        assert!(check_window("r", Some(late), None).is_ok());
    }

    #[test]
    fn keys_are_restricted_to_a_safe_alphabet() {
        assert!(check_key("r", "order_item_arrived").is_ok());
        assert!(check_key("r", "store.contact_email").is_ok());
        assert!(check_key("r", "").is_err());
        assert!(check_key("r", "Bad Key").is_err());
    }
}
