//! Public storefront content: announcements, shipping terms and banners.

use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use storefront_db::{AnnouncementRow, BannerRow, ShippingSettingsRow};

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub(super) struct AnnouncementItem {
    id: i64,
    title: String,
    body: String,
    is_active: bool,
    starts_at: Option<DateTime<Utc>>,
    ends_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<AnnouncementRow> for AnnouncementItem {
    fn from(row: AnnouncementRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            body: row.body,
            is_active: row.is_active,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct ShippingItem {
    flat_fee: Decimal,
    free_shipping_threshold: Option<Decimal>,
    notes: Option<String>,
    updated_at: DateTime<Utc>,
}

impl From<ShippingSettingsRow> for ShippingItem {
    fn from(row: ShippingSettingsRow) -> Self {
        Self {
            flat_fee: row.flat_fee,
            free_shipping_threshold: row.free_shipping_threshold,
            notes: row.notes,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct BannerItem {
    id: i64,
    image_url: String,
    link_url: Option<String>,
    sort_order: i32,
    is_active: bool,
}

impl From<BannerRow> for BannerItem {
    fn from(row: BannerRow) -> Self {
        Self {
            id: row.id,
            image_url: row.image_url,
            link_url: row.link_url,
            sort_order: row.sort_order,
            is_active: row.is_active,
        }
    }
}

pub(super) async fn list_announcements(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<AnnouncementItem>>>, ApiError> {
    let rows = storefront_db::list_active_announcements(&state.pool, Utc::now())
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(
        req_id.0,
        rows.into_iter().map(AnnouncementItem::from).collect(),
    )))
}

pub(super) async fn get_shipping(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<ShippingItem>>, ApiError> {
    let row = storefront_db::get_shipping_settings(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(req_id.0, row.into())))
}

pub(super) async fn list_banners(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<BannerItem>>>, ApiError> {
    let rows = storefront_db::list_active_banners(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(
        req_id.0,
        rows.into_iter().map(BannerItem::from).collect(),
    )))
}
