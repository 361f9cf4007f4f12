//! Public catalog handlers: categories, the level-1 visibility map, and
//! tier-priced product listings.

use std::collections::{BTreeMap, BTreeSet};

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use storefront_core::{visible_price, ProductStatus, Tier};
use storefront_db::{CategoryRow, ProductImageRow, ProductListFilters, ProductRow};

use crate::middleware::RequestId;

use super::extract::Viewer;
use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub(super) struct CategoryItem {
    id: i64,
    name: String,
    slug: String,
    level: i16,
    sort_order: i32,
    parent_ids: Vec<i64>,
}

impl From<CategoryRow> for CategoryItem {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            slug: row.slug,
            level: row.level,
            sort_order: row.sort_order,
            parent_ids: row.parent_ids,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct ProductItem {
    id: i64,
    name: String,
    slug: String,
    description: Option<String>,
    /// What the caller pays at their tier.
    price: Decimal,
    retail_price: Decimal,
    wholesale_only: bool,
    primary_image_url: Option<String>,
    updated_at: DateTime<Utc>,
}

impl ProductItem {
    fn priced_for(row: ProductRow, tier: Tier) -> Self {
        Self {
            price: visible_price(tier, row.retail_price, row.wholesale_price),
            id: row.id,
            name: row.name,
            slug: row.slug,
            description: row.description,
            retail_price: row.retail_price,
            wholesale_only: row.wholesale_only,
            primary_image_url: row.primary_image_url,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct ImageItem {
    pub id: i64,
    pub url: String,
    pub sort_order: i32,
}

impl From<ProductImageRow> for ImageItem {
    fn from(row: ProductImageRow) -> Self {
        Self {
            id: row.id,
            url: row.url,
            sort_order: row.sort_order,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct ProductDetail {
    #[serde(flatten)]
    product: ProductItem,
    images: Vec<ImageItem>,
    category_ids: Vec<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ProductQuery {
    pub category_id: Option<i64>,
    pub limit: Option<i64>,
}

/// Whether a product row may be shown to a caller of the given tier.
pub(super) fn is_visible_to(row: &ProductRow, tier: Tier) -> bool {
    matches!(row.status(), Ok(ProductStatus::Published))
        && (!row.wholesale_only || tier.sees_wholesale_catalog())
}

pub(super) async fn list_categories(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<CategoryItem>>>, ApiError> {
    let rows = storefront_db::list_categories(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(
        req_id.0,
        rows.into_iter().map(CategoryItem::from).collect(),
    )))
}

/// GET /api/v1/categories/visible-by-l1
///
/// Keys serialize as JSON object keys (strings), values as sorted id arrays.
pub(super) async fn visible_by_l1(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<BTreeMap<i64, BTreeSet<i64>>>>, ApiError> {
    let memberships = storefront_db::list_category_memberships(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(
        req_id.0,
        storefront_core::visible_by_l1(&memberships),
    )))
}

pub(super) async fn list_products(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    viewer: Viewer,
    Query(query): Query<ProductQuery>,
) -> Result<Json<ApiResponse<Vec<ProductItem>>>, ApiError> {
    let rows = storefront_db::list_products(
        &state.pool,
        ProductListFilters {
            category_id: query.category_id,
            include_wholesale_only: viewer.tier.sees_wholesale_catalog(),
            include_unpublished: false,
            limit: normalize_limit(query.limit),
        },
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| ProductItem::priced_for(row, viewer.tier))
        .collect();

    Ok(Json(ApiResponse::new(req_id.0, data)))
}

pub(super) async fn get_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<ProductDetail>>, ApiError> {
    let rid = &req_id.0;
    let row = storefront_db::get_product(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .filter(|row| is_visible_to(row, viewer.tier))
        .ok_or_else(|| ApiError::new(rid, "not_found", format!("product {id} not found")))?;

    let images = storefront_db::list_product_images(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    let category_ids = storefront_db::list_product_category_ids(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse::new(
        req_id.0,
        ProductDetail {
            product: ProductItem::priced_for(row, viewer.tier),
            images: images.into_iter().map(ImageItem::from).collect(),
            category_ids,
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(status: &str, wholesale_only: bool) -> ProductRow {
        ProductRow {
            id: 1,
            name: "Tea".to_string(),
            slug: "tea".to_string(),
            description: None,
            retail_price: Decimal::new(1000, 2),
            wholesale_price: Some(Decimal::new(700, 2)),
            status: status.to_string(),
            wholesale_only,
            primary_image_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn drafts_are_hidden_from_everyone() {
        let row = product("draft", false);
        assert!(!is_visible_to(&row, Tier::Guest));
        assert!(!is_visible_to(&row, Tier::Wholesale));
    }

    #[test]
    fn wholesale_only_products_need_wholesale_tier() {
        let row = product("published", true);
        assert!(!is_visible_to(&row, Tier::Retail));
        assert!(is_visible_to(&row, Tier::Wholesale));
    }

    #[test]
    fn price_follows_tier() {
        let retail = ProductItem::priced_for(product("published", false), Tier::Retail);
        assert_eq!(retail.price, Decimal::new(1000, 2));

        let wholesale = ProductItem::priced_for(product("published", false), Tier::Wholesale);
        assert_eq!(wholesale.price, Decimal::new(700, 2));
        assert_eq!(wholesale.retail_price, Decimal::new(1000, 2));
    }
}
