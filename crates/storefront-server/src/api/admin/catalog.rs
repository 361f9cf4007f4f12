//! Catalog administration: products, their images and category links, and
//! the category tree.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use storefront_core::{slug_from_name, ProductStatus};
use storefront_db::{NewProduct, ProductRow, UpdateProduct};

use crate::middleware::RequestId;

use super::super::catalog::{CategoryItem, ImageItem};
use super::super::extract::{Admin, ApiJson};
use super::super::{
    double_option, map_db_error, required_text, ApiError, ApiResponse, AppState,
};
use super::Deleted;

const MAX_NAME_LEN: usize = 200;

/// Product as admins see it: both prices and the lifecycle status.
#[derive(Debug, Serialize)]
pub(in crate::api) struct AdminProductItem {
    id: i64,
    name: String,
    slug: String,
    description: Option<String>,
    retail_price: Decimal,
    wholesale_price: Option<Decimal>,
    status: String,
    wholesale_only: bool,
    primary_image_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for AdminProductItem {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            slug: row.slug,
            description: row.description,
            retail_price: row.retail_price,
            wholesale_price: row.wholesale_price,
            status: row.status,
            wholesale_only: row.wholesale_only,
            primary_image_url: row.primary_image_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(in crate::api) struct CreateProductRequest {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub retail_price: Decimal,
    pub wholesale_price: Option<Decimal>,
    pub status: Option<ProductStatus>,
    #[serde(default)]
    pub wholesale_only: bool,
}

#[allow(clippy::option_option)]
#[derive(Debug, Deserialize)]
pub(in crate::api) struct UpdateProductRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub retail_price: Option<Decimal>,
    #[serde(default, deserialize_with = "double_option")]
    pub wholesale_price: Option<Option<Decimal>>,
    pub status: Option<ProductStatus>,
    pub wholesale_only: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub(in crate::api) struct CategoryIdsRequest {
    pub category_ids: Vec<i64>,
}

#[derive(Debug, Deserialize)]
pub(in crate::api) struct AddImageRequest {
    pub url: String,
    pub public_id: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Deserialize)]
pub(in crate::api) struct CreateCategoryRequest {
    pub name: String,
    pub slug: Option<String>,
    pub level: i16,
    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Deserialize)]
pub(in crate::api) struct UpdateCategoryRequest {
    pub name: Option<String>,
    pub level: Option<i16>,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub(in crate::api) struct ParentIdsRequest {
    pub parent_ids: Vec<i64>,
}

/// Slug from the explicit value when given, otherwise from the name.
fn slug_for(request_id: &str, explicit: Option<&str>, name: &str) -> Result<String, ApiError> {
    let slug = slug_from_name(explicit.unwrap_or(name));
    if slug.is_empty() {
        return Err(ApiError::new(
            request_id,
            "validation_error",
            "slug must contain at least one letter or digit",
        ));
    }
    Ok(slug)
}

fn check_price(request_id: &str, field: &str, price: Decimal) -> Result<(), ApiError> {
    if price < Decimal::ZERO || price.scale() > 2 {
        return Err(ApiError::new(
            request_id,
            "validation_error",
            format!("{field} must be non-negative with at most 2 decimal places"),
        ));
    }
    Ok(())
}

fn check_level(request_id: &str, level: i16) -> Result<(), ApiError> {
    if (1..=3).contains(&level) {
        Ok(())
    } else {
        Err(ApiError::new(
            request_id,
            "validation_error",
            "level must be 1, 2 or 3",
        ))
    }
}

fn not_found(request_id: &str, what: &str, id: i64) -> ApiError {
    ApiError::new(request_id, "not_found", format!("{what} {id} not found"))
}

pub(in crate::api) async fn create_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Admin(admin): Admin,
    ApiJson(body): ApiJson<CreateProductRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AdminProductItem>>), ApiError> {
    let rid = &req_id.0;
    let name = required_text(rid, "name", &body.name, MAX_NAME_LEN)?;
    let slug = slug_for(rid, body.slug.as_deref(), &name)?;
    check_price(rid, "retail_price", body.retail_price)?;
    if let Some(wholesale) = body.wholesale_price {
        check_price(rid, "wholesale_price", wholesale)?;
    }

    let row = storefront_db::create_product(
        &state.pool,
        &NewProduct {
            name: &name,
            slug: &slug,
            description: body.description.as_deref(),
            retail_price: body.retail_price,
            wholesale_price: body.wholesale_price,
            status: body.status.unwrap_or(ProductStatus::Draft),
            wholesale_only: body.wholesale_only,
        },
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    tracing::info!(product_id = row.id, admin_id = %admin.id, slug = %row.slug, "product created");
    Ok((StatusCode::CREATED, Json(ApiResponse::new(req_id.0, row.into()))))
}

pub(in crate::api) async fn update_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    _admin: Admin,
    Path(id): Path<i64>,
    ApiJson(body): ApiJson<UpdateProductRequest>,
) -> Result<Json<ApiResponse<AdminProductItem>>, ApiError> {
    let rid = &req_id.0;
    let name = body
        .name
        .as_deref()
        .map(|n| required_text(rid, "name", n, MAX_NAME_LEN))
        .transpose()?;
    if let Some(price) = body.retail_price {
        check_price(rid, "retail_price", price)?;
    }
    if let Some(Some(price)) = body.wholesale_price {
        check_price(rid, "wholesale_price", price)?;
    }

    let update = UpdateProduct {
        name: name.as_deref(),
        description: body.description.as_ref().map(|d| d.as_deref()),
        retail_price: body.retail_price,
        wholesale_price: body.wholesale_price,
        status: body.status,
        wholesale_only: body.wholesale_only,
    };
    let row = storefront_db::update_product(&state.pool, id, &update)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .ok_or_else(|| not_found(rid, "product", id))?;

    Ok(Json(ApiResponse::new(req_id.0, row.into())))
}

pub(in crate::api) async fn delete_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Admin(admin): Admin,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Deleted>>, ApiError> {
    let rid = &req_id.0;
    let deleted = storefront_db::delete_product(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    if !deleted {
        return Err(not_found(rid, "product", id));
    }

    tracing::info!(product_id = id, admin_id = %admin.id, "product deleted");
    Ok(Json(ApiResponse::new(req_id.0, Deleted { id, deleted })))
}

/// PUT /api/v1/admin/products/{id}/categories: replace the product's category set.
pub(in crate::api) async fn set_product_categories(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    _admin: Admin,
    Path(id): Path<i64>,
    ApiJson(body): ApiJson<CategoryIdsRequest>,
) -> Result<Json<ApiResponse<Vec<i64>>>, ApiError> {
    let rid = &req_id.0;
    storefront_db::get_product(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .ok_or_else(|| not_found(rid, "product", id))?;

    storefront_db::set_product_categories(&state.pool, id, &body.category_ids)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    let ids = storefront_db::list_product_category_ids(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse::new(req_id.0, ids)))
}

pub(in crate::api) async fn add_product_image(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    _admin: Admin,
    Path(id): Path<i64>,
    ApiJson(body): ApiJson<AddImageRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ImageItem>>), ApiError> {
    let rid = &req_id.0;
    let url = required_text(rid, "url", &body.url, 2048)?;
    storefront_db::get_product(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .ok_or_else(|| not_found(rid, "product", id))?;

    let row = storefront_db::add_product_image(
        &state.pool,
        id,
        &url,
        body.public_id.as_deref(),
        body.sort_order,
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok((StatusCode::CREATED, Json(ApiResponse::new(req_id.0, row.into()))))
}

pub(in crate::api) async fn delete_product_image(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    _admin: Admin,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Deleted>>, ApiError> {
    let rid = &req_id.0;
    let row = storefront_db::delete_product_image(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .ok_or_else(|| not_found(rid, "product image", id))?;

    // The hosted file stays on the image CDN; log its handle for cleanup.
    tracing::info!(image_id = id, public_id = ?row.public_id, "product image removed");
    Ok(Json(ApiResponse::new(req_id.0, Deleted { id, deleted: true })))
}

pub(in crate::api) async fn create_category(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    _admin: Admin,
    ApiJson(body): ApiJson<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CategoryItem>>), ApiError> {
    let rid = &req_id.0;
    let name = required_text(rid, "name", &body.name, MAX_NAME_LEN)?;
    let slug = slug_for(rid, body.slug.as_deref(), &name)?;
    check_level(rid, body.level)?;

    let row = storefront_db::create_category(&state.pool, &name, &slug, body.level, body.sort_order)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok((StatusCode::CREATED, Json(ApiResponse::new(req_id.0, row.into()))))
}

pub(in crate::api) async fn update_category(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    _admin: Admin,
    Path(id): Path<i64>,
    ApiJson(body): ApiJson<UpdateCategoryRequest>,
) -> Result<Json<ApiResponse<CategoryItem>>, ApiError> {
    let rid = &req_id.0;
    let name = body
        .name
        .as_deref()
        .map(|n| required_text(rid, "name", n, MAX_NAME_LEN))
        .transpose()?;
    if let Some(level) = body.level {
        check_level(rid, level)?;
    }

    let row = storefront_db::update_category(
        &state.pool,
        id,
        name.as_deref(),
        body.level,
        body.sort_order,
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?
    .ok_or_else(|| not_found(rid, "category", id))?;

    Ok(Json(ApiResponse::new(req_id.0, row.into())))
}

pub(in crate::api) async fn delete_category(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    _admin: Admin,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Deleted>>, ApiError> {
    let rid = &req_id.0;
    let deleted = storefront_db::delete_category(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    if !deleted {
        return Err(not_found(rid, "category", id));
    }
    Ok(Json(ApiResponse::new(req_id.0, Deleted { id, deleted })))
}

/// PUT /api/v1/admin/categories/{id}/parents: replace the category's parent set.
pub(in crate::api) async fn set_category_parents(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    _admin: Admin,
    Path(id): Path<i64>,
    ApiJson(body): ApiJson<ParentIdsRequest>,
) -> Result<Json<ApiResponse<CategoryItem>>, ApiError> {
    let rid = &req_id.0;
    if body.parent_ids.contains(&id) {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "a category cannot be its own parent",
        ));
    }

    storefront_db::get_category(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .ok_or_else(|| not_found(rid, "category", id))?;

    storefront_db::set_category_parents(&state.pool, id, &body.parent_ids)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    let row = storefront_db::get_category(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .ok_or_else(|| not_found(rid, "category", id))?;

    Ok(Json(ApiResponse::new(req_id.0, row.into())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_prefers_explicit_value() {
        assert_eq!(slug_for("r", Some("Gift Box"), "ignored").unwrap(), "gift-box");
        assert_eq!(slug_for("r", None, "Green Tea").unwrap(), "green-tea");
    }

    #[test]
    fn cjk_name_gets_a_slug() {
        assert_eq!(slug_for("r", None, "抹茶粉 禮盒").unwrap(), "抹茶粉-禮盒");
    }

    #[test]
    fn slug_without_alphanumerics_is_rejected() {
        let err = slug_for("r", None, "!!!").unwrap_err();
        assert_eq!(err.error.code, "validation_error");
    }

    #[test]
    fn negative_and_fractional_cent_prices_are_rejected() {
        assert!(check_price("r", "p", Decimal::new(-1, 0)).is_err());
        assert!(check_price("r", "p", Decimal::new(1001, 3)).is_err());
        assert!(check_price("r", "p", Decimal::new(1999, 2)).is_ok());
    }

    #[test]
    fn category_levels_are_one_to_three() {
        assert!(check_level("r", 0).is_err());
        assert!(check_level("r", 3).is_ok());
        assert!(check_level("r", 4).is_err());
    }
}
