//! Orders: members place and list their own; admins list recent orders and
//! move order items through their fulfilment statuses.

use std::collections::{BTreeMap, HashMap};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use storefront_core::{visible_price, OrderItemStatus, Tier};
use storefront_db::{NewOrderLine, OrderItemRow, OrderRow};
use uuid::Uuid;

use crate::middleware::RequestId;
use crate::notify::{self, TemplateKey};

use super::catalog::is_visible_to;
use super::extract::{Admin, ApiJson, Member};
use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState};

const MAX_LINE_QUANTITY: i32 = 10_000;
const MAX_LINES: usize = 100;

#[derive(Debug, Serialize)]
pub(super) struct OrderItemItem {
    id: i64,
    product_id: Option<i64>,
    product_name: String,
    unit_price: Decimal,
    quantity: i32,
    status: String,
    status_updated_at: DateTime<Utc>,
}

impl From<OrderItemRow> for OrderItemItem {
    fn from(row: OrderItemRow) -> Self {
        Self {
            id: row.id,
            product_id: row.product_id,
            product_name: row.product_name,
            unit_price: row.unit_price,
            quantity: row.quantity,
            status: row.status,
            status_updated_at: row.status_updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct OrderItem {
    id: i64,
    profile_id: Uuid,
    total: Decimal,
    note: Option<String>,
    created_at: DateTime<Utc>,
    items: Vec<OrderItemItem>,
}

#[derive(Debug, Deserialize)]
pub(super) struct OrderLineRequest {
    pub product_id: i64,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub(super) struct PlaceOrderRequest {
    pub items: Vec<OrderLineRequest>,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct LimitQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ItemStatusRequest {
    pub status: OrderItemStatus,
}

#[derive(Debug, Serialize)]
pub(super) struct ItemStatusResponse {
    #[serde(flatten)]
    item: OrderItemItem,
    previous_status: String,
    notified: bool,
}

fn assemble(orders: Vec<OrderRow>, items: Vec<OrderItemRow>) -> Vec<OrderItem> {
    let mut by_order: HashMap<i64, Vec<OrderItemItem>> = HashMap::new();
    for item in items {
        by_order.entry(item.order_id).or_default().push(item.into());
    }

    orders
        .into_iter()
        .map(|order| OrderItem {
            items: by_order.remove(&order.id).unwrap_or_default(),
            id: order.id,
            profile_id: order.profile_id,
            total: order.total,
            note: order.note,
            created_at: order.created_at,
        })
        .collect()
}

/// Merge repeated product ids and validate quantities.
fn collect_quantities(
    request_id: &str,
    lines: &[OrderLineRequest],
) -> Result<BTreeMap<i64, i32>, ApiError> {
    if lines.is_empty() || lines.len() > MAX_LINES {
        return Err(ApiError::new(
            request_id,
            "validation_error",
            format!("an order must have 1-{MAX_LINES} lines"),
        ));
    }

    let mut quantities: BTreeMap<i64, i32> = BTreeMap::new();
    for line in lines {
        if line.quantity < 1 {
            return Err(ApiError::new(
                request_id,
                "validation_error",
                format!("quantity for product {} must be at least 1", line.product_id),
            ));
        }
        let total = quantities.entry(line.product_id).or_insert(0);
        *total = total.saturating_add(line.quantity);
        if *total > MAX_LINE_QUANTITY {
            return Err(ApiError::new(
                request_id,
                "validation_error",
                format!("quantity for product {} exceeds {MAX_LINE_QUANTITY}", line.product_id),
            ));
        }
    }
    Ok(quantities)
}

async fn load_orders(
    state: &AppState,
    request_id: &str,
    orders: Vec<OrderRow>,
) -> Result<Vec<OrderItem>, ApiError> {
    let ids: Vec<i64> = orders.iter().map(|o| o.id).collect();
    let items = storefront_db::list_items_for_orders(&state.pool, &ids)
        .await
        .map_err(|e| map_db_error(request_id.to_owned(), &e))?;
    Ok(assemble(orders, items))
}

pub(super) async fn list_my_orders(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Member(profile): Member,
    Query(query): Query<LimitQuery>,
) -> Result<Json<ApiResponse<Vec<OrderItem>>>, ApiError> {
    let rid = &req_id.0;
    let orders =
        storefront_db::list_orders_for_profile(&state.pool, profile.id, normalize_limit(query.limit))
            .await
            .map_err(|e| map_db_error(rid.clone(), &e))?;

    let data = load_orders(&state, rid, orders).await?;
    Ok(Json(ApiResponse::new(req_id.0, data)))
}

/// POST /api/v1/orders: price the lines at the member's tier and pay from the wallet.
pub(super) async fn place_order(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Member(profile): Member,
    ApiJson(body): ApiJson<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<OrderItem>>), ApiError> {
    let rid = &req_id.0;
    let tier: Tier = profile.tier().map_err(|e| map_db_error(rid.clone(), &e))?;
    if !tier.can_order() {
        return Err(ApiError::new(rid, "forbidden", "guest accounts cannot place orders"));
    }

    let quantities = collect_quantities(rid, &body.items)?;
    let ids: Vec<i64> = quantities.keys().copied().collect();
    let products = storefront_db::list_products_by_ids(&state.pool, &ids)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    let products: HashMap<i64, _> = products.into_iter().map(|p| (p.id, p)).collect();

    let mut lines = Vec::with_capacity(quantities.len());
    let mut total = Decimal::ZERO;
    for (product_id, quantity) in quantities {
        let Some(product) = products.get(&product_id).filter(|p| is_visible_to(p, tier)) else {
            return Err(ApiError::new(
                rid,
                "validation_error",
                format!("product {product_id} is not available"),
            ));
        };
        let unit_price = visible_price(tier, product.retail_price, product.wholesale_price);
        total += unit_price * Decimal::from(quantity);
        lines.push(NewOrderLine {
            product_id,
            product_name: product.name.clone(),
            unit_price,
            quantity,
        });
    }

    let note = body
        .note
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());
    let (order, items) = storefront_db::place_order(&state.pool, profile.id, &lines, total, note)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    tracing::info!(order_id = order.id, profile_id = %profile.id, total = %order.total, "order placed");
    let data = assemble(vec![order], items)
        .pop()
        .ok_or_else(|| ApiError::new(rid, "internal_error", "order disappeared"))?;
    Ok((StatusCode::CREATED, Json(ApiResponse::new(req_id.0, data))))
}

pub(super) async fn list_recent_orders(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    _admin: Admin,
    Query(query): Query<LimitQuery>,
) -> Result<Json<ApiResponse<Vec<OrderItem>>>, ApiError> {
    let rid = &req_id.0;
    let orders = storefront_db::list_recent_orders(&state.pool, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    let data = load_orders(&state, rid, orders).await?;
    Ok(Json(ApiResponse::new(req_id.0, data)))
}

/// PATCH /api/v1/admin/order-items/{id}/status
///
/// Any status may follow any other. Moving an item to `ARRIVED` from a
/// different status emails the order's owner once.
pub(super) async fn set_item_status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    _admin: Admin,
    Path(id): Path<i64>,
    ApiJson(body): ApiJson<ItemStatusRequest>,
) -> Result<Json<ApiResponse<ItemStatusResponse>>, ApiError> {
    let rid = &req_id.0;
    let change = storefront_db::set_order_item_status(&state.pool, id, body.status)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .ok_or_else(|| ApiError::new(rid, "not_found", format!("order item {id} not found")))?;

    let previous = change
        .previous_status()
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    let notified = body.status.sends_arrival_notice(Some(previous));
    if notified {
        notify_arrival(&state, &change.item, change.profile_id).await;
    }

    tracing::info!(
        order_item_id = id,
        from = %previous,
        to = %body.status,
        "order item status changed"
    );
    Ok(Json(ApiResponse::new(
        req_id.0,
        ItemStatusResponse {
            previous_status: change.previous_status,
            item: change.item.into(),
            notified,
        },
    )))
}

async fn notify_arrival(state: &AppState, item: &OrderItemRow, owner: Uuid) {
    let profile = match storefront_db::get_profile(&state.pool, owner).await {
        Ok(Some(profile)) => profile,
        Ok(None) => {
            tracing::warn!(profile_id = %owner, "arrival notice skipped: owner profile missing");
            return;
        }
        Err(e) => {
            tracing::warn!(error = %e, "arrival notice skipped: profile lookup failed");
            return;
        }
    };

    let vars = notify::vars([
        ("display_name", profile.greeting_name().to_owned()),
        ("order_id", item.order_id.to_string()),
        ("product_name", item.product_name.clone()),
        ("quantity", item.quantity.to_string()),
    ]);
    notify::send(state, TemplateKey::OrderItemArrived, &profile.email, &vars).await;
}
