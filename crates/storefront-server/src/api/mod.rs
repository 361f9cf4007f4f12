mod admin;
mod blog;
mod catalog;
mod content;
mod extract;
mod me;
mod orders;
mod wallet;

#[cfg(test)]
mod routes_test;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{delete, get, patch, post, put},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::PgPool;
use storefront_clients::{AuthClient, MailClient};
use storefront_core::TransitionError;
use storefront_db::DbError;
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{authenticate, request_id, RequestId};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub auth: Arc<AuthClient>,
    /// `None` when no mail API key is configured; notifications are skipped.
    pub mailer: Option<Arc<MailClient>>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn new(request_id: String, data: T) -> Self {
        Self {
            data,
            meta: ResponseMeta::new(request_id),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }

    fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "forbidden" => StatusCode::FORBIDDEN,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "upstream_error" => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status(), Json(self)).into_response()
    }
}

pub(super) fn normalize_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(50).clamp(1, 200)
}

/// Translate a data-access failure into the API error taxonomy.
///
/// Errors raised by Postgres itself carry a message worth showing the client:
/// unique violations become 409, every other database-side rejection 400.
/// Connection, pool and decode failures are hidden behind a generic 500.
pub(super) fn map_db_error(request_id: String, error: &DbError) -> ApiError {
    tracing::error!(error = %error, "database query failed");
    match error {
        DbError::NotFound => ApiError::new(request_id, "not_found", "record not found"),
        DbError::StaleStatus { .. } | DbError::InsufficientBalance => {
            ApiError::new(request_id, "conflict", error.to_string())
        }
        DbError::Sqlx(sqlx::Error::Database(db_err)) => {
            if db_err.is_unique_violation() {
                ApiError::new(request_id, "conflict", db_err.message())
            } else {
                ApiError::new(request_id, "bad_request", db_err.message())
            }
        }
        _ => ApiError::new(request_id, "internal_error", "database query failed"),
    }
}

/// Map a refused member state change: not permitted is 403, wrong state is 409.
pub(super) fn map_transition_error(request_id: String, error: &TransitionError) -> ApiError {
    let code = if error.is_forbidden() {
        "forbidden"
    } else {
        "conflict"
    };
    ApiError::new(request_id, code, error.to_string())
}

/// Deserialize a field that distinguishes "absent" from "null" for PATCH bodies.
///
/// Use with `#[serde(default, deserialize_with = "double_option")]`: absent is
/// `None`, `null` is `Some(None)`, a value is `Some(Some(v))`.
#[allow(clippy::option_option)]
pub(super) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Trim a required text field, rejecting empty or oversized values.
pub(super) fn required_text(
    request_id: &str,
    field: &str,
    value: &str,
    max_len: usize,
) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.chars().count() > max_len {
        return Err(ApiError::new(
            request_id,
            "validation_error",
            format!("{field} must be 1-{max_len} characters"),
        ));
    }
    Ok(trimmed.to_owned())
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn public_router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/categories", get(catalog::list_categories))
        .route(
            "/api/v1/categories/visible-by-l1",
            get(catalog::visible_by_l1),
        )
        .route("/api/v1/products", get(catalog::list_products))
        .route("/api/v1/products/{id}", get(catalog::get_product))
        .route("/api/v1/tags", get(blog::list_tags))
        .route("/api/v1/blog/posts", get(blog::list_posts))
        .route("/api/v1/blog/posts/{slug}", get(blog::get_post))
        .route("/api/v1/announcements", get(content::list_announcements))
        .route("/api/v1/settings/shipping", get(content::get_shipping))
        .route("/api/v1/settings/banners", get(content::list_banners))
}

fn member_router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/me",
            get(me::get_me).post(me::register).patch(me::update_me),
        )
        .route("/api/v1/me/upgrade-request", post(me::request_upgrade))
        .route("/api/v1/me/orders", get(orders::list_my_orders))
        .route("/api/v1/orders", post(orders::place_order))
        .route("/api/v1/wallet", get(wallet::get_wallet))
        .route(
            "/api/v1/wallet/topups",
            get(wallet::list_my_topups).post(wallet::create_topup),
        )
}

fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/admin/members", get(admin::members::list_members))
        .route(
            "/api/v1/admin/members/{id}/tier",
            patch(admin::members::set_tier),
        )
        .route(
            "/api/v1/admin/members/{id}/login",
            patch(admin::members::set_login),
        )
        .route(
            "/api/v1/admin/members/{id}/upgrade/approve",
            post(admin::members::approve_upgrade),
        )
        .route(
            "/api/v1/admin/members/{id}/upgrade/reject",
            post(admin::members::reject_upgrade),
        )
        .route("/api/v1/admin/topups", get(wallet::list_topups))
        .route(
            "/api/v1/admin/topups/{id}/approve",
            post(wallet::approve_topup),
        )
        .route(
            "/api/v1/admin/topups/{id}/reject",
            post(wallet::reject_topup),
        )
        .route("/api/v1/admin/orders", get(orders::list_recent_orders))
        .route(
            "/api/v1/admin/order-items/{id}/status",
            patch(orders::set_item_status),
        )
        .route(
            "/api/v1/admin/products",
            post(admin::catalog::create_product),
        )
        .route(
            "/api/v1/admin/products/{id}",
            patch(admin::catalog::update_product).delete(admin::catalog::delete_product),
        )
        .route(
            "/api/v1/admin/products/{id}/categories",
            put(admin::catalog::set_product_categories),
        )
        .route(
            "/api/v1/admin/products/{id}/images",
            post(admin::catalog::add_product_image),
        )
        .route(
            "/api/v1/admin/product-images/{id}",
            delete(admin::catalog::delete_product_image),
        )
        .route(
            "/api/v1/admin/categories",
            post(admin::catalog::create_category),
        )
        .route(
            "/api/v1/admin/categories/{id}",
            patch(admin::catalog::update_category).delete(admin::catalog::delete_category),
        )
        .route(
            "/api/v1/admin/categories/{id}/parents",
            put(admin::catalog::set_category_parents),
        )
        .route("/api/v1/admin/tags", post(admin::blog::create_tag))
        .route("/api/v1/admin/tags/{id}", delete(admin::blog::delete_tag))
        .route("/api/v1/admin/blog/posts", post(admin::blog::create_post))
        .route(
            "/api/v1/admin/blog/posts/{id}",
            patch(admin::blog::update_post).delete(admin::blog::delete_post),
        )
        .route(
            "/api/v1/admin/blog/posts/{id}/tags",
            put(admin::blog::set_post_tags),
        )
        .route(
            "/api/v1/admin/announcements",
            post(admin::content::create_announcement),
        )
        .route(
            "/api/v1/admin/announcements/{id}",
            patch(admin::content::update_announcement)
                .delete(admin::content::delete_announcement),
        )
        .route(
            "/api/v1/admin/email-templates",
            get(admin::content::list_email_templates),
        )
        .route(
            "/api/v1/admin/email-templates/{key}",
            put(admin::content::upsert_email_template),
        )
        .route(
            "/api/v1/admin/settings/shipping",
            put(admin::content::update_shipping),
        )
        .route(
            "/api/v1/admin/settings/banners",
            post(admin::content::create_banner),
        )
        .route(
            "/api/v1/admin/settings/banners/{id}",
            delete(admin::content::delete_banner),
        )
        .route(
            "/api/v1/admin/settings/system",
            get(admin::content::list_system_settings),
        )
        .route(
            "/api/v1/admin/settings/system/{key}",
            put(admin::content::upsert_system_setting),
        )
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(public_router())
        .merge(member_router())
        .merge(admin_router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id))
                .layer(axum::middleware::from_fn_with_state(
                    state.clone(),
                    authenticate,
                )),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match storefront_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_limit_applies_defaults_and_bounds() {
        assert_eq!(normalize_limit(None), 50);
        assert_eq!(normalize_limit(Some(0)), 1);
        assert_eq!(normalize_limit(Some(1_000)), 200);
        assert_eq!(normalize_limit(Some(25)), 25);
    }

    #[test]
    fn api_error_codes_map_to_statuses() {
        for (code, status) in [
            ("not_found", StatusCode::NOT_FOUND),
            ("unauthorized", StatusCode::UNAUTHORIZED),
            ("forbidden", StatusCode::FORBIDDEN),
            ("validation_error", StatusCode::BAD_REQUEST),
            ("bad_request", StatusCode::BAD_REQUEST),
            ("conflict", StatusCode::CONFLICT),
            ("upstream_error", StatusCode::BAD_GATEWAY),
            ("internal_error", StatusCode::INTERNAL_SERVER_ERROR),
        ] {
            let response = ApiError::new("req-1", code, "message").into_response();
            assert_eq!(response.status(), status, "code {code}");
        }
    }

    #[test]
    fn stale_status_maps_to_conflict() {
        let err = DbError::StaleStatus {
            entity: "top-up request",
            id: "7".to_string(),
            expected: "PENDING",
        };
        let api = map_db_error("req-1".to_string(), &err);
        assert_eq!(api.error.code, "conflict");
        assert_eq!(api.error.message, "top-up request 7 is not in status PENDING");
    }

    #[test]
    fn pool_failures_hide_details() {
        let api = map_db_error("req-1".to_string(), &DbError::Sqlx(sqlx::Error::PoolTimedOut));
        assert_eq!(api.error.code, "internal_error");
        assert_eq!(api.error.message, "database query failed");
    }

    #[test]
    fn not_found_maps_to_404_code() {
        let api = map_db_error("req-1".to_string(), &DbError::NotFound);
        assert_eq!(api.error.code, "not_found");
    }

    #[test]
    fn transition_errors_split_forbidden_and_conflict() {
        let forbidden = map_transition_error("r".to_string(), &TransitionError::NotRetail);
        assert_eq!(forbidden.error.code, "forbidden");

        let conflict = map_transition_error("r".to_string(), &TransitionError::AlreadyPending);
        assert_eq!(conflict.error.code, "conflict");
    }

    #[derive(Debug, Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "double_option")]
        phone: Option<Option<String>>,
    }

    #[test]
    fn double_option_distinguishes_absent_and_null() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.phone, None);

        let null: Patch = serde_json::from_str(r#"{"phone":null}"#).unwrap();
        assert_eq!(null.phone, Some(None));

        let set: Patch = serde_json::from_str(r#"{"phone":"555"}"#).unwrap();
        assert_eq!(set.phone, Some(Some("555".to_string())));
    }

    #[test]
    fn required_text_trims_and_bounds() {
        assert_eq!(required_text("r", "name", "  Tea  ", 10).unwrap(), "Tea");
        assert!(required_text("r", "name", "   ", 10).is_err());
        assert!(required_text("r", "name", "abcdefghijk", 10).is_err());
    }
}
