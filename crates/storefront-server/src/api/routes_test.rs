//! End-to-end route tests: a real Postgres from `sqlx::test`, with the auth
//! provider and mail API stood in for by wiremock.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use sqlx::PgPool;
use storefront_clients::{AuthClient, MailClient};
use storefront_core::{ProductStatus, Tier};
use storefront_db::NewProduct;
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::{build_app, AppState};

const MEMBER_ID: Uuid = Uuid::from_u128(0x1111_1111_1111_1111_1111_1111_1111_1111);
const ADMIN_ID: Uuid = Uuid::from_u128(0x2222_2222_2222_2222_2222_2222_2222_2222);
const MEMBER_EMAIL: &str = "buyer@example.com";
const ADMIN_EMAIL: &str = "owner@example.com";

struct Harness {
    app: Router,
    pool: PgPool,
    // Expectations mounted on the server are verified when it drops.
    server: MockServer,
}

async fn mount_user(server: &MockServer, token: &str, id: Uuid, email: &str) {
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header("authorization", format!("Bearer {token}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": id, "email": email })))
        .mount(server)
        .await;
}

async fn harness(pool: PgPool) -> Harness {
    let server = MockServer::start().await;
    mount_user(&server, "member-token", MEMBER_ID, MEMBER_EMAIL).await;
    mount_user(&server, "admin-token", ADMIN_ID, ADMIN_EMAIL).await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header("authorization", "Bearer expired-token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "msg": "invalid JWT" })))
        .mount(&server)
        .await;

    for key in ["upgrade_approved", "upgrade_rejected", "topup_approved", "order_item_arrived"] {
        storefront_db::upsert_email_template(
            &pool,
            key,
            &format!("{key}: {{{{display_name}}}}"),
            "<p>{{product_name}} {{amount}}</p>",
        )
        .await
        .expect("seed template");
    }

    let state = AppState {
        pool: pool.clone(),
        auth: Arc::new(AuthClient::new(&server.uri(), "anon", 5).expect("auth client")),
        mailer: Some(Arc::new(
            MailClient::new(&server.uri(), "mail-key", "shop@example.com", 5).expect("mail client"),
        )),
    };

    Harness {
        app: build_app(state),
        pool,
        server,
    }
}

async fn expect_mails(server: &MockServer, count: u64) {
    Mock::given(method("POST"))
        .and(path("/emails"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "msg_1" })))
        .expect(count)
        .mount(server)
        .await;
}

async fn call(
    app: &Router,
    verb: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(verb).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request");

    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json parse")
    };
    (status, json)
}

/// Send a body verbatim, for requests that are not valid JSON.
async fn call_raw(
    app: &Router,
    uri: &str,
    token: &str,
    content_type: Option<&str>,
    body: &str,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("authorization", format!("Bearer {token}"));
    if let Some(content_type) = content_type {
        builder = builder.header("content-type", content_type);
    }
    let request = builder.body(Body::from(body.to_owned())).expect("request");

    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let json = serde_json::from_slice(&bytes).expect("error envelope should be json");
    (status, json)
}

async fn register_member(pool: &PgPool) {
    storefront_db::create_profile(pool, MEMBER_ID, MEMBER_EMAIL, Some("Dana"), None, None)
        .await
        .expect("member profile");
}

async fn register_admin(pool: &PgPool) {
    storefront_db::create_profile(pool, ADMIN_ID, ADMIN_EMAIL, None, None, None)
        .await
        .expect("admin profile");
    assert!(storefront_db::grant_admin_by_email(pool, ADMIN_EMAIL)
        .await
        .expect("grant admin"));
}

async fn fund_member(pool: &PgPool, amount: Decimal) {
    let topup = storefront_db::create_topup(pool, MEMBER_ID, amount, "bank", None)
        .await
        .expect("topup");
    storefront_db::approve_topup(pool, topup.id, None)
        .await
        .expect("approve topup");
}

async fn seed_product(pool: &PgPool, slug: &str, wholesale_only: bool) -> i64 {
    storefront_db::create_product(
        pool,
        &NewProduct {
            name: &format!("Product {slug}"),
            slug,
            description: None,
            retail_price: Decimal::new(1000, 2),
            wholesale_price: Some(Decimal::new(700, 2)),
            status: ProductStatus::Published,
            wholesale_only,
        },
    )
    .await
    .expect("product")
    .id
}

#[sqlx::test(migrations = "../../migrations")]
async fn registration_creates_once_then_returns_existing(pool: PgPool) {
    let h = harness(pool).await;

    let (status, json) = call(
        &h.app,
        "POST",
        "/api/v1/me",
        Some("member-token"),
        Some(json!({ "display_name": "Dana" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["data"]["email"], MEMBER_EMAIL);
    assert_eq!(json["data"]["tier"], "retail");
    assert_eq!(json["data"]["wallet_balance"], "0.00");

    let (status, json) = call(&h.app, "POST", "/api/v1/me", Some("member-token"), Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["display_name"], "Dana");
}

#[sqlx::test(migrations = "../../migrations")]
async fn bearer_tokens_are_checked_on_every_route(pool: PgPool) {
    let h = harness(pool).await;

    let (status, json) = call(&h.app, "GET", "/api/v1/products", Some("expired-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"]["code"], "unauthorized");

    let (status, _) = call(&h.app, "GET", "/api/v1/products", None, None).await;
    assert_eq!(status, StatusCode::OK);

    // Valid token, but no profile yet.
    let (status, _) = call(&h.app, "GET", "/api/v1/me", Some("member-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../migrations")]
async fn second_upgrade_request_conflicts(pool: PgPool) {
    let h = harness(pool).await;
    register_member(&h.pool).await;

    let (status, json) = call(&h.app, "POST", "/api/v1/me/upgrade-request", Some("member-token"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["wholesale_upgrade_status"], "PENDING");
    assert!(json["data"]["upgrade_requested_at"].is_string());

    let (status, json) = call(&h.app, "POST", "/api/v1/me/upgrade-request", Some("member-token"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"]["code"], "conflict");
}

#[sqlx::test(migrations = "../../migrations")]
async fn approving_upgrade_promotes_member_and_emails_once(pool: PgPool) {
    let h = harness(pool).await;
    register_member(&h.pool).await;
    register_admin(&h.pool).await;
    storefront_db::request_upgrade(&h.pool, MEMBER_ID)
        .await
        .expect("request upgrade");
    Mock::given(method("POST"))
        .and(path("/emails"))
        .and(body_partial_json(json!({
            "to": [MEMBER_EMAIL],
            "subject": "upgrade_approved: Dana",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "msg_1" })))
        .expect(1)
        .mount(&h.server)
        .await;

    let uri = format!("/api/v1/admin/members/{MEMBER_ID}/upgrade/approve");
    let (status, json) = call(&h.app, "POST", &uri, Some("admin-token"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["tier"], "wholesale");
    assert_eq!(json["data"]["wholesale_upgrade_status"], "APPROVED");

    // Already decided.
    let (status, _) = call(&h.app, "POST", &uri, Some("admin-token"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../../migrations")]
async fn admin_routes_reject_members(pool: PgPool) {
    let h = harness(pool).await;
    register_member(&h.pool).await;

    let (status, json) = call(&h.app, "GET", "/api/v1/admin/members", Some("member-token"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["error"]["code"], "forbidden");

    let (status, _) = call(&h.app, "GET", "/api/v1/admin/topups", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../migrations")]
async fn disabled_login_blocks_member_routes(pool: PgPool) {
    let h = harness(pool).await;
    register_member(&h.pool).await;
    register_admin(&h.pool).await;

    let uri = format!("/api/v1/admin/members/{MEMBER_ID}/login");
    let (status, json) = call(
        &h.app,
        "PATCH",
        &uri,
        Some("admin-token"),
        Some(json!({ "login_enabled": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["login_enabled"], false);

    let (status, _) = call(&h.app, "GET", "/api/v1/wallet", Some("member-token"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../migrations")]
async fn approved_topup_credits_wallet(pool: PgPool) {
    let h = harness(pool).await;
    register_member(&h.pool).await;
    register_admin(&h.pool).await;
    expect_mails(&h.server, 1).await;

    let (status, json) = call(
        &h.app,
        "POST",
        "/api/v1/wallet/topups",
        Some("member-token"),
        Some(json!({ "amount": "50.00", "method": "bank transfer", "reference": "TX-1" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["data"]["status"], "PENDING");
    let topup_id = json["data"]["id"].as_i64().expect("topup id");

    let (status, json) = call(&h.app, "GET", "/api/v1/admin/topups?status=PENDING", Some("admin-token"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"].as_array().expect("topups").len(), 1);

    let uri = format!("/api/v1/admin/topups/{topup_id}/approve");
    let (status, json) = call(&h.app, "POST", &uri, Some("admin-token"), Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "APPROVED");
    assert_eq!(json["data"]["balance"], "50.00");

    let (status, _) = call(&h.app, "POST", &uri, Some("admin-token"), Some(json!({}))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, json) = call(&h.app, "GET", "/api/v1/wallet", Some("member-token"), None).await;
    assert_eq!(json["data"]["balance"], "50.00");
}

#[sqlx::test(migrations = "../../migrations")]
async fn topup_amount_must_be_positive(pool: PgPool) {
    let h = harness(pool).await;
    register_member(&h.pool).await;

    let (status, json) = call(
        &h.app,
        "POST",
        "/api/v1/wallet/topups",
        Some("member-token"),
        Some(json!({ "amount": "0", "method": "bank" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");
}

#[sqlx::test(migrations = "../../migrations")]
async fn arrival_is_announced_once(pool: PgPool) {
    let h = harness(pool).await;
    register_member(&h.pool).await;
    register_admin(&h.pool).await;
    fund_member(&h.pool, Decimal::new(10_000, 2)).await;
    let product_id = seed_product(&h.pool, "tea-tin", false).await;
    expect_mails(&h.server, 1).await;

    let (status, json) = call(
        &h.app,
        "POST",
        "/api/v1/orders",
        Some("member-token"),
        Some(json!({ "items": [{ "product_id": product_id, "quantity": 2 }] })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["data"]["total"], "20.00");
    let item_id = json["data"]["items"][0]["id"].as_i64().expect("item id");
    assert_eq!(json["data"]["items"][0]["status"], "NORMAL");

    let uri = format!("/api/v1/admin/order-items/{item_id}/status");
    let (status, json) = call(&h.app, "PATCH", &uri, Some("admin-token"), Some(json!({ "status": "ARRIVED" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["previous_status"], "NORMAL");
    assert_eq!(json["data"]["notified"], true);

    let (status, json) = call(&h.app, "PATCH", &uri, Some("admin-token"), Some(json!({ "status": "ARRIVED" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["notified"], false);

    let (_, json) = call(&h.app, "GET", "/api/v1/wallet", Some("member-token"), None).await;
    assert_eq!(json["data"]["balance"], "80.00");
}

#[sqlx::test(migrations = "../../migrations")]
async fn order_beyond_balance_is_refused(pool: PgPool) {
    let h = harness(pool).await;
    register_member(&h.pool).await;
    fund_member(&h.pool, Decimal::new(500, 2)).await;
    let product_id = seed_product(&h.pool, "kettle", false).await;

    let (status, json) = call(
        &h.app,
        "POST",
        "/api/v1/orders",
        Some("member-token"),
        Some(json!({ "items": [{ "product_id": product_id, "quantity": 1 }] })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"]["code"], "conflict");

    let (_, json) = call(&h.app, "GET", "/api/v1/me/orders", Some("member-token"), None).await;
    assert!(json["data"].as_array().expect("orders").is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn wholesale_only_products_follow_tier(pool: PgPool) {
    let h = harness(pool).await;
    register_member(&h.pool).await;
    let open = seed_product(&h.pool, "open-item", false).await;
    let trade = seed_product(&h.pool, "trade-item", true).await;

    let (_, json) = call(&h.app, "GET", "/api/v1/products", None, None).await;
    let ids: Vec<i64> = json["data"]
        .as_array()
        .expect("products")
        .iter()
        .filter_map(|p| p["id"].as_i64())
        .collect();
    assert!(ids.contains(&open));
    assert!(!ids.contains(&trade));

    let (status, _) = call(&h.app, "GET", &format!("/api/v1/products/{trade}"), Some("member-token"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    storefront_db::set_tier(&h.pool, MEMBER_ID, Tier::Wholesale)
        .await
        .expect("set tier");
    let (status, json) = call(&h.app, "GET", &format!("/api/v1/products/{trade}"), Some("member-token"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["price"], "7.00");
    assert_eq!(json["data"]["retail_price"], "10.00");
}

#[sqlx::test(migrations = "../../migrations")]
async fn visible_by_l1_groups_categories_under_top_level(pool: PgPool) {
    let h = harness(pool).await;
    let l1 = storefront_db::create_category(&h.pool, "Tea", "tea", 1, 0)
        .await
        .expect("l1");
    let l2 = storefront_db::create_category(&h.pool, "Green", "green", 2, 0)
        .await
        .expect("l2");
    let unused = storefront_db::create_category(&h.pool, "Black", "black", 2, 1)
        .await
        .expect("unused");
    let product_id = seed_product(&h.pool, "sencha", false).await;
    storefront_db::set_product_categories(&h.pool, product_id, &[l1.id, l2.id])
        .await
        .expect("link categories");

    let (status, json) = call(&h.app, "GET", "/api/v1/categories/visible-by-l1", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let visible = json["data"][l1.id.to_string()]
        .as_array()
        .expect("l1 entry");
    assert!(visible.contains(&json!(l1.id)));
    assert!(visible.contains(&json!(l2.id)));
    assert!(!visible.contains(&json!(unused.id)));
}

#[sqlx::test(migrations = "../../migrations")]
async fn admin_manages_catalog_and_content(pool: PgPool) {
    let h = harness(pool).await;
    register_admin(&h.pool).await;

    let (status, json) = call(
        &h.app,
        "POST",
        "/api/v1/admin/products",
        Some("admin-token"),
        Some(json!({ "name": "Matcha Whisk", "retail_price": "12.50", "status": "published" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["data"]["slug"], "matcha-whisk");
    let product_id = json["data"]["id"].as_i64().expect("product id");

    let (status, json) = call(
        &h.app,
        "PATCH",
        &format!("/api/v1/admin/products/{product_id}"),
        Some("admin-token"),
        Some(json!({ "wholesale_price": "9.00" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["wholesale_price"], "9.00");

    let (status, _) = call(
        &h.app,
        "POST",
        "/api/v1/admin/products",
        Some("admin-token"),
        Some(json!({ "name": "Matcha Whisk", "retail_price": "1.00" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, json) = call(
        &h.app,
        "PUT",
        "/api/v1/admin/settings/shipping",
        Some("admin-token"),
        Some(json!({ "flat_fee": "6.00", "free_shipping_threshold": "80.00" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["flat_fee"], "6.00");

    let (_, json) = call(&h.app, "GET", "/api/v1/settings/shipping", None, None).await;
    assert_eq!(json["data"]["free_shipping_threshold"], "80.00");

    let (status, _) = call(
        &h.app,
        "DELETE",
        &format!("/api/v1/admin/products/{product_id}"),
        Some("admin-token"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&h.app, "GET", &format!("/api/v1/products/{product_id}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../migrations")]
async fn published_posts_are_filtered_by_tag(pool: PgPool) {
    let h = harness(pool).await;
    register_admin(&h.pool).await;

    let (_, json) = call(&h.app, "POST", "/api/v1/admin/tags", Some("admin-token"), Some(json!({ "name": "Brewing" }))).await;
    let tag_id = json["data"]["id"].as_i64().expect("tag id");

    let (status, json) = call(
        &h.app,
        "POST",
        "/api/v1/admin/blog/posts",
        Some("admin-token"),
        Some(json!({ "title": "Cold Brew Basics", "content": "Steep overnight.", "is_published": true })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let post_id = json["data"]["id"].as_i64().expect("post id");

    call(
        &h.app,
        "POST",
        "/api/v1/admin/blog/posts",
        Some("admin-token"),
        Some(json!({ "title": "Draft Notes", "content": "wip" })),
    )
    .await;

    let (status, _) = call(
        &h.app,
        "PUT",
        &format!("/api/v1/admin/blog/posts/{post_id}/tags"),
        Some("admin-token"),
        Some(json!({ "tag_ids": [tag_id] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, json) = call(&h.app, "GET", "/api/v1/blog/posts?tag=brewing", None, None).await;
    let posts = json["data"].as_array().expect("posts");
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0]["slug"], "cold-brew-basics");
    assert_eq!(posts[0]["tags"][0]["slug"], "brewing");

    let (status, _) = call(&h.app, "GET", "/api/v1/blog/posts/draft-notes", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../migrations")]
async fn malformed_bodies_use_error_envelope(pool: PgPool) {
    let h = harness(pool).await;
    register_admin(&h.pool).await;

    let (status, json) = call_raw(
        &h.app,
        "/api/v1/me",
        "member-token",
        Some("application/json"),
        "{not json",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "bad_request");
    assert!(json["meta"]["request_id"].is_string());

    let (status, json) = call_raw(&h.app, "/api/v1/me", "member-token", None, "{}").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "bad_request");

    let (status, json) = call(
        &h.app,
        "PATCH",
        "/api/v1/admin/order-items/1/status",
        Some("admin-token"),
        Some(json!({ "status": "LOST" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");
}

#[sqlx::test(migrations = "../../migrations")]
async fn topup_decision_accepts_missing_body(pool: PgPool) {
    let h = harness(pool).await;
    register_member(&h.pool).await;
    register_admin(&h.pool).await;
    expect_mails(&h.server, 1).await;
    let topup = storefront_db::create_topup(&h.pool, MEMBER_ID, Decimal::new(2500, 2), "bank", None)
        .await
        .expect("topup");

    let uri = format!("/api/v1/admin/topups/{}/approve", topup.id);
    let (status, json) = call(&h.app, "POST", &uri, Some("admin-token"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["balance"], "25.00");
    assert!(json["data"]["admin_note"].is_null());
}

#[sqlx::test(migrations = "../../migrations")]
async fn guest_members_cannot_order_or_request_upgrade(pool: PgPool) {
    let h = harness(pool).await;
    register_member(&h.pool).await;
    fund_member(&h.pool, Decimal::new(10_000, 2)).await;
    let product_id = seed_product(&h.pool, "guest-item", false).await;
    storefront_db::set_tier(&h.pool, MEMBER_ID, Tier::Guest)
        .await
        .expect("set tier");

    let (status, json) = call(
        &h.app,
        "POST",
        "/api/v1/orders",
        Some("member-token"),
        Some(json!({ "items": [{ "product_id": product_id, "quantity": 1 }] })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["error"]["code"], "forbidden");

    let (status, json) = call(&h.app, "POST", "/api/v1/me/upgrade-request", Some("member-token"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["error"]["code"], "forbidden");

    let (_, json) = call(&h.app, "GET", "/api/v1/wallet", Some("member-token"), None).await;
    assert_eq!(json["data"]["balance"], "100.00");
}

#[sqlx::test(migrations = "../../migrations")]
async fn rejecting_upgrade_keeps_retail_and_emails_once(pool: PgPool) {
    let h = harness(pool).await;
    register_member(&h.pool).await;
    register_admin(&h.pool).await;
    storefront_db::request_upgrade(&h.pool, MEMBER_ID)
        .await
        .expect("request upgrade");
    Mock::given(method("POST"))
        .and(path("/emails"))
        .and(body_partial_json(json!({
            "to": [MEMBER_EMAIL],
            "subject": "upgrade_rejected: Dana",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "msg_2" })))
        .expect(1)
        .mount(&h.server)
        .await;

    let uri = format!("/api/v1/admin/members/{MEMBER_ID}/upgrade/reject");
    let (status, json) = call(&h.app, "POST", &uri, Some("admin-token"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["tier"], "retail");
    assert_eq!(json["data"]["wholesale_upgrade_status"], "REJECTED");

    // A rejected member may ask again.
    let (status, json) = call(&h.app, "POST", "/api/v1/me/upgrade-request", Some("member-token"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["wholesale_upgrade_status"], "PENDING");
}

#[sqlx::test(migrations = "../../migrations")]
async fn cjk_names_get_slugs_and_unknown_category_parents_are_not_found(pool: PgPool) {
    let h = harness(pool).await;
    register_admin(&h.pool).await;

    let (status, json) = call(
        &h.app,
        "POST",
        "/api/v1/admin/categories",
        Some("admin-token"),
        Some(json!({ "name": "抹茶粉 禮盒", "level": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["data"]["slug"], "抹茶粉-禮盒");
    let parent = json["data"]["id"].as_i64().expect("category id");

    let (status, json) = call(
        &h.app,
        "PUT",
        &format!("/api/v1/admin/categories/{}/parents", parent + 1000),
        Some("admin-token"),
        Some(json!({ "parent_ids": [parent] })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "not_found");
}
