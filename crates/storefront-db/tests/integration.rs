//! Offline unit tests for storefront-db pool configuration and row types.
//! These tests do not require a live database connection.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use chrono::Utc;
use rust_decimal::Decimal;
use storefront_core::{AppConfig, Environment, OrderItemStatus, Tier, UpgradeStatus};
use storefront_db::{DbError, OrderItemRow, OrderItemStatusChange, PoolConfig, ProfileRow};
use uuid::Uuid;

fn profile(tier: &str, status: Option<&str>) -> ProfileRow {
    ProfileRow {
        id: Uuid::new_v4(),
        email: "buyer@example.com".to_string(),
        display_name: None,
        phone: None,
        company_name: None,
        role: "member".to_string(),
        tier: tier.to_string(),
        login_enabled: true,
        wholesale_upgrade_status: status.map(str::to_string),
        upgrade_requested_at: None,
        upgrade_decided_at: None,
        wallet_balance: Decimal::ZERO,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let app_config = AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
        log_level: "info".to_string(),
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        auth_url: "https://auth.example".to_string(),
        auth_anon_key: "anon".to_string(),
        mail_api_url: "https://mail.example".to_string(),
        mail_api_key: None,
        mail_from: "shop@example.com".to_string(),
        http_timeout_secs: 15,
    };

    let pool_config = PoolConfig::from_app_config(&app_config);
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

#[test]
fn profile_row_parses_tier_and_upgrade_status() {
    let row = profile("wholesale", Some("APPROVED"));

    assert_eq!(row.tier().unwrap(), Tier::Wholesale);
    assert_eq!(row.upgrade_status().unwrap(), Some(UpgradeStatus::Approved));
}

#[test]
fn profile_row_without_request_has_no_upgrade_status() {
    let row = profile("retail", None);
    assert_eq!(row.upgrade_status().unwrap(), None);
}

#[test]
fn profile_row_rejects_unknown_tier() {
    let row = profile("platinum", None);
    assert!(matches!(
        row.tier(),
        Err(DbError::InvalidColumn {
            column: "profiles.tier",
            ..
        })
    ));
}

#[test]
fn greeting_name_falls_back_to_email_for_blank_display_name() {
    let mut row = profile("retail", None);
    row.display_name = Some("   ".to_string());
    assert_eq!(row.greeting_name(), "buyer@example.com");

    row.display_name = Some("Ana".to_string());
    assert_eq!(row.greeting_name(), "Ana");
}

#[test]
fn status_change_exposes_both_statuses() {
    let change = OrderItemStatusChange {
        item: OrderItemRow {
            id: 3,
            order_id: 1,
            product_id: Some(9),
            product_name: "Tea tin".to_string(),
            unit_price: Decimal::new(1250, 2),
            quantity: 2,
            status: "ARRIVED".to_string(),
            status_updated_at: Utc::now(),
        },
        previous_status: "PARTIAL_OOS".to_string(),
        profile_id: Uuid::new_v4(),
    };

    assert_eq!(change.item.status().unwrap(), OrderItemStatus::Arrived);
    assert_eq!(
        change.previous_status().unwrap(),
        OrderItemStatus::PartialOos
    );
}
