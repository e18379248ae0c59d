//! Tests for `src/relay/chain.rs` — servicechain ordering.

use sqlx::SqlitePool;

use courier::db;
use courier::relay::chain::{
    add_service_to_chain, create_service, create_servicechain, load_servicechain,
    mark_initialized, servicechain_order,
};
use courier::relay::RelayError;

async fn setup_pool() -> SqlitePool {
    db::connect_in_memory().await.expect("db should connect")
}

#[tokio::test]
async fn order_follows_ascending_priority() {
    let pool = setup_pool().await;
    let chain_id = create_servicechain(&pool, "escalation")
        .await
        .expect("chain should create");

    let sms = create_service(&pool, "sms", "channel-sms")
        .await
        .expect("service should create");
    let email = create_service(&pool, "email", "channel-email")
        .await
        .expect("service should create");
    let telegram = create_service(&pool, "telegram", "channel-telegram")
        .await
        .expect("service should create");

    // Insert out of priority order on purpose.
    add_service_to_chain(&pool, chain_id, email, 30)
        .await
        .expect("add should succeed");
    add_service_to_chain(&pool, chain_id, sms, 10)
        .await
        .expect("add should succeed");
    add_service_to_chain(&pool, chain_id, telegram, 20)
        .await
        .expect("add should succeed");

    let order = servicechain_order(&pool, chain_id)
        .await
        .expect("order should resolve");
    let names: Vec<&str> = order.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["sms", "telegram", "email"]);
}

#[tokio::test]
async fn duplicate_priority_is_surfaced_not_tiebroken() {
    let pool = setup_pool().await;
    let chain_id = create_servicechain(&pool, "broken")
        .await
        .expect("chain should create");
    let sms = create_service(&pool, "sms", "channel-sms")
        .await
        .expect("service should create");
    let email = create_service(&pool, "email", "channel-email")
        .await
        .expect("service should create");

    add_service_to_chain(&pool, chain_id, sms, 10)
        .await
        .expect("add should succeed");
    add_service_to_chain(&pool, chain_id, email, 10)
        .await
        .expect("schema must accept the bad data");

    let err = servicechain_order(&pool, chain_id)
        .await
        .expect_err("duplicate priority must be surfaced");
    match err {
        RelayError::DuplicatePriority {
            servicechain_id,
            priority,
        } => {
            assert_eq!(servicechain_id, chain_id);
            assert_eq!(priority, 10);
        }
        other => panic!("expected DuplicatePriority, got: {other}"),
    }
}

#[tokio::test]
async fn empty_chain_resolves_to_no_services() {
    let pool = setup_pool().await;
    let chain_id = create_servicechain(&pool, "empty")
        .await
        .expect("chain should create");
    let order = servicechain_order(&pool, chain_id)
        .await
        .expect("order should resolve");
    assert!(order.is_empty());
}

#[tokio::test]
async fn missing_chain_reports_not_found() {
    let pool = setup_pool().await;
    let err = servicechain_order(&pool, 404)
        .await
        .expect_err("missing chain should fail");
    assert!(matches!(err, RelayError::ChainNotFound(404)));

    let err = load_servicechain(&pool, 404)
        .await
        .expect_err("missing chain should fail");
    assert!(matches!(err, RelayError::ChainNotFound(404)));
}

#[tokio::test]
async fn membership_requires_existing_parents() {
    let pool = setup_pool().await;
    let chain_id = create_servicechain(&pool, "strict")
        .await
        .expect("chain should create");

    let err = add_service_to_chain(&pool, chain_id, 999, 10)
        .await
        .expect_err("dangling service reference should fail");
    assert!(matches!(err, RelayError::Database(_)));

    let service = create_service(&pool, "sms", "channel-sms")
        .await
        .expect("service should create");
    let err = add_service_to_chain(&pool, 999, service, 10)
        .await
        .expect_err("dangling chain reference should fail");
    assert!(matches!(err, RelayError::Database(_)));
}

#[tokio::test]
async fn services_start_uninitialised_until_marked() {
    let pool = setup_pool().await;
    let chain_id = create_servicechain(&pool, "setup")
        .await
        .expect("chain should create");
    let service = create_service(&pool, "sms", "channel-sms")
        .await
        .expect("service should create");
    add_service_to_chain(&pool, chain_id, service, 10)
        .await
        .expect("add should succeed");

    let order = servicechain_order(&pool, chain_id)
        .await
        .expect("order should resolve");
    assert!(!order[0].initialized);

    mark_initialized(&pool, service)
        .await
        .expect("mark should succeed");

    let order = servicechain_order(&pool, chain_id)
        .await
        .expect("order should resolve");
    assert!(order[0].initialized);
}

#[tokio::test]
async fn blank_names_are_rejected() {
    let pool = setup_pool().await;
    let err = create_servicechain(&pool, " ")
        .await
        .expect_err("blank chain name should fail");
    assert!(matches!(err, RelayError::Validation { field: "name", .. }));

    let err = create_service(&pool, "sms", "")
        .await
        .expect_err("blank directory should fail");
    assert!(matches!(
        err,
        RelayError::Validation {
            field: "directory_name",
            ..
        }
    ));
}
