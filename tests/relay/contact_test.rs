//! Tests for `src/relay/contact.rs` — contact validation and persistence.

use sqlx::SqlitePool;

use courier::db;
use courier::relay::chain::create_servicechain;
use courier::relay::contact::{load_contact, search_contacts, upsert_contact, Contact};
use courier::relay::RelayError;

async fn setup_pool() -> SqlitePool {
    db::connect_in_memory().await.expect("db should connect")
}

#[test]
fn construction_validates_each_field() {
    let err = Contact::new("", "Lovelace", "ada@example.com", "+44000", None)
        .expect_err("blank first name should fail");
    assert!(matches!(
        err,
        RelayError::Validation {
            field: "first_name",
            ..
        }
    ));

    let err = Contact::new("Ada", "Lovelace", "not-an-email", "+44000", None)
        .expect_err("bad email should fail");
    assert!(matches!(err, RelayError::Validation { field: "email", .. }));

    let err = Contact::new("Ada", "Lovelace", "ada@example.com", "  ", None)
        .expect_err("blank phone should fail");
    assert!(matches!(err, RelayError::Validation { field: "phone", .. }));
}

#[tokio::test]
async fn upsert_and_load_round_trip() {
    let pool = setup_pool().await;
    let chain_id = create_servicechain(&pool, "default")
        .await
        .expect("chain should create");

    let ada = Contact::new(
        "Ada",
        "Lovelace",
        "ada@example.com",
        "+440000000001",
        Some(chain_id),
    )
    .expect("contact should validate");
    let id = upsert_contact(&pool, &ada).await.expect("insert should succeed");

    let loaded = load_contact(&pool, id).await.expect("load should succeed");
    assert_eq!(loaded.first_name, "Ada");
    assert_eq!(loaded.surname, "Lovelace");
    assert_eq!(loaded.default_servicechain_id, Some(chain_id));

    // Update in place keeps the id stable.
    let mut updated = loaded;
    updated.phone = "+440000000002".to_owned();
    let same_id = upsert_contact(&pool, &updated)
        .await
        .expect("update should succeed");
    assert_eq!(same_id, id);

    let reloaded = load_contact(&pool, id).await.expect("load should succeed");
    assert_eq!(reloaded.phone, "+440000000002");
}

#[tokio::test]
async fn default_chain_must_exist() {
    let pool = setup_pool().await;
    let ada = Contact::new(
        "Ada",
        "Lovelace",
        "ada@example.com",
        "+440000000001",
        Some(777),
    )
    .expect("contact should validate");
    let err = upsert_contact(&pool, &ada)
        .await
        .expect_err("dangling default chain should fail");
    assert!(matches!(err, RelayError::ChainNotFound(777)));
}

#[tokio::test]
async fn search_matches_either_name() {
    let pool = setup_pool().await;
    for (first, last, email) in [
        ("Ada", "Lovelace", "ada@example.com"),
        ("Grace", "Hopper", "grace@example.com"),
        ("Lovis", "Corinth", "lovis@example.com"),
    ] {
        let contact =
            Contact::new(first, last, email, "+4400", None).expect("contact should validate");
        upsert_contact(&pool, &contact)
            .await
            .expect("insert should succeed");
    }

    let results = search_contacts(&pool, "lov", 10)
        .await
        .expect("search should succeed");
    assert_eq!(results.len(), 2, "matches Lovelace and Lovis");

    let results = search_contacts(&pool, "hopper", 10)
        .await
        .expect("search should succeed");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].first_name, "Grace");
}

#[tokio::test]
async fn missing_contact_reports_not_found() {
    let pool = setup_pool().await;
    let err = load_contact(&pool, 42)
        .await
        .expect_err("missing contact should fail");
    assert!(matches!(err, RelayError::ContactNotFound(42)));
}
