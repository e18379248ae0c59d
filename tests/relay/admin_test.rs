//! Tests for `src/relay/admin.rs` — organizations, users, and blasts.

use sqlx::SqlitePool;

use courier::db;
use courier::relay::admin::{
    blast_messages, create_blast, create_organization, create_user, load_blast, load_organization,
    load_user,
};
use courier::relay::chain::create_servicechain;
use courier::relay::contact::{upsert_contact, Contact};
use courier::relay::message::{create_message, Direction, MessageState, NewMessage};
use courier::relay::RelayError;

async fn setup_pool() -> SqlitePool {
    db::connect_in_memory().await.expect("db should connect")
}

#[tokio::test]
async fn organization_round_trip() {
    let pool = setup_pool().await;
    let id = create_organization(&pool, "Acme Relay", Some("+15550100"))
        .await
        .expect("create should succeed");

    let org = load_organization(&pool, id).await.expect("load should succeed");
    assert_eq!(org.name, "Acme Relay");
    assert_eq!(org.phone.as_deref(), Some("+15550100"));

    let err = load_organization(&pool, 404)
        .await
        .expect_err("missing organization should fail");
    assert!(matches!(err, RelayError::OrganizationNotFound(404)));
}

#[tokio::test]
async fn users_belong_to_an_existing_organization() {
    let pool = setup_pool().await;
    let org_id = create_organization(&pool, "Acme Relay", None)
        .await
        .expect("create should succeed");

    let user_id = create_user(&pool, org_id, "ops@acme.example")
        .await
        .expect("create should succeed");
    let user = load_user(&pool, user_id).await.expect("load should succeed");
    assert_eq!(user.organization_id, org_id);
    assert_eq!(user.email, "ops@acme.example");

    let err = create_user(&pool, 404, "ops@acme.example")
        .await
        .expect_err("unknown organization should fail");
    assert!(matches!(err, RelayError::OrganizationNotFound(404)));

    let err = create_user(&pool, org_id, "not-an-email")
        .await
        .expect_err("bad email should fail");
    assert!(matches!(err, RelayError::Validation { field: "email", .. }));
}

#[tokio::test]
async fn blast_groups_its_messages_in_order() {
    let pool = setup_pool().await;
    let chain_id = create_servicechain(&pool, "default")
        .await
        .expect("chain should create");
    let ada = Contact::new("Ada", "Lovelace", "ada@example.com", "+4400", None)
        .expect("contact should validate");
    let contact_id = upsert_contact(&pool, &ada)
        .await
        .expect("contact should insert");

    let blast_id = create_blast(&pool, "launch announcement")
        .await
        .expect("blast should create");
    let blast = load_blast(&pool, blast_id).await.expect("load should succeed");
    assert_eq!(blast.name, "launch announcement");

    for body in ["first", "second"] {
        create_message(
            &pool,
            NewMessage {
                contact_id,
                servicechain_id: chain_id,
                body: body.to_owned(),
                direction: Direction::Outbound,
                is_reply_to: None,
                blast_id: Some(blast_id),
            },
        )
        .await
        .expect("message should create");
    }
    // A message outside the blast must not be included.
    create_message(
        &pool,
        NewMessage {
            contact_id,
            servicechain_id: chain_id,
            body: "unrelated".to_owned(),
            direction: Direction::Outbound,
            is_reply_to: None,
            blast_id: None,
        },
    )
    .await
    .expect("message should create");

    let messages = blast_messages(&pool, blast_id)
        .await
        .expect("listing should succeed");
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].body, "first");
    assert_eq!(messages[1].body, "second");
    assert!(messages.iter().all(|m| m.state == MessageState::Pending));

    let err = blast_messages(&pool, 404)
        .await
        .expect_err("missing blast should fail");
    assert!(matches!(err, RelayError::BlastNotFound(404)));
}

#[tokio::test]
async fn blank_names_are_rejected() {
    let pool = setup_pool().await;
    let err = create_organization(&pool, "", None)
        .await
        .expect_err("blank name should fail");
    assert!(matches!(err, RelayError::Validation { field: "name", .. }));

    let err = create_blast(&pool, "  ")
        .await
        .expect_err("blank name should fail");
    assert!(matches!(err, RelayError::Validation { field: "name", .. }));
}
