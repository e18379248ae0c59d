//! Administrative grouping entities: organizations, operator users, and
//! bulk-send blasts.
//!
//! These are identity records only — no behavioral logic beyond validated
//! construction and persistence.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::trace;

use super::message::{self, Message};
use super::RelayError;

/// A tenant grouping contacts and users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    /// Database ID (None for new organizations).
    pub id: Option<i64>,
    /// Organization name.
    pub name: String,
    /// Contact phone number.
    pub phone: Option<String>,
}

/// An operator account belonging to an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Database ID (None for new users).
    pub id: Option<i64>,
    /// Owning organization.
    pub organization_id: i64,
    /// Login email.
    pub email: String,
}

/// A named bulk-send batch grouping multiple messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blast {
    /// Database ID (None for new blasts).
    pub id: Option<i64>,
    /// Batch name.
    pub name: String,
}

/// Create an organization.
///
/// # Errors
///
/// Returns [`RelayError::Validation`] if the name is blank,
/// or [`RelayError::Database`] on SQLite failure.
pub async fn create_organization(
    db: &SqlitePool,
    name: &str,
    phone: Option<&str>,
) -> Result<i64, RelayError> {
    super::require_non_empty("name", name)?;
    let result = sqlx::query("INSERT INTO organizations (name, phone) VALUES (?1, ?2)")
        .bind(name)
        .bind(phone)
        .execute(db)
        .await?;
    let id = result.last_insert_rowid();
    trace!(organization_id = id, name, "organization created");
    Ok(id)
}

/// Load an organization by ID.
///
/// # Errors
///
/// Returns [`RelayError::OrganizationNotFound`] if no organization matches,
/// or [`RelayError::Database`] on SQLite failure.
pub async fn load_organization(
    db: &SqlitePool,
    organization_id: i64,
) -> Result<Organization, RelayError> {
    let row: (i64, String, Option<String>) =
        sqlx::query_as("SELECT id, name, phone FROM organizations WHERE id = ?1")
            .bind(organization_id)
            .fetch_optional(db)
            .await?
            .ok_or(RelayError::OrganizationNotFound(organization_id))?;
    Ok(Organization {
        id: Some(row.0),
        name: row.1,
        phone: row.2,
    })
}

/// Create an operator user within an organization.
///
/// # Errors
///
/// Returns [`RelayError::Validation`] if the email is malformed,
/// [`RelayError::OrganizationNotFound`] if the organization does not exist,
/// or [`RelayError::Database`] on SQLite failure.
pub async fn create_user(
    db: &SqlitePool,
    organization_id: i64,
    email: &str,
) -> Result<i64, RelayError> {
    super::require_email("email", email)?;
    let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM organizations WHERE id = ?1")
        .bind(organization_id)
        .fetch_optional(db)
        .await?;
    if row.is_none() {
        return Err(RelayError::OrganizationNotFound(organization_id));
    }
    let result = sqlx::query("INSERT INTO users (organization_id, email) VALUES (?1, ?2)")
        .bind(organization_id)
        .bind(email)
        .execute(db)
        .await?;
    let id = result.last_insert_rowid();
    trace!(user_id = id, organization_id, "user created");
    Ok(id)
}

/// Load a user by ID.
///
/// # Errors
///
/// Returns [`RelayError::Database`] on SQLite failure, including no match.
pub async fn load_user(db: &SqlitePool, user_id: i64) -> Result<User, RelayError> {
    let row: (i64, i64, String) =
        sqlx::query_as("SELECT id, organization_id, email FROM users WHERE id = ?1")
            .bind(user_id)
            .fetch_one(db)
            .await?;
    Ok(User {
        id: Some(row.0),
        organization_id: row.1,
        email: row.2,
    })
}

/// Create a blast batch.
///
/// # Errors
///
/// Returns [`RelayError::Validation`] if the name is blank,
/// or [`RelayError::Database`] on SQLite failure.
pub async fn create_blast(db: &SqlitePool, name: &str) -> Result<i64, RelayError> {
    super::require_non_empty("name", name)?;
    let result = sqlx::query("INSERT INTO blasts (name) VALUES (?1)")
        .bind(name)
        .execute(db)
        .await?;
    let id = result.last_insert_rowid();
    trace!(blast_id = id, name, "blast created");
    Ok(id)
}

/// Load a blast by ID.
///
/// # Errors
///
/// Returns [`RelayError::BlastNotFound`] if no blast matches,
/// or [`RelayError::Database`] on SQLite failure.
pub async fn load_blast(db: &SqlitePool, blast_id: i64) -> Result<Blast, RelayError> {
    let row: (i64, String) = sqlx::query_as("SELECT id, name FROM blasts WHERE id = ?1")
        .bind(blast_id)
        .fetch_optional(db)
        .await?
        .ok_or(RelayError::BlastNotFound(blast_id))?;
    Ok(Blast {
        id: Some(row.0),
        name: row.1,
    })
}

/// List the messages grouped under a blast, oldest first.
///
/// # Errors
///
/// Returns [`RelayError::BlastNotFound`] if the blast does not exist,
/// or [`RelayError::Database`] on SQLite failure.
pub async fn blast_messages(db: &SqlitePool, blast_id: i64) -> Result<Vec<Message>, RelayError> {
    load_blast(db, blast_id).await?;
    let rows: Vec<message::MessageRow> = sqlx::query_as(
        "SELECT id, body, servicechain_id, contact_id, blast_id, is_reply_to, \
         direction, state, sent_time, created_at, updated_at \
         FROM messages WHERE blast_id = ?1 ORDER BY rowid ASC",
    )
    .bind(blast_id)
    .fetch_all(db)
    .await?;
    rows.into_iter().map(message::message_from_row).collect()
}
