//! Contact records: validation, resolution, and persistence.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::trace;

use super::RelayError;

/// Row type returned by SQLite queries for contacts.
type ContactRow = (i64, String, String, String, String, Option<i64>);

/// A person the relay can deliver to or receive from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Database ID (None for new contacts).
    pub id: Option<i64>,
    /// First name.
    pub first_name: String,
    /// Surname.
    pub surname: String,
    /// Email address.
    pub email: String,
    /// Phone number.
    pub phone: String,
    /// Servicechain used when a message does not name one.
    pub default_servicechain_id: Option<i64>,
}

impl Contact {
    /// Build a validated contact that has not yet been persisted.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Validation`] naming the offending field if a
    /// name or phone is blank or the email is malformed. No partially
    /// constructed contact is returned.
    pub fn new(
        first_name: &str,
        surname: &str,
        email: &str,
        phone: &str,
        default_servicechain_id: Option<i64>,
    ) -> Result<Self, RelayError> {
        super::require_non_empty("first_name", first_name)?;
        super::require_non_empty("surname", surname)?;
        super::require_email("email", email)?;
        super::require_non_empty("phone", phone)?;
        Ok(Self {
            id: None,
            first_name: first_name.to_owned(),
            surname: surname.to_owned(),
            email: email.to_owned(),
            phone: phone.to_owned(),
            default_servicechain_id,
        })
    }
}

/// Insert or update a contact.
///
/// If `contact.id` is `Some`, updates the existing row. Otherwise inserts a
/// new row and returns the auto-generated ID.
///
/// # Errors
///
/// Returns [`RelayError::ChainNotFound`] if the default servicechain does
/// not exist, or [`RelayError::Database`] on SQLite failure.
pub async fn upsert_contact(db: &SqlitePool, contact: &Contact) -> Result<i64, RelayError> {
    if let Some(chain_id) = contact.default_servicechain_id {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM servicechains WHERE id = ?1")
            .bind(chain_id)
            .fetch_optional(db)
            .await?;
        if row.is_none() {
            return Err(RelayError::ChainNotFound(chain_id));
        }
    }

    if let Some(id) = contact.id {
        sqlx::query(
            "UPDATE contacts SET first_name=?1, surname=?2, email=?3, phone=?4, \
             default_servicechain_id=?5 WHERE id=?6",
        )
        .bind(&contact.first_name)
        .bind(&contact.surname)
        .bind(&contact.email)
        .bind(&contact.phone)
        .bind(contact.default_servicechain_id)
        .bind(id)
        .execute(db)
        .await?;
        return Ok(id);
    }
    let result = sqlx::query(
        "INSERT INTO contacts (first_name, surname, email, phone, default_servicechain_id) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(&contact.first_name)
    .bind(&contact.surname)
    .bind(&contact.email)
    .bind(&contact.phone)
    .bind(contact.default_servicechain_id)
    .execute(db)
    .await?;
    let id = result.last_insert_rowid();
    trace!(contact_id = id, surname = %contact.surname, "contact created");
    Ok(id)
}

/// Search contacts by name (case-insensitive LIKE match on either name).
///
/// # Errors
///
/// Returns [`RelayError::Database`] on SQLite failure.
pub async fn search_contacts(
    db: &SqlitePool,
    query: &str,
    limit: usize,
) -> Result<Vec<Contact>, RelayError> {
    let pattern = format!("%{query}%");
    let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);
    let rows: Vec<ContactRow> = sqlx::query_as(
        "SELECT id, first_name, surname, email, phone, default_servicechain_id \
         FROM contacts WHERE first_name LIKE ?1 OR surname LIKE ?1 \
         ORDER BY surname, first_name LIMIT ?2",
    )
    .bind(&pattern)
    .bind(limit_i64)
    .fetch_all(db)
    .await?;
    Ok(rows.into_iter().map(contact_from_row).collect())
}

/// Load a contact by ID.
///
/// # Errors
///
/// Returns [`RelayError::ContactNotFound`] if no contact matches,
/// or [`RelayError::Database`] on SQLite failure.
pub async fn load_contact(db: &SqlitePool, contact_id: i64) -> Result<Contact, RelayError> {
    let row: ContactRow = sqlx::query_as(
        "SELECT id, first_name, surname, email, phone, default_servicechain_id \
         FROM contacts WHERE id = ?1",
    )
    .bind(contact_id)
    .fetch_optional(db)
    .await?
    .ok_or(RelayError::ContactNotFound(contact_id))?;
    Ok(contact_from_row(row))
}

fn contact_from_row(row: ContactRow) -> Contact {
    Contact {
        id: Some(row.0),
        first_name: row.1,
        surname: row.2,
        email: row.3,
        phone: row.4,
        default_servicechain_id: row.5,
    }
}
