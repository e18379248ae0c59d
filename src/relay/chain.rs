//! Services, servicechains, and chain membership.
//!
//! A servicechain is a named ordered list of delivery channels. Ordering is
//! defined by the `priority` column of the membership rows: ascending, and
//! strict — equal priorities within one chain make the attempt order
//! undefined, which [`servicechain_order`] surfaces as
//! [`RelayError::DuplicatePriority`] instead of silently picking a winner.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::trace;

use super::RelayError;

/// A delivery-channel implementation descriptor.
///
/// `directory_name` is the module reference an external plugin registry uses
/// to locate the channel implementation; this crate only stores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    /// Database ID (None for new services).
    pub id: Option<i64>,
    /// Human-readable channel name (e.g. "sms", "telegram").
    pub name: String,
    /// Plugin directory/module reference.
    pub directory_name: String,
    /// Whether the channel has completed setup.
    pub initialized: bool,
}

/// A named ordered list of services to attempt for a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Servicechain {
    /// Database ID (None for new chains).
    pub id: Option<i64>,
    /// Chain name.
    pub name: String,
}

/// Create a service record. New services start uninitialised.
///
/// # Errors
///
/// Returns [`RelayError::Validation`] if a required field is blank,
/// or [`RelayError::Database`] on SQLite failure.
pub async fn create_service(
    db: &SqlitePool,
    name: &str,
    directory_name: &str,
) -> Result<i64, RelayError> {
    super::require_non_empty("name", name)?;
    super::require_non_empty("directory_name", directory_name)?;
    let result = sqlx::query("INSERT INTO services (name, directory_name) VALUES (?1, ?2)")
        .bind(name)
        .bind(directory_name)
        .execute(db)
        .await?;
    let id = result.last_insert_rowid();
    trace!(service_id = id, name, "service created");
    Ok(id)
}

/// Record that a service's channel plugin has completed setup.
///
/// # Errors
///
/// Returns [`RelayError::Database`] on SQLite failure.
pub async fn mark_initialized(db: &SqlitePool, service_id: i64) -> Result<(), RelayError> {
    sqlx::query("UPDATE services SET initialized = 1 WHERE id = ?1")
        .bind(service_id)
        .execute(db)
        .await?;
    trace!(service_id, "service marked initialized");
    Ok(())
}

/// Create a servicechain.
///
/// # Errors
///
/// Returns [`RelayError::Validation`] if the name is blank,
/// or [`RelayError::Database`] on SQLite failure.
pub async fn create_servicechain(db: &SqlitePool, name: &str) -> Result<i64, RelayError> {
    super::require_non_empty("name", name)?;
    let result = sqlx::query("INSERT INTO servicechains (name) VALUES (?1)")
        .bind(name)
        .execute(db)
        .await?;
    let id = result.last_insert_rowid();
    trace!(servicechain_id = id, name, "servicechain created");
    Ok(id)
}

/// Add a service to a chain at the given attempt priority.
///
/// Referential integrity to both parents is enforced by the schema's foreign
/// keys; priority uniqueness is deliberately not, see [`servicechain_order`].
///
/// # Errors
///
/// Returns [`RelayError::Database`] on SQLite failure (including a dangling
/// service or chain reference).
pub async fn add_service_to_chain(
    db: &SqlitePool,
    servicechain_id: i64,
    service_id: i64,
    priority: i64,
) -> Result<(), RelayError> {
    sqlx::query(
        "INSERT INTO services_in_sc (servicechain_id, service_id, priority) VALUES (?1, ?2, ?3)",
    )
    .bind(servicechain_id)
    .bind(service_id)
    .bind(priority)
    .execute(db)
    .await?;
    trace!(servicechain_id, service_id, priority, "service added to chain");
    Ok(())
}

/// Load a servicechain by ID.
///
/// # Errors
///
/// Returns [`RelayError::ChainNotFound`] if no chain matches,
/// or [`RelayError::Database`] on SQLite failure.
pub async fn load_servicechain(
    db: &SqlitePool,
    servicechain_id: i64,
) -> Result<Servicechain, RelayError> {
    let row: (i64, String) = sqlx::query_as("SELECT id, name FROM servicechains WHERE id = ?1")
        .bind(servicechain_id)
        .fetch_optional(db)
        .await?
        .ok_or(RelayError::ChainNotFound(servicechain_id))?;
    Ok(Servicechain {
        id: Some(row.0),
        name: row.1,
    })
}

/// Resolve a chain into its services in ascending priority order.
///
/// Scans the membership rows ordered by priority and rejects the chain if
/// two rows share a priority value — pre-existing bad data must surface to
/// the administrator, not be quietly tie-broken.
///
/// # Errors
///
/// Returns [`RelayError::ChainNotFound`] if the chain does not exist,
/// [`RelayError::DuplicatePriority`] on a priority collision,
/// or [`RelayError::Database`] on SQLite failure.
pub async fn servicechain_order(
    db: &SqlitePool,
    servicechain_id: i64,
) -> Result<Vec<Service>, RelayError> {
    // Existence check first, so an empty chain and a missing chain differ.
    load_servicechain(db, servicechain_id).await?;

    let rows: Vec<(i64, i64, String, String, i64)> = sqlx::query_as(
        "SELECT sis.priority, s.id, s.name, s.directory_name, s.initialized \
         FROM services_in_sc sis \
         JOIN services s ON s.id = sis.service_id \
         WHERE sis.servicechain_id = ?1 \
         ORDER BY sis.priority ASC",
    )
    .bind(servicechain_id)
    .fetch_all(db)
    .await?;

    let mut previous_priority: Option<i64> = None;
    let mut services = Vec::with_capacity(rows.len());
    for (priority, id, name, directory_name, initialized) in rows {
        if previous_priority == Some(priority) {
            return Err(RelayError::DuplicatePriority {
                servicechain_id,
                priority,
            });
        }
        previous_priority = Some(priority);
        services.push(Service {
            id: Some(id),
            name,
            directory_name,
            initialized: initialized != 0,
        });
    }
    Ok(services)
}
