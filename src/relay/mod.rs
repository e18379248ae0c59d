//! Relay domain core: entity records, servicechain ordering, and the message
//! delivery lifecycle.
//!
//! Every record is constructed through a validating factory and persisted as
//! plain rows; enum-typed columns round-trip through `as_str`/`parse` pairs.
//! Lifecycle legality is enforced centrally in [`message`], not left to
//! caller discipline.

pub mod admin;
pub mod chain;
pub mod contact;
pub mod message;

use std::sync::OnceLock;

use regex::Regex;

/// Errors from the relay domain core.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// An entity field failed validation.
    #[error("validation failed for {field}: {reason}")]
    Validation {
        /// Which field was malformed or missing.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// A lifecycle event was applied to a message in a state that does not
    /// permit it. The row is left unchanged.
    #[error("invalid transition for message {message_id}: {event} not allowed in state {state}")]
    InvalidTransition {
        /// The message the transition targeted.
        message_id: String,
        /// The state the message was in when the attempt was rejected.
        state: message::MessageState,
        /// The event that was attempted.
        event: message::MessageEvent,
    },

    /// Two services in one servicechain share a priority, so the attempt
    /// order is undefined. Surfaced to the administrator, never resolved by
    /// silently picking one.
    #[error("duplicate priority {priority} in servicechain {servicechain_id}")]
    DuplicatePriority {
        /// The chain holding the conflicting rows.
        servicechain_id: i64,
        /// The priority value shared by more than one service.
        priority: i64,
    },

    /// The requested mutation conflicts with a message already handed to
    /// dispatch.
    #[error("message {message_id} already dispatched (state {state})")]
    MessageAlreadySent {
        /// The message id.
        message_id: String,
        /// Its current state.
        state: message::MessageState,
    },

    /// The requested mutation conflicts with a message in the failed state.
    #[error("message {message_id} has failed delivery")]
    MessageFailed {
        /// The message id.
        message_id: String,
    },

    /// The requested message was not found.
    #[error("message not found: {0}")]
    MessageNotFound(String),

    /// The requested contact was not found.
    #[error("contact not found: {0}")]
    ContactNotFound(i64),

    /// The requested servicechain was not found.
    #[error("servicechain not found: {0}")]
    ChainNotFound(i64),

    /// The requested organization was not found.
    #[error("organization not found: {0}")]
    OrganizationNotFound(i64),

    /// The requested blast was not found.
    #[error("blast not found: {0}")]
    BlastNotFound(i64),

    /// An invalid enum value was read from the database.
    #[error("invalid {field} value: {value:?}")]
    InvalidEnum {
        /// Which column contained the bad value.
        field: &'static str,
        /// The unexpected value.
        value: String,
    },
}

// ── Validation helpers ──────────────────────────────────────────

/// Matches one `local@domain.tld` token with no whitespace.
fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
    })
}

/// Check that a required text field is non-empty (after trimming).
///
/// # Errors
///
/// Returns [`RelayError::Validation`] naming the field if it is blank.
pub fn require_non_empty(field: &'static str, value: &str) -> Result<(), RelayError> {
    if value.trim().is_empty() {
        return Err(RelayError::Validation {
            field,
            reason: "must not be empty".to_owned(),
        });
    }
    Ok(())
}

/// Check that an email address is syntactically plausible.
///
/// # Errors
///
/// Returns [`RelayError::Validation`] naming the field on a malformed address.
pub fn require_email(field: &'static str, value: &str) -> Result<(), RelayError> {
    if !email_regex().is_match(value) {
        return Err(RelayError::Validation {
            field,
            reason: format!("not a valid email address: {value:?}"),
        });
    }
    Ok(())
}
