//! Message records and the delivery lifecycle state machine.
//!
//! A message is created in [`MessageState::Pending`] and only ever moves
//! through [`transition`], which validates the event against the transition
//! table and applies it with a compare-and-set on the current state. Delivery
//! progress is monotonic once a channel has confirmed receipt; the single
//! permitted regression is `Failed -> Sending`, a retry after one exhausted
//! servicechain pass. When to retry is the external dispatcher's call, not
//! ours.

use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::trace;

use super::RelayError;

/// Maximum message body length in characters.
pub const MAX_BODY_CHARS: usize = 1024;

/// Row type returned by SQLite queries for messages.
pub(super) type MessageRow = (
    String,
    String,
    i64,
    i64,
    Option<i64>,
    Option<String>,
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
);

// ── Enums ───────────────────────────────────────────────────────

/// Whether a message is coming into the relay or going out through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Received from a contact via a delivery channel.
    Inbound,
    /// Sent to a contact via a servicechain.
    Outbound,
}

impl Direction {
    /// Returns the SQLite-stored string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inbound => "inbound",
            Self::Outbound => "outbound",
        }
    }

    /// Parse from a SQLite text value.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::InvalidEnum`] if the value is not a recognised direction.
    pub fn parse(s: &str) -> Result<Self, RelayError> {
        match s {
            "inbound" => Ok(Self::Inbound),
            "outbound" => Ok(Self::Outbound),
            other => Err(RelayError::InvalidEnum {
                field: "direction",
                value: other.to_owned(),
            }),
        }
    }
}

/// Delivery lifecycle state of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageState {
    /// Created, no dispatch attempt yet.
    Pending,
    /// A dispatch attempt is in flight.
    Sending,
    /// A channel accepted the message for transmission.
    Sent,
    /// The channel/service confirmed receipt.
    DeliveredService,
    /// Downstream confirmed user-level delivery.
    DeliveredUser,
    /// The recipient opened the message.
    Read,
    /// The recipient responded.
    Replied,
    /// All servicechain attempts exhausted, or a non-retryable error.
    Failed,
}

impl MessageState {
    /// Returns the SQLite-stored string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sending => "sending",
            Self::Sent => "sent",
            Self::DeliveredService => "delivered_service",
            Self::DeliveredUser => "delivered_user",
            Self::Read => "read",
            Self::Replied => "replied",
            Self::Failed => "failed",
        }
    }

    /// Parse from a SQLite text value.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::InvalidEnum`] if the value is not a recognised state.
    pub fn parse(s: &str) -> Result<Self, RelayError> {
        match s {
            "pending" => Ok(Self::Pending),
            "sending" => Ok(Self::Sending),
            "sent" => Ok(Self::Sent),
            "delivered_service" => Ok(Self::DeliveredService),
            "delivered_user" => Ok(Self::DeliveredUser),
            "read" => Ok(Self::Read),
            "replied" => Ok(Self::Replied),
            "failed" => Ok(Self::Failed),
            other => Err(RelayError::InvalidEnum {
                field: "state",
                value: other.to_owned(),
            }),
        }
    }

    /// The state this message moves to if `event` is applied, or `None` if
    /// the event is not legal from this state.
    ///
    /// This table is the single source of truth for lifecycle legality.
    pub fn apply(&self, event: MessageEvent) -> Option<MessageState> {
        match (self, event) {
            (Self::Pending | Self::Failed, MessageEvent::DispatchStarted) => Some(Self::Sending),
            (Self::Sending, MessageEvent::ChannelAccepted) => Some(Self::Sent),
            (Self::Sent, MessageEvent::ServiceConfirmed) => Some(Self::DeliveredService),
            (Self::DeliveredService, MessageEvent::UserConfirmed) => Some(Self::DeliveredUser),
            (Self::DeliveredUser, MessageEvent::RecipientRead) => Some(Self::Read),
            (Self::DeliveredUser | Self::Read, MessageEvent::RecipientReplied) => {
                Some(Self::Replied)
            }
            (Self::Sending, MessageEvent::ChainExhausted) => Some(Self::Failed),
            _ => None,
        }
    }

    /// Whether this state ends the lifecycle (`Replied`) or is only left
    /// again via the retry regression (`Failed`).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Replied | Self::Failed)
    }
}

impl fmt::Display for MessageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle events reported by the external dispatch collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageEvent {
    /// A dispatch attempt starts (first attempt or retry after failure).
    DispatchStarted,
    /// A channel accepted the message for transmission.
    ChannelAccepted,
    /// The channel/service confirmed receipt.
    ServiceConfirmed,
    /// Downstream confirmed user-level delivery.
    UserConfirmed,
    /// The recipient opened the message.
    RecipientRead,
    /// The recipient responded.
    RecipientReplied,
    /// A send attempt exhausted the servicechain.
    ChainExhausted,
}

impl MessageEvent {
    /// Stable snake_case name, used in logs and error text.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DispatchStarted => "dispatch_started",
            Self::ChannelAccepted => "channel_accepted",
            Self::ServiceConfirmed => "service_confirmed",
            Self::UserConfirmed => "user_confirmed",
            Self::RecipientRead => "recipient_read",
            Self::RecipientReplied => "recipient_replied",
            Self::ChainExhausted => "chain_exhausted",
        }
    }
}

impl fmt::Display for MessageEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Records ─────────────────────────────────────────────────────

/// One unit of outbound or inbound communication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier, immutable once assigned.
    pub id: String,
    /// Text payload.
    pub body: String,
    /// The servicechain used to deliver this message.
    pub servicechain_id: i64,
    /// The recipient (outbound) or sender (inbound).
    pub contact_id: i64,
    /// Optional bulk-send batch this message belongs to.
    pub blast_id: Option<i64>,
    /// Prior message this one replies to.
    pub is_reply_to: Option<String>,
    /// Inbound or outbound.
    pub direction: Direction,
    /// Current lifecycle state.
    pub state: MessageState,
    /// When a channel accepted the message for transmission.
    pub sent_time: Option<String>,
    /// ISO-8601 creation timestamp (set by SQLite on insert).
    pub created_at: Option<String>,
    /// ISO-8601 last-update timestamp.
    pub updated_at: Option<String>,
}

/// Parameters for creating a message.
#[derive(Debug, Clone)]
pub struct NewMessage {
    /// The recipient (outbound) or sender (inbound).
    pub contact_id: i64,
    /// The servicechain to deliver through.
    pub servicechain_id: i64,
    /// Text payload.
    pub body: String,
    /// Inbound or outbound.
    pub direction: Direction,
    /// Prior message this one replies to.
    pub is_reply_to: Option<String>,
    /// Optional bulk-send batch.
    pub blast_id: Option<i64>,
}

/// Convert a `MessageRow` tuple into a [`Message`], propagating parse errors.
pub(super) fn message_from_row(row: MessageRow) -> Result<Message, RelayError> {
    Ok(Message {
        id: row.0,
        body: row.1,
        servicechain_id: row.2,
        contact_id: row.3,
        blast_id: row.4,
        is_reply_to: row.5,
        direction: Direction::parse(&row.6)?,
        state: MessageState::parse(&row.7)?,
        sent_time: row.8,
        created_at: row.9,
        updated_at: row.10,
    })
}

// ── Operations ──────────────────────────────────────────────────

/// Validate the body field of a new or updated message.
fn validate_body(body: &str) -> Result<(), RelayError> {
    super::require_non_empty("body", body)?;
    let chars = body.chars().count();
    if chars > MAX_BODY_CHARS {
        return Err(RelayError::Validation {
            field: "body",
            reason: format!("{chars} characters exceeds the {MAX_BODY_CHARS} character limit"),
        });
    }
    Ok(())
}

async fn row_exists(db: &SqlitePool, sql: &str, id: i64) -> Result<bool, RelayError> {
    let row: Option<(i64,)> = sqlx::query_as(sql).bind(id).fetch_optional(db).await?;
    Ok(row.is_some())
}

/// Create a message in [`MessageState::Pending`].
///
/// Validates the body, then checks every referenced row exists before
/// inserting, so callers get a typed error instead of a bare foreign-key
/// violation.
///
/// # Errors
///
/// Returns [`RelayError::Validation`] for a malformed body,
/// [`RelayError::ContactNotFound`] / [`RelayError::ChainNotFound`] /
/// [`RelayError::MessageNotFound`] / [`RelayError::BlastNotFound`] for a
/// dangling reference, or [`RelayError::Database`] on SQLite failure.
pub async fn create_message(db: &SqlitePool, new: NewMessage) -> Result<Message, RelayError> {
    validate_body(&new.body)?;

    if !row_exists(db, "SELECT 1 FROM contacts WHERE id = ?1", new.contact_id).await? {
        return Err(RelayError::ContactNotFound(new.contact_id));
    }
    if !row_exists(
        db,
        "SELECT 1 FROM servicechains WHERE id = ?1",
        new.servicechain_id,
    )
    .await?
    {
        return Err(RelayError::ChainNotFound(new.servicechain_id));
    }
    if let Some(ref reply_to) = new.is_reply_to {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM messages WHERE id = ?1")
            .bind(reply_to)
            .fetch_optional(db)
            .await?;
        if row.is_none() {
            return Err(RelayError::MessageNotFound(reply_to.clone()));
        }
    }
    if let Some(blast_id) = new.blast_id {
        if !row_exists(db, "SELECT 1 FROM blasts WHERE id = ?1", blast_id).await? {
            return Err(RelayError::BlastNotFound(blast_id));
        }
    }

    let id = uuid::Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO messages (id, body, servicechain_id, contact_id, blast_id, is_reply_to, \
         direction, state) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )
    .bind(&id)
    .bind(&new.body)
    .bind(new.servicechain_id)
    .bind(new.contact_id)
    .bind(new.blast_id)
    .bind(&new.is_reply_to)
    .bind(new.direction.as_str())
    .bind(MessageState::Pending.as_str())
    .execute(db)
    .await?;

    trace!(message_id = %id, contact_id = new.contact_id, "message created");
    load_message(db, &id).await
}

/// Load a message by id.
///
/// # Errors
///
/// Returns [`RelayError::MessageNotFound`] if no message matches,
/// or [`RelayError::Database`] on SQLite failure.
pub async fn load_message(db: &SqlitePool, message_id: &str) -> Result<Message, RelayError> {
    let row: MessageRow = sqlx::query_as(
        "SELECT id, body, servicechain_id, contact_id, blast_id, is_reply_to, \
         direction, state, sent_time, created_at, updated_at \
         FROM messages WHERE id = ?1",
    )
    .bind(message_id)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| RelayError::MessageNotFound(message_id.to_owned()))?;
    message_from_row(row)
}

/// Apply a lifecycle event to a message and return the updated record.
///
/// The update is a compare-and-set on the state the message was loaded in:
/// if a concurrent caller transitioned the row first, zero rows match and
/// the losing caller gets [`RelayError::InvalidTransition`] reflecting the
/// fresh state. The row is never left partially mutated.
///
/// `ChannelAccepted` also stamps `sent_time`.
///
/// # Errors
///
/// Returns [`RelayError::InvalidTransition`] if the event is not legal from
/// the current state (or a concurrent transition won the race),
/// [`RelayError::MessageNotFound`] if the message does not exist,
/// or [`RelayError::Database`] on SQLite failure.
pub async fn transition(
    db: &SqlitePool,
    message_id: &str,
    event: MessageEvent,
) -> Result<Message, RelayError> {
    let message = load_message(db, message_id).await?;
    let Some(next) = message.state.apply(event) else {
        return Err(RelayError::InvalidTransition {
            message_id: message_id.to_owned(),
            state: message.state,
            event,
        });
    };

    let sent_time = matches!(next, MessageState::Sent)
        .then(|| chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string());

    let result = sqlx::query(
        "UPDATE messages SET state = ?1, sent_time = COALESCE(?2, sent_time), \
         updated_at = datetime('now') WHERE id = ?3 AND state = ?4",
    )
    .bind(next.as_str())
    .bind(&sent_time)
    .bind(message_id)
    .bind(message.state.as_str())
    .execute(db)
    .await?;

    if result.rows_affected() == 0 {
        // Lost the race: reload and report against the state that won.
        let fresh = load_message(db, message_id).await?;
        return Err(RelayError::InvalidTransition {
            message_id: message_id.to_owned(),
            state: fresh.state,
            event,
        });
    }

    trace!(
        message_id,
        event = event.as_str(),
        from = message.state.as_str(),
        to = next.as_str(),
        "message transitioned"
    );
    load_message(db, message_id).await
}

/// Replace the body of a not-yet-dispatched message.
///
/// Only legal while the message is still [`MessageState::Pending`]. The
/// update carries the same compare-and-set as [`transition`], so a dispatch
/// racing this edit cannot interleave with it.
///
/// # Errors
///
/// Returns [`RelayError::Validation`] for a malformed body,
/// [`RelayError::MessageFailed`] if the message has failed delivery,
/// [`RelayError::MessageAlreadySent`] if it has been handed to dispatch,
/// [`RelayError::MessageNotFound`] if it does not exist,
/// or [`RelayError::Database`] on SQLite failure.
pub async fn update_body(
    db: &SqlitePool,
    message_id: &str,
    body: &str,
) -> Result<Message, RelayError> {
    validate_body(body)?;

    let message = load_message(db, message_id).await?;
    if message.state != MessageState::Pending {
        return Err(body_conflict(message_id, message.state));
    }

    let result = sqlx::query(
        "UPDATE messages SET body = ?1, updated_at = datetime('now') \
         WHERE id = ?2 AND state = ?3",
    )
    .bind(body)
    .bind(message_id)
    .bind(MessageState::Pending.as_str())
    .execute(db)
    .await?;

    if result.rows_affected() == 0 {
        let fresh = load_message(db, message_id).await?;
        return Err(body_conflict(message_id, fresh.state));
    }

    trace!(message_id, "message body updated");
    load_message(db, message_id).await
}

fn body_conflict(message_id: &str, state: MessageState) -> RelayError {
    match state {
        MessageState::Failed => RelayError::MessageFailed {
            message_id: message_id.to_owned(),
        },
        _ => RelayError::MessageAlreadySent {
            message_id: message_id.to_owned(),
            state,
        },
    }
}
