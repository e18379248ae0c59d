//! Courier — messaging-relay persistence core.
//!
//! Entity records (contacts, services, servicechains, organizations, users,
//! blasts), the message delivery lifecycle state machine, and servicechain
//! ordering, persisted to SQLite. Dispatch scheduling, retry policy, and the
//! delivery-channel plugins themselves live in external collaborators; this
//! crate owns the records and the legality of every lifecycle move.
//!
//! See `DESIGN.md` for full architecture documentation.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod db;
pub mod logging;

pub mod relay;
