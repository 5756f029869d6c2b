//! # hamdam-store
//!
//! Local persistent state for the Hamdam application.
//!
//! State is split into independent named slices (users, characters,
//! conversations, ban list, audit log, ...), each stored as one JSON
//! document. [`SliceStore`] gives typed `get`/`set` access with an in-memory
//! mirror; [`Database`] is the SQLite backend behind it.

pub mod audit;
pub mod backup;
pub mod database;
pub mod export;
pub mod migrations;
pub mod models;
pub mod slices;

mod error;

pub use audit::{AuditActor, AuditEvent, AuditLog, AuditLogEntry};
pub use database::Database;
pub use error::StoreError;
pub use models::*;
pub use slices::{MemoryBackend, SliceBackend, SliceStore};
