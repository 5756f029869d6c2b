//! Append-only record of account changes.
//!
//! On disk an entry keeps the loose `{ action, details }` layout; in memory
//! the details are decoded into an [`AuditEvent`] keyed by the action name.
//! Entries whose action is unknown, or whose details do not decode, are kept
//! as [`AuditEvent::Unknown`] with the raw payload instead of being dropped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use hamdam_shared::types::{LogId, UserId};

pub const ACTION_USER_CREATED: &str = "USER_CREATED";
pub const ACTION_BALANCE_ADD: &str = "BALANCE_ADD";
pub const ACTION_BALANCE_SUBTRACT: &str = "BALANCE_SUBTRACT";
pub const ACTION_SUBSCRIPTION_ADD: &str = "SUBSCRIPTION_ADD";
pub const ACTION_SUBSCRIPTION_REMOVE: &str = "SUBSCRIPTION_REMOVE";

/// Who performed the action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditActor {
    /// Automatic actions such as sign-up.
    System,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCreated {
    pub email: String,
    pub initial_balance: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceChange {
    pub amount: u64,
    pub old_balance: u64,
    pub new_balance: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionAdded {
    pub days_added: u32,
    #[serde(default)]
    pub old_expiry: Option<DateTime<Utc>>,
    pub new_expiry: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRemoved {
    #[serde(default)]
    pub last_expiry: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuditEvent {
    UserCreated(UserCreated),
    BalanceAdd(BalanceChange),
    BalanceSubtract(BalanceChange),
    SubscriptionAdd(SubscriptionAdded),
    SubscriptionRemove(SubscriptionRemoved),
    Unknown { action: String, details: Value },
}

impl AuditEvent {
    pub fn action(&self) -> &str {
        match self {
            AuditEvent::UserCreated(_) => ACTION_USER_CREATED,
            AuditEvent::BalanceAdd(_) => ACTION_BALANCE_ADD,
            AuditEvent::BalanceSubtract(_) => ACTION_BALANCE_SUBTRACT,
            AuditEvent::SubscriptionAdd(_) => ACTION_SUBSCRIPTION_ADD,
            AuditEvent::SubscriptionRemove(_) => ACTION_SUBSCRIPTION_REMOVE,
            AuditEvent::Unknown { action, .. } => action,
        }
    }

    fn details(&self) -> Value {
        let encoded = match self {
            AuditEvent::UserCreated(d) => serde_json::to_value(d),
            AuditEvent::BalanceAdd(d) | AuditEvent::BalanceSubtract(d) => serde_json::to_value(d),
            AuditEvent::SubscriptionAdd(d) => serde_json::to_value(d),
            AuditEvent::SubscriptionRemove(d) => serde_json::to_value(d),
            AuditEvent::Unknown { details, .. } => return details.clone(),
        };
        encoded.unwrap_or(Value::Null)
    }

    fn decode(action: String, details: Value) -> Self {
        fn typed<T: serde::de::DeserializeOwned>(details: &Value) -> Option<T> {
            serde_json::from_value(details.clone()).ok()
        }

        let decoded = match action.as_str() {
            ACTION_USER_CREATED => typed(&details).map(AuditEvent::UserCreated),
            ACTION_BALANCE_ADD => typed(&details).map(AuditEvent::BalanceAdd),
            ACTION_BALANCE_SUBTRACT => typed(&details).map(AuditEvent::BalanceSubtract),
            ACTION_SUBSCRIPTION_ADD => typed(&details).map(AuditEvent::SubscriptionAdd),
            ACTION_SUBSCRIPTION_REMOVE => typed(&details).map(AuditEvent::SubscriptionRemove),
            _ => None,
        };

        decoded.unwrap_or(AuditEvent::Unknown { action, details })
    }
}

/// One immutable audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawAuditLogEntry", into = "RawAuditLogEntry")]
pub struct AuditLogEntry {
    pub id: LogId,
    pub timestamp: DateTime<Utc>,
    pub actor: AuditActor,
    pub target_user_id: UserId,
    pub event: AuditEvent,
}

impl AuditLogEntry {
    pub fn new(
        actor: AuditActor,
        target_user_id: UserId,
        event: AuditEvent,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: LogId::new(),
            timestamp: now,
            actor,
            target_user_id,
            event,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAuditLogEntry {
    id: LogId,
    timestamp: DateTime<Utc>,
    action: String,
    admin_id: AuditActor,
    target_user_id: UserId,
    #[serde(default)]
    details: Value,
}

impl From<RawAuditLogEntry> for AuditLogEntry {
    fn from(raw: RawAuditLogEntry) -> Self {
        Self {
            id: raw.id,
            timestamp: raw.timestamp,
            actor: raw.admin_id,
            target_user_id: raw.target_user_id,
            event: AuditEvent::decode(raw.action, raw.details),
        }
    }
}

impl From<AuditLogEntry> for RawAuditLogEntry {
    fn from(entry: AuditLogEntry) -> Self {
        Self {
            details: entry.event.details(),
            action: entry.event.action().to_string(),
            id: entry.id,
            timestamp: entry.timestamp,
            admin_id: entry.actor,
            target_user_id: entry.target_user_id,
        }
    }
}

/// Newest-first log. New entries go to the front.
pub type AuditLog = Vec<AuditLogEntry>;

pub fn append(log: &mut AuditLog, entry: AuditLogEntry) {
    log.insert(0, entry);
}
