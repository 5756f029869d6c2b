//! Admin panel commands. Everything except the login requires the session
//! admin flag.

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use hamdam_shared::premium::parse_days;
use hamdam_shared::pricing::parse_amount;
use hamdam_shared::types::{UserId, VisitorId};
use hamdam_store::export::conversations_to_csv;
use hamdam_store::AuditLogEntry;

use crate::audit::render_log;
use crate::commands::accounts::AccountDto;
use crate::error::{ClientError, Result};
use crate::gate::{self, LoginOutcome};
use crate::ledger::{self, BalanceOp};
use crate::router::Page;
use crate::state::{enter, AppState, SharedState};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLineDto {
    pub id: String,
    pub timestamp: String,
    pub action: String,
    pub text: String,
}

/// Check admin credentials and apply the attempt to the visitor's counter.
pub fn admin_log_in(state: &SharedState, username: &str, password: &str) -> Result<()> {
    let mut guard = enter(state)?;

    let verified = match &guard.authenticator {
        Some(auth) => auth.verify(username, password),
        None => return Err(ClientError::AdminDisabled),
    };

    let visitor = guard.visitor_id.clone();
    let mut bans = guard.bans();
    let mut attempts = guard.attempts();
    let outcome = gate::record_attempt(&mut bans, &mut attempts, &visitor, verified);
    guard.set_attempts(&attempts);
    guard.set_bans(&bans);

    match outcome {
        LoginOutcome::Granted => {
            guard.is_admin = true;
            guard.page = Page::Admin;
            info!(visitor = %visitor, "admin session granted");
            Ok(())
        }
        LoginOutcome::Rejected { remaining } => {
            warn!(visitor = %visitor, remaining, "admin login failed");
            Err(ClientError::InvalidCredentials { remaining })
        }
        LoginOutcome::Banned => Err(ClientError::BanTriggered),
    }
}

pub fn admin_log_out(state: &SharedState) -> Result<()> {
    let mut guard = enter(state)?;
    guard.is_admin = false;
    guard.page = Page::Landing;
    Ok(())
}

fn admin(state: &SharedState) -> Result<std::sync::MutexGuard<'_, AppState>> {
    let guard = enter(state)?;
    guard.require_admin()?;
    Ok(guard)
}

fn apply(
    guard: &mut AppState,
    target: &UserId,
    (users, entry): (Vec<hamdam_store::User>, AuditLogEntry),
) -> Result<AccountDto> {
    let updated = users
        .iter()
        .find(|u| &u.id == target)
        .map(AccountDto::from)
        .ok_or(ClientError::UserNotFound)?;

    info!(target = %target, action = entry.event.action(), "ledger mutation");
    guard.commit_users(&users);
    guard.append_audit(entry);
    Ok(updated)
}

pub fn list_users(state: &SharedState) -> Result<Vec<AccountDto>> {
    let mut guard = admin(state)?;
    Ok(guard.users().iter().map(AccountDto::from).collect())
}

/// Add or remove coins. `amount_input` is the raw form field.
pub fn adjust_balance(
    state: &SharedState,
    target: &UserId,
    op: BalanceOp,
    amount_input: &str,
) -> Result<AccountDto> {
    let mut guard = admin(state)?;
    let amount = parse_amount(amount_input)?;

    let users = guard.users();
    let change = ledger::adjust_balance(&users, target, op, amount, Utc::now())?;
    apply(&mut guard, target, change)
}

pub fn extend_subscription(
    state: &SharedState,
    target: &UserId,
    days_input: &str,
) -> Result<AccountDto> {
    let mut guard = admin(state)?;
    let days = parse_days(days_input)?;

    let users = guard.users();
    let change = ledger::extend_subscription(&users, target, days, Utc::now())?;
    apply(&mut guard, target, change)
}

pub fn revoke_subscription(state: &SharedState, target: &UserId) -> Result<AccountDto> {
    let mut guard = admin(state)?;

    let users = guard.users();
    let change = ledger::revoke_subscription(&users, target, Utc::now())?;
    apply(&mut guard, target, change)
}

pub fn list_bans(state: &SharedState) -> Result<Vec<VisitorId>> {
    let mut guard = admin(state)?;
    Ok(guard.bans())
}

/// Lift a ban and reset the visitor's login counter.
pub fn unban(state: &SharedState, visitor: &VisitorId) -> Result<bool> {
    let mut guard = admin(state)?;
    let mut bans = guard.bans();
    let mut attempts = guard.attempts();

    let removed = gate::unban(&mut bans, &mut attempts, visitor);
    guard.set_bans(&bans);
    guard.set_attempts(&attempts);

    if removed {
        info!(visitor = %visitor, "visitor unbanned");
    }
    Ok(removed)
}

/// Every conversation as CSV.
pub fn export_csv(state: &SharedState) -> Result<String> {
    let mut guard = admin(state)?;
    let conversations = guard.conversations();
    info!(conversations = conversations.len(), "transcripts exported");
    Ok(conversations_to_csv(&conversations))
}

/// The audit log rendered newest first.
pub fn audit_log(state: &SharedState) -> Result<Vec<AuditLineDto>> {
    let mut guard = admin(state)?;
    let log = guard.audit_log();
    let users = guard.users();

    Ok(log
        .iter()
        .zip(render_log(&log, &users))
        .map(|(entry, text)| AuditLineDto {
            id: entry.id.to_string(),
            timestamp: entry.timestamp.to_rfc3339(),
            action: entry.event.action().to_string(),
            text,
        })
        .collect())
}
